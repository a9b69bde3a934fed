//! Role→permission manifest.
//!
//! The manifest is loaded exactly once at process start and is read-only
//! thereafter; every lookup is a pure function of immutable state. A manifest
//! that fails validation must prevent the process from serving.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::{Permission, Role};

/// Role identifier that anchors the administrator-floor invariant.
pub const ADMIN_ROLE: &str = "admin";

/// Role assigned when a create request does not name one.
pub const DEFAULT_ROLE: &str = "operator";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed manifest: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("role '{role}' references unknown permission '{permission}'")]
    UnknownPermission { role: String, permission: String },

    #[error("role '{role}' lists permission '{permission}' more than once")]
    DuplicatePermission { role: String, permission: String },

    #[error("manifest does not define the 'admin' role")]
    MissingAdminRole,
}

/// On-disk document shape:
/// `{"permissions": {id: description, ...}, "roles": {roleId: [permissionId, ...], ...}}`.
#[derive(Debug, Deserialize)]
struct RawManifest {
    permissions: BTreeMap<String, String>,
    roles: BTreeMap<String, Vec<String>>,
}

/// Immutable permission catalog and role baseline mapping.
#[derive(Debug, Clone)]
pub struct PermissionManifest {
    permissions: BTreeMap<Permission, String>,
    roles: BTreeMap<Role, Vec<Permission>>,
}

impl PermissionManifest {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest = serde_json::from_str(raw)?;

        let permissions: BTreeMap<Permission, String> = raw
            .permissions
            .into_iter()
            .map(|(id, description)| (Permission::new(id), description))
            .collect();

        let mut roles: BTreeMap<Role, Vec<Permission>> = BTreeMap::new();
        for (role, grants) in raw.roles {
            let mut baseline: Vec<Permission> = Vec::with_capacity(grants.len());
            for id in grants {
                let permission = Permission::new(id);
                if !permissions.contains_key(&permission) {
                    return Err(ManifestError::UnknownPermission {
                        role,
                        permission: permission.as_str().to_string(),
                    });
                }
                if baseline.contains(&permission) {
                    return Err(ManifestError::DuplicatePermission {
                        role,
                        permission: permission.as_str().to_string(),
                    });
                }
                baseline.push(permission);
            }
            roles.insert(Role::new(role), baseline);
        }

        let manifest = Self { permissions, roles };
        if !manifest.is_known_role(&Role::new(ADMIN_ROLE)) {
            return Err(ManifestError::MissingAdminRole);
        }
        Ok(manifest)
    }

    /// The full set of known permission identifiers.
    pub fn permissions(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.keys()
    }

    pub fn permission_description(&self, id: &Permission) -> Option<&str> {
        self.permissions.get(id).map(String::as_str)
    }

    /// Baseline permission set for a role. Empty for unknown roles, so an
    /// account with an unknown role fails closed.
    pub fn role_permissions(&self, role: &Role) -> &[Permission] {
        self.roles.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn roles(&self) -> impl Iterator<Item = (&Role, &[Permission])> {
        self.roles.iter().map(|(role, perms)| (role, perms.as_slice()))
    }

    pub fn is_known_permission(&self, id: &Permission) -> bool {
        self.permissions.contains_key(id)
    }

    pub fn is_known_role(&self, role: &Role) -> bool {
        self.roles.contains_key(role)
    }

    /// The subset of `ids` the manifest does not know, for error payloads.
    pub fn unknown_permissions<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a Permission>,
    ) -> Vec<Permission> {
        ids.into_iter()
            .filter(|id| !self.is_known_permission(id))
            .cloned()
            .collect()
    }
}
