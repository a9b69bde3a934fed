//! Pure authorization evaluator.
//!
//! An account's effective permission set is recomputed on every check as the
//! union of its role baseline and its extra grants, so role or grant changes
//! are reflected immediately with no cached state to invalidate.

use std::collections::BTreeSet;

use crate::{Permission, PermissionManifest, Role};

/// Effective permission set: the union of the role baseline and the extra
/// grants, deduplicated.
///
/// An unknown role contributes an empty baseline.
pub fn effective_permissions(
    manifest: &PermissionManifest,
    role: &Role,
    extras: &[Permission],
) -> BTreeSet<Permission> {
    let mut set: BTreeSet<Permission> =
        manifest.role_permissions(role).iter().cloned().collect();
    set.extend(extras.iter().cloned());
    set
}

/// True iff `required` is in the effective permission set.
///
/// - No IO
/// - No panics
/// - No failure modes: an unknown permission simply cannot be satisfied.
pub fn authorize(
    manifest: &PermissionManifest,
    role: &Role,
    extras: &[Permission],
    required: &Permission,
) -> bool {
    manifest.role_permissions(role).contains(required) || extras.contains(required)
}
