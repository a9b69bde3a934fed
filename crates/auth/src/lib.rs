//! `opsgate-auth` — pure authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod claims;
pub mod credential;
pub mod evaluate;
pub mod manifest;
pub mod permissions;
pub mod roles;

pub use claims::{AuthClaims, TokenValidationError, validate_claims};
pub use credential::{BcryptHasher, CredentialError, CredentialHasher, StoredCredential};
pub use evaluate::{authorize, effective_permissions};
pub use manifest::{ADMIN_ROLE, DEFAULT_ROLE, ManifestError, PermissionManifest};
pub use permissions::Permission;
pub use roles::Role;
