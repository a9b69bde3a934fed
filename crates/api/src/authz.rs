//! API-side authorization guard.
//!
//! Enforces the required capability at the route boundary, before the
//! lifecycle service is invoked.

use axum::http::StatusCode;

use opsgate_auth::{Permission, PermissionManifest, evaluate};

use crate::app::errors;
use crate::context::ActorContext;

/// Capability gating every account-management route.
pub const USER_MANAGE: &str = "user.manage";

pub fn require_permission(
    manifest: &PermissionManifest,
    actor: &ActorContext,
    required: &Permission,
) -> Result<(), axum::response::Response> {
    if evaluate::authorize(manifest, actor.role(), actor.permissions(), required) {
        Ok(())
    } else {
        Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            format!("missing permission '{required}'"),
        ))
    }
}
