//! Manifest summary endpoints.
//!
//! Read-only views of the loaded permission catalog and role baselines, for
//! console UIs that render grant pickers.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use opsgate_auth::Permission;

use crate::app::AppState;
use crate::authz::{USER_MANAGE, require_permission};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/roles", get(list_roles))
        .route("/permissions", get(list_permissions))
}

/// GET /rbac/roles - all roles with their baseline permission sets.
pub async fn list_roles(
    Extension(state): Extension<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = require_permission(&state.manifest, &actor, &Permission::new(USER_MANAGE)) {
        return resp;
    }

    let roles: Vec<_> = state
        .manifest
        .roles()
        .map(|(role, permissions)| {
            serde_json::json!({
                "name": role,
                "permissions": permissions,
            })
        })
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "roles": roles }))).into_response()
}

/// GET /rbac/permissions - the full permission catalog with descriptions.
pub async fn list_permissions(
    Extension(state): Extension<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = require_permission(&state.manifest, &actor, &Permission::new(USER_MANAGE)) {
        return resp;
    }

    let permissions: Vec<_> = state
        .manifest
        .permissions()
        .map(|permission| {
            serde_json::json!({
                "name": permission,
                "description": state.manifest.permission_description(permission),
            })
        })
        .collect();

    (
        StatusCode::OK,
        Json(serde_json::json!({ "permissions": permissions })),
    )
        .into_response()
}
