//! Account management endpoints.
//!
//! Every route is gated on the `user.manage` capability; the transport layer
//! only translates requests into lifecycle-service calls and maps typed
//! outcomes back to statuses.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, put},
};

use opsgate_accounts::AccountFilter;
use opsgate_auth::{Permission, Role};
use opsgate_core::AccountId;

use crate::app::{AppState, dto, errors};
use crate::authz::{USER_MANAGE, require_permission};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_accounts).post(create_account))
        .route("/:id", put(update_account).delete(delete_account))
        .route("/:id/status", patch(set_account_status))
}

fn parse_account_id(raw: &str) -> Result<AccountId, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            "account id must be a UUID",
        )
    })
}

pub async fn list_accounts(
    Extension(state): Extension<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<dto::ListAccountsQuery>,
) -> axum::response::Response {
    if let Err(resp) = require_permission(&state.manifest, &actor, &Permission::new(USER_MANAGE)) {
        return resp;
    }

    let filter = AccountFilter {
        enabled: query.status.map(|s| s.is_enabled()),
        role: query.role.map(Role::new),
        search: query.search,
    };

    match state.service.list_accounts(&filter).await {
        Ok(items) => {
            let total = items.len();
            (
                StatusCode::OK,
                Json(serde_json::json!({ "items": items, "total": total })),
            )
                .into_response()
        }
        Err(e) => errors::account_error_to_response(e),
    }
}

pub async fn create_account(
    Extension(state): Extension<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::CreateAccountRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_permission(&state.manifest, &actor, &Permission::new(USER_MANAGE)) {
        return resp;
    }

    match state.service.create_account(body.into_input()).await {
        Ok(account) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "account": account })),
        )
            .into_response(),
        Err(e) => errors::account_error_to_response(e),
    }
}

pub async fn update_account(
    Extension(state): Extension<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateAccountRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_permission(&state.manifest, &actor, &Permission::new(USER_MANAGE)) {
        return resp;
    }

    let id = match parse_account_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.service.update_account(id, body.into_patch()).await {
        Ok(account) => (
            StatusCode::OK,
            Json(serde_json::json!({ "account": account })),
        )
            .into_response(),
        Err(e) => errors::account_error_to_response(e),
    }
}

pub async fn set_account_status(
    Extension(state): Extension<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetStatusRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_permission(&state.manifest, &actor, &Permission::new(USER_MANAGE)) {
        return resp;
    }

    let id = match parse_account_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.service.set_account_enabled(id, body.enabled).await {
        Ok(account) => (
            StatusCode::OK,
            Json(serde_json::json!({ "account": account })),
        )
            .into_response(),
        Err(e) => errors::account_error_to_response(e),
    }
}

pub async fn delete_account(
    Extension(state): Extension<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_permission(&state.manifest, &actor, &Permission::new(USER_MANAGE)) {
        return resp;
    }

    let id = match parse_account_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.service.delete_account(id).await {
        Ok(id) => (
            StatusCode::OK,
            Json(serde_json::json!({ "id": id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::account_error_to_response(e),
    }
}
