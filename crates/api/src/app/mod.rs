pub mod dto;
pub mod errors;
pub mod routes;

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

use opsgate_accounts::AccountService;
use opsgate_auth::PermissionManifest;

use crate::jwt::Hs256TokenDecoder;
use crate::middleware::{AuthState, auth_middleware};

/// Shared state for request handlers.
pub struct AppState {
    pub service: Arc<AccountService>,
    pub manifest: Arc<PermissionManifest>,
}

/// Assemble the full router: public health probe plus the token-guarded
/// account and manifest routes.
pub fn build_app(
    manifest: Arc<PermissionManifest>,
    service: Arc<AccountService>,
    jwt_secret: String,
) -> Router {
    let state = Arc::new(AppState { service, manifest });
    let auth_state = AuthState {
        decoder: Arc::new(Hs256TokenDecoder::new(&jwt_secret)),
    };

    let protected = Router::new()
        .nest("/accounts", routes::accounts::router())
        .nest("/rbac", routes::rbac::router())
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .layer(Extension(state));

    Router::new()
        .route("/healthz", get(healthz))
        .merge(protected)
}

async fn healthz() -> &'static str {
    "ok"
}
