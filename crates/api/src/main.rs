use std::sync::Arc;

use opsgate_accounts::AccountService;
use opsgate_auth::{BcryptHasher, PermissionManifest};
use opsgate_infra::{InMemoryAccountRepository, seed_default_accounts};

#[tokio::main]
async fn main() {
    opsgate_observability::init();

    let manifest_path = std::env::var("OPSGATE_MANIFEST")
        .unwrap_or_else(|_| "config/permissions.json".to_string());

    // Manifest load failure is the one fatal condition: the process must not
    // serve with an inconsistent permission catalog.
    let manifest = match PermissionManifest::from_path(&manifest_path) {
        Ok(manifest) => Arc::new(manifest),
        Err(e) => {
            tracing::error!(error = %e, path = %manifest_path, "failed to load permission manifest");
            std::process::exit(1);
        }
    };

    let jwt_secret = std::env::var("OPSGATE_JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("OPSGATE_JWT_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });

    let repository = Arc::new(InMemoryAccountRepository::new());
    let hasher = Arc::new(BcryptHasher::new());
    let service = Arc::new(AccountService::new(manifest.clone(), repository, hasher));

    if let Err(e) = seed_default_accounts(&service).await {
        tracing::error!(error = %e, "failed to seed default accounts");
        std::process::exit(1);
    }

    let app = opsgate_api::app::build_app(manifest, service, jwt_secret);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
        .await
        .expect("failed to bind 0.0.0.0:8080");

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
