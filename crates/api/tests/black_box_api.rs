use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

use opsgate_accounts::AccountService;
use opsgate_auth::{AuthClaims, BcryptHasher, PermissionManifest, Role};
use opsgate_core::AccountId;
use opsgate_infra::{InMemoryAccountRepository, seed_default_accounts};

const MANIFEST: &str = r#"{
    "permissions": {
        "user.manage": "Manage accounts",
        "task.operate": "Operate task pipelines",
        "report.view": "View reports"
    },
    "roles": {
        "admin": ["user.manage", "task.operate", "report.view"],
        "operator": ["task.operate", "report.view"],
        "viewer": ["report.view"]
    }
}"#;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        // Same wiring as prod, but with the in-memory repository, a cheap
        // hash cost, and an ephemeral port.
        let manifest = Arc::new(PermissionManifest::from_json(MANIFEST).unwrap());
        let repository = Arc::new(InMemoryAccountRepository::new());
        let hasher = Arc::new(BcryptHasher::with_cost(4));
        let service = Arc::new(AccountService::new(
            manifest.clone(),
            repository,
            hasher,
        ));
        seed_default_accounts(&service).await.unwrap();

        let app = opsgate_api::app::build_app(manifest, service, jwt_secret.to_string());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(jwt_secret: &str, role: &str) -> String {
    let now = Utc::now();
    let claims = AuthClaims {
        sub: AccountId::new(),
        username: "tester".to_string(),
        role: Role::new(role.to_string()),
        permissions: vec![],
        issued_at: now - ChronoDuration::minutes(1),
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn("test-secret").await;

    let res = reqwest::get(format!("{}/healthz", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_account_routes() {
    let srv = TestServer::spawn("test-secret").await;

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/accounts", srv.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn viewer_token_is_forbidden() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, "viewer");

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/accounts", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn admin_can_create_list_and_delete_accounts() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, "admin");
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/accounts", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "username": "walt",
            "display_name": "Walt Viewer",
            "password": "walt-pass-1",
            "role": "viewer"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let body_text = res.text().await.unwrap();
    assert!(!body_text.contains("credential"));
    assert!(!body_text.contains("$2b$"));
    let body: serde_json::Value = serde_json::from_str(&body_text).unwrap();
    assert_eq!(body["account"]["username"], "walt");
    assert_eq!(body["account"]["status"], "active");
    let id = body["account"]["id"].as_str().unwrap().to_string();

    let res = client
        .get(format!("{}/accounts?search=walt", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["username"], "walt");

    let res = client
        .delete(format!("{}/accounts/{}", srv.base_url, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["id"], id);
}

#[tokio::test]
async fn duplicate_username_maps_to_conflict() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, "admin");
    let client = reqwest::Client::new();

    let payload = json!({
        "username": "dana",
        "display_name": "Dana Operator",
        "password": "dana-pass-1",
        "role": "operator"
    });

    let res = client
        .post(format!("{}/accounts", srv.base_url))
        .bearer_auth(&token)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(format!("{}/accounts", srv.base_url))
        .bearer_auth(&token)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "duplicate_username");
}

#[tokio::test]
async fn invalid_inputs_map_to_bad_request() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, "admin");
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/accounts", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "username": "eve",
            "display_name": "Eve",
            "password": "eve-pass-1",
            "role": "ghost"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unknown_role");

    let res = client
        .post(format!("{}/accounts", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "username": "eve",
            "display_name": "Eve",
            "password": "eve-pass-1",
            "role": "viewer",
            "permissions": ["no.such.permission"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_permission");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("no.such.permission")
    );
}

#[tokio::test]
async fn empty_update_maps_to_bad_request() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, "admin");
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/accounts", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "username": "dana",
            "display_name": "Dana Operator",
            "password": "dana-pass-1",
            "role": "operator"
        }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let id = body["account"]["id"].as_str().unwrap().to_string();

    let res = client
        .put(format!("{}/accounts/{}", srv.base_url, id))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "empty_update");
}

#[tokio::test]
async fn update_applies_present_fields_only() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, "admin");
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/accounts", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "username": "dana",
            "display_name": "Dana Operator",
            "password": "dana-pass-1",
            "role": "operator"
        }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let id = body["account"]["id"].as_str().unwrap().to_string();

    let res = client
        .put(format!("{}/accounts/{}", srv.base_url, id))
        .bearer_auth(&token)
        .json(&json!({ "display_name": "Dana Ops Lead" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["account"]["display_name"], "Dana Ops Lead");
    assert_eq!(body["account"]["role"], "operator");
    assert_eq!(body["account"]["username"], "dana");
}

#[tokio::test]
async fn seeded_admin_is_protected_and_floor_guarded() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, "admin");
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/accounts?role=admin", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["total"], 1);
    let admin_id = body["items"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(body["items"][0]["is_protected"], true);

    // Seed accounts can never be deleted.
    let res = client
        .delete(format!("{}/accounts/{}", srv.base_url, admin_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "protected_account");

    // Disabling the last enabled admin would lock everyone out.
    let res = client
        .patch(format!("{}/accounts/{}/status", srv.base_url, admin_id))
        .bearer_auth(&token)
        .json(&json!({ "enabled": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "last_admin_violation");
}

#[tokio::test]
async fn rbac_routes_expose_the_manifest_summary() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, "admin");
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/rbac/roles", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let roles = body["roles"].as_array().unwrap();
    assert_eq!(roles.len(), 3);
    assert!(roles.iter().any(|r| r["name"] == "admin"));

    let res = client
        .get(format!("{}/rbac/permissions", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let permissions = body["permissions"].as_array().unwrap();
    assert_eq!(permissions.len(), 3);
    assert!(
        permissions
            .iter()
            .any(|p| p["name"] == "user.manage" && p["description"] == "Manage accounts")
    );
}
