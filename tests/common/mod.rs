//! Shared helpers for the HTTP API tests.

#![allow(dead_code)]

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use nimbus::auth::{register_admin, RegistrationRequest};
use nimbus::web::handlers::AppState;
use nimbus::web::middleware::{JwtState, RateLimitState};
use nimbus::web::router::create_router;
use nimbus::{AccountRepository, BlobStore, Config, Database};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

pub use axum::http::header::AUTHORIZATION;

pub const PASSWORD: &str = "Abcdef1!";

/// A test server together with the state behind it.
pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<Database>,
    pub storage: Arc<BlobStore>,
    /// Blob root, removed when the test ends.
    pub dir: TempDir,
}

/// Create a test configuration.
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = "test-secret-key-for-testing-only".to_string();
    config.auth.login_rate_limit = 100;
    config.storage.max_upload_size_mb = 1;
    config
}

/// Create a test server with an in-memory database and a temporary blob root.
pub async fn create_test_app() -> TestApp {
    create_test_app_with_config(create_test_config()).await
}

pub async fn create_test_app_with_config(config: Config) -> TestApp {
    let dir = TempDir::new().expect("Failed to create blob root");
    let db = Arc::new(
        Database::open_in_memory()
            .await
            .expect("Failed to create test database"),
    );
    let storage = Arc::new(BlobStore::new(dir.path()).expect("Failed to create blob store"));

    let app_state = Arc::new(AppState::from_config(db.clone(), storage.clone(), &config));
    let jwt_state = Arc::new(JwtState::new(&config.auth.jwt_secret));
    let rate_limit = Arc::new(
        RateLimitState::new(config.auth.login_rate_limit)
            .with_trusted_proxy(config.server.trusted_proxy),
    );

    let router = create_router(
        app_state,
        jwt_state,
        rate_limit,
        &config.server.cors_origins,
    );
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        db,
        storage,
        dir,
    }
}

/// Register an account through the API and return the response body.
pub async fn register_user(server: &TestServer, username: &str) -> Value {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "full_name": format!("{username} Test"),
            "password": PASSWORD,
            "password2": PASSWORD,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

/// Register an account and return its access token and id.
pub async fn register_and_token(server: &TestServer, username: &str) -> (String, i64) {
    let body = register_user(server, username).await;
    let token = body["data"]["access_token"]
        .as_str()
        .expect("access token")
        .to_string();
    let id = body["data"]["user"]["id"].as_i64().expect("user id");
    (token, id)
}

/// Create an administrator directly in the store and log it in.
pub async fn create_admin(app: &TestApp, username: &str) -> (String, i64) {
    let repo = AccountRepository::new(app.db.pool());
    let request = RegistrationRequest::new(username, format!("{username}@example.com"), PASSWORD);
    let account = register_admin(&repo, request)
        .await
        .expect("Failed to create admin");

    let body = login_user(&app.server, username, PASSWORD).await;
    let token = body["data"]["access_token"]
        .as_str()
        .expect("access token")
        .to_string();
    (token, account.id)
}

/// Log in and return the response body.
pub async fn login_user(server: &TestServer, username: &str, password: &str) -> Value {
    server
        .post("/api/auth/login")
        .json(&json!({
            "username": username,
            "password": password
        }))
        .await
        .json::<Value>()
}

/// Upload a file and return the `data` object of the response.
pub async fn upload_file(
    server: &TestServer,
    token: &str,
    filename: &str,
    content: &[u8],
    comment: Option<&str>,
) -> Value {
    let mut form = MultipartForm::new().add_part(
        "file",
        Part::bytes(content.to_vec())
            .file_name(filename)
            .mime_type("application/octet-stream"),
    );
    if let Some(comment) = comment {
        form = form.add_text("comment", comment.to_string());
    }

    let response = server
        .post("/api/files")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .multipart(form)
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["data"].clone()
}
