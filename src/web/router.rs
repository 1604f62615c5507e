//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    admin, delete_profile, download_by_token, file, get_profile, login, logout, me, refresh,
    register, update_profile, AppState,
};
use super::middleware::{
    create_cors_layer, jwt_auth, login_rate_limit, security_headers, JwtState, RateLimitState,
};
use super::openapi::ApiDoc;

/// Headroom on top of the upload limit for multipart framing and the
/// comment field.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    rate_limit: Arc<RateLimitState>,
    cors_origins: &[String],
) -> Router {
    let body_limit = usize::try_from(app_state.max_upload_size + MULTIPART_OVERHEAD)
        .unwrap_or(usize::MAX);

    // Only login is rate limited
    let login_route = Router::new().route(
        "/login",
        post(login).route_layer(middleware::from_fn(move |req, next| {
            let state = rate_limit.clone();
            login_rate_limit(state, req, next)
        })),
    );

    let auth_routes = Router::new()
        .merge(login_route)
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
        .route("/register", post(register))
        .route("/me", get(me));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route(
            "/users/:id",
            patch(admin::update_user).delete(admin::delete_user),
        )
        .route("/users/:id/files", get(admin::list_user_files))
        .route(
            "/files/:id",
            get(admin::get_file).delete(admin::delete_file),
        );

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .route(
            "/profile",
            get(get_profile).patch(update_profile).delete(delete_profile),
        )
        .route(
            "/files",
            get(file::list_files)
                .post(file::upload_file)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/files/:id",
            get(file::get_file)
                .patch(file::update_file)
                .delete(file::delete_file),
        )
        .route("/download/:token", get(download_by_token))
        .nest("/admin", admin_routes);

    let jwt_state_for_middleware = jwt_state.clone();

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state_for_middleware.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Swagger UI at `/swagger-ui` backed by `/api-docs/openapi.json`.
pub fn create_swagger_router() -> Router {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}

/// Serve a built frontend, falling back to `index.html` for client routes.
///
/// Returns `None` when the directory or its index is missing.
pub fn create_static_router(static_path: &str) -> Option<Router> {
    let dist = Path::new(static_path);
    let index = dist.join("index.html");

    if !dist.is_dir() || !index.is_file() {
        tracing::warn!(path = %static_path, "Static directory not found, not serving frontend");
        return None;
    }

    let serve_dir = ServeDir::new(dist).not_found_service(ServeFile::new(index));
    Some(Router::new().fallback_service(serve_dir))
}
