//! Admin handlers.
//!
//! Every handler reloads the caller's account; the admin checks themselves
//! happen in [`crate::access`] through the identity store and file service.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::auth::{list_accounts, set_admin};
use crate::file::FileKey;
use crate::web::dto::{
    AccountFilesResponse, AccountInfo, AccountSummaryResponse, ApiResponse, RetrieveQuery,
    SetAdminRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::file::{file_content_response, parse_file_key};
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /api/admin/users - All accounts with file statistics.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "admin",
    responses(
        (status = 200, description = "Accounts, newest first", body = Vec<AccountSummaryResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<Vec<AccountSummaryResponse>>>, ApiError> {
    let actor = state.current_actor(&claims).await?;
    let accounts = list_accounts(&state.accounts(), &actor).await?;
    Ok(Json(ApiResponse::new(
        accounts.into_iter().map(AccountSummaryResponse::from).collect(),
    )))
}

/// PATCH /api/admin/users/:id - Grant or revoke the admin flag.
#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}",
    tag = "admin",
    params(("id" = i64, Path, description = "Account ID")),
    request_body = SetAdminRequest,
    responses(
        (status = 200, description = "Updated account", body = AccountInfo),
        (status = 403, description = "Not an admin, or revoking own flag"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(user_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<SetAdminRequest>,
) -> Result<Json<ApiResponse<AccountInfo>>, ApiError> {
    let actor = state.current_actor(&claims).await?;
    let account = set_admin(&state.accounts(), &actor, user_id, req.is_admin).await?;
    Ok(Json(ApiResponse::new(account.into())))
}

/// DELETE /api/admin/users/:id - Delete a member account with all files.
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    tag = "admin",
    params(("id" = i64, Path, description = "Account ID")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 403, description = "Not an admin, own account, or another admin"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let actor = state.current_actor(&claims).await?;
    state
        .file_service()
        .admin_delete_account(&actor, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/users/:id/files - Files of any account.
#[utoipa::path(
    get,
    path = "/api/admin/users/{id}/files",
    tag = "admin",
    params(("id" = i64, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account files with total size", body = AccountFilesResponse),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_user_files(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<AccountFilesResponse>>, ApiError> {
    let actor = state.current_actor(&claims).await?;
    let listing = state
        .file_service()
        .list_account_files(&actor, user_id)
        .await?;
    Ok(Json(ApiResponse::new(listing.into())))
}

/// GET /api/admin/files/:id - Download or preview any file.
#[utoipa::path(
    get,
    path = "/api/admin/files/{id}",
    tag = "admin",
    params(
        ("id" = String, Path, description = "File ID (UUID)"),
        RetrieveQuery
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "File not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    Query(query): Query<RetrieveQuery>,
) -> Result<Response<Body>, ApiError> {
    let actor = state.current_actor(&claims).await?;
    let id = parse_file_key(&id)?;
    let preview = query.is_preview();

    let retrieved = state
        .file_service()
        .retrieve(Some(&actor), FileKey::Admin(id), preview)
        .await?;
    file_content_response(retrieved, preview)
}

/// DELETE /api/admin/files/:id - Delete any file.
#[utoipa::path(
    delete,
    path = "/api/admin/files/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "File ID (UUID)")),
    responses(
        (status = 204, description = "File deleted"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "File not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let actor = state.current_actor(&claims).await?;
    let id = parse_file_key(&id)?;

    state
        .file_service()
        .delete(&actor, FileKey::Admin(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
