//! Profile handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::auth::{get_profile as load_profile, update_profile as apply_update, ProfileUpdateRequest};
use crate::web::dto::{AccountSummaryResponse, ApiResponse, UpdateProfileRequest, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /api/profile - Own profile with storage statistics.
#[utoipa::path(
    get,
    path = "/api/profile",
    tag = "profile",
    responses(
        (status = 200, description = "Profile", body = AccountSummaryResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<AccountSummaryResponse>>, ApiError> {
    let account = state.current_account(&claims).await?;
    let summary = load_profile(&state.accounts(), account.id).await?;
    Ok(Json(ApiResponse::new(summary.into())))
}

/// PATCH /api/profile - Change name, email or password.
///
/// A password change revokes every refresh token of the account.
#[utoipa::path(
    patch,
    path = "/api/profile",
    tag = "profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = AccountSummaryResponse),
        (status = 400, description = "Validation error or wrong current password"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Email already in use")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<AccountSummaryResponse>>, ApiError> {
    let account = state.current_account(&claims).await?;

    let mut update = ProfileUpdateRequest::new();
    update.full_name = req.full_name;
    update.email = req.email;
    update.current_password = req.current_password;
    update.new_password = req.new_password;

    let (account, password_changed) = apply_update(&state.accounts(), account.id, update).await?;
    if password_changed {
        let revoked = state.refresh_tokens().revoke_all_for_user(account.id).await?;
        tracing::info!(user_id = account.id, revoked, "Password changed, sessions revoked");
    }

    let summary = load_profile(&state.accounts(), account.id).await?;
    Ok(Json(ApiResponse::new(summary.into())))
}

/// DELETE /api/profile - Delete own account with all files.
#[utoipa::path(
    delete,
    path = "/api/profile",
    tag = "profile",
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<StatusCode, ApiError> {
    let actor = state.current_actor(&claims).await?;
    state.file_service().delete_account_cascade(&actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
