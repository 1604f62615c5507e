//! Authentication handlers and shared application state.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Arc;
use tracing::info;

use crate::access::Actor;
use crate::auth::{authenticate, get_profile, register as register_account, RegistrationRequest};
use crate::config::Config;
use crate::db::{Account, AccountRepository, Database, NewRefreshToken, RefreshTokenRepository};
use crate::file::{BlobStore, FileService, DEFAULT_MAX_FILE_SIZE};
use crate::web::dto::{
    AccountSummaryResponse, ApiResponse, LoginRequest, LoginResponse, LogoutRequest,
    RefreshRequest, RefreshResponse, RegisterRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::{AuthUser, JwtClaims};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub storage: Arc<BlobStore>,
    /// Maximum upload size in bytes.
    pub max_upload_size: u64,
    /// JWT encoding key.
    pub encoding_key: EncodingKey,
    /// Access token expiry in seconds.
    pub access_token_expiry: u64,
    /// Refresh token expiry in days.
    pub refresh_token_expiry: u64,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        storage: Arc<BlobStore>,
        jwt_secret: &str,
        access_expiry: u64,
        refresh_expiry: u64,
    ) -> Self {
        Self {
            db,
            storage,
            max_upload_size: DEFAULT_MAX_FILE_SIZE,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            access_token_expiry: access_expiry,
            refresh_token_expiry: refresh_expiry,
        }
    }

    /// Build the state from the `[auth]` and `[storage]` sections.
    pub fn from_config(db: Arc<Database>, storage: Arc<BlobStore>, config: &Config) -> Self {
        Self::new(
            db,
            storage,
            &config.auth.jwt_secret,
            config.auth.access_token_expiry_secs,
            config.auth.refresh_token_expiry_days,
        )
        .with_max_upload_size(config.storage.max_upload_bytes())
    }

    pub fn with_max_upload_size(mut self, bytes: u64) -> Self {
        self.max_upload_size = bytes;
        self
    }

    pub fn accounts(&self) -> AccountRepository<'_> {
        AccountRepository::new(self.db.pool())
    }

    pub fn refresh_tokens(&self) -> RefreshTokenRepository<'_> {
        RefreshTokenRepository::new(self.db.pool())
    }

    pub fn file_service(&self) -> FileService<'_> {
        FileService::new(&self.db, &self.storage).with_max_file_size(self.max_upload_size)
    }

    /// Reload the account behind a token.
    ///
    /// A token for a deleted account is rejected, and the admin flag always
    /// comes from the database rather than the claims.
    pub async fn current_account(&self, claims: &JwtClaims) -> Result<Account, ApiError> {
        self.accounts()
            .get_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))
    }

    pub async fn current_actor(&self, claims: &JwtClaims) -> Result<Actor, ApiError> {
        let account = self.current_account(claims).await?;
        Ok(Actor::from(&account))
    }

    /// Generate an access token for an account.
    pub fn generate_access_token(&self, account: &Account) -> Result<String, ApiError> {
        let now = Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: account.id,
            username: account.username.clone(),
            is_admin: account.is_admin,
            iat: now,
            exp: now + self.access_token_expiry,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }

    /// Generate a refresh token.
    pub fn generate_refresh_token(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Issue an access token and a stored refresh token.
    async fn issue_tokens(&self, account: &Account) -> Result<(String, String), ApiError> {
        let access_token = self.generate_access_token(account)?;
        let refresh_token = self.generate_refresh_token();

        let new_token = NewRefreshToken {
            user_id: account.id,
            token: refresh_token.clone(),
            expires_at: Utc::now() + Duration::days(self.refresh_token_expiry as i64),
        };
        self.refresh_tokens().create(&new_token).await.map_err(|e| {
            tracing::error!("Failed to store refresh token: {}", e);
            ApiError::internal("Failed to create session")
        })?;

        Ok((access_token, refresh_token))
    }

    async fn login_response(&self, account: Account) -> Result<LoginResponse, ApiError> {
        let (access_token, refresh_token) = self.issue_tokens(&account).await?;
        Ok(LoginResponse {
            access_token,
            refresh_token,
            expires_in: self.access_token_expiry,
            user: account.into(),
        })
    }
}

/// POST /api/auth/register - Create an account and log it in.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = LoginResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Username or email already exists")
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LoginResponse>>), ApiError> {
    let request = RegistrationRequest::new(req.username, req.email, req.password)
        .with_full_name(req.full_name)
        .with_password2(req.password2);

    let account = register_account(&state.accounts(), request).await?;
    let response = state.login_response(account).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}

/// POST /api/auth/login - Log in with username and password.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many login attempts")
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let account = authenticate(&state.accounts(), &req.username, &req.password).await?;
    info!(user_id = account.id, "User logged in");

    let response = state.login_response(account).await?;
    Ok(Json(ApiResponse::new(response)))
}

/// POST /api/auth/logout - Revoke a refresh token.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    request_body = LogoutRequest,
    responses((status = 200, description = "Logged out"))
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LogoutRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.refresh_tokens().revoke(&req.refresh_token).await?;
    Ok(Json(ApiResponse::new(())))
}

/// POST /api/auth/refresh - Rotate the refresh token.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = RefreshResponse),
        (status = 401, description = "Invalid or expired refresh token")
    )
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<Json<ApiResponse<RefreshResponse>>, ApiError> {
    let token = state
        .refresh_tokens()
        .get_valid_token(&req.refresh_token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;

    let account = state
        .accounts()
        .get_by_id(token.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;

    // Only one concurrent refresh with the same token may win
    if !state.refresh_tokens().revoke(&req.refresh_token).await? {
        return Err(ApiError::unauthorized("Invalid or expired refresh token"));
    }

    let (access_token, refresh_token) = state.issue_tokens(&account).await?;
    let response = RefreshResponse {
        access_token,
        refresh_token,
        expires_in: state.access_token_expiry,
    };

    Ok(Json(ApiResponse::new(response)))
}

/// GET /api/auth/me - Current account with storage statistics.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current account", body = AccountSummaryResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<AccountSummaryResponse>>, ApiError> {
    let account = state.current_account(&claims).await?;
    let summary = get_profile(&state.accounts(), account.id).await?;
    Ok(Json(ApiResponse::new(summary.into())))
}
