//! Account registration for Nimbus.

use thiserror::Error;
use tracing::info;

use crate::auth::validation::{normalize_email, validate_registration, ValidationError};
use crate::auth::{hash_password, validate_password, PasswordError};
use crate::db::{Account, AccountRepository, NewAccount};
use crate::NimbusError;

/// Registration-specific errors.
///
/// Duplicate usernames and emails are reported explicitly, which lets a
/// caller probe for existing accounts. Login failures do not do this.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Field validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Password was rejected by the strength check or could not be hashed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    #[error("a user with this username already exists")]
    UsernameExists,

    #[error("a user with this email already exists")]
    EmailExists,

    #[error("database error: {0}")]
    Database(String),
}

impl From<RegistrationError> for NimbusError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Validation(e) => NimbusError::Validation(e.to_string()),
            RegistrationError::Password(e) if e.is_user_error() => {
                NimbusError::Validation(e.to_string())
            }
            RegistrationError::Password(e) => NimbusError::Internal(e.to_string()),
            RegistrationError::UsernameExists | RegistrationError::EmailExists => {
                NimbusError::Conflict(err.to_string())
            }
            RegistrationError::Database(e) => NimbusError::Database(e),
        }
    }
}

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    /// Confirmation copy of `password`.
    pub password2: String,
}

impl RegistrationRequest {
    /// Create a request whose confirmation password equals `password`.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let password = password.into();
        Self {
            username: username.into(),
            email: email.into(),
            full_name: String::new(),
            password2: password.clone(),
            password,
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = full_name.into();
        self
    }

    /// Set a separate confirmation password.
    pub fn with_password2(mut self, password2: impl Into<String>) -> Self {
        self.password2 = password2.into();
        self
    }
}

/// Register a new account.
///
/// This function:
/// 1. Validates all input fields and the password policy
/// 2. Runs the general password strength check
/// 3. Checks that the username and normalized email are free
/// 4. Hashes the password and creates the account
pub async fn register(
    repo: &AccountRepository<'_>,
    request: RegistrationRequest,
) -> Result<Account, RegistrationError> {
    create_account(repo, request, false).await
}

/// Register a new account with the admin flag set.
///
/// Used for the bootstrap administrator from the configuration file.
pub async fn register_admin(
    repo: &AccountRepository<'_>,
    request: RegistrationRequest,
) -> Result<Account, RegistrationError> {
    create_account(repo, request, true).await
}

async fn create_account(
    repo: &AccountRepository<'_>,
    request: RegistrationRequest,
    is_admin: bool,
) -> Result<Account, RegistrationError> {
    let email = normalize_email(&request.email);
    let full_name = request.full_name.trim().to_string();

    validate_registration(
        &request.username,
        &email,
        &full_name,
        &request.password,
        &request.password2,
    )?;
    validate_password(&request.password, Some(&request.username))?;

    if repo
        .username_exists(&request.username)
        .await
        .map_err(|e| RegistrationError::Database(e.to_string()))?
    {
        return Err(RegistrationError::UsernameExists);
    }
    if repo
        .email_exists(&email)
        .await
        .map_err(|e| RegistrationError::Database(e.to_string()))?
    {
        return Err(RegistrationError::EmailExists);
    }

    let password_hash = hash_password(&request.password)?;

    let new_account = NewAccount::new(&request.username, &email, &password_hash)
        .with_full_name(full_name)
        .with_admin(is_admin);

    // A concurrent registration can still win the race between the checks
    // above and this insert; the UNIQUE constraint catches it.
    let account = match repo.create(&new_account).await {
        Ok(account) => account,
        Err(NimbusError::Conflict(_)) => {
            return Err(conflict_cause(repo, &request.username, &email).await)
        }
        Err(other) => return Err(RegistrationError::Database(other.to_string())),
    };

    info!(
        username = %account.username,
        user_id = account.id,
        is_admin = account.is_admin,
        "New account registered"
    );

    Ok(account)
}

/// Work out which value collided after the insert hit a UNIQUE constraint.
async fn conflict_cause(
    repo: &AccountRepository<'_>,
    username: &str,
    email: &str,
) -> RegistrationError {
    match repo.username_exists(username).await {
        Ok(true) => return RegistrationError::UsernameExists,
        Ok(false) => {}
        Err(e) => return RegistrationError::Database(e.to_string()),
    }
    match repo.email_exists(email).await {
        Ok(true) => RegistrationError::EmailExists,
        Ok(false) => RegistrationError::UsernameExists,
        Err(e) => RegistrationError::Database(e.to_string()),
    }
}
