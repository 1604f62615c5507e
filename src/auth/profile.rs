//! Self-service profile management.
//!
//! Viewing and editing one's own account. Account deletion lives in
//! [`crate::file::FileService::delete_account_cascade`] because it has to
//! remove the account's blobs first.

use thiserror::Error;
use tracing::info;

use crate::auth::validation::{
    normalize_email, validate_email, validate_full_name, validate_password_policy,
    ValidationError,
};
use crate::auth::{hash_password, validate_password, verify_password, PasswordError};
use crate::db::{Account, AccountRepository, AccountSummary, AccountUpdate};
use crate::NimbusError;

/// Profile-related errors.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("account not found")]
    AccountNotFound,

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    #[error("current password is required to set a new password")]
    CurrentPasswordRequired,

    #[error("current password is incorrect")]
    WrongPassword,

    #[error("a user with this email already exists")]
    EmailExists,

    #[error("database error: {0}")]
    Database(String),
}

impl From<ProfileError> for NimbusError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::AccountNotFound => NimbusError::NotFound("account".to_string()),
            ProfileError::Validation(e) => NimbusError::Validation(e.to_string()),
            ProfileError::Password(e) if e.is_user_error() => NimbusError::Validation(e.to_string()),
            ProfileError::Password(e) => NimbusError::Internal(e.to_string()),
            ProfileError::CurrentPasswordRequired | ProfileError::WrongPassword => {
                NimbusError::Validation(err.to_string())
            }
            ProfileError::EmailExists => NimbusError::Conflict(err.to_string()),
            ProfileError::Database(e) => NimbusError::Database(e),
        }
    }
}

/// Profile update request. Unset fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdateRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

impl ProfileUpdateRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Change the password; `current` must match the stored credential.
    pub fn password(mut self, current: impl Into<String>, new: impl Into<String>) -> Self {
        self.current_password = Some(current.into());
        self.new_password = Some(new.into());
        self
    }
}

/// Get an account together with its file statistics.
pub async fn get_profile(
    repo: &AccountRepository<'_>,
    account_id: i64,
) -> Result<AccountSummary, ProfileError> {
    repo.get_summary(account_id)
        .await
        .map_err(|e| ProfileError::Database(e.to_string()))?
        .ok_or(ProfileError::AccountNotFound)
}

/// Update the caller's own profile.
///
/// Returns the account and whether the password changed, so the caller can
/// revoke outstanding refresh tokens.
pub async fn update_profile(
    repo: &AccountRepository<'_>,
    account_id: i64,
    request: ProfileUpdateRequest,
) -> Result<(Account, bool), ProfileError> {
    let account = repo
        .get_by_id(account_id)
        .await
        .map_err(|e| ProfileError::Database(e.to_string()))?
        .ok_or(ProfileError::AccountNotFound)?;

    let mut update = AccountUpdate::new();

    if let Some(full_name) = request.full_name {
        let full_name = full_name.trim().to_string();
        validate_full_name(&full_name)?;
        update = update.full_name(full_name);
    }

    if let Some(email) = request.email {
        let email = normalize_email(&email);
        validate_email(&email)?;
        if email != account.email {
            let taken = repo
                .email_exists(&email)
                .await
                .map_err(|e| ProfileError::Database(e.to_string()))?;
            if taken {
                return Err(ProfileError::EmailExists);
            }
            update = update.email(email);
        }
    }

    let mut password_changed = false;
    if let Some(new_password) = request.new_password {
        let current = request
            .current_password
            .ok_or(ProfileError::CurrentPasswordRequired)?;
        verify_password(&current, &account.password).map_err(|_| ProfileError::WrongPassword)?;

        validate_password_policy(&new_password)?;
        validate_password(&new_password, Some(&account.username))?;
        update = update.password(hash_password(&new_password)?);
        password_changed = true;
    }

    let updated = repo
        .update(account_id, &update)
        .await
        .map_err(|e| match e {
            NimbusError::Conflict(_) => ProfileError::EmailExists,
            other => ProfileError::Database(other.to_string()),
        })?
        .ok_or(ProfileError::AccountNotFound)?;

    if password_changed {
        info!(user_id = account_id, "Password changed");
    }

    Ok((updated, password_changed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{register, RegistrationRequest};
    use crate::db::Database;

    async fn setup() -> (Database, Account) {
        let db = Database::open_in_memory().await.unwrap();
        let repo = AccountRepository::new(db.pool());
        let account = register(&repo, RegistrationRequest::new("alice1", "alice@x.com", "Abcdef1!"))
            .await
            .unwrap();
        (db, account)
    }

    #[tokio::test]
    async fn test_get_profile() {
        let (db, account) = setup().await;
        let repo = AccountRepository::new(db.pool());
        let profile = get_profile(&repo, account.id).await.unwrap();
        assert_eq!(profile.username, "alice1");
        assert_eq!(profile.file_count, 0);
        assert!(matches!(
            get_profile(&repo, 999).await,
            Err(ProfileError::AccountNotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_name_and_email() {
        let (db, account) = setup().await;
        let repo = AccountRepository::new(db.pool());

        let request = ProfileUpdateRequest::new()
            .full_name(" Alice Liddell ")
            .email("ALICE@Wonder.land");
        let (updated, changed) = update_profile(&repo, account.id, request).await.unwrap();
        assert_eq!(updated.full_name, "Alice Liddell");
        assert_eq!(updated.email, "alice@wonder.land");
        assert!(!changed);
    }

    #[tokio::test]
    async fn test_update_email_taken() {
        let (db, account) = setup().await;
        let repo = AccountRepository::new(db.pool());
        register(&repo, RegistrationRequest::new("bobby1", "bob@x.com", "Abcdef1!"))
            .await
            .unwrap();

        let result = update_profile(&repo, account.id, ProfileUpdateRequest::new().email("Bob@x.com")).await;
        assert!(matches!(result, Err(ProfileError::EmailExists)));
    }

    #[tokio::test]
    async fn test_change_password() {
        let (db, account) = setup().await;
        let repo = AccountRepository::new(db.pool());

        let request = ProfileUpdateRequest::new().password("Abcdef1!", "Newpass9#");
        let (updated, changed) = update_profile(&repo, account.id, request).await.unwrap();
        assert!(changed);
        assert!(verify_password("Newpass9#", &updated.password).is_ok());
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let (db, account) = setup().await;
        let repo = AccountRepository::new(db.pool());

        let mut request = ProfileUpdateRequest::new();
        request.new_password = Some("Newpass9#".to_string());
        assert!(matches!(
            update_profile(&repo, account.id, request).await,
            Err(ProfileError::CurrentPasswordRequired)
        ));

        let request = ProfileUpdateRequest::new().password("Wrong1!!", "Newpass9#");
        assert!(matches!(
            update_profile(&repo, account.id, request).await,
            Err(ProfileError::WrongPassword)
        ));
    }

    #[tokio::test]
    async fn test_change_password_policy() {
        let (db, account) = setup().await;
        let repo = AccountRepository::new(db.pool());

        let request = ProfileUpdateRequest::new().password("Abcdef1!", "short");
        assert!(matches!(
            update_profile(&repo, account.id, request).await,
            Err(ProfileError::Validation(_))
        ));
    }
}
