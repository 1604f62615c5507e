//! Credential checks.

use tracing::debug;

use crate::auth::verify_password;
use crate::db::{Account, AccountRepository};
use crate::{NimbusError, Result};

/// Message returned for every credential failure.
pub const INVALID_CREDENTIALS: &str = "invalid credentials";

/// Authenticate by username and password.
///
/// An unknown username and a wrong password produce the same `Auth` error.
pub async fn authenticate(
    repo: &AccountRepository<'_>,
    username: &str,
    password: &str,
) -> Result<Account> {
    if username.is_empty() || password.is_empty() {
        return Err(NimbusError::Validation(
            "username and password are required".to_string(),
        ));
    }

    let Some(account) = repo.get_by_username(username).await? else {
        debug!(username, "login for unknown username");
        return Err(NimbusError::Auth(INVALID_CREDENTIALS.to_string()));
    };

    if verify_password(password, &account.password).is_err() {
        debug!(user_id = account.id, "login with wrong password");
        return Err(NimbusError::Auth(INVALID_CREDENTIALS.to_string()));
    }

    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{register, RegistrationRequest};
    use crate::db::Database;

    async fn setup() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        let repo = AccountRepository::new(db.pool());
        register(&repo, RegistrationRequest::new("alice1", "alice@x.com", "Abcdef1!"))
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let db = setup().await;
        let repo = AccountRepository::new(db.pool());
        let account = authenticate(&repo, "alice1", "Abcdef1!").await.unwrap();
        assert_eq!(account.username, "alice1");
    }

    #[tokio::test]
    async fn test_unknown_user_and_wrong_password_look_the_same() {
        let db = setup().await;
        let repo = AccountRepository::new(db.pool());

        let unknown = authenticate(&repo, "nobody1", "Abcdef1!").await.unwrap_err();
        let wrong = authenticate(&repo, "alice1", "Wrong1!!").await.unwrap_err();
        assert!(matches!(unknown, NimbusError::Auth(_)));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let db = setup().await;
        let repo = AccountRepository::new(db.pool());
        assert!(matches!(
            authenticate(&repo, "", "x").await,
            Err(NimbusError::Validation(_))
        ));
        assert!(matches!(
            authenticate(&repo, "alice1", "").await,
            Err(NimbusError::Validation(_))
        ));
    }
}
