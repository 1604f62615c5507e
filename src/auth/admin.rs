//! Admin operations on accounts.

use tracing::info;

use crate::access::{authorize_account, AccountAction, Actor};
use crate::db::{Account, AccountRepository, AccountSummary, AccountUpdate};
use crate::{NimbusError, Result};

/// List every account with its file statistics, newest first.
pub async fn list_accounts(
    repo: &AccountRepository<'_>,
    actor: &Actor,
) -> Result<Vec<AccountSummary>> {
    authorize_account(actor, None, AccountAction::List)?;
    repo.list_with_stats().await
}

/// Grant or revoke the admin flag on `target_id`.
///
/// An admin cannot revoke their own flag this way.
pub async fn set_admin(
    repo: &AccountRepository<'_>,
    actor: &Actor,
    target_id: i64,
    value: bool,
) -> Result<Account> {
    let target = repo.get_by_id(target_id).await?;
    authorize_account(actor, target.as_ref(), AccountAction::SetAdmin(value))?;

    let updated = repo
        .update(target_id, &AccountUpdate::new().is_admin(value))
        .await?
        .ok_or_else(|| NimbusError::NotFound("account".to_string()))?;

    info!(
        actor_id = actor.id,
        target_id,
        is_admin = value,
        "Admin flag changed"
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, NewAccount};

    async fn setup() -> (Database, Account, Account) {
        let db = Database::open_in_memory().await.unwrap();
        let repo = AccountRepository::new(db.pool());
        let admin = repo
            .create(&NewAccount::new("root1", "root@x.com", "hash").with_admin(true))
            .await
            .unwrap();
        let member = repo
            .create(&NewAccount::new("alice1", "alice@x.com", "hash"))
            .await
            .unwrap();
        (db, admin, member)
    }

    #[tokio::test]
    async fn test_set_admin_grant_and_revoke() {
        let (db, admin, member) = setup().await;
        let repo = AccountRepository::new(db.pool());
        let actor = Actor::from(&admin);

        let promoted = set_admin(&repo, &actor, member.id, true).await.unwrap();
        assert!(promoted.is_admin);
        let demoted = set_admin(&repo, &actor, member.id, false).await.unwrap();
        assert!(!demoted.is_admin);
    }

    #[tokio::test]
    async fn test_set_admin_cannot_revoke_self() {
        let (db, admin, _) = setup().await;
        let repo = AccountRepository::new(db.pool());
        let actor = Actor::from(&admin);

        let result = set_admin(&repo, &actor, admin.id, false).await;
        assert!(matches!(result, Err(NimbusError::Permission(_))));
        assert!(repo.get_by_id(admin.id).await.unwrap().unwrap().is_admin);
    }

    #[tokio::test]
    async fn test_set_admin_requires_admin() {
        let (db, admin, member) = setup().await;
        let repo = AccountRepository::new(db.pool());
        let actor = Actor::from(&member);

        let result = set_admin(&repo, &actor, admin.id, false).await;
        assert!(matches!(result, Err(NimbusError::Permission(_))));
        let result = set_admin(&repo, &actor, member.id, true).await;
        assert!(matches!(result, Err(NimbusError::Permission(_))));
    }

    #[tokio::test]
    async fn test_set_admin_unknown_target() {
        let (db, admin, _) = setup().await;
        let repo = AccountRepository::new(db.pool());
        let result = set_admin(&repo, &Actor::from(&admin), 999, true).await;
        assert!(matches!(result, Err(NimbusError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_accounts() {
        let (db, admin, member) = setup().await;
        let repo = AccountRepository::new(db.pool());

        let list = list_accounts(&repo, &Actor::from(&admin)).await.unwrap();
        assert_eq!(list.len(), 2);
        assert!(matches!(
            list_accounts(&repo, &Actor::from(&member)).await,
            Err(NimbusError::Permission(_))
        ));
    }
}
