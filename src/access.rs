//! Authorization rules for files and accounts.
//!
//! Every file service operation calls [`authorize_file`] before it touches
//! the record store or the blob store, and every admin account operation
//! calls [`authorize_account`]. The rules live here rather than in the
//! HTTP layer so they apply to any caller.
//!
//! Owner-scoped lookups of someone else's file fail with `NotFound`, the
//! same outcome as a file that does not exist, so ids cannot be probed.

use crate::db::Account;
use crate::{NimbusError, Result};

/// The authenticated identity performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub is_admin: bool,
}

impl Actor {
    pub fn new(id: i64, is_admin: bool) -> Self {
        Self { id, is_admin }
    }
}

impl From<&Account> for Actor {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            is_admin: account.is_admin,
        }
    }
}

/// How a file is being reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPath {
    /// By file id, scoped to the caller's own files.
    Owner,
    /// By file id, through the admin endpoints.
    Admin,
    /// By download token, no identity required.
    PublicLink,
}

/// What is being done to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Upload,
    List,
    Retrieve,
    Update,
    Delete,
}

/// What an admin is doing to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountAction {
    List,
    ViewFiles,
    SetAdmin(bool),
    Delete,
}

/// Decide whether `actor` may perform `action` on a file owned by `owner_id`.
pub fn authorize_file(
    actor: Option<&Actor>,
    owner_id: i64,
    path: AccessPath,
    action: FileAction,
) -> Result<()> {
    match path {
        AccessPath::PublicLink => {
            if action == FileAction::Retrieve {
                Ok(())
            } else {
                Err(NimbusError::Permission(
                    "download links only allow retrieval".to_string(),
                ))
            }
        }
        AccessPath::Owner => {
            let actor = require_actor(actor)?;
            if actor.id == owner_id {
                Ok(())
            } else {
                Err(NimbusError::NotFound("file".to_string()))
            }
        }
        AccessPath::Admin => {
            require_admin(actor)?;
            match action {
                FileAction::List | FileAction::Retrieve | FileAction::Delete => Ok(()),
                FileAction::Upload | FileAction::Update => Err(NimbusError::Permission(
                    "only the owner can modify a file".to_string(),
                )),
            }
        }
    }
}

/// Decide whether `actor` may perform an admin `action` on `target`.
///
/// `target` is `None` for [`AccountAction::List`]; for the other actions a
/// missing target is `NotFound`.
pub fn authorize_account(
    actor: &Actor,
    target: Option<&Account>,
    action: AccountAction,
) -> Result<()> {
    if !actor.is_admin {
        return Err(NimbusError::Permission("admin access required".to_string()));
    }

    if action == AccountAction::List {
        return Ok(());
    }

    let target = target.ok_or_else(|| NimbusError::NotFound("account".to_string()))?;

    match action {
        AccountAction::List | AccountAction::ViewFiles => Ok(()),
        AccountAction::SetAdmin(value) => {
            if target.id == actor.id && !value {
                Err(NimbusError::Permission(
                    "cannot revoke your own admin status".to_string(),
                ))
            } else {
                Ok(())
            }
        }
        AccountAction::Delete => {
            if target.id == actor.id {
                Err(NimbusError::Permission(
                    "cannot delete your own account here".to_string(),
                ))
            } else if target.is_admin {
                Err(NimbusError::Permission(
                    "cannot delete another administrator".to_string(),
                ))
            } else {
                Ok(())
            }
        }
    }
}

fn require_actor(actor: Option<&Actor>) -> Result<&Actor> {
    actor.ok_or_else(|| NimbusError::Auth("authentication required".to_string()))
}

/// Fail unless `actor` is an authenticated administrator.
///
/// Admin file routes call this before looking the file up, so a non-admin
/// gets the same answer whether or not the id exists.
pub fn require_admin(actor: Option<&Actor>) -> Result<&Actor> {
    let actor = require_actor(actor)?;
    if actor.is_admin {
        Ok(actor)
    } else {
        Err(NimbusError::Permission("admin access required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const ALICE: Actor = Actor { id: 1, is_admin: false };
    const BOB: Actor = Actor { id: 2, is_admin: false };
    const ROOT: Actor = Actor { id: 10, is_admin: true };

    fn account(id: i64, is_admin: bool) -> Account {
        Account {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            full_name: String::new(),
            password: "hash".to_string(),
            is_admin,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_owner_may_do_everything_on_own_file() {
        for action in [
            FileAction::Upload,
            FileAction::List,
            FileAction::Retrieve,
            FileAction::Update,
            FileAction::Delete,
        ] {
            assert!(authorize_file(Some(&ALICE), ALICE.id, AccessPath::Owner, action).is_ok());
        }
    }

    #[test]
    fn test_require_admin() {
        assert_eq!(require_admin(Some(&ROOT)).unwrap().id, ROOT.id);
        assert!(matches!(
            require_admin(Some(&ALICE)),
            Err(NimbusError::Permission(_))
        ));
        assert!(matches!(require_admin(None), Err(NimbusError::Auth(_))));
    }

    #[test]
    fn test_other_owner_gets_not_found() {
        for action in [FileAction::Retrieve, FileAction::Update, FileAction::Delete] {
            let result = authorize_file(Some(&BOB), ALICE.id, AccessPath::Owner, action);
            assert!(matches!(result, Err(NimbusError::NotFound(_))));
        }
    }

    #[test]
    fn test_admin_on_owner_path_is_still_scoped() {
        let result = authorize_file(Some(&ROOT), ALICE.id, AccessPath::Owner, FileAction::Retrieve);
        assert!(matches!(result, Err(NimbusError::NotFound(_))));
    }

    #[test]
    fn test_owner_path_requires_identity() {
        let result = authorize_file(None, ALICE.id, AccessPath::Owner, FileAction::Retrieve);
        assert!(matches!(result, Err(NimbusError::Auth(_))));
    }

    #[test]
    fn test_public_link_only_retrieves() {
        assert!(authorize_file(None, ALICE.id, AccessPath::PublicLink, FileAction::Retrieve).is_ok());
        assert!(authorize_file(Some(&BOB), ALICE.id, AccessPath::PublicLink, FileAction::Retrieve).is_ok());
        for action in [
            FileAction::Upload,
            FileAction::List,
            FileAction::Update,
            FileAction::Delete,
        ] {
            let result = authorize_file(None, ALICE.id, AccessPath::PublicLink, action);
            assert!(matches!(result, Err(NimbusError::Permission(_))));
        }
    }

    #[test]
    fn test_admin_path() {
        for action in [FileAction::List, FileAction::Retrieve, FileAction::Delete] {
            assert!(authorize_file(Some(&ROOT), ALICE.id, AccessPath::Admin, action).is_ok());
        }
        for action in [FileAction::Upload, FileAction::Update] {
            assert!(matches!(
                authorize_file(Some(&ROOT), ALICE.id, AccessPath::Admin, action),
                Err(NimbusError::Permission(_))
            ));
        }
        assert!(matches!(
            authorize_file(Some(&BOB), ALICE.id, AccessPath::Admin, FileAction::Retrieve),
            Err(NimbusError::Permission(_))
        ));
    }

    #[test]
    fn test_account_actions_require_admin() {
        let target = account(ALICE.id, false);
        assert!(matches!(
            authorize_account(&BOB, None, AccountAction::List),
            Err(NimbusError::Permission(_))
        ));
        assert!(matches!(
            authorize_account(&BOB, Some(&target), AccountAction::Delete),
            Err(NimbusError::Permission(_))
        ));
        assert!(authorize_account(&ROOT, None, AccountAction::List).is_ok());
        assert!(authorize_account(&ROOT, Some(&target), AccountAction::ViewFiles).is_ok());
    }

    #[test]
    fn test_admin_cannot_revoke_self() {
        let me = account(ROOT.id, true);
        assert!(matches!(
            authorize_account(&ROOT, Some(&me), AccountAction::SetAdmin(false)),
            Err(NimbusError::Permission(_))
        ));
        assert!(authorize_account(&ROOT, Some(&me), AccountAction::SetAdmin(true)).is_ok());

        let other_admin = account(11, true);
        assert!(authorize_account(&ROOT, Some(&other_admin), AccountAction::SetAdmin(false)).is_ok());
    }

    #[test]
    fn test_admin_delete_protection() {
        let me = account(ROOT.id, true);
        let other_admin = account(11, true);
        let member = account(ALICE.id, false);

        assert!(matches!(
            authorize_account(&ROOT, Some(&me), AccountAction::Delete),
            Err(NimbusError::Permission(_))
        ));
        assert!(matches!(
            authorize_account(&ROOT, Some(&other_admin), AccountAction::Delete),
            Err(NimbusError::Permission(_))
        ));
        assert!(authorize_account(&ROOT, Some(&member), AccountAction::Delete).is_ok());
    }

    #[test]
    fn test_missing_target_is_not_found() {
        assert!(matches!(
            authorize_account(&ROOT, None, AccountAction::Delete),
            Err(NimbusError::NotFound(_))
        ));
    }
}
