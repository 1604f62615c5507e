//! Account repository for Nimbus.

use chrono::Utc;
use sqlx::QueryBuilder;

use super::account::{Account, AccountSummary, AccountUpdate, NewAccount};
use super::{is_unique_violation, DbPool};
use crate::{NimbusError, Result};

const ACCOUNT_COLUMNS: &str = "id, username, email, full_name, password, is_admin, created_at";

const SUMMARY_SELECT: &str = "SELECT u.id, u.username, u.email, u.full_name, u.is_admin, u.created_at,
            COUNT(f.id) AS file_count,
            COALESCE(SUM(f.size_bytes), 0) AS total_size
     FROM users u
     LEFT JOIN files f ON f.owner_id = u.id";

/// Repository for account CRUD operations.
pub struct AccountRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> AccountRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new account.
    ///
    /// A UNIQUE violation on username or email is reported as `Conflict`.
    pub async fn create(&self, new_account: &NewAccount) -> Result<Account> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, full_name, password, is_admin, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_account.username)
        .bind(&new_account.email)
        .bind(&new_account.full_name)
        .bind(&new_account.password)
        .bind(new_account.is_admin)
        .bind(Utc::now())
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                NimbusError::Conflict("username or email already exists".to_string())
            } else {
                NimbusError::Database(e.to_string())
            }
        })?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| NimbusError::NotFound("account".to_string()))
    }

    /// Get an account by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = ?");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| NimbusError::Database(e.to_string()))?;
        Ok(account)
    }

    /// Get an account by username (exact match).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE username = ?");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(username)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| NimbusError::Database(e.to_string()))?;
        Ok(account)
    }

    /// Get an account by email. The lookup lowercases its input.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = ?");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(email.to_lowercase())
            .fetch_optional(self.pool)
            .await
            .map_err(|e| NimbusError::Database(e.to_string()))?;
        Ok(account)
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
            .bind(username)
            .fetch_one(self.pool)
            .await
            .map_err(|e| NimbusError::Database(e.to_string()))?;
        Ok(exists)
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
            .bind(email.to_lowercase())
            .fetch_one(self.pool)
            .await
            .map_err(|e| NimbusError::Database(e.to_string()))?;
        Ok(exists)
    }

    /// Update an account by ID.
    ///
    /// Only fields that are set in the update will be modified.
    /// Returns the updated account, or None if not found.
    pub async fn update(&self, id: i64, update: &AccountUpdate) -> Result<Option<Account>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE users SET ");
        let mut separated = query.separated(", ");

        if let Some(ref email) = update.email {
            separated.push("email = ");
            separated.push_bind_unseparated(email.to_lowercase());
        }
        if let Some(ref full_name) = update.full_name {
            separated.push("full_name = ");
            separated.push_bind_unseparated(full_name.clone());
        }
        if let Some(ref password) = update.password {
            separated.push("password = ");
            separated.push_bind_unseparated(password.clone());
        }
        if let Some(is_admin) = update.is_admin {
            separated.push("is_admin = ");
            separated.push_bind_unseparated(is_admin);
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query.build().execute(self.pool).await.map_err(|e| {
            if is_unique_violation(&e) {
                NimbusError::Conflict("email already exists".to_string())
            } else {
                NimbusError::Database(e.to_string())
            }
        })?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Delete an account. Returns true if a row was removed.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| NimbusError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// List all accounts with file count and total size, newest first.
    pub async fn list_with_stats(&self) -> Result<Vec<AccountSummary>> {
        let sql = format!("{SUMMARY_SELECT} GROUP BY u.id ORDER BY u.created_at DESC, u.id DESC");
        let accounts = sqlx::query_as::<_, AccountSummary>(&sql)
            .fetch_all(self.pool)
            .await
            .map_err(|e| NimbusError::Database(e.to_string()))?;
        Ok(accounts)
    }

    /// One account with file statistics.
    pub async fn get_summary(&self, id: i64) -> Result<Option<AccountSummary>> {
        let sql = format!("{SUMMARY_SELECT} WHERE u.id = ? GROUP BY u.id");
        let summary = sqlx::query_as::<_, AccountSummary>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| NimbusError::Database(e.to_string()))?;
        Ok(summary)
    }

    pub async fn count_admins(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_admin = 1")
            .fetch_one(self.pool)
            .await
            .map_err(|e| NimbusError::Database(e.to_string()))?;
        Ok(count)
    }
}
