//! File record model and repository.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, SqliteConnection};
use uuid::Uuid;

use crate::db::{is_unique_violation, DbPool};
use crate::{NimbusError, Result};

const RECORD_COLUMNS: &str = "id, owner_id, original_name, stored_name, size_bytes, comment,
     uploaded_at, last_downloaded_at, download_token";

/// Metadata for one uploaded file.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileRecord {
    pub id: Uuid,
    pub owner_id: i64,
    /// Display name; mutable.
    pub original_name: String,
    /// Server-generated blob name; immutable.
    pub stored_name: String,
    pub size_bytes: i64,
    pub comment: String,
    pub uploaded_at: DateTime<Utc>,
    pub last_downloaded_at: Option<DateTime<Utc>>,
    /// Public download link key, distinct from `id`.
    pub download_token: Uuid,
}

/// Data for inserting a new file record.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub id: Uuid,
    pub owner_id: i64,
    pub original_name: String,
    pub stored_name: String,
    pub size_bytes: i64,
    pub comment: String,
    pub download_token: Uuid,
}

impl NewFileRecord {
    /// Create a new record with fresh random id and download token.
    pub fn new(
        owner_id: i64,
        original_name: impl Into<String>,
        stored_name: impl Into<String>,
        size_bytes: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            original_name: original_name.into(),
            stored_name: stored_name.into(),
            size_bytes,
            comment: String::new(),
            download_token: Uuid::new_v4(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

/// Mutable fields of a file record.
#[derive(Debug, Clone, Default)]
pub struct FileRecordUpdate {
    pub original_name: Option<String>,
    pub comment: Option<String>,
}

impl FileRecordUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn original_name(mut self, name: impl Into<String>) -> Self {
        self.original_name = Some(name.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.original_name.is_none() && self.comment.is_none()
    }
}

/// Repository for file records.
///
/// Mutations are conditional single statements, so concurrent requests on
/// the same record resolve to "one wins, the rest see nothing to change".
pub struct FileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new record.
    pub async fn create(&self, new_file: &NewFileRecord) -> Result<FileRecord> {
        let sql = format!(
            "INSERT INTO files (id, owner_id, original_name, stored_name, size_bytes, comment,
                                uploaded_at, download_token)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {RECORD_COLUMNS}"
        );
        let record = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(new_file.id)
            .bind(new_file.owner_id)
            .bind(&new_file.original_name)
            .bind(&new_file.stored_name)
            .bind(new_file.size_bytes)
            .bind(&new_file.comment)
            .bind(Utc::now())
            .bind(new_file.download_token)
            .fetch_one(self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    NimbusError::Conflict("file identifier collision".to_string())
                } else {
                    NimbusError::Database(e.to_string())
                }
            })?;

        Ok(record)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM files WHERE id = ?");
        let record = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| NimbusError::Database(e.to_string()))?;
        Ok(record)
    }

    pub async fn get_by_token(&self, token: Uuid) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM files WHERE download_token = ?");
        let record = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(token)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| NimbusError::Database(e.to_string()))?;
        Ok(record)
    }

    /// All records of one owner, newest first.
    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM files WHERE owner_id = ?
             ORDER BY uploaded_at DESC, id"
        );
        let records = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(owner_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| NimbusError::Database(e.to_string()))?;
        Ok(records)
    }

    pub async fn total_size_by_owner(&self, owner_id: i64) -> Result<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(size_bytes), 0) FROM files WHERE owner_id = ?")
                .bind(owner_id)
                .fetch_one(self.pool)
                .await
                .map_err(|e| NimbusError::Database(e.to_string()))?;
        Ok(total)
    }

    /// Update a record only if it still exists and belongs to `owner_id`.
    ///
    /// Returns `None` if no row matched.
    pub async fn update_owned(
        &self,
        id: Uuid,
        owner_id: i64,
        update: &FileRecordUpdate,
    ) -> Result<Option<FileRecord>> {
        if update.is_empty() {
            return Err(NimbusError::Validation("nothing to update".to_string()));
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE files SET ");
        let mut separated = query.separated(", ");
        if let Some(ref name) = update.original_name {
            separated.push("original_name = ");
            separated.push_bind_unseparated(name.clone());
        }
        if let Some(ref comment) = update.comment {
            separated.push("comment = ");
            separated.push_bind_unseparated(comment.clone());
        }
        query.push(" WHERE id = ");
        query.push_bind(id);
        query.push(" AND owner_id = ");
        query.push_bind(owner_id);
        query.push(" RETURNING ");
        query.push(RECORD_COLUMNS);

        let record = query
            .build_query_as::<FileRecord>()
            .fetch_optional(self.pool)
            .await
            .map_err(|e| NimbusError::Database(e.to_string()))?;
        Ok(record)
    }

    /// Record a download at `at`, never moving the timestamp backwards.
    ///
    /// Returns `None` if the record no longer exists.
    pub async fn touch_downloaded(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        let stamp: Option<Option<DateTime<Utc>>> = sqlx::query_scalar(
            "UPDATE files
             SET last_downloaded_at = CASE
                 WHEN last_downloaded_at IS NULL OR last_downloaded_at < ? THEN ?
                 ELSE last_downloaded_at
             END
             WHERE id = ?
             RETURNING last_downloaded_at",
        )
        .bind(at)
        .bind(at)
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| NimbusError::Database(e.to_string()))?;

        Ok(stamp.flatten())
    }

    /// Delete a record. Returns `false` if it was already gone.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| NimbusError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every record of one owner inside the caller's transaction,
    /// returning the removed rows so their blobs can be cleaned up.
    pub async fn delete_all_by_owner(
        conn: &mut SqliteConnection,
        owner_id: i64,
    ) -> Result<Vec<FileRecord>> {
        let sql = format!("DELETE FROM files WHERE owner_id = ? RETURNING {RECORD_COLUMNS}");
        sqlx::query_as::<_, FileRecord>(&sql)
            .bind(owner_id)
            .fetch_all(conn)
            .await
            .map_err(|e| NimbusError::Database(e.to_string()))
    }
}
