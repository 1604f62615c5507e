//! File service for Nimbus.
//!
//! This module provides the high-level file operations:
//! - Upload with size checks and blob cleanup on failure
//! - Retrieval by id or public download token, with preview
//! - Rename/annotate and delete
//! - Account deletion cascading over every owned file
//!
//! Every operation asks [`crate::access`] before touching the record store
//! or the blob store.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::{
    authorize_account, authorize_file, require_admin, AccessPath, AccountAction, Actor, FileAction,
};
use crate::db::{Account, AccountRepository, Database};
use crate::{NimbusError, Result};

use super::content_type::content_type_for;
use super::record::{FileRecord, FileRecordUpdate, FileRepository, NewFileRecord};
use super::storage::BlobStore;
use super::{DEFAULT_MAX_FILE_SIZE, MAX_COMMENT_LENGTH, MAX_FILENAME_LENGTH};

/// Request data for file upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Name supplied by the client; only its last path component is kept.
    pub original_name: String,
    pub comment: Option<String>,
    pub content: Vec<u8>,
}

impl UploadRequest {
    pub fn new(original_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            original_name: original_name.into(),
            comment: None,
            content,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// How a file is addressed, which also decides the access path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKey {
    /// File id on the caller's own files.
    Owned(Uuid),
    /// File id through the admin endpoints.
    Admin(Uuid),
    /// Public download token.
    Token(Uuid),
}

impl FileKey {
    pub fn path(&self) -> AccessPath {
        match self {
            FileKey::Owned(_) => AccessPath::Owner,
            FileKey::Admin(_) => AccessPath::Admin,
            FileKey::Token(_) => AccessPath::PublicLink,
        }
    }
}

/// Files of one account plus their combined size.
#[derive(Debug, Clone)]
pub struct FileListing {
    pub files: Vec<FileRecord>,
    pub total_size: i64,
}

/// An account's files as seen by an administrator.
#[derive(Debug, Clone)]
pub struct AccountFiles {
    pub account: Account,
    pub files: Vec<FileRecord>,
    pub total_size: i64,
}

/// Result of a retrieval.
#[derive(Debug)]
pub struct RetrievedFile {
    /// The record, with `last_downloaded_at` already updated unless previewed.
    pub record: FileRecord,
    pub content: Vec<u8>,
    pub content_type: &'static str,
}

/// File service coordinating the record store and the blob store.
pub struct FileService<'a> {
    db: &'a Database,
    storage: &'a BlobStore,
    max_file_size: u64,
}

impl<'a> FileService<'a> {
    pub fn new(db: &'a Database, storage: &'a BlobStore) -> Self {
        Self {
            db,
            storage,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, max_size: u64) -> Self {
        self.max_file_size = max_size;
        self
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    fn files(&self) -> FileRepository<'_> {
        FileRepository::new(self.db.pool())
    }

    fn accounts(&self) -> AccountRepository<'_> {
        AccountRepository::new(self.db.pool())
    }

    /// Upload a file into the actor's storage.
    ///
    /// The blob is written first; the record is inserted only after the
    /// bytes are durable. If the insert fails the blob is removed again.
    pub async fn upload(&self, actor: &Actor, request: UploadRequest) -> Result<FileRecord> {
        authorize_file(Some(actor), actor.id, AccessPath::Owner, FileAction::Upload)?;

        if request.content.len() as u64 > self.max_file_size {
            let max_mb = self.max_file_size / 1024 / 1024;
            return Err(NimbusError::Validation(format!(
                "file is too large (max {max_mb}MB)"
            )));
        }

        let original_name = display_name(&request.original_name)?;
        let comment = request.comment.unwrap_or_default();
        if comment.chars().count() > MAX_COMMENT_LENGTH {
            return Err(NimbusError::Validation(format!(
                "comment must be at most {MAX_COMMENT_LENGTH} characters"
            )));
        }

        let stored_name = BlobStore::generate_stored_name(&original_name);
        self.storage
            .write(actor.id, &stored_name, &request.content)
            .await?;

        let new_file = NewFileRecord::new(
            actor.id,
            &original_name,
            &stored_name,
            request.content.len() as i64,
        )
        .with_comment(comment);

        match self.files().create(&new_file).await {
            Ok(record) => {
                info!(
                    "User {} uploaded {} ({} bytes) as {}",
                    actor.id, record.original_name, record.size_bytes, record.id
                );
                Ok(record)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(actor.id, &stored_name).await {
                    warn!(
                        "Failed to remove blob {} after failed upload: {}",
                        stored_name, cleanup
                    );
                }
                Err(e)
            }
        }
    }

    /// List the actor's own files.
    pub async fn list(&self, actor: &Actor) -> Result<FileListing> {
        authorize_file(Some(actor), actor.id, AccessPath::Owner, FileAction::List)?;

        let files = self.files().list_by_owner(actor.id).await?;
        let total_size = self.files().total_size_by_owner(actor.id).await?;
        Ok(FileListing { files, total_size })
    }

    /// List any account's files (admin).
    pub async fn list_account_files(&self, actor: &Actor, account_id: i64) -> Result<AccountFiles> {
        let account = self.accounts().get_by_id(account_id).await?;
        authorize_account(actor, account.as_ref(), AccountAction::ViewFiles)?;
        let account = account.ok_or_else(|| NimbusError::NotFound("account".to_string()))?;
        authorize_file(Some(actor), account.id, AccessPath::Admin, FileAction::List)?;

        let files = self.files().list_by_owner(account.id).await?;
        let total_size = self.files().total_size_by_owner(account.id).await?;
        Ok(AccountFiles {
            account,
            files,
            total_size,
        })
    }

    async fn lookup(&self, actor: Option<&Actor>, key: FileKey) -> Result<FileRecord> {
        if key.path() == AccessPath::Admin {
            require_admin(actor)?;
        }
        let record = match key {
            FileKey::Owned(id) | FileKey::Admin(id) => self.files().get_by_id(id).await?,
            FileKey::Token(token) => self.files().get_by_token(token).await?,
        };
        record.ok_or_else(|| NimbusError::NotFound("file".to_string()))
    }

    /// Retrieve a file's bytes.
    ///
    /// Unless `preview` is set, the download timestamp is moved to now.
    pub async fn retrieve(
        &self,
        actor: Option<&Actor>,
        key: FileKey,
        preview: bool,
    ) -> Result<RetrievedFile> {
        let mut record = self.lookup(actor, key).await?;
        authorize_file(actor, record.owner_id, key.path(), FileAction::Retrieve)?;

        let content = match self.storage.read(record.owner_id, &record.stored_name).await {
            Ok(content) => content,
            Err(NimbusError::NotFound(_)) => {
                warn!(
                    "File {} has no blob at {}/{}",
                    record.id, record.owner_id, record.stored_name
                );
                return Err(NimbusError::NotFound("file".to_string()));
            }
            Err(e) => return Err(e),
        };

        if !preview {
            let stamp = self
                .files()
                .touch_downloaded(record.id, Utc::now())
                .await?
                .ok_or_else(|| NimbusError::NotFound("file".to_string()))?;
            record.last_downloaded_at = Some(stamp);
        }

        let content_type = content_type_for(&record.stored_name);
        Ok(RetrievedFile {
            record,
            content,
            content_type,
        })
    }

    /// Rename and/or annotate one of the actor's files.
    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        update: FileRecordUpdate,
    ) -> Result<FileRecord> {
        if update.is_empty() {
            return Err(NimbusError::Validation(
                "provide a new name or a comment".to_string(),
            ));
        }

        let mut update = update;
        if let Some(name) = update.original_name.take() {
            update.original_name = Some(display_name(&name)?);
        }
        if let Some(ref comment) = update.comment {
            if comment.chars().count() > MAX_COMMENT_LENGTH {
                return Err(NimbusError::Validation(format!(
                    "comment must be at most {MAX_COMMENT_LENGTH} characters"
                )));
            }
        }

        let record = self.lookup(Some(actor), FileKey::Owned(id)).await?;
        authorize_file(Some(actor), record.owner_id, AccessPath::Owner, FileAction::Update)?;

        self.files()
            .update_owned(id, actor.id, &update)
            .await?
            .ok_or_else(|| NimbusError::NotFound("file".to_string()))
    }

    /// Delete a file: blob first, then the record.
    ///
    /// A missing blob is logged and the record is still removed. When two
    /// deletes race, the one that loses sees `NotFound`.
    pub async fn delete(&self, actor: &Actor, key: FileKey) -> Result<()> {
        let record = self.lookup(Some(actor), key).await?;
        authorize_file(Some(actor), record.owner_id, key.path(), FileAction::Delete)?;

        self.remove_blob(&record).await;

        if !self.files().delete(record.id).await? {
            return Err(NimbusError::NotFound("file".to_string()));
        }

        info!(
            "User {} deleted file {} ({}) owned by {}",
            actor.id, record.id, record.original_name, record.owner_id
        );
        Ok(())
    }

    /// Delete the actor's own account with every file it owns.
    pub async fn delete_account_cascade(&self, actor: &Actor) -> Result<()> {
        let account = self
            .accounts()
            .get_by_id(actor.id)
            .await?
            .ok_or_else(|| NimbusError::NotFound("account".to_string()))?;

        self.remove_account(&account).await?;
        info!("User {} deleted their account", account.username);
        Ok(())
    }

    /// Delete another account with every file it owns (admin).
    pub async fn admin_delete_account(&self, actor: &Actor, target_id: i64) -> Result<()> {
        let target = self.accounts().get_by_id(target_id).await?;
        authorize_account(actor, target.as_ref(), AccountAction::Delete)?;
        let target = target.ok_or_else(|| NimbusError::NotFound("account".to_string()))?;

        self.remove_account(&target).await?;
        info!("Admin {} deleted account {}", actor.id, target.username);
        Ok(())
    }

    /// Records go first, in one transaction with the account row; blobs are
    /// removed after the commit. Any record committed before the delete is
    /// returned by it, so at worst a blob is left orphaned, never a record.
    async fn remove_account(&self, account: &Account) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;
        let removed = FileRepository::delete_all_by_owner(&mut *tx, account.id).await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(account.id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(NimbusError::NotFound("account".to_string()));
        }
        tx.commit().await?;

        for record in &removed {
            self.remove_blob(record).await;
        }
        if let Err(e) = self.storage.remove_owner_dir_if_empty(account.id).await {
            warn!("Failed to remove storage directory of {}: {}", account.id, e);
        }

        info!(
            "Removed account {} with {} file(s)",
            account.id,
            removed.len()
        );
        Ok(())
    }

    async fn remove_blob(&self, record: &FileRecord) {
        match self.storage.delete(record.owner_id, &record.stored_name).await {
            Ok(true) => {}
            Ok(false) => warn!(
                "Blob for file {} was already missing at {}/{}",
                record.id, record.owner_id, record.stored_name
            ),
            Err(e) => warn!("Failed to delete blob for file {}: {}", record.id, e),
        }
    }
}

/// Reduce a client-supplied name to a trimmed base name.
fn display_name(name: &str) -> Result<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    if base.is_empty() {
        return Err(NimbusError::Validation("file name cannot be empty".to_string()));
    }
    if base.chars().count() > MAX_FILENAME_LENGTH {
        return Err(NimbusError::Validation(format!(
            "file name must be at most {MAX_FILENAME_LENGTH} characters"
        )));
    }
    Ok(base.to_string())
}
