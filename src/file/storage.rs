//! Blob storage for Nimbus.
//!
//! Bytes live on the local filesystem, one directory per account:
//! ```text
//! {root}/
//! ├── 1/
//! │   ├── 6f1c...-....txt
//! │   └── 9a0b...-....png
//! └── 2/
//!     └── ...
//! ```
//! Writes go to a hidden `.part` file in the same directory, are synced,
//! and then renamed into place, so a reader never sees a partial blob.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::{NimbusError, Result};

/// Longest extension carried over from the original file name.
const MAX_EXTENSION_LENGTH: usize = 16;

/// Filesystem blob store keyed by (owner id, stored name).
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every blob of one account.
    pub fn owner_dir(&self, owner_id: i64) -> PathBuf {
        self.root.join(owner_id.to_string())
    }

    /// Location of a blob.
    pub fn blob_path(&self, owner_id: i64, stored_name: &str) -> PathBuf {
        self.owner_dir(owner_id).join(stored_name)
    }

    /// Generate a fresh stored name: a new UUID plus the original extension.
    ///
    /// The extension is dropped if it is not short and alphanumeric, so the
    /// stored name is always safe to use as a path component.
    pub fn generate_stored_name(original_name: &str) -> String {
        let uuid = Uuid::new_v4();
        match Self::extract_extension(original_name) {
            Some(ext) => format!("{uuid}.{ext}"),
            None => uuid.to_string(),
        }
    }

    fn extract_extension(name: &str) -> Option<&str> {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| {
                !e.is_empty()
                    && e.len() <= MAX_EXTENSION_LENGTH
                    && e.chars().all(|c| c.is_ascii_alphanumeric())
            })
    }

    /// Durably write a blob. Fails if a blob with the same name exists.
    pub async fn write(&self, owner_id: i64, stored_name: &str, content: &[u8]) -> Result<()> {
        let dir = self.owner_dir(owner_id);
        fs::create_dir_all(&dir).await?;

        let final_path = dir.join(stored_name);
        if fs::try_exists(&final_path).await? {
            return Err(NimbusError::Conflict(format!("blob {stored_name} already exists")));
        }

        let temp_path = dir.join(format!(".{stored_name}.part"));
        if let Err(e) = Self::write_synced(&temp_path, content).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn write_synced(path: &Path, content: &[u8]) -> io::Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(content).await?;
        file.sync_all().await
    }

    /// Read a whole blob. A missing blob is `NotFound`.
    pub async fn read(&self, owner_id: i64, stored_name: &str) -> Result<Vec<u8>> {
        match fs::read(self.blob_path(owner_id, stored_name)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(NimbusError::NotFound("file content".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a blob.
    ///
    /// Returns `true` if it was deleted, `false` if it didn't exist.
    pub async fn delete(&self, owner_id: i64, stored_name: &str) -> Result<bool> {
        match fs::remove_file(self.blob_path(owner_id, stored_name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self, owner_id: i64, stored_name: &str) -> bool {
        fs::try_exists(self.blob_path(owner_id, stored_name))
            .await
            .unwrap_or(false)
    }

    /// Remove an account's directory if it exists and is empty.
    ///
    /// Returns `true` if the directory was removed.
    pub async fn remove_owner_dir_if_empty(&self, owner_id: i64) -> Result<bool> {
        let dir = self.owner_dir(owner_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        if entries.next_entry().await?.is_some() {
            return Ok(false);
        }

        fs::remove_dir(&dir).await?;
        Ok(true)
    }
}
