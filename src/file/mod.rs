//! File storage for Nimbus.
//!
//! This module provides:
//! - File records (metadata) in the database
//! - Blob storage on the local filesystem
//! - The file service that keeps the two consistent

mod content_type;
mod record;
mod service;
mod storage;

pub use content_type::{content_type_for, OCTET_STREAM};
pub use record::{FileRecord, FileRecordUpdate, FileRepository, NewFileRecord};
pub use service::{
    AccountFiles, FileKey, FileListing, FileService, RetrievedFile, UploadRequest,
};
pub use storage::BlobStore;

/// Maximum length for a display name (in characters).
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Maximum length for a file comment (in characters).
pub const MAX_COMMENT_LENGTH: usize = 1000;

/// Default maximum upload size (50MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;
