//! Nimbus - personal cloud file storage.
//!
//! Accounts upload, list, download, preview, rename, annotate and delete
//! their own files. Each file also gets a public download token. Admins
//! manage every account and file.

pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use access::{Actor, AccessPath, AccountAction, FileAction};
pub use auth::{
    authenticate, get_profile, hash_password, list_accounts, register, register_admin, set_admin,
    update_profile, validate_password, verify_password, PasswordError, ProfileError,
    ProfileUpdateRequest, RegistrationError, RegistrationRequest, ValidationError,
};
pub use config::Config;
pub use db::{Account, AccountRepository, AccountSummary, Database};
pub use error::{NimbusError, Result};
pub use file::{BlobStore, FileKey, FileRecord, FileRepository, FileService, UploadRequest};
