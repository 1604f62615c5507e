//! Response DTOs for the HTTP API.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::{Account, AccountSummary};
use crate::file::{AccountFiles, FileListing, FileRecord};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Account information in responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccountInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountInfo {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            full_name: account.full_name,
            is_admin: account.is_admin,
            created_at: account.created_at,
        }
    }
}

/// Account with storage statistics (`/auth/me`, `/profile`, admin list).
#[derive(Debug, Serialize, ToSchema)]
pub struct AccountSummaryResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub file_count: i64,
    /// Sum of all file sizes in bytes.
    pub total_size: i64,
}

impl From<AccountSummary> for AccountSummaryResponse {
    fn from(summary: AccountSummary) -> Self {
        Self {
            id: summary.id,
            username: summary.username,
            email: summary.email,
            full_name: summary.full_name,
            is_admin: summary.is_admin,
            created_at: summary.created_at,
            file_count: summary.file_count,
            total_size: summary.total_size,
        }
    }
}

/// Login and registration response.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Access token (JWT).
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub user: AccountInfo,
}

/// Token refresh response.
#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// File metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileResponse {
    pub id: Uuid,
    pub original_name: String,
    pub size_bytes: i64,
    pub comment: String,
    pub uploaded_at: DateTime<Utc>,
    pub last_downloaded_at: Option<DateTime<Utc>>,
    pub download_token: Uuid,
    /// Public link that serves the file without authentication.
    pub download_url: String,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            download_url: format!("/api/download/{}", record.download_token),
            original_name: record.original_name,
            size_bytes: record.size_bytes,
            comment: record.comment,
            uploaded_at: record.uploaded_at,
            last_downloaded_at: record.last_downloaded_at,
            download_token: record.download_token,
        }
    }
}

/// File listing with total size.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileListResponse {
    pub files: Vec<FileResponse>,
    pub total_size: i64,
}

impl From<FileListing> for FileListResponse {
    fn from(listing: FileListing) -> Self {
        Self {
            files: listing.files.into_iter().map(FileResponse::from).collect(),
            total_size: listing.total_size,
        }
    }
}

/// An account's files as seen by an administrator.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccountFilesResponse {
    pub account: AccountInfo,
    pub files: Vec<FileResponse>,
    pub total_size: i64,
}

impl From<AccountFiles> for AccountFilesResponse {
    fn from(listing: AccountFiles) -> Self {
        Self {
            account: listing.account.into(),
            files: listing.files.into_iter().map(FileResponse::from).collect(),
            total_size: listing.total_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_response_download_url() {
        let record = FileRecord {
            id: Uuid::new_v4(),
            owner_id: 1,
            original_name: "a.txt".to_string(),
            stored_name: "x.txt".to_string(),
            size_bytes: 10,
            comment: String::new(),
            uploaded_at: Utc::now(),
            last_downloaded_at: None,
            download_token: Uuid::new_v4(),
        };
        let token = record.download_token;

        let response = FileResponse::from(record);
        assert_eq!(response.download_url, format!("/api/download/{token}"));

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("stored_name").is_none());
        assert!(json.get("owner_id").is_none());
    }
}
