//! Request DTOs for the HTTP API.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::validation::no_control_chars;

/// Login request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Logout request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LogoutRequest {
    /// Refresh token to revoke.
    pub refresh_token: String,
}

/// Token refresh request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Account registration request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    pub password: String,
    /// Confirmation copy of `password`.
    pub password2: String,
}

/// Profile update request. Omitted fields are unchanged.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Required when `new_password` is set.
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

/// File rename/annotate request. At least one field must be set.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFileRequest {
    #[serde(default)]
    #[validate(
        length(max = 255, message = "File name is too long"),
        custom(function = "no_control_chars")
    )]
    pub original_name: Option<String>,
    #[serde(default)]
    #[validate(
        length(max = 1000, message = "Comment is too long"),
        custom(function = "no_control_chars")
    )]
    pub comment: Option<String>,
}

/// Admin flag change.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetAdminRequest {
    pub is_admin: bool,
}

/// Query parameters for file retrieval.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RetrieveQuery {
    /// `1` or `true` serves the file inline without counting a download.
    #[serde(default)]
    pub preview: Option<String>,
}

impl RetrieveQuery {
    pub fn is_preview(&self) -> bool {
        matches!(
            self.preview.as_deref().map(str::trim),
            Some("1" | "true" | "yes" | "on")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MAX_COMMENT_LENGTH;

    #[test]
    fn test_retrieve_query_preview() {
        let query = |v: Option<&str>| RetrieveQuery {
            preview: v.map(String::from),
        };
        assert!(query(Some("1")).is_preview());
        assert!(query(Some("true")).is_preview());
        assert!(!query(Some("0")).is_preview());
        assert!(!query(Some("false")).is_preview());
        assert!(!query(None).is_preview());
    }

    #[test]
    fn test_register_request_requires_confirmation() {
        let body = r#"{"username":"alice1","email":"a@x.com","password":"Abcdef1!"}"#;
        assert!(serde_json::from_str::<RegisterRequest>(body).is_err());

        let body = r#"{"username":"alice1","email":"a@x.com","password":"Abcdef1!","password2":"Abcdef1!"}"#;
        let req: RegisterRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.password2, "Abcdef1!");
        assert!(req.full_name.is_empty());
    }

    #[test]
    fn test_update_file_request_validation() {
        let ok = UpdateFileRequest {
            original_name: Some("b.txt".to_string()),
            comment: Some("line one\nline two".to_string()),
        };
        assert!(ok.validate().is_ok());

        let long = UpdateFileRequest {
            comment: Some("x".repeat(MAX_COMMENT_LENGTH + 1)),
            ..Default::default()
        };
        assert!(long.validate().is_err());

        let control = UpdateFileRequest {
            original_name: Some("a\x00.txt".to_string()),
            ..Default::default()
        };
        assert!(control.validate().is_err());
    }
}
