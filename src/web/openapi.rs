//! OpenAPI document for the HTTP API.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use super::dto::{
    AccountFilesResponse, AccountInfo, AccountSummaryResponse, FileListResponse, FileResponse,
    LoginRequest, LoginResponse, LogoutRequest, RefreshRequest, RefreshResponse, RegisterRequest,
    SetAdminRequest, UpdateFileRequest, UpdateProfileRequest,
};
use super::handlers::{admin, auth, download, file, profile};

#[derive(OpenApi)]
#[openapi(
    info(title = "Nimbus API", description = "Personal cloud file storage"),
    paths(
        auth::register,
        auth::login,
        auth::logout,
        auth::refresh,
        auth::me,
        profile::get_profile,
        profile::update_profile,
        profile::delete_profile,
        file::list_files,
        file::upload_file,
        file::get_file,
        file::update_file,
        file::delete_file,
        download::download_by_token,
        admin::list_users,
        admin::update_user,
        admin::delete_user,
        admin::list_user_files,
        admin::get_file,
        admin::delete_file,
    ),
    components(schemas(
        LoginRequest,
        LogoutRequest,
        RefreshRequest,
        RegisterRequest,
        UpdateProfileRequest,
        UpdateFileRequest,
        SetAdminRequest,
        AccountInfo,
        AccountSummaryResponse,
        LoginResponse,
        RefreshResponse,
        FileResponse,
        FileListResponse,
        AccountFilesResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and token rotation"),
        (name = "profile", description = "Own account"),
        (name = "files", description = "Own files and public download links"),
        (name = "admin", description = "Account and file administration")
    )
)]
pub struct ApiDoc;

/// Registers the bearer scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        assert!(paths.contains_key("/api/auth/login"));
        assert!(paths.contains_key("/api/files/{id}"));
        assert!(paths.contains_key("/api/download/{token}"));
        assert!(paths.contains_key("/api/admin/users/{id}/files"));
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
