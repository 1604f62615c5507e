//! Public download links.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    response::Response,
};
use std::sync::Arc;

use crate::file::FileKey;
use crate::web::dto::RetrieveQuery;
use crate::web::error::ApiError;
use crate::web::handlers::file::{file_content_response, parse_file_key};
use crate::web::handlers::AppState;

/// GET /api/download/:token - Download a file by its public token.
///
/// No authentication. Counts as a download unless `preview` is set.
#[utoipa::path(
    get,
    path = "/api/download/{token}",
    tag = "files",
    params(
        ("token" = String, Path, description = "Download token (UUID)"),
        RetrieveQuery
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "Unknown token")
    )
)]
pub async fn download_by_token(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Query(query): Query<RetrieveQuery>,
) -> Result<Response<Body>, ApiError> {
    let token = parse_file_key(&token)?;
    let preview = query.is_preview();

    let retrieved = state
        .file_service()
        .retrieve(None, FileKey::Token(token), preview)
        .await?;
    file_content_response(retrieved, preview)
}
