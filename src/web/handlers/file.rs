//! File handlers for the HTTP API.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::file::{FileKey, FileRecordUpdate, RetrievedFile, UploadRequest};
use crate::web::dto::{
    ApiResponse, FileListResponse, FileResponse, RetrieveQuery, UpdateFileRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// Generate a safe Content-Disposition header value.
///
/// Control characters are removed and quotes/backslashes replaced in the
/// plain `filename` parameter; non-ASCII names are also sent RFC 5987
/// encoded as `filename*`.
pub(crate) fn content_disposition_header(filename: &str, inline: bool) -> String {
    let disposition = if inline { "inline" } else { "attachment" };

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();

    if filename.is_ascii() && sanitized == filename {
        return format!("{disposition}; filename=\"{filename}\"");
    }

    let encoded = urlencoding::encode(filename);
    format!("{disposition}; filename=\"{sanitized}\"; filename*=UTF-8''{encoded}")
}

/// Parse a file id or token from the path.
///
/// Anything that is not a UUID cannot name a file, so it is a 404.
pub(crate) fn parse_file_key(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("file not found"))
}

/// Build the byte response for a retrieval.
pub(crate) fn file_content_response(
    retrieved: RetrievedFile,
    preview: bool,
) -> Result<Response<Body>, ApiError> {
    let RetrievedFile {
        record,
        content,
        content_type,
    } = retrieved;

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&record.original_name, preview),
        )
        .header(header::CONTENT_LENGTH, content.len())
        .body(Body::from(content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

fn too_large(max_bytes: u64) -> ApiError {
    ApiError::invalid(format!(
        "File too large (max {}MB)",
        max_bytes / 1024 / 1024
    ))
}

fn multipart_error(e: MultipartError, max_bytes: u64) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_bytes)
    } else {
        tracing::debug!("Failed to read multipart data: {}", e);
        ApiError::bad_request("Invalid multipart data")
    }
}

/// GET /api/files - List own files.
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    responses(
        (status = 200, description = "Own files with total size", body = FileListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<FileListResponse>>, ApiError> {
    let actor = state.current_actor(&claims).await?;
    let listing = state.file_service().list(&actor).await?;
    Ok(Json(ApiResponse::new(listing.into())))
}

/// POST /api/files - Upload a file.
///
/// Request body: multipart/form-data with a "file" field and an optional
/// "comment" field. The upload is rejected as soon as it passes the size
/// limit; nothing is written in that case.
#[utoipa::path(
    post,
    path = "/api/files",
    tag = "files",
    responses(
        (status = 201, description = "File uploaded", body = FileResponse),
        (status = 400, description = "Missing file or file too large"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponse>>), ApiError> {
    let actor = state.current_actor(&claims).await?;
    let max_bytes = state.max_upload_size;

    let mut filename: Option<String> = None;
    let mut comment: Option<String> = None;
    let mut content: Option<Vec<u8>> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                filename = field.file_name().map(|s| s.to_string());
                let mut buffer = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| multipart_error(e, max_bytes))?
                {
                    if (buffer.len() + chunk.len()) as u64 > max_bytes {
                        return Err(too_large(max_bytes));
                    }
                    buffer.extend_from_slice(&chunk);
                }
                content = Some(buffer);
            }
            "comment" => {
                comment = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| multipart_error(e, max_bytes))?,
                );
            }
            _ => {}
        }
    }

    let content = content.ok_or_else(|| ApiError::field("file", "No file provided"))?;
    let filename = filename.ok_or_else(|| ApiError::field("file", "No file name provided"))?;

    let mut request = UploadRequest::new(filename, content);
    if let Some(comment) = comment {
        request = request.with_comment(comment);
    }

    let record = state.file_service().upload(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(record.into()))))
}

/// GET /api/files/:id - Download or preview an own file.
#[utoipa::path(
    get,
    path = "/api/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID"),
        RetrieveQuery
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    Query(query): Query<RetrieveQuery>,
) -> Result<Response<Body>, ApiError> {
    let actor = state.current_actor(&claims).await?;
    let id = parse_file_key(&id)?;
    let preview = query.is_preview();

    let retrieved = state
        .file_service()
        .retrieve(Some(&actor), FileKey::Owned(id), preview)
        .await?;
    file_content_response(retrieved, preview)
}

/// PATCH /api/files/:id - Rename and/or annotate an own file.
#[utoipa::path(
    patch,
    path = "/api/files/{id}",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    request_body = UpdateFileRequest,
    responses(
        (status = 200, description = "Updated file", body = FileResponse),
        (status = 400, description = "Nothing to update or invalid name"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateFileRequest>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let actor = state.current_actor(&claims).await?;
    let id = parse_file_key(&id)?;

    let update = FileRecordUpdate {
        original_name: req.original_name,
        comment: req.comment,
    };
    let record = state.file_service().update(&actor, id, update).await?;
    Ok(Json(ApiResponse::new(record.into())))
}

/// DELETE /api/files/:id - Delete an own file.
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 204, description = "File deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let actor = state.current_actor(&claims).await?;
    let id = parse_file_key(&id)?;

    state
        .file_service()
        .delete(&actor, FileKey::Owned(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
