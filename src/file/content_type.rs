//! Static extension to MIME type table used for retrieval responses.

use std::path::Path;

/// Fallback for anything not in the table.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content type for a stored file name, decided by its extension
/// (case-insensitive).
pub fn content_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("doc" | "docx") => "application/msword",
        _ => OCTET_STREAM,
    }
}
