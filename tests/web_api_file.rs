//! Web API File Tests
//!
//! Integration tests for upload, listing, retrieval, update, deletion and
//! public download links.

mod common;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use common::*;
use serde_json::{json, Value};

// ============================================================================
// Upload Tests
// ============================================================================

#[tokio::test]
async fn test_upload_and_list() {
    let app = create_test_app().await;
    let (token, _) = register_and_token(&app.server, "alice1").await;

    let file = upload_file(&app.server, &token, "notes.txt", b"hello world", Some("draft")).await;
    assert_eq!(file["original_name"], "notes.txt");
    assert_eq!(file["size_bytes"], 11);
    assert_eq!(file["comment"], "draft");
    assert!(file["last_downloaded_at"].is_null());
    let token_str = file["download_token"].as_str().unwrap();
    assert_eq!(
        file["download_url"],
        format!("/api/download/{}", token_str).as_str()
    );

    upload_file(&app.server, &token, "b.bin", &[0u8; 4], None).await;

    let response = app
        .server
        .get("/api/files")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["data"]["files"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["total_size"], 15);
}

#[tokio::test]
async fn test_upload_strips_client_path() {
    let app = create_test_app().await;
    let (token, _) = register_and_token(&app.server, "alice1").await;

    let file = upload_file(&app.server, &token, "C:\\Users\\alice\\report.pdf", b"%PDF", None).await;
    assert_eq!(file["original_name"], "report.pdf");
}

#[tokio::test]
async fn test_upload_requires_auth() {
    let app = create_test_app().await;

    let form = MultipartForm::new().add_part("file", Part::bytes(b"x".to_vec()).file_name("x.txt"));
    app.server
        .post("/api/files")
        .multipart(form)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let app = create_test_app().await;
    let (token, _) = register_and_token(&app.server, "alice1").await;

    let form = MultipartForm::new().add_text("comment", "no file here");
    let response = app
        .server
        .post("/api/files")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .multipart(form)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"]["details"]["file"].is_array());
}

#[tokio::test]
async fn test_upload_too_large_writes_nothing() {
    let app = create_test_app().await;
    let (token, id) = register_and_token(&app.server, "alice1").await;

    // Limit is 1 MiB in tests
    let content = vec![b'a'; 1024 * 1024 + 1];
    let form = MultipartForm::new().add_part("file", Part::bytes(content).file_name("big.bin"));
    let response = app
        .server
        .post("/api/files")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .multipart(form)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("too large"));

    let owner_dir = app.dir.path().join(id.to_string());
    assert!(!owner_dir.exists() || std::fs::read_dir(owner_dir).unwrap().next().is_none());

    let listing = app
        .server
        .get("/api/files")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .json::<Value>();
    assert_eq!(listing["data"]["total_size"], 0);
}

#[tokio::test]
async fn test_upload_exactly_at_limit() {
    let app = create_test_app().await;
    let (token, _) = register_and_token(&app.server, "alice1").await;

    let content = vec![b'a'; 1024 * 1024];
    let file = upload_file(&app.server, &token, "edge.bin", &content, None).await;
    assert_eq!(file["size_bytes"], 1024 * 1024);
}

#[tokio::test]
async fn test_upload_comment_too_long() {
    let app = create_test_app().await;
    let (token, _) = register_and_token(&app.server, "alice1").await;

    let form = MultipartForm::new()
        .add_part("file", Part::bytes(b"x".to_vec()).file_name("x.txt"))
        .add_text("comment", "c".repeat(1001));
    app.server
        .post("/api/files")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .multipart(form)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// ============================================================================
// Retrieval Tests
// ============================================================================

#[tokio::test]
async fn test_download_sets_headers_and_timestamp() {
    let app = create_test_app().await;
    let (token, _) = register_and_token(&app.server, "alice1").await;
    let file = upload_file(&app.server, &token, "résumé.txt", b"hello", None).await;
    let id = file["id"].as_str().unwrap();

    let response = app
        .server
        .get(&format!("/api/files/{}", id))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;

    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), b"hello");
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "text/plain"
    );
    assert_eq!(response.header("content-length").to_str().unwrap(), "5");
    let disposition = response.header("content-disposition");
    let disposition = disposition.to_str().unwrap();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("filename*=UTF-8''r%C3%A9sum%C3%A9.txt"));

    let listing = app
        .server
        .get("/api/files")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .json::<Value>();
    assert!(listing["data"]["files"][0]["last_downloaded_at"].is_string());
}

#[tokio::test]
async fn test_preview_is_inline_and_not_counted() {
    let app = create_test_app().await;
    let (token, _) = register_and_token(&app.server, "alice1").await;
    let file = upload_file(&app.server, &token, "photo.png", b"\x89PNG", None).await;
    let id = file["id"].as_str().unwrap();

    let response = app
        .server
        .get(&format!("/api/files/{}?preview=1", id))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "image/png"
    );
    assert!(response
        .header("content-disposition")
        .to_str()
        .unwrap()
        .starts_with("inline;"));
    assert!(response
        .header("content-security-policy")
        .to_str()
        .unwrap()
        .starts_with("sandbox"));

    let listing = app
        .server
        .get("/api/files")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .json::<Value>();
    assert!(listing["data"]["files"][0]["last_downloaded_at"].is_null());
}

#[tokio::test]
async fn test_other_users_file_is_not_found() {
    let app = create_test_app().await;
    let (alice, _) = register_and_token(&app.server, "alice1").await;
    let (bob, _) = register_and_token(&app.server, "bob123").await;
    let file = upload_file(&app.server, &alice, "secret.txt", b"s3cret", None).await;
    let id = file["id"].as_str().unwrap();

    app.server
        .get(&format!("/api/files/{}", id))
        .add_header(AUTHORIZATION, format!("Bearer {}", bob))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    app.server
        .patch(&format!("/api/files/{}", id))
        .add_header(AUTHORIZATION, format!("Bearer {}", bob))
        .json(&json!({"comment": "mine now"}))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    app.server
        .delete(&format!("/api/files/{}", id))
        .add_header(AUTHORIZATION, format!("Bearer {}", bob))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_file_id_is_not_found() {
    let app = create_test_app().await;
    let (token, _) = register_and_token(&app.server, "alice1").await;

    app.server
        .get("/api/files/not-a-uuid")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_blob_is_not_found() {
    let app = create_test_app().await;
    let (token, owner_id) = register_and_token(&app.server, "alice1").await;
    let file = upload_file(&app.server, &token, "gone.txt", b"bye", None).await;
    let id = file["id"].as_str().unwrap();

    // Remove the blob behind the service's back
    let owner_dir = app.dir.path().join(owner_id.to_string());
    for entry in std::fs::read_dir(&owner_dir).unwrap() {
        std::fs::remove_file(entry.unwrap().path()).unwrap();
    }

    app.server
        .get(&format!("/api/files/{}", id))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Public Download Link Tests
// ============================================================================

#[tokio::test]
async fn test_public_download_link() {
    let app = create_test_app().await;
    let (token, _) = register_and_token(&app.server, "alice1").await;
    let file = upload_file(&app.server, &token, "shared.txt", b"for everyone", None).await;
    let url = file["download_url"].as_str().unwrap();

    let response = app.server.get(url).await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), b"for everyone");
    assert!(response
        .header("content-disposition")
        .to_str()
        .unwrap()
        .contains("shared.txt"));
}

#[tokio::test]
async fn test_public_link_preview_is_not_counted() {
    let app = create_test_app().await;
    let (token, _) = register_and_token(&app.server, "alice1").await;
    let file = upload_file(&app.server, &token, "a.txt", b"hello", None).await;
    let url = file["download_url"].as_str().unwrap().to_string();

    let response = app.server.get(&format!("{}?preview=1", url)).await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), b"hello");
    assert!(response
        .header("content-disposition")
        .to_str()
        .unwrap()
        .starts_with("inline;"));

    let listing = app
        .server
        .get("/api/files")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .json::<Value>();
    assert!(listing["data"]["files"][0]["last_downloaded_at"].is_null());

    // A plain download through the same link is counted
    app.server.get(&url).await.assert_status_ok();
    let listing = app
        .server
        .get("/api/files")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .json::<Value>();
    assert!(listing["data"]["files"][0]["last_downloaded_at"].is_string());
}

#[tokio::test]
async fn test_public_download_unknown_token() {
    let app = create_test_app().await;

    app.server
        .get(&format!("/api/download/{}", uuid::Uuid::new_v4()))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server
        .get("/api/download/garbage")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_file_id_is_not_a_download_token() {
    let app = create_test_app().await;
    let (token, _) = register_and_token(&app.server, "alice1").await;
    let file = upload_file(&app.server, &token, "a.txt", b"a", None).await;
    let id = file["id"].as_str().unwrap();

    app.server
        .get(&format!("/api/download/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Update Tests
// ============================================================================

#[tokio::test]
async fn test_update_comment_and_name() {
    let app = create_test_app().await;
    let (token, _) = register_and_token(&app.server, "alice1").await;
    let file = upload_file(&app.server, &token, "old.txt", b"abc", Some("first")).await;
    let id = file["id"].as_str().unwrap();

    let response = app
        .server
        .patch(&format!("/api/files/{}", id))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({"original_name": "new.txt", "comment": "second"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["original_name"], "new.txt");
    assert_eq!(body["data"]["comment"], "second");
    // Identity of the file is unchanged
    assert_eq!(body["data"]["id"], file["id"]);
    assert_eq!(body["data"]["download_token"], file["download_token"]);
    assert_eq!(body["data"]["size_bytes"], 3);
}

#[tokio::test]
async fn test_update_with_nothing_to_change() {
    let app = create_test_app().await;
    let (token, _) = register_and_token(&app.server, "alice1").await;
    let file = upload_file(&app.server, &token, "a.txt", b"a", None).await;
    let id = file["id"].as_str().unwrap();

    app.server
        .patch(&format!("/api/files/{}", id))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_rejects_control_characters() {
    let app = create_test_app().await;
    let (token, _) = register_and_token(&app.server, "alice1").await;
    let file = upload_file(&app.server, &token, "a.txt", b"a", None).await;
    let id = file["id"].as_str().unwrap();

    let response = app
        .server
        .patch(&format!("/api/files/{}", id))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({"original_name": "evil\r\n.txt"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"]["details"]["original_name"].is_array());
}

// ============================================================================
// Delete Tests
// ============================================================================

#[tokio::test]
async fn test_delete_file() {
    let app = create_test_app().await;
    let (token, owner_id) = register_and_token(&app.server, "alice1").await;
    let file = upload_file(&app.server, &token, "a.txt", b"a", None).await;
    let id = file["id"].as_str().unwrap();

    app.server
        .delete(&format!("/api/files/{}", id))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let owner_dir = app.dir.path().join(owner_id.to_string());
    assert!(std::fs::read_dir(owner_dir).unwrap().next().is_none());

    // Second delete finds nothing
    app.server
        .delete(&format!("/api/files/{}", id))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // The public link is gone too
    let url = file["download_url"].as_str().unwrap();
    app.server.get(url).await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unsupported_method() {
    let app = create_test_app().await;
    let (token, _) = register_and_token(&app.server, "alice1").await;

    app.server
        .put("/api/files")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
}
