mod common;

use axum_test::multipart::{MultipartForm, Part};
use serde_json::Value;

/// A minimal 1x1 PNG.
fn png_bytes() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
        0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
        0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1
        0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, // bit depth, color type, CRC
        0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, // IDAT chunk
        0x08, 0xD7, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, // compressed data
        0x00, 0x02, 0x00, 0x01, 0xE2, 0x21, 0xBC, 0x33, // CRC
        0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, // IEND chunk
        0xAE, 0x42, 0x60, 0x82,
    ]
}

fn png_part(name: &str) -> Part {
    Part::bytes(png_bytes()).file_name(name).mime_type("image/png")
}

#[tokio::test]
async fn upload_list_and_delete_image() {
    let env = common::TestEnv::start().await;
    let server = env.server();
    let token = env.admin_token(&server).await;

    let form = MultipartForm::new()
        .add_text("folder", "gallery")
        .add_part("image", png_part("stage.png"));
    let response = server
        .post("/api/images/upload")
        .authorization_bearer(&token)
        .multipart(form)
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body: Value = response.json();
    let key = body["data"]["key"].as_str().expect("upload returns a key").to_string();
    assert!(key.starts_with("gallery/"), "unexpected key: {key}");
    assert!(key.ends_with("-stage.png"), "unexpected key: {key}");
    assert_eq!(
        body["data"]["url"].as_str(),
        Some(format!("{}/{}", env.storage_url, key).as_str())
    );

    let listed: Value = server
        .get("/api/images/list")
        .add_query_param("folder", "gallery")
        .authorization_bearer(&token)
        .await
        .json();
    let items = listed["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["key"].as_str(), Some(key.as_str()));
    assert_eq!(items[0]["size"].as_i64(), Some(png_bytes().len() as i64));
    assert!(items[0]["lastModified"].is_string());

    server
        .delete("/api/images")
        .add_query_param("key", &key)
        .authorization_bearer(&token)
        .await;

    let listed: Value = server
        .get("/api/images/list")
        .add_query_param("folder", "gallery")
        .authorization_bearer(&token)
        .await
        .json();
    assert!(listed["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn upload_multiple_images() {
    let env = common::TestEnv::start().await;
    let server = env.server();
    let token = env.admin_token(&server).await;

    let form = MultipartForm::new()
        .add_part("images", png_part("one.png"))
        .add_part("images", png_part("two.png"));
    let response = server
        .post("/api/images/upload-multiple")
        .authorization_bearer(&token)
        .multipart(form)
        .await;

    let body: Value = response.json();
    let uploaded = body["data"].as_array().unwrap();
    assert_eq!(uploaded.len(), 2);
    assert!(uploaded
        .iter()
        .all(|image| image["key"].as_str().unwrap().starts_with("images/")));
}

#[tokio::test]
async fn upload_rejects_non_image() {
    let env = common::TestEnv::start().await;
    let server = env.server_permissive();
    let token = env.admin_token(&server).await;

    let form = MultipartForm::new().add_part(
        "image",
        Part::bytes(b"hello world".to_vec())
            .file_name("notes.txt")
            .mime_type("text/plain"),
    );
    let response = server
        .post("/api/images/upload")
        .authorization_bearer(&token)
        .multipart(form)
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn upload_without_file_field() {
    let env = common::TestEnv::start().await;
    let server = env.server_permissive();
    let token = env.admin_token(&server).await;

    let form = MultipartForm::new().add_part("wrong_field", png_part("x.png"));
    let response = server
        .post("/api/images/upload")
        .authorization_bearer(&token)
        .multipart(form)
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn image_routes_require_admin() {
    let env = common::TestEnv::start().await;
    let server = env.server_permissive();

    let form = MultipartForm::new().add_part("image", png_part("x.png"));
    server
        .post("/api/images/upload")
        .multipart(form)
        .await
        .assert_status_unauthorized();

    server.get("/api/images/list").await.assert_status_unauthorized();
}
