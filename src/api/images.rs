use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::{delete, get, post};
use axum::Router;
use serde::Deserialize;

use crate::api::response::{ApiResponse, QueryParams};
use crate::app::AppState;
use crate::error::AppError;
use crate::services::images::{
    process_delete, process_list, process_upload, process_upload_many, ImageUpload, ListedImage,
    UploadedImage, MAX_FILES_PER_UPLOAD, MAX_IMAGE_BYTES,
};
use crate::storage::client::StorageClient;

/// Room for the non-file parts of a form.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

type Storage = State<Arc<dyn StorageClient>>;

#[derive(Debug, Default)]
struct ImageForm {
    folder: Option<String>,
    files: Vec<ImageUpload>,
}

/// Collect the `folder` field and every file sent under `file_field`.
/// Fields may arrive in any order, so nothing is uploaded while reading.
async fn read_form(mut multipart: Multipart, file_field: &str) -> Result<ImageForm, AppError> {
    let mut form = ImageForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "folder" {
            let folder = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read folder: {e}")))?;
            form.folder = Some(folder);
            continue;
        }
        if name != file_field {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?;

        form.files.push(ImageUpload {
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }

    Ok(form)
}

async fn upload(
    State(storage): Storage,
    multipart: Multipart,
) -> Result<ApiResponse<UploadedImage>, AppError> {
    let form = read_form(multipart, "image").await?;
    let image = process_upload(
        storage.as_ref(),
        form.folder.as_deref(),
        form.files.into_iter().next(),
    )
    .await?;
    Ok(ApiResponse::created(image).with_message("Image uploaded successfully"))
}

async fn upload_multiple(
    State(storage): Storage,
    multipart: Multipart,
) -> Result<ApiResponse<Vec<UploadedImage>>, AppError> {
    let form = read_form(multipart, "images").await?;
    let images = process_upload_many(storage.as_ref(), form.folder.as_deref(), form.files).await?;
    Ok(ApiResponse::created(images).with_message("Images uploaded successfully"))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListImagesQuery {
    folder: Option<String>,
    max_keys: Option<String>,
}

async fn list(
    State(storage): Storage,
    QueryParams(query): QueryParams<ListImagesQuery>,
) -> Result<ApiResponse<Vec<ListedImage>>, AppError> {
    let images = process_list(
        storage.as_ref(),
        query.folder.as_deref(),
        query.max_keys.as_deref(),
    )
    .await?;
    Ok(ApiResponse::ok(images).with_message("Images retrieved successfully"))
}

#[derive(Debug, Default, Deserialize)]
struct KeyQuery {
    key: Option<String>,
}

async fn remove(
    State(storage): Storage,
    QueryParams(query): QueryParams<KeyQuery>,
) -> Result<ApiResponse, AppError> {
    process_delete(storage.as_ref(), query.key.as_deref()).await?;
    Ok(ApiResponse::message_only("Image deleted successfully"))
}

/// `/api/images`
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + FORM_OVERHEAD_BYTES)),
        )
        .route(
            "/upload-multiple",
            post(upload_multiple).layer(DefaultBodyLimit::max(
                MAX_FILES_PER_UPLOAD * MAX_IMAGE_BYTES + FORM_OVERHEAD_BYTES,
            )),
        )
        .route("/list", get(list))
        .route("/", delete(remove))
}
