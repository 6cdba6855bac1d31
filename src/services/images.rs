//! Image uploads to the public bucket.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::models::bson_serde::opt_timestamp;
use crate::storage::client::StorageClient;

/// Per-file size cap.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Files accepted by one multi-upload.
pub const MAX_FILES_PER_UPLOAD: usize = 10;

pub const DEFAULT_FOLDER: &str = "images";

const DEFAULT_MAX_KEYS: i32 = 100;
const MAX_KEYS_CAP: i32 = 1000;

const ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// A file taken from a multipart request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadedImage {
    pub key: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedImage {
    pub key: String,
    pub url: String,
    pub size: Option<i64>,
    #[serde(with = "opt_timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// Normalise the target folder; blank means [`DEFAULT_FOLDER`].
fn folder_name(raw: Option<&str>) -> Result<String, AppError> {
    let folder = raw.map(|f| f.trim().trim_matches('/')).unwrap_or_default();
    if folder.is_empty() {
        return Ok(DEFAULT_FOLDER.to_string());
    }
    if folder.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
        return Err(AppError::BadRequest(format!("Invalid folder: {folder}")));
    }
    Ok(folder.to_string())
}

fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if sanitized.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        sanitized
    }
}

/// `{folder}/{timestamp_ms}-{file name}`.
pub fn object_key(folder: &str, file_name: &str, at: DateTime<Utc>) -> String {
    format!("{folder}/{}-{}", at.timestamp_millis(), sanitize_file_name(file_name))
}

fn check_image(upload: &ImageUpload) -> Result<(), AppError> {
    if !ALLOWED_TYPES.contains(&upload.content_type.as_str()) {
        return Err(AppError::BadRequest(
            "Invalid file type. Only JPEG, PNG, GIF, and WEBP are allowed.".into(),
        ));
    }
    if upload.data.is_empty() {
        return Err(AppError::BadRequest(format!("{} is empty", upload.file_name)));
    }
    if upload.data.len() > MAX_IMAGE_BYTES {
        return Err(AppError::BadRequest(format!(
            "{} exceeds the 10 MB limit",
            upload.file_name
        )));
    }
    Ok(())
}

async fn store(
    storage: &dyn StorageClient,
    folder: &str,
    upload: ImageUpload,
) -> Result<UploadedImage, AppError> {
    let key = object_key(folder, &upload.file_name, Utc::now());
    let size = upload.data.len();
    storage.put_object(&key, upload.data, &upload.content_type).await?;
    tracing::info!(key = %key, size, "image uploaded");
    Ok(UploadedImage {
        url: storage.public_url(&key),
        key,
    })
}

pub async fn process_upload(
    storage: &dyn StorageClient,
    folder: Option<&str>,
    upload: Option<ImageUpload>,
) -> Result<UploadedImage, AppError> {
    let upload = upload.ok_or_else(|| AppError::BadRequest("No file uploaded".into()))?;
    let folder = folder_name(folder)?;
    check_image(&upload)?;
    store(storage, &folder, upload).await
}

/// Upload a batch. Every file is checked before any is stored.
pub async fn process_upload_many(
    storage: &dyn StorageClient,
    folder: Option<&str>,
    uploads: Vec<ImageUpload>,
) -> Result<Vec<UploadedImage>, AppError> {
    if uploads.is_empty() {
        return Err(AppError::BadRequest("No files uploaded".into()));
    }
    if uploads.len() > MAX_FILES_PER_UPLOAD {
        return Err(AppError::BadRequest(format!(
            "At most {MAX_FILES_PER_UPLOAD} images can be uploaded at once"
        )));
    }
    let folder = folder_name(folder)?;
    for upload in &uploads {
        check_image(upload)?;
    }

    futures::future::try_join_all(
        uploads
            .into_iter()
            .map(|upload| store(storage, &folder, upload)),
    )
    .await
}

/// Objects under a folder, directory markers excluded.
pub async fn process_list(
    storage: &dyn StorageClient,
    folder: Option<&str>,
    max_keys: Option<&str>,
) -> Result<Vec<ListedImage>, AppError> {
    let folder = folder_name(folder)?;
    let max_keys = max_keys
        .and_then(|raw| raw.trim().parse::<i32>().ok())
        .filter(|n| *n > 0)
        .map_or(DEFAULT_MAX_KEYS, |n| n.min(MAX_KEYS_CAP));

    let objects = storage.list_objects(&folder, max_keys).await?;
    Ok(objects
        .into_iter()
        .filter(|object| !object.key.ends_with('/'))
        .map(|object| ListedImage {
            url: storage.public_url(&object.key),
            key: object.key,
            size: object.size,
            last_modified: object.last_modified,
        })
        .collect())
}

pub async fn process_delete(storage: &dyn StorageClient, key: Option<&str>) -> Result<(), AppError> {
    let key = key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AppError::BadRequest("Image key is required".into()))?;
    storage.delete_object(key).await?;
    tracing::info!(key = %key, "image deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStorage;
    use chrono::TimeZone;

    fn png(name: &str) -> ImageUpload {
        ImageUpload {
            file_name: name.into(),
            content_type: "image/png".into(),
            data: vec![0x89, 0x50, 0x4e, 0x47],
        }
    }

    #[test]
    fn test_object_key_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(
            object_key("gallery", "my photo (1).jpg", at),
            "gallery/1709251200000-my_photo__1_.jpg"
        );
        assert_eq!(object_key("images", "..", at), "images/1709251200000-upload");
        assert_eq!(
            object_key("passers", "합격자 명단.png", at),
            "passers/1709251200000-______.png"
        );
    }

    #[test]
    fn test_folder_name() {
        assert_eq!(folder_name(None).unwrap(), "images");
        assert_eq!(folder_name(Some(" /hero/ ")).unwrap(), "hero");
        assert_eq!(folder_name(Some("content/hero")).unwrap(), "content/hero");
        assert!(matches!(folder_name(Some("../etc")), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_upload_stores_under_folder() {
        let storage = MemoryStorage::new();
        let uploaded = process_upload(&storage, Some("notices"), Some(png("a.png")))
            .await
            .unwrap();

        assert!(uploaded.key.starts_with("notices/"));
        assert!(uploaded.key.ends_with("-a.png"));
        assert_eq!(uploaded.url, format!("https://bucket.test/{}", uploaded.key));

        let objects = storage.objects.lock().unwrap();
        assert_eq!(objects[&uploaded.key].1, "image/png");
    }

    #[tokio::test]
    async fn test_upload_rejects_other_types_and_oversize() {
        let storage = MemoryStorage::new();

        let mut svg = png("a.svg");
        svg.content_type = "image/svg+xml".into();
        match process_upload(&storage, None, Some(svg)).await.unwrap_err() {
            AppError::BadRequest(msg) => assert!(msg.contains("Invalid file type")),
            other => panic!("Expected BadRequest error, got: {:?}", other),
        }

        let mut big = png("big.png");
        big.data = vec![0; MAX_IMAGE_BYTES + 1];
        assert!(matches!(
            process_upload(&storage, None, Some(big)).await,
            Err(AppError::BadRequest(_))
        ));

        assert!(matches!(
            process_upload(&storage, None, None).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(storage.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_many_checks_all_before_storing() {
        let storage = MemoryStorage::new();
        let mut bad = png("bad.bmp");
        bad.content_type = "image/bmp".into();

        let result = process_upload_many(&storage, None, vec![png("ok.png"), bad]).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(storage.objects.lock().unwrap().is_empty());

        let too_many = (0..11).map(|i| png(&format!("{i}.png"))).collect();
        assert!(matches!(
            process_upload_many(&storage, None, too_many).await,
            Err(AppError::BadRequest(_))
        ));

        let stored = process_upload_many(&storage, Some("gallery"), vec![png("1.png"), png("2.png")])
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(storage.objects.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let storage = MemoryStorage::new();
        storage.put_object("gallery/", Vec::new(), "application/x-directory").await.unwrap();
        storage.put_object("gallery/1-a.png", vec![1, 2, 3], "image/png").await.unwrap();
        storage.put_object("gallery/2-b.png", vec![1], "image/png").await.unwrap();
        storage.put_object("hero/3-c.png", vec![1], "image/png").await.unwrap();

        let listed = process_list(&storage, Some("gallery"), Some("abc")).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].key, "gallery/1-a.png");
        assert_eq!(listed[0].size, Some(3));
        assert_eq!(listed[0].url, "https://bucket.test/gallery/1-a.png");

        process_delete(&storage, Some("gallery/1-a.png")).await.unwrap();
        let listed = process_list(&storage, Some("gallery"), Some("10")).await.unwrap();
        assert_eq!(listed.len(), 1);

        match process_delete(&storage, Some("  ")).await.unwrap_err() {
            AppError::BadRequest(msg) => assert!(msg.contains("key is required")),
            other => panic!("Expected BadRequest error, got: {:?}", other),
        }
    }
}
