//! The four board-style record kinds: notices, resources, gallery items and
//! passer (alumni) stories.

use bson::oid::ObjectId;
use bson::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::bson_serde::{object_id, opt_timestamp, timestamp};
use crate::models::entity::{check_length, clean_list, non_blank, trimmed, Entity, TITLE_MAX_CHARS};

/// A notice board post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    #[serde(rename = "_id", with = "object_id")]
    pub id: ObjectId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// A downloadable resource post. Same shape as [`Notice`], own collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(rename = "_id", with = "object_id")]
    pub id: ObjectId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Create / update body shared by notices and resources.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// A gallery picture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gallery {
    #[serde(rename = "_id", with = "object_id")]
    pub id: ObjectId,
    pub title: String,
    pub image_url: String,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryInput {
    pub title: Option<String>,
    pub image_url: Option<String>,
}

/// An alumni success story with a thumbnail and a picture set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passer {
    #[serde(rename = "_id", with = "object_id")]
    pub id: ObjectId,
    pub title: String,
    pub thumbnail_url: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasserInput {
    pub title: Option<String>,
    pub thumbnail_url: Option<String>,
    pub image_urls: Option<Vec<String>>,
}

/// Validated fields of an article draft.
fn article_draft(input: ArticleInput) -> Result<(String, String, String), AppError> {
    let (Some(title), Some(content)) = (non_blank(input.title), non_blank(input.content)) else {
        return Err(AppError::BadRequest("Title and content are required".into()));
    };
    check_length("Title", &title, TITLE_MAX_CHARS)?;
    Ok((title, content, trimmed(input.thumbnail_url).unwrap_or_default()))
}

fn article_patch(input: ArticleInput) -> Result<Document, AppError> {
    let mut fields = Document::new();
    if let Some(title) = non_blank(input.title) {
        check_length("Title", &title, TITLE_MAX_CHARS)?;
        fields.insert("title", title);
    }
    if let Some(content) = non_blank(input.content) {
        fields.insert("content", content);
    }
    if let Some(thumbnail_url) = trimmed(input.thumbnail_url) {
        fields.insert("thumbnailUrl", thumbnail_url);
    }
    Ok(fields)
}

impl Entity for Notice {
    const COLLECTION: &'static str = "notices";
    const LABEL: &'static str = "Notice";
    const SUMMARY_FIELDS: &'static [&'static str] =
        &["title", "thumbnailUrl", "viewCount", "createdAt"];

    type Draft = ArticleInput;
    type Patch = ArticleInput;

    fn id(&self) -> &ObjectId {
        &self.id
    }

    fn from_draft(draft: ArticleInput, now: DateTime<Utc>) -> Result<Self, AppError> {
        let (title, content, thumbnail_url) = article_draft(draft)?;
        Ok(Self {
            id: ObjectId::new(),
            title,
            content,
            thumbnail_url,
            view_count: 0,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn patch_fields(patch: ArticleInput) -> Result<Document, AppError> {
        article_patch(patch)
    }
}

impl Entity for Resource {
    const COLLECTION: &'static str = "resources";
    const LABEL: &'static str = "Resource";
    const SUMMARY_FIELDS: &'static [&'static str] =
        &["title", "thumbnailUrl", "viewCount", "createdAt"];

    type Draft = ArticleInput;
    type Patch = ArticleInput;

    fn id(&self) -> &ObjectId {
        &self.id
    }

    fn from_draft(draft: ArticleInput, now: DateTime<Utc>) -> Result<Self, AppError> {
        let (title, content, thumbnail_url) = article_draft(draft)?;
        Ok(Self {
            id: ObjectId::new(),
            title,
            content,
            thumbnail_url,
            view_count: 0,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn patch_fields(patch: ArticleInput) -> Result<Document, AppError> {
        article_patch(patch)
    }
}

impl Entity for Gallery {
    const COLLECTION: &'static str = "galleries";
    const LABEL: &'static str = "Gallery item";
    const SUMMARY_FIELDS: &'static [&'static str] =
        &["title", "imageUrl", "viewCount", "createdAt"];
    const PUBLIC_PAGE_SIZE: u64 = 12;

    type Draft = GalleryInput;
    type Patch = GalleryInput;

    fn id(&self) -> &ObjectId {
        &self.id
    }

    fn from_draft(draft: GalleryInput, now: DateTime<Utc>) -> Result<Self, AppError> {
        let (Some(title), Some(image_url)) = (non_blank(draft.title), non_blank(draft.image_url))
        else {
            return Err(AppError::BadRequest("Title and image URL are required".into()));
        };
        check_length("Title", &title, TITLE_MAX_CHARS)?;
        Ok(Self {
            id: ObjectId::new(),
            title,
            image_url,
            view_count: 0,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn patch_fields(patch: GalleryInput) -> Result<Document, AppError> {
        let mut fields = Document::new();
        if let Some(title) = non_blank(patch.title) {
            check_length("Title", &title, TITLE_MAX_CHARS)?;
            fields.insert("title", title);
        }
        if let Some(image_url) = non_blank(patch.image_url) {
            fields.insert("imageUrl", image_url);
        }
        Ok(fields)
    }
}

impl Entity for Passer {
    const COLLECTION: &'static str = "passers";
    const LABEL: &'static str = "Passer";
    const SUMMARY_FIELDS: &'static [&'static str] =
        &["title", "thumbnailUrl", "viewCount", "createdAt"];

    type Draft = PasserInput;
    type Patch = PasserInput;

    fn id(&self) -> &ObjectId {
        &self.id
    }

    fn from_draft(draft: PasserInput, now: DateTime<Utc>) -> Result<Self, AppError> {
        let (Some(title), Some(thumbnail_url)) =
            (non_blank(draft.title), non_blank(draft.thumbnail_url))
        else {
            return Err(AppError::BadRequest(
                "Title and thumbnail URL are required".into(),
            ));
        };
        check_length("Title", &title, TITLE_MAX_CHARS)?;
        Ok(Self {
            id: ObjectId::new(),
            title,
            thumbnail_url,
            image_urls: clean_list(draft.image_urls.unwrap_or_default()),
            view_count: 0,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn patch_fields(patch: PasserInput) -> Result<Document, AppError> {
        let mut fields = Document::new();
        if let Some(title) = non_blank(patch.title) {
            check_length("Title", &title, TITLE_MAX_CHARS)?;
            fields.insert("title", title);
        }
        if let Some(thumbnail_url) = non_blank(patch.thumbnail_url) {
            fields.insert("thumbnailUrl", thumbnail_url);
        }
        if let Some(image_urls) = patch.image_urls {
            fields.insert("imageUrls", clean_list(image_urls));
        }
        Ok(fields)
    }
}
