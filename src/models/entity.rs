use bson::oid::ObjectId;
use bson::Document;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppError;

/// Maximum length of every `title` field.
pub const TITLE_MAX_CHARS: usize = 200;

/// A soft-deletable record kind stored in its own MongoDB collection.
///
/// Every implementor carries the lifecycle fields `isDeleted`, `deletedAt`,
/// `viewCount`, `createdAt` and `updatedAt` in camelCase, which is what the
/// generic repository filters and updates on.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    /// MongoDB collection name.
    const COLLECTION: &'static str;

    /// Human-readable name used in response messages ("Notice not found").
    const LABEL: &'static str;

    /// Fields matched by the admin keyword search.
    const KEYWORD_FIELDS: &'static [&'static str] = &["title"];

    /// Fields kept in the public list view (`_id` is always kept).
    const SUMMARY_FIELDS: &'static [&'static str];

    /// Default page size of the public list.
    const PUBLIC_PAGE_SIZE: u64 = 10;

    /// Request body accepted on create.
    type Draft: DeserializeOwned + Send + 'static;

    /// Request body accepted on partial update.
    type Patch: DeserializeOwned + Send + 'static;

    fn id(&self) -> &ObjectId;

    /// Validate a draft and build a fresh, active record.
    fn from_draft(draft: Self::Draft, now: DateTime<Utc>) -> Result<Self, AppError>;

    /// Validate a patch and turn it into the fields to `$set`.
    fn patch_fields(patch: Self::Patch) -> Result<Document, AppError>;

    /// Reject `$set` fields that would leave this record in an invalid state.
    fn check_update(&self, _fields: &Document) -> Result<(), AppError> {
        Ok(())
    }

    /// JSON representation sent to clients.
    fn render(&self) -> Result<serde_json::Value, AppError> {
        serde_json::to_value(self)
            .map_err(|e| AppError::Internal(format!("Failed to render {}: {e}", Self::LABEL)))
    }
}

/// Trim a value and drop it when blank.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim a value, keeping empty strings (used for fields that may be cleared).
pub fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

/// Reject values longer than `max` characters.
pub fn check_length(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::BadRequest(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Trim every element of a URL list and drop blank ones.
pub fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|v| non_blank(Some(v)))
        .collect()
}
