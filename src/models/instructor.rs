use std::fmt;

use bson::oid::ObjectId;
use bson::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::bson_serde::{bson_serializer_options, object_id, opt_timestamp, timestamp};
use crate::models::entity::{clean_list, non_blank, trimmed, Entity};

/// Teaching department an instructor belongs to. Ordering is per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Leader,
    Acting,
    Musical,
    Dance,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Leader => "leader",
            Category::Acting => "acting",
            Category::Musical => "musical",
            Category::Dance => "dance",
        }
    }

    /// Parse a category from a query string value (case-insensitive).
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "leader" => Some(Category::Leader),
            "acting" => Some(Category::Acting),
            "musical" => Some(Category::Musical),
            "dance" => Some(Category::Dance),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A titled bullet list on the instructor profile page ("Career", "Awards").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailSection {
    pub title: String,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instructor {
    #[serde(rename = "_id", with = "object_id")]
    pub id: ObjectId,
    pub name: String,
    pub position: String,
    pub education: String,
    pub category: Category,
    #[serde(default)]
    pub profile_images: Vec<String>,
    #[serde(default)]
    pub detail_sections: Vec<DetailSection>,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
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

fn active_by_default() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorInput {
    pub name: Option<String>,
    pub position: Option<String>,
    pub education: Option<String>,
    pub category: Option<Category>,
    pub profile_images: Option<Vec<String>>,
    pub detail_sections: Option<Vec<DetailSection>>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

fn clean_sections(sections: Vec<DetailSection>) -> Vec<DetailSection> {
    sections
        .into_iter()
        .filter_map(|section| {
            let title = non_blank(Some(section.title))?;
            Some(DetailSection {
                title,
                items: clean_list(section.items),
            })
        })
        .collect()
}

impl Entity for Instructor {
    const COLLECTION: &'static str = "instructors";
    const LABEL: &'static str = "Instructor";
    const KEYWORD_FIELDS: &'static [&'static str] = &["name"];
    const SUMMARY_FIELDS: &'static [&'static str] = &[
        "name",
        "position",
        "education",
        "category",
        "profileImages",
        "order",
    ];

    type Draft = InstructorInput;
    type Patch = InstructorInput;

    fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Builds the record with `order` 0; the caller assigns the real slot.
    fn from_draft(draft: InstructorInput, now: DateTime<Utc>) -> Result<Self, AppError> {
        let (Some(name), Some(position), Some(education), Some(category)) = (
            non_blank(draft.name),
            non_blank(draft.position),
            non_blank(draft.education),
            draft.category,
        ) else {
            return Err(AppError::BadRequest(
                "Name, position, education and category are required".into(),
            ));
        };
        Ok(Self {
            id: ObjectId::new(),
            name,
            position,
            education,
            category,
            profile_images: clean_list(draft.profile_images.unwrap_or_default()),
            detail_sections: clean_sections(draft.detail_sections.unwrap_or_default()),
            order: draft.order.unwrap_or(0),
            is_active: draft.is_active.unwrap_or(true),
            view_count: 0,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn patch_fields(patch: InstructorInput) -> Result<Document, AppError> {
        let mut fields = Document::new();
        if let Some(name) = non_blank(patch.name) {
            fields.insert("name", name);
        }
        if let Some(position) = non_blank(patch.position) {
            fields.insert("position", position);
        }
        if let Some(education) = trimmed(patch.education) {
            fields.insert("education", education);
        }
        if let Some(category) = patch.category {
            fields.insert("category", category.as_str());
        }
        if let Some(images) = patch.profile_images {
            fields.insert("profileImages", clean_list(images));
        }
        if let Some(sections) = patch.detail_sections {
            let sections = bson::to_bson_with_options(
                &clean_sections(sections),
                bson_serializer_options(),
            )
            .map_err(|e| AppError::Internal(format!("Failed to encode detail sections: {e}")))?;
            fields.insert("detailSections", sections);
        }
        if let Some(order) = patch.order {
            fields.insert("order", order);
        }
        if let Some(is_active) = patch.is_active {
            fields.insert("isActive", is_active);
        }
        Ok(fields)
    }
}
