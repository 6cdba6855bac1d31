use bson::oid::ObjectId;
use bson::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::bson_serde::{format_timestamp, object_id, opt_timestamp, timestamp};
use crate::models::entity::{check_length, non_blank, Entity, TITLE_MAX_CHARS};

pub const WRITER_ID_MAX_CHARS: usize = 50;
pub const PASSWORD_MIN_CHARS: usize = 4;
/// Author recorded on staff replies.
pub const STAFF_AUTHOR: &str = "관리자";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BoardType {
    #[default]
    Inquiry,
    Consultation,
}

impl BoardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardType::Inquiry => "INQUIRY",
            BoardType::Consultation => "CONSULTATION",
        }
    }

    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "INQUIRY" => Some(BoardType::Inquiry),
            "CONSULTATION" => Some(BoardType::Consultation),
            _ => None,
        }
    }
}

/// Whether staff has replied to the post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsultationStatus {
    #[default]
    Pending,
    Answered,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Pending => "PENDING",
            ConsultationStatus::Answered => "ANSWERED",
        }
    }
}

/// A reply attached to a consultation post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id", with = "object_id")]
    pub id: ObjectId,
    pub author: String,
    pub content: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn staff(content: String, now: DateTime<Utc>) -> Self {
        Self {
            id: ObjectId::new(),
            author: STAFF_AUTHOR.to_string(),
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A question posted on the public inquiry / consultation boards.
///
/// `password` holds an Argon2 PHC string (or legacy plaintext) and is
/// stripped from every rendered representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    #[serde(rename = "_id", with = "object_id")]
    pub id: ObjectId,
    pub writer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub board_type: BoardType,
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default)]
    pub status: ConsultationStatus,
    #[serde(default)]
    pub comments: Vec<Comment>,
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

impl Consultation {
    /// The only view of a secret post given out before its password is checked.
    pub fn secret_stub(&self) -> serde_json::Value {
        serde_json::json!({
            "_id": self.id.to_hex(),
            "title": self.title,
            "writerId": self.writer_id,
            "isSecret": true,
            "status": self.status.as_str(),
            "createdAt": format_timestamp(&self.created_at),
            "needPassword": true,
        })
    }
}

/// Body of a public `POST /api/consultations`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationDraft {
    pub writer_id: Option<String>,
    pub password: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub board_type: Option<BoardType>,
    pub is_secret: Option<bool>,
}

/// Body of an admin `PATCH /api/admin/consultations/{id}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_secret: Option<bool>,
    pub status: Option<ConsultationStatus>,
}

impl Entity for Consultation {
    const COLLECTION: &'static str = "consultations";
    const LABEL: &'static str = "Consultation";
    const SUMMARY_FIELDS: &'static [&'static str] = &[
        "writerId",
        "title",
        "boardType",
        "isSecret",
        "status",
        "comments",
        "viewCount",
        "createdAt",
        "updatedAt",
    ];

    type Draft = ConsultationDraft;
    type Patch = ConsultationPatch;

    fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Validates the draft; the password is kept as typed and must be hashed
    /// by the caller before the record is stored.
    fn from_draft(draft: ConsultationDraft, now: DateTime<Utc>) -> Result<Self, AppError> {
        let (Some(writer_id), Some(title), Some(content)) = (
            non_blank(draft.writer_id),
            non_blank(draft.title),
            non_blank(draft.content),
        ) else {
            return Err(AppError::BadRequest(
                "Writer id, title and content are required".into(),
            ));
        };
        check_length("Writer id", &writer_id, WRITER_ID_MAX_CHARS)?;
        check_length("Title", &title, TITLE_MAX_CHARS)?;

        let is_secret = draft.is_secret.unwrap_or(false);
        let password = draft.password.filter(|p| !p.is_empty());
        match &password {
            None if is_secret => {
                return Err(AppError::BadRequest(
                    "A password is required for secret posts".into(),
                ));
            }
            Some(p) if p.chars().count() < PASSWORD_MIN_CHARS => {
                return Err(AppError::BadRequest(format!(
                    "Password must be at least {PASSWORD_MIN_CHARS} characters"
                )));
            }
            _ => {}
        }

        Ok(Self {
            id: ObjectId::new(),
            writer_id,
            password,
            title,
            content,
            board_type: draft.board_type.unwrap_or_default(),
            is_secret,
            status: ConsultationStatus::Pending,
            comments: Vec::new(),
            view_count: 0,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn patch_fields(patch: ConsultationPatch) -> Result<Document, AppError> {
        let mut fields = Document::new();
        if let Some(title) = non_blank(patch.title) {
            check_length("Title", &title, TITLE_MAX_CHARS)?;
            fields.insert("title", title);
        }
        if let Some(content) = non_blank(patch.content) {
            fields.insert("content", content);
        }
        if let Some(is_secret) = patch.is_secret {
            fields.insert("isSecret", is_secret);
        }
        if let Some(status) = patch.status {
            fields.insert("status", status.as_str());
        }
        Ok(fields)
    }

    /// A post without a password cannot be made secret: nobody could open it.
    fn check_update(&self, fields: &Document) -> Result<(), AppError> {
        if matches!(fields.get_bool("isSecret"), Ok(true)) && self.password.is_none() {
            return Err(AppError::BadRequest(
                "A password is required for secret posts".into(),
            ));
        }
        Ok(())
    }

    fn render(&self) -> Result<serde_json::Value, AppError> {
        let mut value = serde_json::to_value(self)
            .map_err(|e| AppError::Internal(format!("Failed to render consultation: {e}")))?;
        if let Some(object) = value.as_object_mut() {
            object.remove("password");
        }
        Ok(value)
    }
}
