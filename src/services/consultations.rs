//! Public inquiry board: password-gated secret posts, author edits and the
//! staff comment thread.

use bson::oid::ObjectId;
use chrono::Utc;
use serde::Deserialize;

use crate::api::response::{only, ListParams, Pagination};
use crate::auth::password::{hash_password, verify_stored_password};
use crate::db::consultation_repository::ConsultationRepository;
use crate::db::records::{FieldValue, ListQuery, RecordRepository, Scope};
use crate::error::AppError;
use crate::models::consultation::{
    BoardType, Comment, Consultation, ConsultationDraft, ConsultationPatch, ConsultationStatus,
};
use crate::models::entity::{non_blank, Entity};
use crate::services::records::{Listing, Page};

/// Map a `searchType` value onto the field it searches.
fn search_field(search_type: Option<&str>) -> Option<&'static str> {
    match search_type.map(str::trim) {
        Some("title") => Some("title"),
        Some("content") => Some("content"),
        Some("writerId") => Some("writerId"),
        _ => None,
    }
}

fn keyword_filter(query: ListQuery, params: &ListParams) -> ListQuery {
    match search_field(params.search_type.as_deref()) {
        Some(field) => query.keyword(&[field], params.keyword.as_deref()),
        None => query,
    }
}

impl Listing for Consultation {
    /// `boardType=all` (or none) lists both boards.
    fn admin_query(params: &ListParams) -> Result<ListQuery, AppError> {
        let mut query = ListQuery::new(Scope::Active).created_within(params.date_range()?);
        if let Some(board) = params.board_type.as_deref().and_then(BoardType::from_str_ci) {
            query = query.equals("boardType", FieldValue::Text(board.as_str().into()));
        }
        Ok(keyword_filter(query, params))
    }
}

/// What a visitor gets for a post.
#[derive(Debug)]
pub enum ConsultationView {
    /// Secret post whose password has not been given.
    Locked(Consultation),
    Open(Consultation),
}

impl ConsultationView {
    pub fn render(&self) -> Result<serde_json::Value, AppError> {
        match self {
            ConsultationView::Locked(post) => Ok(post.secret_stub()),
            ConsultationView::Open(post) => post.render(),
        }
    }
}

/// Body of the author edit.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorPatch {
    pub password: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_secret: Option<bool>,
}

/// Body carrying only the post password.
#[derive(Debug, Default, Deserialize)]
pub struct PasswordBody {
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentInput {
    pub content: Option<String>,
}

fn comment_text(input: CommentInput) -> Result<String, AppError> {
    non_blank(input.content)
        .ok_or_else(|| AppError::BadRequest("Comment content is required".into()))
}

fn check_author(post: &Consultation, candidate: Option<&str>) -> Result<(), AppError> {
    match (post.password.as_deref(), candidate) {
        (Some(stored), Some(candidate)) if verify_stored_password(candidate, stored) => Ok(()),
        _ => Err(AppError::Auth("Password does not match".into())),
    }
}

async fn active_post(
    records: &dyn RecordRepository<Consultation>,
    id: &ObjectId,
) -> Result<Consultation, AppError> {
    records
        .find_by_id(id, Scope::Active)
        .await?
        .ok_or_else(|| AppError::not_found(Consultation::LABEL))
}

async fn count_view(
    records: &dyn RecordRepository<Consultation>,
    id: &ObjectId,
    conditions: &[(&'static str, FieldValue)],
) -> Result<Consultation, AppError> {
    records
        .find_and_increment_views(id, conditions)
        .await?
        .ok_or_else(|| AppError::not_found(Consultation::LABEL))
}

/// One board, newest first. The board defaults to inquiries.
pub async fn process_public_consultations(
    records: &dyn RecordRepository<Consultation>,
    params: &ListParams,
) -> Result<Page<Consultation>, AppError> {
    let board = params
        .board_type
        .as_deref()
        .and_then(BoardType::from_str_ci)
        .unwrap_or_default();
    let query = ListQuery::new(Scope::Active)
        .equals("boardType", FieldValue::Text(board.as_str().into()));
    let query = keyword_filter(query, params);

    let page = params.page_request(Consultation::PUBLIC_PAGE_SIZE);
    let (items, total) = records.find_page(&query.paginate(page)).await?;
    Ok(Page {
        items,
        pagination: Pagination::new(page, total),
    })
}

/// List view of a board. Replies to a secret post stay behind its password.
pub fn render_public_summaries(
    posts: &[Consultation],
) -> Result<Vec<serde_json::Value>, AppError> {
    posts
        .iter()
        .map(|post| {
            let mut summary = only(post.render()?, Consultation::SUMMARY_FIELDS);
            if post.is_secret {
                if let Some(object) = summary.as_object_mut() {
                    object.remove("comments");
                }
            }
            Ok(summary)
        })
        .collect()
}

/// Secret posts stay locked and are not counted; open posts count a view.
pub async fn process_public_consultation(
    records: &dyn RecordRepository<Consultation>,
    id: &ObjectId,
) -> Result<ConsultationView, AppError> {
    let post = active_post(records, id).await?;
    if post.is_secret {
        return Ok(ConsultationView::Locked(post));
    }
    let post = count_view(records, id, &[("isSecret", FieldValue::Flag(false))]).await?;
    Ok(ConsultationView::Open(post))
}

/// Unlock a post with its password. Only a successful check counts a view.
pub async fn process_check_password(
    records: &dyn RecordRepository<Consultation>,
    id: &ObjectId,
    body: PasswordBody,
) -> Result<Consultation, AppError> {
    let post = active_post(records, id).await?;
    check_author(&post, body.password.as_deref())?;
    count_view(records, id, &[]).await
}

/// Store a new post with its password hashed.
pub async fn process_create_consultation(
    records: &dyn RecordRepository<Consultation>,
    draft: ConsultationDraft,
) -> Result<Consultation, AppError> {
    let mut post = Consultation::from_draft(draft, Utc::now())?;
    if let Some(password) = post.password.take() {
        post.password = Some(hash_password(&password)?);
    }
    records.insert(&post).await?;
    tracing::info!(id = %post.id, board = post.board_type.as_str(), secret = post.is_secret, "consultation posted");
    Ok(post)
}

/// Author edit of title, content or secrecy, authorised by the post password.
pub async fn process_author_update(
    records: &dyn RecordRepository<Consultation>,
    id: &ObjectId,
    patch: AuthorPatch,
) -> Result<Consultation, AppError> {
    let post = active_post(records, id).await?;
    check_author(&post, patch.password.as_deref())?;

    let fields = Consultation::patch_fields(ConsultationPatch {
        title: patch.title,
        content: patch.content,
        is_secret: patch.is_secret,
        status: None,
    })?;
    records
        .update(id, fields)
        .await?
        .ok_or_else(|| AppError::not_found(Consultation::LABEL))
}

/// Author removal (to the trash), authorised by the post password.
pub async fn process_author_delete(
    records: &dyn RecordRepository<Consultation>,
    id: &ObjectId,
    body: PasswordBody,
) -> Result<(), AppError> {
    let post = active_post(records, id).await?;
    check_author(&post, body.password.as_deref())?;
    records
        .soft_delete(id)
        .await?
        .ok_or_else(|| AppError::not_found(Consultation::LABEL))?;
    tracing::info!(%id, "consultation deleted by author");
    Ok(())
}

/// Staff reply; the post becomes answered.
pub async fn process_add_comment(
    threads: &dyn ConsultationRepository,
    id: &ObjectId,
    input: CommentInput,
) -> Result<Consultation, AppError> {
    let comment = Comment::staff(comment_text(input)?, Utc::now());
    threads
        .push_comment(id, &comment)
        .await?
        .ok_or_else(|| AppError::not_found(Consultation::LABEL))
}

pub async fn process_edit_comment(
    threads: &dyn ConsultationRepository,
    id: &ObjectId,
    comment_id: &ObjectId,
    input: CommentInput,
) -> Result<Consultation, AppError> {
    let content = comment_text(input)?;
    threads
        .edit_comment(id, comment_id, &content)
        .await?
        .ok_or_else(|| AppError::NotFound("Consultation or comment not found".into()))
}

/// Remove a reply; a post left without replies goes back to pending.
pub async fn process_delete_comment(
    threads: &dyn ConsultationRepository,
    id: &ObjectId,
    comment_id: &ObjectId,
) -> Result<Consultation, AppError> {
    let post = threads
        .remove_comment(id, comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Consultation or comment not found".into()))?;

    if post.comments.is_empty() && post.status != ConsultationStatus::Pending {
        return threads
            .set_status(id, ConsultationStatus::Pending)
            .await?
            .ok_or_else(|| AppError::not_found(Consultation::LABEL));
    }
    Ok(post)
}
