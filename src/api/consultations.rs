use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Router;
use serde_json::{json, Value};

use crate::api::records::admin_routes;
use crate::api::response::{parse_id, ApiResponse, JsonBody, ListParams, QueryParams};
use crate::app::AppState;
use crate::db::consultation_repository::ConsultationRepository;
use crate::db::records::RecordRepository;
use crate::error::AppError;
use crate::models::consultation::{Consultation, ConsultationDraft};
use crate::models::entity::Entity;
use crate::services::consultations::{
    process_add_comment, process_author_delete, process_author_update, process_check_password,
    process_create_consultation, process_delete_comment, process_edit_comment,
    process_public_consultation, process_public_consultations, render_public_summaries,
    AuthorPatch, CommentInput, PasswordBody,
};

type Posts = State<Arc<dyn RecordRepository<Consultation>>>;
type Threads = State<Arc<dyn ConsultationRepository>>;

fn post_id(raw: &str) -> Result<bson::oid::ObjectId, AppError> {
    parse_id(raw, Consultation::LABEL)
}

async fn public_list(
    State(posts): Posts,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<ApiResponse, AppError> {
    let page = process_public_consultations(posts.as_ref(), &params).await?;
    let items = render_public_summaries(&page.items)?;
    Ok(ApiResponse::ok(Value::from(items)).with_pagination(page.pagination))
}

async fn public_detail(
    State(posts): Posts,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    let view = process_public_consultation(posts.as_ref(), &post_id(&id)?).await?;
    Ok(ApiResponse::ok(view.render()?))
}

async fn check_password(
    State(posts): Posts,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<PasswordBody>,
) -> Result<ApiResponse, AppError> {
    let post = process_check_password(posts.as_ref(), &post_id(&id)?, body).await?;
    Ok(ApiResponse::ok(post.render()?))
}

async fn create(
    State(posts): Posts,
    JsonBody(draft): JsonBody<ConsultationDraft>,
) -> Result<ApiResponse, AppError> {
    let post = process_create_consultation(posts.as_ref(), draft).await?;
    Ok(ApiResponse::created(json!({ "_id": post.id.to_hex() })).with_message("Consultation posted"))
}

async fn author_update(
    State(posts): Posts,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<AuthorPatch>,
) -> Result<ApiResponse, AppError> {
    process_author_update(posts.as_ref(), &post_id(&id)?, patch).await?;
    Ok(ApiResponse::message_only("Consultation updated"))
}

async fn author_delete(
    State(posts): Posts,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<PasswordBody>,
) -> Result<ApiResponse, AppError> {
    process_author_delete(posts.as_ref(), &post_id(&id)?, body).await?;
    Ok(ApiResponse::message_only("Consultation deleted"))
}

async fn add_comment(
    State(threads): Threads,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<CommentInput>,
) -> Result<ApiResponse, AppError> {
    let post = process_add_comment(threads.as_ref(), &post_id(&id)?, input).await?;
    Ok(ApiResponse::ok(post.render()?).with_message("Reply added"))
}

async fn edit_comment(
    State(threads): Threads,
    Path((id, comment_id)): Path<(String, String)>,
    JsonBody(input): JsonBody<CommentInput>,
) -> Result<ApiResponse, AppError> {
    let comment_id = parse_id(&comment_id, "Comment")?;
    let post = process_edit_comment(threads.as_ref(), &post_id(&id)?, &comment_id, input).await?;
    Ok(ApiResponse::ok(post.render()?).with_message("Reply updated"))
}

async fn delete_comment(
    State(threads): Threads,
    Path((id, comment_id)): Path<(String, String)>,
) -> Result<ApiResponse, AppError> {
    let comment_id = parse_id(&comment_id, "Comment")?;
    let post = process_delete_comment(threads.as_ref(), &post_id(&id)?, &comment_id).await?;
    Ok(ApiResponse::ok(post.render()?).with_message("Reply deleted"))
}

/// `/api/consultations`
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public_list).post(create))
        .route(
            "/{id}",
            get(public_detail).patch(author_update).delete(author_delete),
        )
        .route("/{id}/check-password", post(check_password))
}

/// `/api/admin/consultations`. Posts only come in through the public board.
pub fn admin_consultation_routes() -> Router<AppState> {
    admin_routes::<Consultation>()
        .route("/{id}/comments", post(add_comment))
        .route(
            "/{id}/comments/{comment_id}",
            patch(edit_comment).delete(delete_comment),
        )
}
