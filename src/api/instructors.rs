use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::records::{admin_routes, render_all};
use crate::api::response::{parse_id, ApiResponse, JsonBody, QueryParams};
use crate::app::AppState;
use crate::db::instructor_repository::{Direction, InstructorRepository};
use crate::db::records::RecordRepository;
use crate::error::AppError;
use crate::models::entity::Entity;
use crate::models::instructor::{Instructor, InstructorInput};
use crate::services::ordering::{
    process_create_instructor, process_move, process_public_instructor,
    process_public_instructors, process_reorder, ReorderRequest,
};

#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

async fn public_list(
    State(records): State<Arc<dyn RecordRepository<Instructor>>>,
    QueryParams(query): QueryParams<CategoryQuery>,
) -> Result<ApiResponse, AppError> {
    let instructors = process_public_instructors(records.as_ref(), query.category.as_deref()).await?;
    Ok(ApiResponse::ok(Value::from(render_all(&instructors)?)))
}

async fn public_detail(
    State(records): State<Arc<dyn RecordRepository<Instructor>>>,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    let id = parse_id(&id, Instructor::LABEL)?;
    let instructor = process_public_instructor(records.as_ref(), &id).await?;
    Ok(ApiResponse::ok(instructor.render()?))
}

async fn create(
    State(records): State<Arc<dyn RecordRepository<Instructor>>>,
    State(ordering): State<Arc<dyn InstructorRepository>>,
    JsonBody(draft): JsonBody<InstructorInput>,
) -> Result<ApiResponse, AppError> {
    let instructor = process_create_instructor(records.as_ref(), ordering.as_ref(), draft).await?;
    Ok(ApiResponse::created(instructor.render()?).with_message("Instructor created"))
}

async fn reorder(
    State(ordering): State<Arc<dyn InstructorRepository>>,
    JsonBody(request): JsonBody<ReorderRequest>,
) -> Result<ApiResponse, AppError> {
    let count = process_reorder(ordering.as_ref(), request).await?;
    Ok(ApiResponse::ok(json!({ "count": count })).with_message("Instructor order updated"))
}

async fn shift(
    records: Arc<dyn RecordRepository<Instructor>>,
    ordering: Arc<dyn InstructorRepository>,
    id: String,
    direction: Direction,
) -> Result<ApiResponse, AppError> {
    let id = parse_id(&id, Instructor::LABEL)?;
    process_move(records.as_ref(), ordering.as_ref(), &id, direction).await?;
    Ok(ApiResponse::message_only("Instructor moved"))
}

async fn move_up(
    State(records): State<Arc<dyn RecordRepository<Instructor>>>,
    State(ordering): State<Arc<dyn InstructorRepository>>,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    shift(records, ordering, id, Direction::Up).await
}

async fn move_down(
    State(records): State<Arc<dyn RecordRepository<Instructor>>>,
    State(ordering): State<Arc<dyn InstructorRepository>>,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    shift(records, ordering, id, Direction::Down).await
}

/// `/api/instructors`
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public_list))
        .route("/{id}", get(public_detail))
}

/// `/api/admin/instructors`
pub fn admin_instructor_routes() -> Router<AppState> {
    admin_routes::<Instructor>()
        .route("/", post(create))
        .route("/reorder", put(reorder))
        .route("/{id}/move-up", put(move_up))
        .route("/{id}/move-down", put(move_down))
}
