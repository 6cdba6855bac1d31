//! Route sets shared by every record kind.

use std::sync::Arc;

use axum::extract::{FromRef, Path, State};
use axum::routing::{delete, get, post};
use axum::Router;
use serde_json::{json, Value};

use crate::api::response::{only, parse_id, ApiResponse, IdsBody, JsonBody, ListParams, QueryParams};
use crate::app::AppState;
use crate::db::records::{RecordRepository, Transition};
use crate::error::AppError;
use crate::models::entity::Entity;
use crate::services::records::{
    process_admin_detail, process_admin_list, process_bulk, process_create, process_deleted_list,
    process_permanent_delete, process_public_detail, process_public_list, process_restore,
    process_soft_delete, process_update, Listing, Page,
};

type Records<T> = State<Arc<dyn RecordRepository<T>>>;

/// Render every record in full.
pub fn render_all<T: Entity>(items: &[T]) -> Result<Vec<Value>, AppError> {
    items.iter().map(Entity::render).collect()
}

/// Render records reduced to their list-view fields.
pub fn render_summaries<T: Entity>(items: &[T]) -> Result<Vec<Value>, AppError> {
    items
        .iter()
        .map(|item| Ok(only(item.render()?, T::SUMMARY_FIELDS)))
        .collect()
}

/// A full page response with its pagination block.
pub fn page_response<T: Entity>(page: Page<T>) -> Result<ApiResponse, AppError> {
    Ok(ApiResponse::ok(Value::from(render_all(&page.items)?)).with_pagination(page.pagination))
}

async fn public_list<T: Entity>(
    State(repo): Records<T>,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<ApiResponse, AppError> {
    let page = process_public_list(repo.as_ref(), &params).await?;
    let items = render_summaries(&page.items)?;
    Ok(ApiResponse::ok(Value::from(items)).with_pagination(page.pagination))
}

async fn public_detail<T: Entity>(
    State(repo): Records<T>,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    let id = parse_id(&id, T::LABEL)?;
    let record = process_public_detail(repo.as_ref(), &id).await?;
    Ok(ApiResponse::ok(record.render()?))
}

async fn admin_list<T: Listing>(
    State(repo): Records<T>,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<ApiResponse, AppError> {
    page_response(process_admin_list(repo.as_ref(), &params).await?)
}

async fn deleted_list<T: Entity>(
    State(repo): Records<T>,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<ApiResponse, AppError> {
    page_response(process_deleted_list(repo.as_ref(), &params).await?)
}

async fn admin_detail<T: Entity>(
    State(repo): Records<T>,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    let id = parse_id(&id, T::LABEL)?;
    let record = process_admin_detail(repo.as_ref(), &id).await?;
    Ok(ApiResponse::ok(record.render()?))
}

pub(crate) async fn create<T: Entity>(
    State(repo): Records<T>,
    JsonBody(draft): JsonBody<T::Draft>,
) -> Result<ApiResponse, AppError> {
    let record = process_create(repo.as_ref(), draft).await?;
    Ok(ApiResponse::created(record.render()?).with_message(format!("{} created", T::LABEL)))
}

async fn update<T: Entity>(
    State(repo): Records<T>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<T::Patch>,
) -> Result<ApiResponse, AppError> {
    let id = parse_id(&id, T::LABEL)?;
    let record = process_update(repo.as_ref(), &id, patch).await?;
    Ok(ApiResponse::ok(record.render()?).with_message(format!("{} updated", T::LABEL)))
}

async fn soft_delete<T: Entity>(
    State(repo): Records<T>,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    let id = parse_id(&id, T::LABEL)?;
    process_soft_delete(repo.as_ref(), &id).await?;
    Ok(ApiResponse::message_only(format!("{} deleted", T::LABEL)))
}

async fn restore<T: Entity>(
    State(repo): Records<T>,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    let id = parse_id(&id, T::LABEL)?;
    let record = process_restore(repo.as_ref(), &id).await?;
    Ok(ApiResponse::ok(record.render()?).with_message(format!("{} restored", T::LABEL)))
}

async fn permanent_delete<T: Entity>(
    State(repo): Records<T>,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    let id = parse_id(&id, T::LABEL)?;
    process_permanent_delete(repo.as_ref(), &id).await?;
    Ok(ApiResponse::message_only(format!("{} permanently deleted", T::LABEL)))
}

async fn bulk<T: Entity>(
    repo: &dyn RecordRepository<T>,
    body: IdsBody,
    transition: Transition,
) -> Result<ApiResponse, AppError> {
    let count = process_bulk(repo, &body.ids, transition).await?;
    let verb = match transition {
        Transition::SoftDelete => "deleted",
        Transition::Restore => "restored",
        Transition::Purge => "permanently deleted",
    };
    Ok(ApiResponse::ok(json!({ "count": count })).with_message(format!("{count} items {verb}")))
}

async fn bulk_delete<T: Entity>(
    State(repo): Records<T>,
    JsonBody(body): JsonBody<IdsBody>,
) -> Result<ApiResponse, AppError> {
    bulk(repo.as_ref(), body, Transition::SoftDelete).await
}

async fn bulk_restore<T: Entity>(
    State(repo): Records<T>,
    JsonBody(body): JsonBody<IdsBody>,
) -> Result<ApiResponse, AppError> {
    bulk(repo.as_ref(), body, Transition::Restore).await
}

async fn bulk_permanent_delete<T: Entity>(
    State(repo): Records<T>,
    JsonBody(body): JsonBody<IdsBody>,
) -> Result<ApiResponse, AppError> {
    bulk(repo.as_ref(), body, Transition::Purge).await
}

/// `GET /` and `GET /{id}` for a public board.
pub fn public_routes<T: Entity>() -> Router<AppState>
where
    Arc<dyn RecordRepository<T>>: FromRef<AppState>,
{
    Router::new()
        .route("/", get(public_list::<T>))
        .route("/{id}", get(public_detail::<T>))
}

/// The admin lifecycle routes of one record kind, without create.
pub fn admin_routes<T: Listing>() -> Router<AppState>
where
    Arc<dyn RecordRepository<T>>: FromRef<AppState>,
{
    Router::new()
        .route("/", get(admin_list::<T>))
        .route("/deleted/list", get(deleted_list::<T>))
        .route(
            "/{id}",
            get(admin_detail::<T>)
                .patch(update::<T>)
                .delete(soft_delete::<T>),
        )
        .route("/{id}/restore", post(restore::<T>))
        .route("/{id}/permanent", delete(permanent_delete::<T>))
        .route("/bulk-delete", post(bulk_delete::<T>))
        .route("/bulk-restore", post(bulk_restore::<T>))
        .route("/bulk-permanent-delete", post(bulk_permanent_delete::<T>))
}

/// [`admin_routes`] plus `POST /`.
pub fn admin_crud_routes<T: Listing>() -> Router<AppState>
where
    Arc<dyn RecordRepository<T>>: FromRef<AppState>,
{
    admin_routes::<T>().route("/", post(create::<T>))
}
