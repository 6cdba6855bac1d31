//! Lifecycle operations shared by every record kind.

use bson::oid::ObjectId;
use chrono::Utc;

use crate::api::response::{ListParams, Pagination};
use crate::db::records::{ListQuery, PageRequest, RecordRepository, Scope, Transition};
use crate::error::AppError;
use crate::models::entity::Entity;
use crate::models::posts::{Gallery, Notice, Passer, Resource};

/// One page of records with its pagination metadata.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// How a record kind turns admin list parameters into a query.
///
/// The default searches `KEYWORD_FIELDS` and applies the `createdAt` range.
pub trait Listing: Entity {
    fn admin_query(params: &ListParams) -> Result<ListQuery, AppError> {
        Ok(ListQuery::new(Scope::Active)
            .keyword(Self::KEYWORD_FIELDS, params.keyword.as_deref())
            .created_within(params.date_range()?))
    }
}

impl Listing for Notice {}
impl Listing for Gallery {}
impl Listing for Passer {}
impl Listing for Resource {}

async fn fetch_page<T: Entity>(
    repo: &dyn RecordRepository<T>,
    query: ListQuery,
    params: &ListParams,
    default_limit: u64,
) -> Result<Page<T>, AppError> {
    let page = params.page_request(default_limit);
    let (items, total) = repo.find_page(&query.paginate(page)).await?;
    Ok(Page {
        items,
        pagination: Pagination::new(page, total),
    })
}

/// Newest active records first.
pub async fn process_public_list<T: Entity>(
    repo: &dyn RecordRepository<T>,
    params: &ListParams,
) -> Result<Page<T>, AppError> {
    fetch_page(repo, ListQuery::new(Scope::Active), params, T::PUBLIC_PAGE_SIZE).await
}

pub async fn process_admin_list<T: Listing>(
    repo: &dyn RecordRepository<T>,
    params: &ListParams,
) -> Result<Page<T>, AppError> {
    fetch_page(repo, T::admin_query(params)?, params, PageRequest::DEFAULT_LIMIT).await
}

/// Soft-deleted records, most recently deleted first.
pub async fn process_deleted_list<T: Entity>(
    repo: &dyn RecordRepository<T>,
    params: &ListParams,
) -> Result<Page<T>, AppError> {
    fetch_page(repo, ListQuery::new(Scope::Deleted), params, PageRequest::DEFAULT_LIMIT).await
}

/// Fetch an active record and count the view.
pub async fn process_public_detail<T: Entity>(
    repo: &dyn RecordRepository<T>,
    id: &ObjectId,
) -> Result<T, AppError> {
    repo.find_and_increment_views(id, &[])
        .await?
        .ok_or_else(|| AppError::not_found(T::LABEL))
}

/// Fetch an active record without counting a view.
pub async fn process_admin_detail<T: Entity>(
    repo: &dyn RecordRepository<T>,
    id: &ObjectId,
) -> Result<T, AppError> {
    repo.find_by_id(id, Scope::Active)
        .await?
        .ok_or_else(|| AppError::not_found(T::LABEL))
}

pub async fn process_create<T: Entity>(
    repo: &dyn RecordRepository<T>,
    draft: T::Draft,
) -> Result<T, AppError> {
    let record = T::from_draft(draft, Utc::now())?;
    repo.insert(&record).await?;
    tracing::info!(kind = T::LABEL, id = %record.id(), "record created");
    Ok(record)
}

/// Apply the fields present in the patch to an active record.
pub async fn process_update<T: Entity>(
    repo: &dyn RecordRepository<T>,
    id: &ObjectId,
    patch: T::Patch,
) -> Result<T, AppError> {
    let fields = T::patch_fields(patch)?;
    repo.find_by_id(id, Scope::Active)
        .await?
        .ok_or_else(|| AppError::not_found(T::LABEL))?
        .check_update(&fields)?;
    repo.update(id, fields)
        .await?
        .ok_or_else(|| AppError::not_found(T::LABEL))
}

pub async fn process_soft_delete<T: Entity>(
    repo: &dyn RecordRepository<T>,
    id: &ObjectId,
) -> Result<T, AppError> {
    let record = repo
        .soft_delete(id)
        .await?
        .ok_or_else(|| AppError::not_found(T::LABEL))?;
    tracing::info!(kind = T::LABEL, %id, "record moved to trash");
    Ok(record)
}

pub async fn process_restore<T: Entity>(
    repo: &dyn RecordRepository<T>,
    id: &ObjectId,
) -> Result<T, AppError> {
    repo.restore(id)
        .await?
        .ok_or_else(|| AppError::not_found(T::LABEL))
}

/// Remove a record for good. Only records already in the trash qualify.
pub async fn process_permanent_delete<T: Entity>(
    repo: &dyn RecordRepository<T>,
    id: &ObjectId,
) -> Result<(), AppError> {
    if !repo.permanent_delete(id).await? {
        return Err(AppError::not_found(T::LABEL));
    }
    tracing::info!(kind = T::LABEL, %id, "record permanently deleted");
    Ok(())
}

/// Apply a transition to a batch of ids and report how many changed.
///
/// Ids that are malformed or not in the transition's source state are
/// skipped; an empty batch is rejected.
pub async fn process_bulk<T: Entity>(
    repo: &dyn RecordRepository<T>,
    raw_ids: &[String],
    transition: Transition,
) -> Result<u64, AppError> {
    if raw_ids.is_empty() {
        return Err(AppError::BadRequest("Select at least one item".into()));
    }

    let ids: Vec<ObjectId> = raw_ids
        .iter()
        .filter_map(|raw| ObjectId::parse_str(raw.trim()).ok())
        .collect();
    if ids.is_empty() {
        return Ok(0);
    }

    let count = repo.bulk(&ids, transition).await?;
    tracing::info!(kind = T::LABEL, ?transition, requested = ids.len(), count, "bulk operation");
    Ok(count)
}
