//! Instructor ordering: slot assignment on create, explicit reorder and
//! single-step moves within a category.

use bson::oid::ObjectId;
use chrono::Utc;
use serde::Deserialize;

use crate::api::response::ListParams;
use crate::db::instructor_repository::{Direction, InstructorRepository};
use crate::db::records::{FieldValue, ListQuery, RecordRepository, Scope, SortKey};
use crate::error::AppError;
use crate::models::entity::Entity;
use crate::models::instructor::{Category, Instructor, InstructorInput};
use crate::services::records::Listing;

const CATEGORY_ORDER: [SortKey; 2] = [SortKey::asc("category"), SortKey::asc("order")];

fn category_filter(query: ListQuery, raw: Option<&str>) -> ListQuery {
    match raw.and_then(Category::from_str_ci) {
        Some(category) => query.equals("category", FieldValue::Text(category.as_str().into())),
        None => query,
    }
}

impl Listing for Instructor {
    fn admin_query(params: &ListParams) -> Result<ListQuery, AppError> {
        let query = ListQuery::new(Scope::Active)
            .keyword(Self::KEYWORD_FIELDS, params.keyword.as_deref())
            .sort_by(CATEGORY_ORDER.to_vec());
        Ok(category_filter(query, params.category.as_deref()))
    }
}

/// One entry of a reorder request.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderEntry {
    pub id: String,
    pub order: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReorderRequest {
    pub orders: Option<Vec<OrderEntry>>,
}

/// Active instructors visible on the site, grouped by category then order.
/// An unknown category is ignored rather than rejected.
pub async fn process_public_instructors(
    records: &dyn RecordRepository<Instructor>,
    category: Option<&str>,
) -> Result<Vec<Instructor>, AppError> {
    let query = ListQuery::new(Scope::Active)
        .equals("isActive", FieldValue::Flag(true))
        .sort_by(CATEGORY_ORDER.to_vec());
    let (items, _) = records.find_page(&category_filter(query, category)).await?;
    Ok(items)
}

/// Public profile; hidden instructors are reported as missing.
pub async fn process_public_instructor(
    records: &dyn RecordRepository<Instructor>,
    id: &ObjectId,
) -> Result<Instructor, AppError> {
    records
        .find_and_increment_views(id, &[("isActive", FieldValue::Flag(true))])
        .await?
        .ok_or_else(|| AppError::not_found(Instructor::LABEL))
}

/// Create an instructor in the slot after the last one of its category.
pub async fn process_create_instructor(
    records: &dyn RecordRepository<Instructor>,
    ordering: &dyn InstructorRepository,
    draft: InstructorInput,
) -> Result<Instructor, AppError> {
    let mut instructor = Instructor::from_draft(draft, Utc::now())?;
    instructor.order = match ordering.max_order(instructor.category).await? {
        None => 1,
        Some(max) => max.checked_add(1).ok_or_else(|| {
            AppError::BadRequest(format!(
                "No order left after {max} in {}; reorder the category first",
                instructor.category
            ))
        })?,
    };

    records.insert(&instructor).await?;
    tracing::info!(
        id = %instructor.id,
        category = %instructor.category,
        order = instructor.order,
        "instructor created"
    );
    Ok(instructor)
}

/// Write every requested order independently. Unknown or malformed ids are
/// skipped; the number of instructors actually updated is returned.
pub async fn process_reorder(
    ordering: &dyn InstructorRepository,
    request: ReorderRequest,
) -> Result<u64, AppError> {
    let Some(entries) = request.orders else {
        return Err(AppError::BadRequest("orders must be a list".into()));
    };

    let mut applied = 0;
    for entry in entries {
        let Ok(id) = ObjectId::parse_str(entry.id.trim()) else {
            continue;
        };
        if ordering.set_order(&id, entry.order).await? {
            applied += 1;
        }
    }
    Ok(applied)
}

/// Swap an instructor with its closest neighbour in the same category.
///
/// The two writes are independent; an interruption between them can leave
/// two instructors sharing an order value.
pub async fn process_move(
    records: &dyn RecordRepository<Instructor>,
    ordering: &dyn InstructorRepository,
    id: &ObjectId,
    direction: Direction,
) -> Result<(), AppError> {
    let current = records
        .find_by_id(id, Scope::Active)
        .await?
        .ok_or_else(|| AppError::not_found(Instructor::LABEL))?;

    let neighbour = ordering
        .find_neighbour(current.category, current.order, direction)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(match direction {
                Direction::Up => "Instructor is already at the top".into(),
                Direction::Down => "Instructor is already at the bottom".into(),
            })
        })?;

    futures::try_join!(
        ordering.set_order(&current.id, neighbour.order),
        ordering.set_order(&neighbour.id, current.order),
    )?;

    tracing::info!(
        id = %current.id,
        from = current.order,
        to = neighbour.order,
        "instructor moved"
    );
    Ok(())
}
