//! Soft-delete aware persistence shared by every record kind.
//!
//! Records are never hidden by a driver hook: every query states its
//! [`Scope`] explicitly and the filter always carries `isDeleted`.

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::entity::Entity;

/// Which side of the soft-delete boundary a query looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Active,
    Deleted,
}

impl Scope {
    pub fn is_deleted(self) -> bool {
        matches!(self, Scope::Deleted)
    }
}

/// A lifecycle move applied to one record or to a batch of ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Active → deleted.
    SoftDelete,
    /// Deleted → active.
    Restore,
    /// Deleted → gone.
    Purge,
}

impl Transition {
    /// State a record must be in for the transition to apply.
    pub fn source(self) -> Scope {
        match self {
            Transition::SoftDelete => Scope::Active,
            Transition::Restore | Transition::Purge => Scope::Deleted,
        }
    }

    /// Update document for the transition, `None` when the record is removed.
    pub fn update(self) -> Option<Document> {
        let now = bson::DateTime::now();
        match self {
            Transition::SoftDelete => Some(doc! {
                "$set": { "isDeleted": true, "deletedAt": now, "updatedAt": now }
            }),
            Transition::Restore => Some(doc! {
                "$set": { "isDeleted": false, "updatedAt": now },
                "$unset": { "deletedAt": "" }
            }),
            Transition::Purge => None,
        }
    }
}

/// Value of an equality condition.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
}

impl From<FieldValue> for Bson {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(text) => Bson::String(text),
            FieldValue::Flag(flag) => Bson::Boolean(flag),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: &'static str,
    pub ascending: bool,
}

impl SortKey {
    pub const fn asc(field: &'static str) -> Self {
        Self { field, ascending: true }
    }

    pub const fn desc(field: &'static str) -> Self {
        Self { field, ascending: false }
    }
}

/// A 1-based page. Constructed values are always within bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u64 = 10;
    pub const MAX_LIMIT: u64 = 100;

    /// Clamp `page` to at least 1 and `limit` to `1..=MAX_LIMIT`.
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1) as u64,
            limit: limit.clamp(1, Self::MAX_LIMIT as i64) as u64,
        }
    }

    /// Build from raw query-string values; unparsable values fall back to
    /// page 1 and `default_limit`.
    pub fn parse(page: Option<&str>, limit: Option<&str>, default_limit: u64) -> Self {
        let page = page.and_then(|p| p.trim().parse::<i64>().ok()).unwrap_or(1);
        let limit = limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .unwrap_or(default_limit as i64);
        Self::new(page, limit)
    }

    /// Documents before this page, saturating at the largest skip MongoDB accepts.
    pub fn skip(&self) -> u64 {
        (self.page - 1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }

    pub fn total_pages(&self, total_items: u64) -> u64 {
        total_items.div_ceil(self.limit)
    }
}

/// Inclusive `createdAt` window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| *at >= from) && self.to.map_or(true, |to| *at <= to)
    }
}

/// Case-insensitive literal substring match over one or more fields.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordFilter {
    pub fields: Vec<&'static str>,
    pub text: String,
}

/// Everything a list endpoint can ask the repository for.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub scope: Scope,
    pub keyword: Option<KeywordFilter>,
    pub created: DateRange,
    pub equals: Vec<(&'static str, FieldValue)>,
    pub sort: Vec<SortKey>,
    pub page: Option<PageRequest>,
}

impl ListQuery {
    /// Newest first; the deleted scope is ordered by deletion time.
    pub fn new(scope: Scope) -> Self {
        let sort = match scope {
            Scope::Active => vec![SortKey::desc("createdAt")],
            Scope::Deleted => vec![SortKey::desc("deletedAt")],
        };
        Self {
            scope,
            keyword: None,
            created: DateRange::default(),
            equals: Vec::new(),
            sort,
            page: None,
        }
    }

    /// Ignored when `text` is blank.
    pub fn keyword(mut self, fields: &[&'static str], text: Option<&str>) -> Self {
        if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
            self.keyword = Some(KeywordFilter {
                fields: fields.to_vec(),
                text: text.to_string(),
            });
        }
        self
    }

    pub fn created_within(mut self, range: DateRange) -> Self {
        self.created = range;
        self
    }

    pub fn equals(mut self, field: &'static str, value: FieldValue) -> Self {
        self.equals.push((field, value));
        self
    }

    pub fn sort_by(mut self, sort: Vec<SortKey>) -> Self {
        self.sort = sort;
        self
    }

    pub fn paginate(mut self, page: PageRequest) -> Self {
        self.page = Some(page);
        self
    }

    /// MongoDB filter for this query.
    pub fn filter(&self) -> Document {
        let mut filter = doc! { "isDeleted": self.scope.is_deleted() };

        if let Some(keyword) = &self.keyword {
            let pattern = doc! { "$regex": regex::escape(&keyword.text), "$options": "i" };
            match keyword.fields.as_slice() {
                [] => {}
                [field] => {
                    filter.insert(*field, pattern);
                }
                fields => {
                    let clauses: Vec<Document> = fields
                        .iter()
                        .map(|field| {
                            let mut clause = Document::new();
                            clause.insert(*field, pattern.clone());
                            clause
                        })
                        .collect();
                    filter.insert("$or", clauses);
                }
            }
        }

        let mut created = Document::new();
        if let Some(from) = self.created.from {
            created.insert("$gte", bson::DateTime::from_chrono(from));
        }
        if let Some(to) = self.created.to {
            created.insert("$lte", bson::DateTime::from_chrono(to));
        }
        if !created.is_empty() {
            filter.insert("createdAt", created);
        }

        for (field, value) in &self.equals {
            filter.insert(*field, Bson::from(value.clone()));
        }

        filter
    }

    /// Sort keys in order, ties broken by newest `_id`.
    pub fn sort_document(&self) -> Document {
        let mut sort: Document = self
            .sort
            .iter()
            .map(|key| (key.field.to_string(), Bson::Int32(if key.ascending { 1 } else { -1 })))
            .collect();
        if !sort.contains_key("_id") {
            sort.insert("_id", -1);
        }
        sort
    }
}

/// Repository trait for soft-deletable records.
///
/// Every single-record method returns `None` when no record with that id is
/// in the required state; callers turn that into a not-found response.
#[async_trait]
pub trait RecordRepository<T: Entity>: Send + Sync {
    async fn insert(&self, record: &T) -> Result<(), AppError>;

    /// One page of matching records plus the total match count.
    async fn find_page(&self, query: &ListQuery) -> Result<(Vec<T>, u64), AppError>;

    async fn find_by_id(&self, id: &ObjectId, scope: Scope) -> Result<Option<T>, AppError>;

    /// Atomically bump `viewCount` on an active record matching `conditions`
    /// and return it after the increment.
    async fn find_and_increment_views(
        &self,
        id: &ObjectId,
        conditions: &[(&'static str, FieldValue)],
    ) -> Result<Option<T>, AppError>;

    /// `$set` the given fields on an active record and refresh `updatedAt`.
    async fn update(&self, id: &ObjectId, fields: Document) -> Result<Option<T>, AppError>;

    async fn soft_delete(&self, id: &ObjectId) -> Result<Option<T>, AppError>;

    async fn restore(&self, id: &ObjectId) -> Result<Option<T>, AppError>;

    /// Remove a soft-deleted record. Returns `false` if none matched.
    async fn permanent_delete(&self, id: &ObjectId) -> Result<bool, AppError>;

    /// Apply a transition to every id currently in its source state.
    /// Returns how many records changed.
    async fn bulk(&self, ids: &[ObjectId], transition: Transition) -> Result<u64, AppError>;
}

/// MongoDB implementation of the RecordRepository, one per collection.
pub struct MongoRecordRepository<T: Entity> {
    pub(crate) collection: mongodb::Collection<T>,
}

impl<T: Entity> MongoRecordRepository<T> {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection(T::COLLECTION),
        }
    }

    /// Index backing the default listing (`isDeleted` + newest first).
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        use mongodb::IndexModel;

        let index = IndexModel::builder()
            .keys(doc! { "isDeleted": 1, "createdAt": -1 })
            .build();
        self.collection
            .create_index(index)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub(crate) async fn modify(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<Option<T>, AppError> {
        use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.collection
            .find_one_and_update(filter, update)
            .with_options(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl<T: Entity> RecordRepository<T> for MongoRecordRepository<T> {
    async fn insert(&self, record: &T) -> Result<(), AppError> {
        self.collection
            .insert_one(record)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn find_page(&self, query: &ListQuery) -> Result<(Vec<T>, u64), AppError> {
        use futures::TryStreamExt;
        use mongodb::options::FindOptions;

        let filter = query.filter();
        let options = FindOptions::builder()
            .sort(query.sort_document())
            .skip(query.page.map(|page| page.skip()))
            .limit(query.page.map(|page| page.limit as i64))
            .build();

        let items = async {
            let cursor = self
                .collection
                .find(filter.clone())
                .with_options(options)
                .await?;
            cursor.try_collect::<Vec<T>>().await
        };
        let total = async { self.collection.count_documents(filter.clone()).await };

        futures::try_join!(items, total).map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_by_id(&self, id: &ObjectId, scope: Scope) -> Result<Option<T>, AppError> {
        self.collection
            .find_one(doc! { "_id": *id, "isDeleted": scope.is_deleted() })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_and_increment_views(
        &self,
        id: &ObjectId,
        conditions: &[(&'static str, FieldValue)],
    ) -> Result<Option<T>, AppError> {
        let mut filter = doc! { "_id": *id, "isDeleted": false };
        for (field, value) in conditions {
            filter.insert(*field, Bson::from(value.clone()));
        }
        self.modify(filter, doc! { "$inc": { "viewCount": 1 } }).await
    }

    async fn update(&self, id: &ObjectId, mut fields: Document) -> Result<Option<T>, AppError> {
        fields.insert("updatedAt", bson::DateTime::now());
        self.modify(
            doc! { "_id": *id, "isDeleted": false },
            doc! { "$set": fields },
        )
        .await
    }

    async fn soft_delete(&self, id: &ObjectId) -> Result<Option<T>, AppError> {
        self.transition(id, Transition::SoftDelete).await
    }

    async fn restore(&self, id: &ObjectId) -> Result<Option<T>, AppError> {
        self.transition(id, Transition::Restore).await
    }

    async fn permanent_delete(&self, id: &ObjectId) -> Result<bool, AppError> {
        let result = self
            .collection
            .delete_one(doc! { "_id": *id, "isDeleted": true })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.deleted_count > 0)
    }

    async fn bulk(&self, ids: &[ObjectId], transition: Transition) -> Result<u64, AppError> {
        let filter = doc! {
            "_id": { "$in": ids.to_vec() },
            "isDeleted": transition.source().is_deleted(),
        };

        match transition.update() {
            Some(update) => {
                let result = self
                    .collection
                    .update_many(filter, update)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(result.modified_count)
            }
            None => {
                let result = self
                    .collection
                    .delete_many(filter)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(result.deleted_count)
            }
        }
    }
}

impl<T: Entity> MongoRecordRepository<T> {
    async fn transition(&self, id: &ObjectId, transition: Transition) -> Result<Option<T>, AppError> {
        let filter = doc! { "_id": *id, "isDeleted": transition.source().is_deleted() };
        match transition.update() {
            Some(update) => self.modify(filter, update).await,
            None => Err(AppError::Internal(
                "Purge is not a single-record update".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_page_request_defaults_and_clamping() {
        assert_eq!(PageRequest::parse(None, None, 10), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::parse(Some("0"), Some("0"), 10), PageRequest { page: 1, limit: 1 });
        assert_eq!(PageRequest::parse(Some("-3"), Some("500"), 10), PageRequest { page: 1, limit: 100 });
        assert_eq!(PageRequest::parse(Some("abc"), Some("x"), 12), PageRequest { page: 1, limit: 12 });
        assert_eq!(PageRequest::parse(Some(" 3 "), Some("20"), 10), PageRequest { page: 3, limit: 20 });
    }

    #[test]
    fn test_huge_page_saturates_skip() {
        let page = PageRequest::parse(Some("9223372036854775807"), Some("100"), 10);
        assert_eq!(page.page, i64::MAX as u64);
        assert_eq!(page.skip(), i64::MAX as u64);

        let page = PageRequest::new(i64::MAX, 1);
        assert_eq!(page.skip(), i64::MAX as u64 - 1);
    }

    #[test]
    fn test_page_arithmetic() {
        let third = PageRequest::new(3, 10);
        assert_eq!(third.skip(), 20);
        assert_eq!(third.total_pages(25), 3);
        assert_eq!(third.total_pages(0), 0);
        assert_eq!(PageRequest::new(1, 10).total_pages(30), 3);
    }

    #[test]
    fn test_active_filter_excludes_deleted() {
        let filter = ListQuery::new(Scope::Active).filter();
        assert_eq!(filter, doc! { "isDeleted": false });
    }

    #[test]
    fn test_deleted_scope_sorts_by_deletion() {
        let query = ListQuery::new(Scope::Deleted);
        assert_eq!(query.filter().get_bool("isDeleted").unwrap(), true);
        assert_eq!(query.sort_document(), doc! { "deletedAt": -1, "_id": -1 });
    }

    #[test]
    fn test_keyword_is_escaped_and_case_insensitive() {
        let filter = ListQuery::new(Scope::Active)
            .keyword(&["title"], Some("a.b(c)"))
            .filter();
        let title = filter.get_document("title").unwrap();
        assert_eq!(title.get_str("$regex").unwrap(), r"a\.b\(c\)");
        assert_eq!(title.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn test_blank_keyword_is_ignored() {
        let query = ListQuery::new(Scope::Active).keyword(&["title"], Some("   "));
        assert!(query.keyword.is_none());
    }

    #[test]
    fn test_multi_field_keyword_uses_or() {
        let filter = ListQuery::new(Scope::Active)
            .keyword(&["title", "content"], Some("audition"))
            .filter();
        assert_eq!(filter.get_array("$or").unwrap().len(), 2);
    }

    #[test]
    fn test_date_range_and_equality_are_anded() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let filter = ListQuery::new(Scope::Active)
            .created_within(DateRange { from: Some(from), to: None })
            .equals("boardType", FieldValue::Text("INQUIRY".into()))
            .equals("isActive", FieldValue::Flag(true))
            .filter();

        let created = filter.get_document("createdAt").unwrap();
        assert!(created.contains_key("$gte"));
        assert!(!created.contains_key("$lte"));
        assert_eq!(filter.get_str("boardType").unwrap(), "INQUIRY");
        assert_eq!(filter.get_bool("isActive").unwrap(), true);
        assert_eq!(filter.get_bool("isDeleted").unwrap(), false);
    }

    #[test]
    fn test_sort_document_keeps_key_order() {
        let query = ListQuery::new(Scope::Active)
            .sort_by(vec![SortKey::asc("category"), SortKey::asc("order")]);
        let sort = query.sort_document();
        let keys: Vec<&String> = sort.keys().collect();
        assert_eq!(keys, vec!["category", "order", "_id"]);
    }

    #[test]
    fn test_transition_sources() {
        assert_eq!(Transition::SoftDelete.source(), Scope::Active);
        assert_eq!(Transition::Restore.source(), Scope::Deleted);
        assert_eq!(Transition::Purge.source(), Scope::Deleted);
        assert!(Transition::Purge.update().is_none());

        let restore = Transition::Restore.update().unwrap();
        assert!(restore.get_document("$unset").unwrap().contains_key("deletedAt"));
    }

    #[test]
    fn test_date_range_contains() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
        let range = DateRange { from: Some(from), to: Some(to) };
        assert!(range.contains(&Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()));
        assert!(!range.contains(&Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()));
        assert!(DateRange::default().contains(&from));
    }
}
