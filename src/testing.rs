//! In-memory repositories shared by the unit tests.
//!
//! Records are kept in their JSON form so that generic filters and `$set`
//! style patches can be applied without knowing the concrete type.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Mutex;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::db::admin_repository::AdminRepository;
use crate::db::consultation_repository::ConsultationRepository;
use crate::db::content_repository::ContentRepository;
use crate::db::instructor_repository::{Direction, InstructorRepository};
use crate::db::records::{FieldValue, ListQuery, RecordRepository, Scope, Transition};
use crate::error::AppError;
use crate::models::admin::Admin;
use crate::models::bson_serde::format_timestamp;
use crate::models::consultation::{Comment, Consultation, ConsultationStatus};
use crate::models::content::{default_content_document, ContentSection, HeroSection, HOME_KEY};
use crate::models::entity::Entity;
use crate::models::instructor::{Category, Instructor};
use crate::storage::client::{StorageClient, StoredObject};

fn now_text() -> Value {
    Value::String(format_timestamp(&Utc::now()))
}

fn field_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(text) => Value::String(text.clone()),
        FieldValue::Flag(flag) => Value::Bool(*flag),
    }
}

fn is_deleted(row: &Value) -> bool {
    row["isDeleted"].as_bool().unwrap_or(false)
}

fn created_at(row: &Value) -> Option<DateTime<Utc>> {
    row["createdAt"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|at| at.with_timezone(&Utc))
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn matches(row: &Value, query: &ListQuery) -> bool {
    if is_deleted(row) != query.scope.is_deleted() {
        return false;
    }
    if let Some(keyword) = &query.keyword {
        let needle = keyword.text.to_lowercase();
        let hit = keyword.fields.iter().any(|field| {
            row[*field]
                .as_str()
                .is_some_and(|text| text.to_lowercase().contains(&needle))
        });
        if !hit {
            return false;
        }
    }
    if query.created.from.is_some() || query.created.to.is_some() {
        match created_at(row) {
            Some(at) if query.created.contains(&at) => {}
            _ => return false,
        }
    }
    query
        .equals
        .iter()
        .all(|(field, value)| row[*field] == field_json(value))
}

/// `$set` semantics over a JSON object.
fn apply_fields(row: &mut Value, fields: Document) {
    if let Some(map) = row.as_object_mut() {
        for (key, value) in fields {
            map.insert(key, value.into_relaxed_extjson());
        }
    }
}

fn apply_transition(map: &mut Map<String, Value>, transition: Transition) {
    match transition {
        Transition::SoftDelete => {
            map.insert("isDeleted".into(), Value::Bool(true));
            map.insert("deletedAt".into(), now_text());
        }
        Transition::Restore | Transition::Purge => {
            map.insert("isDeleted".into(), Value::Bool(false));
            map.remove("deletedAt");
        }
    }
    map.insert("updatedAt".into(), now_text());
}

/// In-memory [`RecordRepository`] for any entity kind.
pub struct MemoryRecords<T> {
    rows: Mutex<Vec<Value>>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Entity> MemoryRecords<T> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            _kind: PhantomData,
        }
    }

    pub fn with(records: Vec<T>) -> Self {
        let repo = Self::new();
        {
            let mut rows = repo.rows.lock().unwrap();
            for record in records {
                rows.push(serde_json::to_value(record).unwrap());
            }
        }
        repo
    }

    /// Every stored record regardless of state, in insertion order.
    pub fn all(&self) -> Vec<T> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .map(|row| Self::decode(row))
            .collect()
    }

    pub fn get(&self, id: &ObjectId) -> Option<T> {
        self.all().into_iter().find(|record| record.id() == id)
    }

    fn decode(row: &Value) -> T {
        serde_json::from_value(row.clone()).expect("stored row decodes")
    }

    fn edit(
        &self,
        id: &ObjectId,
        deleted: bool,
        change: impl FnOnce(&mut Value),
    ) -> Option<T> {
        let hex = id.to_hex();
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|row| row["_id"] == hex.as_str() && is_deleted(row) == deleted)?;
        change(row);
        Some(Self::decode(row))
    }
}

#[async_trait]
impl<T: Entity> RecordRepository<T> for MemoryRecords<T> {
    async fn insert(&self, record: &T) -> Result<(), AppError> {
        let row = serde_json::to_value(record).map_err(|e| AppError::Database(e.to_string()))?;
        self.rows.lock().unwrap().push(row);
        Ok(())
    }

    async fn find_page(&self, query: &ListQuery) -> Result<(Vec<T>, u64), AppError> {
        let mut hits: Vec<Value> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| matches(row, query))
            .cloned()
            .collect();

        hits.sort_by(|a, b| {
            query
                .sort
                .iter()
                .map(|key| {
                    let order = compare(&a[key.field], &b[key.field]);
                    if key.ascending {
                        order
                    } else {
                        order.reverse()
                    }
                })
                .find(|order| *order != Ordering::Equal)
                .unwrap_or_else(|| compare(&b["_id"], &a["_id"]))
        });

        let total = hits.len() as u64;
        let items = match query.page {
            Some(page) => hits
                .iter()
                .skip(page.skip() as usize)
                .take(page.limit as usize)
                .map(Self::decode)
                .collect(),
            None => hits.iter().map(Self::decode).collect(),
        };
        Ok((items, total))
    }

    async fn find_by_id(&self, id: &ObjectId, scope: Scope) -> Result<Option<T>, AppError> {
        Ok(self.edit(id, scope.is_deleted(), |_| {}))
    }

    async fn find_and_increment_views(
        &self,
        id: &ObjectId,
        conditions: &[(&'static str, FieldValue)],
    ) -> Result<Option<T>, AppError> {
        let hex = id.to_hex();
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|row| {
            row["_id"] == hex.as_str()
                && !is_deleted(row)
                && conditions
                    .iter()
                    .all(|(field, value)| row[*field] == field_json(value))
        }) else {
            return Ok(None);
        };
        let views = row["viewCount"].as_i64().unwrap_or(0);
        row["viewCount"] = Value::from(views + 1);
        Ok(Some(Self::decode(row)))
    }

    async fn update(&self, id: &ObjectId, fields: Document) -> Result<Option<T>, AppError> {
        Ok(self.edit(id, false, |row| {
            apply_fields(row, fields);
            row["updatedAt"] = now_text();
        }))
    }

    async fn soft_delete(&self, id: &ObjectId) -> Result<Option<T>, AppError> {
        Ok(self.edit(id, false, |row| {
            if let Some(map) = row.as_object_mut() {
                apply_transition(map, Transition::SoftDelete);
            }
        }))
    }

    async fn restore(&self, id: &ObjectId) -> Result<Option<T>, AppError> {
        Ok(self.edit(id, true, |row| {
            if let Some(map) = row.as_object_mut() {
                apply_transition(map, Transition::Restore);
            }
        }))
    }

    async fn permanent_delete(&self, id: &ObjectId) -> Result<bool, AppError> {
        let hex = id.to_hex();
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| !(row["_id"] == hex.as_str() && is_deleted(row)));
        Ok(rows.len() < before)
    }

    async fn bulk(&self, ids: &[ObjectId], transition: Transition) -> Result<u64, AppError> {
        let wanted: Vec<String> = ids.iter().map(|id| id.to_hex()).collect();
        let source = transition.source().is_deleted();
        let selected = |row: &Value| {
            is_deleted(row) == source
                && row["_id"]
                    .as_str()
                    .is_some_and(|id| wanted.iter().any(|w| w == id))
        };

        let mut rows = self.rows.lock().unwrap();
        if transition == Transition::Purge {
            let before = rows.len();
            rows.retain(|row| !selected(row));
            return Ok((before - rows.len()) as u64);
        }

        let mut changed = 0;
        for row in rows.iter_mut().filter(|row| selected(&**row)) {
            if let Some(map) = row.as_object_mut() {
                apply_transition(map, transition);
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl InstructorRepository for MemoryRecords<Instructor> {
    async fn max_order(&self, category: Category) -> Result<Option<i32>, AppError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|i| i.category == category && !i.is_deleted)
            .map(|i| i.order)
            .max())
    }

    async fn find_neighbour(
        &self,
        category: Category,
        order: i32,
        direction: Direction,
    ) -> Result<Option<Instructor>, AppError> {
        let peers = self
            .all()
            .into_iter()
            .filter(|i| i.category == category && !i.is_deleted);
        Ok(match direction {
            Direction::Up => peers.filter(|i| i.order < order).max_by_key(|i| i.order),
            Direction::Down => peers.filter(|i| i.order > order).min_by_key(|i| i.order),
        })
    }

    async fn set_order(&self, id: &ObjectId, order: i32) -> Result<bool, AppError> {
        Ok(self
            .edit(id, false, |row| {
                row["order"] = Value::from(order);
                row["updatedAt"] = now_text();
            })
            .is_some())
    }
}

impl MemoryRecords<Consultation> {
    fn modify_post(
        &self,
        id: &ObjectId,
        change: impl FnOnce(&mut Consultation) -> bool,
    ) -> Option<Consultation> {
        let hex = id.to_hex();
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|row| row["_id"] == hex.as_str() && !is_deleted(row))?;
        let mut post = Self::decode(row);
        if !change(&mut post) {
            return None;
        }
        post.updated_at = Utc::now();
        *row = serde_json::to_value(&post).expect("post encodes");
        Some(post)
    }
}

#[async_trait]
impl ConsultationRepository for MemoryRecords<Consultation> {
    async fn push_comment(
        &self,
        id: &ObjectId,
        comment: &Comment,
    ) -> Result<Option<Consultation>, AppError> {
        Ok(self.modify_post(id, |post| {
            post.comments.push(comment.clone());
            post.status = ConsultationStatus::Answered;
            true
        }))
    }

    async fn edit_comment(
        &self,
        id: &ObjectId,
        comment_id: &ObjectId,
        content: &str,
    ) -> Result<Option<Consultation>, AppError> {
        Ok(self.modify_post(id, |post| {
            match post.comments.iter_mut().find(|c| c.id == *comment_id) {
                Some(comment) => {
                    comment.content = content.to_string();
                    comment.updated_at = Utc::now();
                    true
                }
                None => false,
            }
        }))
    }

    async fn remove_comment(
        &self,
        id: &ObjectId,
        comment_id: &ObjectId,
    ) -> Result<Option<Consultation>, AppError> {
        Ok(self.modify_post(id, |post| {
            let before = post.comments.len();
            post.comments.retain(|c| c.id != *comment_id);
            post.comments.len() < before
        }))
    }

    async fn set_status(
        &self,
        id: &ObjectId,
        status: ConsultationStatus,
    ) -> Result<Option<Consultation>, AppError> {
        Ok(self.modify_post(id, |post| {
            post.status = status;
            true
        }))
    }
}

/// In-memory content singleton.
pub struct MemoryContent {
    document: Mutex<Option<Document>>,
}

impl MemoryContent {
    pub fn new() -> Self {
        Self {
            document: Mutex::new(None),
        }
    }

    /// Start from an already stored document (e.g. a legacy hero shape).
    pub fn with(document: Document) -> Self {
        Self {
            document: Mutex::new(Some(document)),
        }
    }

    pub fn raw(&self) -> Option<Document> {
        self.document.lock().unwrap().clone()
    }

    fn write(&self, change: impl FnOnce(&mut Document)) -> Document {
        let mut slot = self.document.lock().unwrap();
        let document = slot.get_or_insert_with(Self::fresh);
        change(document);
        document.insert("updatedAt", bson::DateTime::now());
        document.clone()
    }

    fn fresh() -> Document {
        let mut document = doc! { "_id": ObjectId::new(), "key": HOME_KEY };
        for (key, value) in default_content_document() {
            document.insert(key, value);
        }
        document
    }
}

#[async_trait]
impl ContentRepository for MemoryContent {
    async fn load(&self) -> Result<Document, AppError> {
        Ok(self
            .document
            .lock()
            .unwrap()
            .get_or_insert_with(Self::fresh)
            .clone())
    }

    async fn save_hero(&self, hero: &HeroSection) -> Result<Document, AppError> {
        Ok(self.write(|document| {
            document.insert(
                "heroSection",
                doc! {
                    "imageUrls": hero.image_urls.clone(),
                    "subtitle": hero.subtitle.as_str(),
                    "title": hero.title.as_str(),
                    "buttonText": hero.button_text.as_str(),
                    "buttonLink": hero.button_link.as_str(),
                },
            );
        }))
    }

    async fn replace_section(
        &self,
        section: ContentSection,
        items: Vec<Bson>,
    ) -> Result<Document, AppError> {
        Ok(self.write(|document| {
            document.insert(section.field(), items);
        }))
    }
}

/// In-memory account store.
pub struct MemoryAdmins {
    pub admins: Mutex<Vec<Admin>>,
}

impl MemoryAdmins {
    pub fn new() -> Self {
        Self {
            admins: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AdminRepository for MemoryAdmins {
    async fn find_active_by_username(&self, username: &str) -> Result<Option<Admin>, AppError> {
        Ok(self
            .admins
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.username == username && a.is_active)
            .cloned())
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Admin>, AppError> {
        Ok(self
            .admins
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == *id)
            .cloned())
    }

    async fn has_any(&self) -> Result<bool, AppError> {
        Ok(!self.admins.lock().unwrap().is_empty())
    }

    async fn insert(&self, admin: &Admin) -> Result<(), AppError> {
        let mut admins = self.admins.lock().unwrap();
        if admins.iter().any(|a| a.username == admin.username) {
            return Err(AppError::BadRequest(format!(
                "Username '{}' is already taken",
                admin.username
            )));
        }
        admins.push(admin.clone());
        Ok(())
    }

    async fn record_login(&self, id: &ObjectId, at: DateTime<Utc>) -> Result<(), AppError> {
        if let Some(admin) = self.admins.lock().unwrap().iter_mut().find(|a| a.id == *id) {
            admin.last_login = Some(at);
        }
        Ok(())
    }

    async fn set_password(&self, id: &ObjectId, hash: &str) -> Result<(), AppError> {
        if let Some(admin) = self.admins.lock().unwrap().iter_mut().find(|a| a.id == *id) {
            admin.password = hash.to_string();
        }
        Ok(())
    }
}

/// In-memory bucket.
pub struct MemoryStorage {
    pub objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (content, content_type.to_string()));
        Ok(())
    }

    async fn list_objects(
        &self,
        prefix: &str,
        max_keys: i32,
    ) -> Result<Vec<StoredObject>, AppError> {
        let mut keys: Vec<(String, i64)> = self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, (content, _))| (key.clone(), content.len() as i64))
            .collect();
        keys.sort();
        Ok(keys
            .into_iter()
            .take(max_keys.max(0) as usize)
            .map(|(key, size)| StoredObject {
                key,
                size: Some(size),
                last_modified: None,
            })
            .collect())
    }

    async fn delete_object(&self, key: &str) -> Result<(), AppError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://bucket.test/{key}")
    }
}

/// Secret used by [`memory_state`].
pub const TEST_JWT_SECRET: &str = "test-secret";

/// Application state over fresh in-memory stores.
pub fn memory_state() -> crate::app::AppState {
    use crate::models::posts::{Gallery, Notice, Passer, Resource};
    use std::sync::Arc;

    let instructors = Arc::new(MemoryRecords::<Instructor>::new());
    let consultations = Arc::new(MemoryRecords::<Consultation>::new());
    crate::app::AppState {
        notices: Arc::new(MemoryRecords::<Notice>::new()),
        galleries: Arc::new(MemoryRecords::<Gallery>::new()),
        passers: Arc::new(MemoryRecords::<Passer>::new()),
        resources: Arc::new(MemoryRecords::<Resource>::new()),
        instructors: instructors.clone(),
        ordering: instructors,
        consultations: consultations.clone(),
        threads: consultations,
        content: Arc::new(MemoryContent::new()),
        admins: Arc::new(MemoryAdmins::new()),
        storage: Arc::new(MemoryStorage::new()),
        jwt: Arc::new(crate::auth::jwt::JwtAuth::new(TEST_JWT_SECRET, 24)),
    }
}

pub fn test_config() -> crate::config::AppConfig {
    use crate::config::{AppConfig, AuthConfig, DatabaseConfig, ServerConfig, StorageConfig};

    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: "http://localhost:3000".into(),
            admin_url: "http://localhost:5001".into(),
        },
        database: DatabaseConfig {
            uri: "mongodb://localhost:27017".into(),
            name: "catharsis-test".into(),
        },
        auth: AuthConfig {
            jwt_secret: TEST_JWT_SECRET.into(),
            token_ttl_hours: 24,
        },
        storage: StorageConfig {
            bucket: "catharsis-image".into(),
            region: "ap-northeast-2".into(),
            endpoint: None,
            public_url: Some("https://bucket.test".into()),
        },
    }
}
