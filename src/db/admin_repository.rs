use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::admin::Admin;

/// Repository trait for back-office accounts.
#[async_trait]
pub trait AdminRepository: Send + Sync {
    /// Find an account that is allowed to log in.
    async fn find_active_by_username(&self, username: &str) -> Result<Option<Admin>, AppError>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Admin>, AppError>;

    /// Whether any account exists at all (first-run detection).
    async fn has_any(&self) -> Result<bool, AppError>;

    /// Insert a new account. A taken username is a `BadRequest`.
    async fn insert(&self, admin: &Admin) -> Result<(), AppError>;

    async fn record_login(&self, id: &ObjectId, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Replace the stored password hash.
    async fn set_password(&self, id: &ObjectId, hash: &str) -> Result<(), AppError>;
}

/// MongoDB implementation of the AdminRepository.
pub struct MongoAdminRepository {
    collection: mongodb::Collection<Admin>,
}

impl MongoAdminRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("admins"),
        }
    }

    /// Unique index on `username`.
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        let index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection
            .create_index(index)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000
    )
}

#[async_trait]
impl AdminRepository for MongoAdminRepository {
    async fn find_active_by_username(&self, username: &str) -> Result<Option<Admin>, AppError> {
        use mongodb::bson::doc;

        self.collection
            .find_one(doc! { "username": username, "isActive": true })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Admin>, AppError> {
        use mongodb::bson::doc;

        self.collection
            .find_one(doc! { "_id": *id })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn has_any(&self) -> Result<bool, AppError> {
        use mongodb::bson::doc;

        let count = self
            .collection
            .count_documents(doc! {})
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    async fn insert(&self, admin: &Admin) -> Result<(), AppError> {
        match self.collection.insert_one(admin).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(AppError::BadRequest(format!(
                "Username '{}' is already taken",
                admin.username
            ))),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn record_login(&self, id: &ObjectId, at: DateTime<Utc>) -> Result<(), AppError> {
        use mongodb::bson::doc;

        let at = bson::DateTime::from_chrono(at);
        self.collection
            .update_one(
                doc! { "_id": *id },
                doc! { "$set": { "lastLogin": at, "updatedAt": at } },
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn set_password(&self, id: &ObjectId, hash: &str) -> Result<(), AppError> {
        use mongodb::bson::doc;

        let now = bson::DateTime::now();
        self.collection
            .update_one(
                doc! { "_id": *id },
                doc! { "$set": { "password": hash, "updatedAt": now } },
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
