use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::db::records::MongoRecordRepository;
use crate::error::AppError;
use crate::models::bson_serde::bson_serializer_options;
use crate::models::consultation::{Comment, Consultation, ConsultationStatus};

/// Comment thread and status writes on active consultation posts.
///
/// Every method returns the post after the write, or `None` when the post
/// (or, for edits and removals, the comment) does not exist.
#[async_trait]
pub trait ConsultationRepository: Send + Sync {
    /// Append a comment and mark the post answered.
    async fn push_comment(
        &self,
        id: &ObjectId,
        comment: &Comment,
    ) -> Result<Option<Consultation>, AppError>;

    async fn edit_comment(
        &self,
        id: &ObjectId,
        comment_id: &ObjectId,
        content: &str,
    ) -> Result<Option<Consultation>, AppError>;

    async fn remove_comment(
        &self,
        id: &ObjectId,
        comment_id: &ObjectId,
    ) -> Result<Option<Consultation>, AppError>;

    async fn set_status(
        &self,
        id: &ObjectId,
        status: ConsultationStatus,
    ) -> Result<Option<Consultation>, AppError>;
}

#[async_trait]
impl ConsultationRepository for MongoRecordRepository<Consultation> {
    async fn push_comment(
        &self,
        id: &ObjectId,
        comment: &Comment,
    ) -> Result<Option<Consultation>, AppError> {
        use mongodb::bson::doc;

        let comment = bson::to_bson_with_options(comment, bson_serializer_options())
            .map_err(|e| AppError::Internal(format!("Failed to encode comment: {e}")))?;

        self.modify(
            doc! { "_id": *id, "isDeleted": false },
            doc! {
                "$push": { "comments": comment },
                "$set": {
                    "status": ConsultationStatus::Answered.as_str(),
                    "updatedAt": bson::DateTime::now(),
                },
            },
        )
        .await
    }

    async fn edit_comment(
        &self,
        id: &ObjectId,
        comment_id: &ObjectId,
        content: &str,
    ) -> Result<Option<Consultation>, AppError> {
        use mongodb::bson::doc;

        let now = bson::DateTime::now();
        self.modify(
            doc! { "_id": *id, "isDeleted": false, "comments._id": *comment_id },
            doc! {
                "$set": {
                    "comments.$.content": content,
                    "comments.$.updatedAt": now,
                    "updatedAt": now,
                },
            },
        )
        .await
    }

    async fn remove_comment(
        &self,
        id: &ObjectId,
        comment_id: &ObjectId,
    ) -> Result<Option<Consultation>, AppError> {
        use mongodb::bson::doc;

        self.modify(
            doc! { "_id": *id, "isDeleted": false, "comments._id": *comment_id },
            doc! {
                "$pull": { "comments": { "_id": *comment_id } },
                "$set": { "updatedAt": bson::DateTime::now() },
            },
        )
        .await
    }

    async fn set_status(
        &self,
        id: &ObjectId,
        status: ConsultationStatus,
    ) -> Result<Option<Consultation>, AppError> {
        use mongodb::bson::doc;

        self.modify(
            doc! { "_id": *id, "isDeleted": false },
            doc! { "$set": { "status": status.as_str(), "updatedAt": bson::DateTime::now() } },
        )
        .await
    }
}
