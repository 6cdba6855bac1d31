use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::db::records::MongoRecordRepository;
use crate::error::AppError;
use crate::models::instructor::{Category, Instructor};

/// Which neighbour a move swaps with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards smaller `order` values.
    Up,
    /// Towards larger `order` values.
    Down,
}

/// Ordering queries on active instructors, scoped to one category.
#[async_trait]
pub trait InstructorRepository: Send + Sync {
    /// Largest `order` among active instructors of the category.
    async fn max_order(&self, category: Category) -> Result<Option<i32>, AppError>;

    /// Closest active instructor of the category above or below `order`.
    async fn find_neighbour(
        &self,
        category: Category,
        order: i32,
        direction: Direction,
    ) -> Result<Option<Instructor>, AppError>;

    /// Write a new `order` on an active instructor. Returns `false` if none matched.
    async fn set_order(&self, id: &ObjectId, order: i32) -> Result<bool, AppError>;
}

#[async_trait]
impl InstructorRepository for MongoRecordRepository<Instructor> {
    async fn max_order(&self, category: Category) -> Result<Option<i32>, AppError> {
        use mongodb::bson::doc;
        use mongodb::options::FindOneOptions;

        let options = FindOneOptions::builder().sort(doc! { "order": -1 }).build();

        let top = self
            .collection
            .find_one(doc! { "category": category.as_str(), "isDeleted": false })
            .with_options(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(top.map(|instructor| instructor.order))
    }

    async fn find_neighbour(
        &self,
        category: Category,
        order: i32,
        direction: Direction,
    ) -> Result<Option<Instructor>, AppError> {
        use mongodb::bson::doc;
        use mongodb::options::FindOneOptions;

        let (bound, sort) = match direction {
            Direction::Up => (doc! { "$lt": order }, doc! { "order": -1 }),
            Direction::Down => (doc! { "$gt": order }, doc! { "order": 1 }),
        };
        let options = FindOneOptions::builder().sort(sort).build();

        self.collection
            .find_one(doc! {
                "category": category.as_str(),
                "isDeleted": false,
                "order": bound,
            })
            .with_options(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_order(&self, id: &ObjectId, order: i32) -> Result<bool, AppError> {
        use mongodb::bson::doc;

        let result = self
            .collection
            .update_one(
                doc! { "_id": *id, "isDeleted": false },
                doc! { "$set": { "order": order, "updatedAt": bson::DateTime::now() } },
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.matched_count > 0)
    }
}
