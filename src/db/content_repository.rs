use async_trait::async_trait;
use bson::{Bson, Document};

use crate::error::AppError;
use crate::models::content::{ContentSection, HeroSection};

/// Repository trait for the home-page content singleton.
///
/// Methods hand back the raw stored document; callers read it through
/// [`normalize_content`](crate::models::content::normalize_content).
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Fetch the singleton, creating it with defaults if it does not exist.
    async fn load(&self) -> Result<Document, AppError>;

    /// Overwrite all five hero fields and drop the legacy `imageUrl`.
    async fn save_hero(&self, hero: &HeroSection) -> Result<Document, AppError>;

    /// Replace one of the lists wholesale.
    async fn replace_section(
        &self,
        section: ContentSection,
        items: Vec<Bson>,
    ) -> Result<Document, AppError>;
}

/// MongoDB implementation of the ContentRepository.
///
/// The singleton is the document with `key: "home"`; a unique index on
/// `key` makes the find-or-create upsert safe under concurrent first reads.
pub struct MongoContentRepository {
    collection: mongodb::Collection<Document>,
}

impl MongoContentRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("contents"),
        }
    }

    /// Tag a pre-existing unkeyed document as the singleton and create the
    /// unique index. Run once at start-up.
    pub async fn ensure_singleton(&self) -> Result<(), AppError> {
        use crate::models::content::HOME_KEY;
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        let keyed = self
            .collection
            .find_one(doc! { "key": HOME_KEY })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if keyed.is_none() {
            let result = self
                .collection
                .update_one(
                    doc! { "key": { "$exists": false } },
                    doc! { "$set": { "key": HOME_KEY } },
                )
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            if result.modified_count > 0 {
                tracing::info!("Tagged existing content document as the home singleton");
            }
        }

        let index = IndexModel::builder()
            .keys(doc! { "key": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection
            .create_index(index)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn write(&self, update: Document) -> Result<Document, AppError> {
        use crate::models::content::HOME_KEY;
        use mongodb::bson::doc;
        use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

        self.load().await?;

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.collection
            .find_one_and_update(doc! { "key": HOME_KEY }, update)
            .with_options(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::Internal("Content document disappeared during update".into()))
    }
}

#[async_trait]
impl ContentRepository for MongoContentRepository {
    async fn load(&self) -> Result<Document, AppError> {
        use crate::models::content::{default_content_document, HOME_KEY};
        use mongodb::bson::doc;
        use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        self.collection
            .find_one_and_update(
                doc! { "key": HOME_KEY },
                doc! { "$setOnInsert": default_content_document() },
            )
            .with_options(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::Database("Content upsert returned no document".into()))
    }

    async fn save_hero(&self, hero: &HeroSection) -> Result<Document, AppError> {
        use mongodb::bson::doc;

        self.write(doc! {
            "$set": {
                "heroSection.imageUrls": hero.image_urls.clone(),
                "heroSection.subtitle": hero.subtitle.as_str(),
                "heroSection.title": hero.title.as_str(),
                "heroSection.buttonText": hero.button_text.as_str(),
                "heroSection.buttonLink": hero.button_link.as_str(),
                "updatedAt": bson::DateTime::now(),
            },
            "$unset": { "heroSection.imageUrl": "" },
        })
        .await
    }

    async fn replace_section(
        &self,
        section: ContentSection,
        items: Vec<Bson>,
    ) -> Result<Document, AppError> {
        use mongodb::bson::doc;

        let mut fields = Document::new();
        fields.insert(section.field(), items);
        fields.insert("updatedAt", bson::DateTime::now());
        self.write(doc! { "$set": fields }).await
    }
}
