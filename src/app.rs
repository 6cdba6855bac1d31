use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::{middleware, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::auth::jwt::JwtAuth;
use crate::auth::middleware::require_admin;
use crate::config::AppConfig;
use crate::db::admin_repository::{AdminRepository, MongoAdminRepository};
use crate::db::consultation_repository::ConsultationRepository;
use crate::db::content_repository::{ContentRepository, MongoContentRepository};
use crate::db::instructor_repository::InstructorRepository;
use crate::db::records::{MongoRecordRepository, RecordRepository};
use crate::error::AppError;
use crate::models::consultation::Consultation;
use crate::models::entity::Entity;
use crate::models::instructor::Instructor;
use crate::models::posts::{Gallery, Notice, Passer, Resource};
use crate::storage::client::{S3StorageClient, StorageClient};

/// Everything a handler can reach, built once at start-up.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub notices: Arc<dyn RecordRepository<Notice>>,
    pub galleries: Arc<dyn RecordRepository<Gallery>>,
    pub passers: Arc<dyn RecordRepository<Passer>>,
    pub resources: Arc<dyn RecordRepository<Resource>>,
    pub instructors: Arc<dyn RecordRepository<Instructor>>,
    pub ordering: Arc<dyn InstructorRepository>,
    pub consultations: Arc<dyn RecordRepository<Consultation>>,
    pub threads: Arc<dyn ConsultationRepository>,
    pub content: Arc<dyn ContentRepository>,
    pub admins: Arc<dyn AdminRepository>,
    pub storage: Arc<dyn StorageClient>,
    pub jwt: Arc<JwtAuth>,
}

async fn records<T: Entity>(
    db: &mongodb::Database,
) -> Result<Arc<MongoRecordRepository<T>>, AppError> {
    let repo = MongoRecordRepository::<T>::new(db);
    repo.ensure_indexes().await?;
    Ok(Arc::new(repo))
}

impl AppState {
    /// Connect to MongoDB and S3 and prepare indexes and the content singleton.
    pub async fn connect(config: &AppConfig) -> Result<Self, AppError> {
        let client = mongodb::Client::with_uri_str(&config.database.uri)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to MongoDB: {e}")))?;
        let db = client.database(&config.database.name);
        tracing::info!(database = %config.database.name, "connected to MongoDB");

        let storage = S3StorageClient::from_config(&config.storage).await?;
        tracing::info!(bucket = %config.storage.bucket, "S3 storage client initialized");

        Self::from_parts(&db, Arc::new(storage), config).await
    }

    /// Build the state over an existing database and storage client.
    pub async fn from_parts(
        db: &mongodb::Database,
        storage: Arc<dyn StorageClient>,
        config: &AppConfig,
    ) -> Result<Self, AppError> {
        let instructors = records::<Instructor>(db).await?;
        let consultations = records::<Consultation>(db).await?;

        let content = MongoContentRepository::new(db);
        content.ensure_singleton().await?;
        let admins = MongoAdminRepository::new(db);
        admins.ensure_indexes().await?;

        if config.uses_dev_secret() {
            tracing::warn!("JWT_SECRET is not set; using the development secret");
        }

        Ok(Self {
            notices: records::<Notice>(db).await?,
            galleries: records::<Gallery>(db).await?,
            passers: records::<Passer>(db).await?,
            resources: records::<Resource>(db).await?,
            instructors: instructors.clone(),
            ordering: instructors,
            consultations: consultations.clone(),
            threads: consultations,
            content: Arc::new(content),
            admins: Arc::new(admins),
            storage,
            jwt: Arc::new(JwtAuth::new(
                &config.auth.jwt_secret,
                config.auth.token_ttl_hours,
            )),
        })
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() }))
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to Catharsis API" }))
}

/// Only the site and the back office may call the API from a browser.
fn cors(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = [&config.server.frontend_url, &config.server.admin_url]
        .into_iter()
        .filter_map(|origin| match origin.trim_end_matches('/').parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// The full HTTP surface.
pub fn build_router(state: AppState, config: &AppConfig) -> Router {
    let admin = Router::new()
        .nest("/notices", api::records::admin_crud_routes::<Notice>())
        .nest("/galleries", api::records::admin_crud_routes::<Gallery>())
        .nest("/passers", api::records::admin_crud_routes::<Passer>())
        .nest("/resources", api::records::admin_crud_routes::<Resource>())
        .nest("/instructors", api::instructors::admin_instructor_routes())
        .nest("/consultations", api::consultations::admin_consultation_routes())
        .nest("/content", api::content::admin_content_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let images = api::images::routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/auth", api::auth::routes(&state))
        .nest("/api/images", images)
        .nest("/api/notices", api::records::public_routes::<Notice>())
        .nest("/api/galleries", api::records::public_routes::<Gallery>())
        .nest("/api/passers", api::records::public_routes::<Passer>())
        .nest("/api/resources", api::records::public_routes::<Resource>())
        .nest("/api/instructors", api::instructors::public_routes())
        .nest("/api/consultations", api::consultations::public_routes())
        .nest("/api/content", api::content::public_routes())
        .nest("/api/admin", admin)
        .layer(cors(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
