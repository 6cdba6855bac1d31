use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, patch, put};
use axum::Router;

use crate::api::response::{ApiResponse, JsonBody};
use crate::app::AppState;
use crate::db::content_repository::ContentRepository;
use crate::error::AppError;
use crate::models::content::{
    ContentItem, FeaturedInstructor, HeroPatch, HeroSection, HistoryPasser, HomeContent,
    InstagramPost, SchoolPasser, YoutubeVideo,
};
use crate::services::content::{
    process_load_content, process_public_content, process_replace_section, process_update_hero,
};

type Content = State<Arc<dyn ContentRepository>>;

async fn public_content(State(content): Content) -> Result<ApiResponse<HomeContent>, AppError> {
    Ok(ApiResponse::ok(process_public_content(content.as_ref()).await?))
}

async fn admin_content(State(content): Content) -> Result<ApiResponse<HomeContent>, AppError> {
    Ok(ApiResponse::ok(process_load_content(content.as_ref()).await?))
}

async fn update_hero(
    State(content): Content,
    JsonBody(patch): JsonBody<HeroPatch>,
) -> Result<ApiResponse<HeroSection>, AppError> {
    let hero = process_update_hero(content.as_ref(), patch).await?;
    Ok(ApiResponse::ok(hero).with_message("Hero section updated"))
}

async fn replace<T: ContentItem>(
    State(content): Content,
    JsonBody(body): JsonBody<serde_json::Value>,
) -> Result<ApiResponse<Vec<T>>, AppError> {
    let items = process_replace_section::<T>(content.as_ref(), body).await?;
    Ok(ApiResponse::ok(items).with_message(format!("{} updated", T::SECTION.label())))
}

/// `/api/content`
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/", get(public_content))
}

/// `/api/admin/content`
pub fn admin_content_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_content))
        .route("/hero", patch(update_hero))
        .route("/school-passers", put(replace::<SchoolPasser>))
        .route("/youtube-videos", put(replace::<YoutubeVideo>))
        .route("/instructors", put(replace::<FeaturedInstructor>))
        .route("/instagram-posts", put(replace::<InstagramPost>))
        .route("/history-passers", put(replace::<HistoryPasser>))
}
