//! Home-page content: normalised reads, hero edits and list replacement.

use crate::db::content_repository::ContentRepository;
use crate::error::AppError;
use crate::models::bson_serde::bson_serializer_options;
use crate::models::content::{
    normalize_content, normalize_hero, ContentItem, HeroPatch, HeroSection, HomeContent,
};
use crate::models::entity::clean_list;

/// The singleton as stored, legacy fields folded in.
pub async fn process_load_content(repo: &dyn ContentRepository) -> Result<HomeContent, AppError> {
    normalize_content(&repo.load().await?)
}

/// The public view also orders the featured instructors.
pub async fn process_public_content(
    repo: &dyn ContentRepository,
) -> Result<HomeContent, AppError> {
    let mut content = process_load_content(repo).await?;
    content.instructors.sort_by_key(|item| item.order());
    Ok(content)
}

/// Merge the provided hero fields over the current (normalised) hero and
/// write all of them back, dropping the legacy single `imageUrl`.
pub async fn process_update_hero(
    repo: &dyn ContentRepository,
    patch: HeroPatch,
) -> Result<HeroSection, AppError> {
    let current = normalize_hero(&repo.load().await?);
    let mut hero = patch.apply(current);
    hero.image_urls = clean_list(hero.image_urls);

    let stored = repo.save_hero(&hero).await?;
    tracing::info!(images = hero.image_urls.len(), "hero section updated");
    Ok(normalize_hero(&stored))
}

/// Replace one list wholesale from a body shaped `{ "<field>": [..] }`.
///
/// Elements without an `order` take their array index; elements without an
/// `_id` get a fresh one.
pub async fn process_replace_section<T: ContentItem>(
    repo: &dyn ContentRepository,
    body: serde_json::Value,
) -> Result<Vec<T>, AppError> {
    let field = T::SECTION.field();
    let Some(raw) = body.get(field).filter(|list| list.is_array()) else {
        return Err(AppError::BadRequest(format!("{field} must be a list")));
    };

    let mut items: Vec<T> = serde_json::from_value(raw.clone())
        .map_err(|e| AppError::BadRequest(format!("Invalid {field}: {e}")))?;

    let mut encoded = Vec::with_capacity(items.len());
    for (index, item) in items.iter_mut().enumerate() {
        item.assign_order(index as i32);
        item.validate()?;
        encoded.push(
            bson::to_bson_with_options(&*item, bson_serializer_options())
                .map_err(|e| AppError::Internal(format!("Failed to encode {field}: {e}")))?,
        );
    }

    repo.replace_section(T::SECTION, encoded).await?;
    tracing::info!(section = field, count = items.len(), "content list replaced");
    Ok(items)
}
