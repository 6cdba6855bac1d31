//! The home-page content singleton: hero banner plus five ordered lists.

use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::bson_serde::{bson_deserializer_options, object_id, opt_timestamp};
use crate::models::entity::non_blank;

/// Value of the `key` field identifying the singleton document.
pub const HOME_KEY: &str = "home";

pub const DEFAULT_HERO_SUBTITLE: &str = "MAKE YOUR STYLE";
pub const DEFAULT_HERO_TITLE: &str = "입시를 스타일하다, 민액터스";
pub const DEFAULT_HERO_BUTTON_TEXT: &str = "2024 합격자 전체보기";
pub const DEFAULT_HERO_BUTTON_LINK: &str = "/passers";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroSection {
    pub image_urls: Vec<String>,
    pub subtitle: String,
    pub title: String,
    pub button_text: String,
    pub button_link: String,
}

/// Body of `PATCH /api/admin/content/hero`. Absent fields keep their value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroPatch {
    pub image_urls: Option<Vec<String>>,
    pub subtitle: Option<String>,
    pub title: Option<String>,
    pub button_text: Option<String>,
    pub button_link: Option<String>,
}

impl HeroPatch {
    pub fn apply(self, current: HeroSection) -> HeroSection {
        HeroSection {
            image_urls: self.image_urls.unwrap_or(current.image_urls),
            subtitle: self.subtitle.unwrap_or(current.subtitle),
            title: self.title.unwrap_or(current.title),
            button_text: self.button_text.unwrap_or(current.button_text),
            button_link: self.button_link.unwrap_or(current.button_link),
        }
    }
}

/// The five replaceable lists of the home page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSection {
    SchoolPassers,
    YoutubeVideos,
    Instructors,
    InstagramPosts,
    HistoryPassers,
}

impl ContentSection {
    /// Field name in the stored document and in request bodies.
    pub fn field(&self) -> &'static str {
        match self {
            ContentSection::SchoolPassers => "schoolPassers",
            ContentSection::YoutubeVideos => "youtubeVideos",
            ContentSection::Instructors => "instructors",
            ContentSection::InstagramPosts => "instagramPosts",
            ContentSection::HistoryPassers => "historyPassers",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentSection::SchoolPassers => "School passers",
            ContentSection::YoutubeVideos => "YouTube videos",
            ContentSection::Instructors => "Featured instructors",
            ContentSection::InstagramPosts => "Instagram posts",
            ContentSection::HistoryPassers => "Passer history",
        }
    }
}

/// An element of one of the home-page lists.
pub trait ContentItem: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const SECTION: ContentSection;

    fn order(&self) -> i32;

    /// Use the list position as `order` when the client sent none.
    fn assign_order(&mut self, index: i32);

    fn validate(&self) -> Result<(), AppError> {
        Ok(())
    }
}

fn require_text(section: ContentSection, field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!(
            "{}: every entry needs a {field}",
            section.label()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolPasser {
    #[serde(rename = "_id", with = "object_id", default = "ObjectId::new")]
    pub id: ObjectId,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub count: i32,
    #[serde(default)]
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

impl ContentItem for SchoolPasser {
    const SECTION: ContentSection = ContentSection::SchoolPassers;

    fn order(&self) -> i32 {
        self.order.unwrap_or(0)
    }

    fn assign_order(&mut self, index: i32) {
        self.order.get_or_insert(index);
    }

    fn validate(&self) -> Result<(), AppError> {
        require_text(Self::SECTION, "school", &self.school)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YoutubeVideo {
    #[serde(rename = "_id", with = "object_id", default = "ObjectId::new")]
    pub id: ObjectId,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

impl ContentItem for YoutubeVideo {
    const SECTION: ContentSection = ContentSection::YoutubeVideos;

    fn order(&self) -> i32 {
        self.order.unwrap_or(0)
    }

    fn assign_order(&mut self, index: i32) {
        self.order.get_or_insert(index);
    }

    fn validate(&self) -> Result<(), AppError> {
        require_text(Self::SECTION, "title", &self.title)
    }
}

/// An instructor card on the home page (independent of the instructor records).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedInstructor {
    #[serde(rename = "_id", with = "object_id", default = "ObjectId::new")]
    pub id: ObjectId,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

impl ContentItem for FeaturedInstructor {
    const SECTION: ContentSection = ContentSection::Instructors;

    fn order(&self) -> i32 {
        self.order.unwrap_or(0)
    }

    fn assign_order(&mut self, index: i32) {
        self.order.get_or_insert(index);
    }

    fn validate(&self) -> Result<(), AppError> {
        require_text(Self::SECTION, "name", &self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstagramPost {
    #[serde(rename = "_id", with = "object_id", default = "ObjectId::new")]
    pub id: ObjectId,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

impl ContentItem for InstagramPost {
    const SECTION: ContentSection = ContentSection::InstagramPosts;

    fn order(&self) -> i32 {
        self.order.unwrap_or(0)
    }

    fn assign_order(&mut self, index: i32) {
        self.order.get_or_insert(index);
    }
}

/// One line of the scrolling passer history ("한국예술종합학교 25학년도" / "이찬민").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPasser {
    #[serde(rename = "_id", with = "object_id", default = "ObjectId::new")]
    pub id: ObjectId,
    #[serde(default)]
    pub left_text: String,
    #[serde(default)]
    pub right_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

impl ContentItem for HistoryPasser {
    const SECTION: ContentSection = ContentSection::HistoryPassers;

    fn order(&self) -> i32 {
        self.order.unwrap_or(0)
    }

    fn assign_order(&mut self, index: i32) {
        self.order.get_or_insert(index);
    }

    fn validate(&self) -> Result<(), AppError> {
        require_text(Self::SECTION, "left text", &self.left_text)?;
        require_text(Self::SECTION, "right text", &self.right_text)
    }
}

/// Canonical view of the content singleton.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeContent {
    #[serde(rename = "_id", with = "object_id")]
    pub id: ObjectId,
    pub hero_section: HeroSection,
    pub school_passers: Vec<SchoolPasser>,
    pub youtube_videos: Vec<YoutubeVideo>,
    pub instructors: Vec<FeaturedInstructor>,
    pub instagram_posts: Vec<InstagramPost>,
    pub history_passers: Vec<HistoryPasser>,
    #[serde(skip_serializing_if = "Option::is_none", with = "opt_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn hero_text(hero: Option<&Document>, field: &str) -> String {
    hero.and_then(|h| h.get_str(field).ok())
        .unwrap_or_default()
        .to_string()
}

/// Read the hero section from a raw document, folding the legacy single
/// `imageUrl` into `imageUrls` when the list is absent or empty.
pub fn normalize_hero(raw: &Document) -> HeroSection {
    let hero = raw.get_document("heroSection").ok();

    let mut image_urls: Vec<String> = hero
        .and_then(|h| h.get_array("imageUrls").ok())
        .map(|urls| {
            urls.iter()
                .filter_map(|url| url.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    if image_urls.is_empty() {
        if let Some(legacy) = hero
            .and_then(|h| h.get_str("imageUrl").ok())
            .and_then(|url| non_blank(Some(url.to_string())))
        {
            image_urls.push(legacy);
        }
    }

    HeroSection {
        image_urls,
        subtitle: hero_text(hero, "subtitle"),
        title: hero_text(hero, "title"),
        button_text: hero_text(hero, "buttonText"),
        button_link: hero_text(hero, "buttonLink"),
    }
}

fn decode_list<T: ContentItem>(raw: &Document) -> Result<Vec<T>, AppError> {
    let Ok(items) = raw.get_array(T::SECTION.field()) else {
        return Ok(Vec::new());
    };
    items
        .iter()
        .cloned()
        .map(|item| {
            bson::from_bson_with_options(item, bson_deserializer_options()).map_err(|e| {
                AppError::Database(format!(
                    "Malformed {} entry in content document: {e}",
                    T::SECTION.field()
                ))
            })
        })
        .collect()
}

/// The single read adapter for the stored content document.
pub fn normalize_content(raw: &Document) -> Result<HomeContent, AppError> {
    let id = raw
        .get_object_id("_id")
        .map_err(|e| AppError::Database(format!("Content document has no _id: {e}")))?;

    Ok(HomeContent {
        id,
        hero_section: normalize_hero(raw),
        school_passers: decode_list(raw)?,
        youtube_videos: decode_list(raw)?,
        instructors: decode_list(raw)?,
        instagram_posts: decode_list(raw)?,
        history_passers: decode_list(raw)?,
        updated_at: raw.get_datetime("updatedAt").ok().map(|dt| dt.to_chrono()),
    })
}

/// Fields written when the singleton is created lazily.
pub fn default_content_document() -> Document {
    let now = bson::DateTime::now();
    doc! {
        "heroSection": {
            "imageUrls": Bson::Array(Vec::new()),
            "subtitle": DEFAULT_HERO_SUBTITLE,
            "title": DEFAULT_HERO_TITLE,
            "buttonText": DEFAULT_HERO_BUTTON_TEXT,
            "buttonLink": DEFAULT_HERO_BUTTON_LINK,
        },
        "schoolPassers": Bson::Array(Vec::new()),
        "youtubeVideos": Bson::Array(Vec::new()),
        "instructors": Bson::Array(Vec::new()),
        "instagramPosts": Bson::Array(Vec::new()),
        "historyPassers": Bson::Array(Vec::new()),
        "createdAt": now,
        "updatedAt": now,
    }
}
