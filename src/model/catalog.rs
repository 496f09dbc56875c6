use chrono::{DateTime, Utc};
use std::fmt::Display;

/// Motion picture style age rating, ordered from least to most restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum AgeRating {
    #[serde(rename = "G")]
    G,
    #[serde(rename = "PG")]
    Pg,
    #[serde(rename = "PG-13")]
    Pg13,
    #[serde(rename = "R")]
    R,
    #[serde(rename = "NC-17")]
    Nc17,
}

impl Default for AgeRating {
    fn default() -> Self {
        Self::G
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Movie,
    Series,
    Channel,
}

impl Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            Self::Movie => "movie",
            Self::Series => "series",
            Self::Channel => "channel",
        })
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub age_rating: AgeRating,
    pub stream_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub premium_only: bool,
    #[serde(default)]
    pub hidden: bool,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub views: u64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub number: u32,
    pub title: String,
    pub stream_url: String,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub number: u32,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub age_rating: AgeRating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub seasons: Vec<Season>,
    #[serde(default)]
    pub premium_only: bool,
    #[serde(default)]
    pub hidden: bool,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub views: u64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub stream_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epg_id: Option<String>,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub age_rating: AgeRating,
    #[serde(default)]
    pub premium_only: bool,
    #[serde(default)]
    pub hidden: bool,
}

impl Movie {
    fn strip_streams(&mut self) {
        self.stream_url.clear();
    }
}

impl Series {
    fn strip_streams(&mut self) {
        self.seasons.iter_mut()
            .flat_map(|season| season.episodes.iter_mut())
            .for_each(|episode| episode.stream_url.clear());
    }
}

/// Common view over catalog records used by filtering, sorting and moderation.
pub trait CatalogItem {
    const KIND: ContentKind;

    fn id(&self) -> &str;
    fn title(&self) -> &str;
    fn genres(&self) -> &[String];
    fn age_rating(&self) -> AgeRating;
    fn is_hidden(&self) -> bool;
    fn set_hidden(&mut self, hidden: bool);
    fn is_premium_only(&self) -> bool;
    /// Removes playable urls, used for premium content shown to free users.
    fn clear_stream_urls(&mut self);
    fn year(&self) -> Option<u16> { None }
    fn rating(&self) -> Option<f32> { None }
    fn views(&self) -> u64 { 0 }
    fn added_at(&self) -> Option<DateTime<Utc>> { None }
}

macro_rules! impl_catalog_item {
    ($type:ty, $kind:expr) => {
        impl CatalogItem for $type {
            const KIND: ContentKind = $kind;

            fn id(&self) -> &str { &self.id }
            fn title(&self) -> &str { &self.title }
            fn genres(&self) -> &[String] { &self.genres }
            fn age_rating(&self) -> AgeRating { self.age_rating }
            fn is_hidden(&self) -> bool { self.hidden }
            fn set_hidden(&mut self, hidden: bool) { self.hidden = hidden; }
            fn is_premium_only(&self) -> bool { self.premium_only }
            fn clear_stream_urls(&mut self) { self.strip_streams(); }
            fn year(&self) -> Option<u16> { self.year }
            fn rating(&self) -> Option<f32> { self.rating }
            fn views(&self) -> u64 { self.views }
            fn added_at(&self) -> Option<DateTime<Utc>> { Some(self.added_at) }
        }
    };
}

impl_catalog_item!(Movie, ContentKind::Movie);
impl_catalog_item!(Series, ContentKind::Series);

impl CatalogItem for Channel {
    const KIND: ContentKind = ContentKind::Channel;

    fn id(&self) -> &str { &self.id }
    fn title(&self) -> &str { &self.name }
    // the channel group acts as genre
    fn genres(&self) -> &[String] { std::slice::from_ref(&self.group) }
    fn age_rating(&self) -> AgeRating { self.age_rating }
    fn is_hidden(&self) -> bool { self.hidden }
    fn set_hidden(&mut self, hidden: bool) { self.hidden = hidden; }
    fn is_premium_only(&self) -> bool { self.premium_only }
    fn clear_stream_urls(&mut self) { self.stream_url.clear(); }
}
