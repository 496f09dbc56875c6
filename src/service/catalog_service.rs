use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::model::{CatalogItem, Channel, ContentKind, Movie, ParentalControls, Series};
use crate::repository::{JsonStore, Repositories};
use crate::streamhub_error::StreamHubError;
use crate::utils::{sanitize_text, MSG_CONTENT_NOT_FOUND, MSG_INVALID_INPUT, MSG_PIN_REQUIRED};

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 200;
const STREAM_SCHEMES: [&str; 5] = ["http", "https", "rtmp", "rtsp", "udp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSort {
    Title,
    Year,
    Rating,
    Added,
    Views,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub sort: Option<CatalogSort>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPage<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

/// Who is looking at the catalog.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub premium: bool,
    pub admin: bool,
    /// active parental controls, `None` when disabled or unlocked by pin
    pub parental: Option<ParentalControls>,
}

impl Viewer {
    fn can_see<T: CatalogItem>(&self, item: &T) -> bool {
        if self.admin {
            return true;
        }
        !item.is_hidden() && self.parental.as_ref().is_none_or(|p| p.allows(item.age_rating(), item.genres()))
    }

    fn present<T: CatalogItem>(&self, mut item: T) -> T {
        if item.is_premium_only() && !self.premium && !self.admin {
            item.clear_stream_urls();
        }
        item
    }
}

/// Catalog records the admin api can create and replace.
pub trait CatalogRecord: CatalogItem + Clone + Serialize + DeserializeOwned + Send + Sync {
    fn set_id(&mut self, id: String);
    /// Sanitizes the text fields and checks the mandatory ones.
    fn prepare(&mut self) -> Result<(), StreamHubError>;
    /// Keeps the server managed fields of the stored record.
    fn keep_managed_fields(&mut self, stored: &Self);
    fn init_managed_fields(&mut self, now: DateTime<Utc>);
}

fn is_valid_stream_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| STREAM_SCHEMES.contains(&u.scheme()))
}

fn clean_genres(genres: &[String]) -> Vec<String> {
    genres.iter().map(|g| sanitize_text(g, 40)).filter(|g| !g.is_empty()).collect()
}

impl CatalogRecord for Movie {
    fn set_id(&mut self, id: String) { self.id = id; }

    fn prepare(&mut self) -> Result<(), StreamHubError> {
        self.title = sanitize_text(&self.title, 200);
        self.description = sanitize_text(&self.description, 4000);
        self.genres = clean_genres(&self.genres);
        if self.title.is_empty() || !is_valid_stream_url(self.stream_url.trim()) {
            return Err(StreamHubError::validation(MSG_INVALID_INPUT));
        }
        self.stream_url = self.stream_url.trim().to_string();
        Ok(())
    }

    fn keep_managed_fields(&mut self, stored: &Self) {
        self.added_at = stored.added_at;
        self.views = stored.views;
    }

    fn init_managed_fields(&mut self, now: DateTime<Utc>) {
        self.added_at = now;
        self.views = 0;
    }
}

impl CatalogRecord for Series {
    fn set_id(&mut self, id: String) { self.id = id; }

    fn prepare(&mut self) -> Result<(), StreamHubError> {
        self.title = sanitize_text(&self.title, 200);
        self.description = sanitize_text(&self.description, 4000);
        self.genres = clean_genres(&self.genres);
        if self.title.is_empty() {
            return Err(StreamHubError::validation(MSG_INVALID_INPUT));
        }
        for episode in self.seasons.iter_mut().flat_map(|s| s.episodes.iter_mut()) {
            episode.title = sanitize_text(&episode.title, 200);
            if episode.id.trim().is_empty() {
                episode.id = uuid::Uuid::new_v4().to_string();
            }
            if !is_valid_stream_url(episode.stream_url.trim()) {
                return Err(StreamHubError::validation(MSG_INVALID_INPUT));
            }
        }
        self.seasons.sort_by_key(|s| s.number);
        Ok(())
    }

    fn keep_managed_fields(&mut self, stored: &Self) {
        self.added_at = stored.added_at;
        self.views = stored.views;
    }

    fn init_managed_fields(&mut self, now: DateTime<Utc>) {
        self.added_at = now;
        self.views = 0;
    }
}

impl CatalogRecord for Channel {
    fn set_id(&mut self, id: String) { self.id = id; }

    fn prepare(&mut self) -> Result<(), StreamHubError> {
        self.name = sanitize_text(&self.name, 120);
        self.group = sanitize_text(&self.group, 60);
        if self.name.is_empty() || !is_valid_stream_url(self.stream_url.trim()) {
            return Err(StreamHubError::validation(MSG_INVALID_INPUT));
        }
        self.stream_url = self.stream_url.trim().to_string();
        Ok(())
    }

    fn keep_managed_fields(&mut self, _stored: &Self) {}

    fn init_managed_fields(&mut self, _now: DateTime<Utc>) {}
}

fn compare_by<T: CatalogItem>(sort: CatalogSort, a: &T, b: &T) -> Ordering {
    match sort {
        CatalogSort::Title => a.title().to_lowercase().cmp(&b.title().to_lowercase()),
        CatalogSort::Year => b.year().cmp(&a.year()),
        CatalogSort::Rating => b.rating().partial_cmp(&a.rating()).unwrap_or(Ordering::Equal),
        CatalogSort::Added => b.added_at().cmp(&a.added_at()),
        CatalogSort::Views => b.views().cmp(&a.views()),
    }
}

fn matches_query<T: CatalogItem>(item: &T, query: &CatalogQuery) -> bool {
    let search_ok = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
        .is_none_or(|s| item.title().to_lowercase().contains(&s.to_lowercase()));
    let genre_ok = query.genre.as_deref().map(str::trim).filter(|g| !g.is_empty())
        .is_none_or(|g| item.genres().iter().any(|ig| ig.eq_ignore_ascii_case(g)));
    let year_ok = query.year.is_none_or(|y| item.year() == Some(y));
    search_ok && genre_ok && year_ok
}

/// Filters, sorts and pages the records for the viewer.
pub fn query_items<T: CatalogItem>(items: Vec<T>, query: &CatalogQuery, viewer: &Viewer) -> CatalogPage<T> {
    let mut matching: Vec<T> = items.into_iter()
        .filter(|item| viewer.can_see(item) && matches_query(item, query))
        .collect();
    if let Some(sort) = query.sort {
        matching.sort_by(|a, b| compare_by(sort, a, b));
    }
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = query.page.unwrap_or(1).max(1);
    let total = matching.len();
    let items = matching.into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .map(|item| viewer.present(item))
        .collect();
    CatalogPage { items, total, page, limit }
}

pub async fn list<T: CatalogRecord>(store: &JsonStore<T>, query: &CatalogQuery, viewer: &Viewer) -> CatalogPage<T> {
    query_items(store.load().await, query, viewer)
}

pub async fn get<T: CatalogRecord>(store: &JsonStore<T>, id: &str, viewer: &Viewer) -> Result<T, StreamHubError> {
    let item = store.find(|item| item.id() == id).await
        .filter(|item| viewer.admin || !item.is_hidden())
        .ok_or_else(|| StreamHubError::not_found(MSG_CONTENT_NOT_FOUND))?;
    if !viewer.can_see(&item) {
        return Err(StreamHubError::forbidden(MSG_PIN_REQUIRED));
    }
    Ok(viewer.present(item))
}

pub async fn create<T: CatalogRecord>(store: &JsonStore<T>, mut item: T, now: DateTime<Utc>) -> Result<T, StreamHubError> {
    item.prepare()?;
    item.init_managed_fields(now);
    if item.id().trim().is_empty() {
        item.set_id(uuid::Uuid::new_v4().to_string());
    }
    let created = store.update(|items| {
        if items.iter().any(|i| i.id() == item.id()) {
            return Err(StreamHubError::conflict(MSG_INVALID_INPUT));
        }
        items.push(item.clone());
        Ok(item)
    }).await?;
    info!("Added {:?} {}", T::KIND, created.title());
    Ok(created)
}

pub async fn replace<T: CatalogRecord>(store: &JsonStore<T>, id: &str, mut item: T) -> Result<T, StreamHubError> {
    item.prepare()?;
    item.set_id(id.to_string());
    store.update(|items| {
        let stored = items.iter_mut().find(|i| i.id() == id)
            .ok_or_else(|| StreamHubError::not_found(MSG_CONTENT_NOT_FOUND))?;
        item.keep_managed_fields(stored);
        *stored = item.clone();
        Ok(item)
    }).await
}

pub async fn delete<T: CatalogRecord>(store: &JsonStore<T>, id: &str) -> Result<(), StreamHubError> {
    store.update(|items| {
        let before = items.len();
        items.retain(|i| i.id() != id);
        if before == items.len() {
            return Err(StreamHubError::not_found(MSG_CONTENT_NOT_FOUND));
        }
        Ok(())
    }).await?;
    info!("Deleted {:?} {id}", T::KIND);
    Ok(())
}

async fn set_hidden_in<T: CatalogRecord>(store: &JsonStore<T>, id: &str, hidden: bool) -> Result<(), StreamHubError> {
    store.update(|items| {
        let item = items.iter_mut().find(|i| i.id() == id)
            .ok_or_else(|| StreamHubError::not_found(MSG_CONTENT_NOT_FOUND))?;
        item.set_hidden(hidden);
        Ok(())
    }).await
}

pub async fn set_hidden(repos: &Repositories, kind: ContentKind, id: &str, hidden: bool) -> Result<(), StreamHubError> {
    match kind {
        ContentKind::Movie => set_hidden_in(&repos.movies, id, hidden).await,
        ContentKind::Series => set_hidden_in(&repos.series, id, hidden).await,
        ContentKind::Channel => set_hidden_in(&repos.channels, id, hidden).await,
    }
}

pub async fn content_exists(repos: &Repositories, kind: ContentKind, id: &str) -> bool {
    match kind {
        ContentKind::Movie => repos.movies.find(|i| i.id == id).await.is_some(),
        ContentKind::Series => repos.series.find(|i| i.id == id).await.is_some(),
        ContentKind::Channel => repos.channels.find(|i| i.id == id).await.is_some(),
    }
}

pub const PLAYLIST_RESOURCE: &str = "playlist";

/// Name an access token for one playable item is bound to.
pub fn stream_resource(kind: ContentKind, id: &str, episode_id: Option<&str>) -> String {
    match episode_id {
        Some(episode_id) if kind == ContentKind::Series => format!("{kind}/{id}/{episode_id}"),
        _ => format!("{kind}/{id}"),
    }
}

/// Playable url of a visible content item and whether it is premium only.
/// Series resolve the first episode unless `episode_id` is given.
pub async fn find_stream(repos: &Repositories, kind: ContentKind, id: &str, episode_id: Option<&str>, viewer: &Viewer) -> Result<(String, bool), StreamHubError> {
    let viewer = Viewer { premium: true, ..viewer.clone() };
    match kind {
        ContentKind::Movie => {
            let movie = get(&repos.movies, id, &viewer).await?;
            Ok((movie.stream_url, movie.premium_only))
        }
        ContentKind::Series => {
            let series = get(&repos.series, id, &viewer).await?;
            let url = series.seasons.iter().flat_map(|s| s.episodes.iter())
                .find(|e| episode_id.is_none_or(|eid| e.id == eid))
                .map(|e| e.stream_url.clone())
                .ok_or_else(|| StreamHubError::not_found(MSG_CONTENT_NOT_FOUND))?;
            Ok((url, series.premium_only))
        }
        ContentKind::Channel => {
            let channel = get(&repos.channels, id, &viewer).await?;
            Ok((channel.stream_url, channel.premium_only))
        }
    }
}

/// Counts a playback for movies and series, channels keep no view count.
pub async fn count_view(repos: &Repositories, kind: ContentKind, id: &str) -> Result<(), StreamHubError> {
    match kind {
        ContentKind::Movie => repos.movies.update(|movies| {
            if let Some(m) = movies.iter_mut().find(|m| m.id == id) { m.views += 1; }
            Ok(())
        }).await,
        ContentKind::Series => repos.series.update(|items| {
            if let Some(s) = items.iter_mut().find(|s| s.id == id) { s.views += 1; }
            Ok(())
        }).await,
        ContentKind::Channel => Ok(()),
    }
}

fn escape_attr(value: &str) -> String {
    value.replace('"', "'").replace(['\r', '\n'], " ")
}

impl Channel {
    pub fn to_m3u(&self) -> String {
        let mut line = format!("#EXTINF:-1 tvg-id=\"{}\" tvg-name=\"{}\" group-title=\"{}\"",
                               escape_attr(self.epg_id.as_deref().unwrap_or_default()),
                               escape_attr(&self.name), escape_attr(&self.group));
        if let Some(logo) = self.logo.as_deref().filter(|l| !l.is_empty()) {
            line = format!("{line} tvg-logo=\"{}\"", escape_attr(logo));
        }
        if let Some(number) = self.number {
            line = format!("{line} tvg-chno=\"{number}\"");
        }
        format!("{line},{}\n{}", escape_attr(&self.name), self.stream_url)
    }
}

/// Extended m3u playlist of the channels visible to the viewer, ordered by channel number.
pub fn render_playlist(channels: Vec<Channel>, viewer: &Viewer) -> String {
    let mut visible: Vec<Channel> = channels.into_iter()
        .filter(|c| viewer.can_see(c) && (!c.premium_only || viewer.premium || viewer.admin))
        .collect();
    visible.sort_by(|a, b| a.number.unwrap_or(u32::MAX).cmp(&b.number.unwrap_or(u32::MAX))
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase())));
    let mut playlist = String::from("#EXTM3U\n");
    for channel in &visible {
        playlist.push_str(&channel.to_m3u());
        playlist.push('\n');
    }
    playlist
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{count_view, create, delete, find_stream, get, query_items, render_playlist, replace, stream_resource, CatalogQuery, CatalogSort, Viewer};
    use crate::model::{AgeRating, Channel, ContentKind, Movie, ParentalControls};
    use crate::service::tests::test_env;
    use crate::streamhub_error::StreamHubErrorKind;
    use chrono::Utc;

    pub(crate) fn test_movie(id: &str, title: &str, year: u16, age_rating: AgeRating) -> Movie {
        Movie {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            genres: vec!["Drama".to_string()],
            year: Some(year),
            duration_minutes: Some(100),
            rating: Some(7.0),
            age_rating,
            stream_url: format!("https://cdn.example.org/{id}.m3u8"),
            poster_url: None,
            premium_only: false,
            hidden: false,
            added_at: Utc::now(),
            views: 0,
        }
    }

    pub(crate) fn test_channel(id: &str, number: u32, premium_only: bool) -> Channel {
        Channel {
            id: id.to_string(),
            name: format!("Channel {id}"),
            group: "News".to_string(),
            logo: None,
            stream_url: format!("http://iptv.example.org/{id}.ts"),
            epg_id: Some(format!("{id}.fr")),
            number: Some(number),
            age_rating: AgeRating::G,
            premium_only,
            hidden: false,
        }
    }

    #[test]
    fn test_query_filter_sort_page() {
        let mut hidden = test_movie("m4", "Hidden", 2001, AgeRating::G);
        hidden.hidden = true;
        let movies = vec![
            test_movie("m1", "Alpha", 1999, AgeRating::G),
            test_movie("m2", "Beta", 2010, AgeRating::R),
            test_movie("m3", "Gamma", 2005, AgeRating::Pg13),
            hidden,
        ];
        let query = CatalogQuery { sort: Some(CatalogSort::Year), ..CatalogQuery::default() };
        let page = query_items(movies.clone(), &query, &Viewer::default());
        assert_eq!(page.total, 3);
        assert_eq!(page.items.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec!["m2", "m3", "m1"]);

        let query = CatalogQuery { search: Some("amm".to_string()), ..CatalogQuery::default() };
        assert_eq!(query_items(movies.clone(), &query, &Viewer::default()).items[0].id, "m3");

        let query = CatalogQuery { sort: Some(CatalogSort::Title), page: Some(2), limit: Some(2), ..CatalogQuery::default() };
        let page = query_items(movies.clone(), &query, &Viewer::default());
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "m3");

        let parental = ParentalControls {
            user_id: "u".to_string(),
            enabled: true,
            pin_hash: None,
            max_age_rating: AgeRating::Pg13,
            blocked_genres: vec![],
            updated_at: Utc::now(),
        };
        let viewer = Viewer { parental: Some(parental), ..Viewer::default() };
        let page = query_items(movies, &CatalogQuery::default(), &viewer);
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|m| m.age_rating <= AgeRating::Pg13));
    }

    #[test]
    fn test_premium_streams_redacted() {
        let mut movie = test_movie("m1", "Alpha", 1999, AgeRating::G);
        movie.premium_only = true;
        let page = query_items(vec![movie.clone()], &CatalogQuery::default(), &Viewer::default());
        assert!(page.items[0].stream_url.is_empty());
        let viewer = Viewer { premium: true, ..Viewer::default() };
        let page = query_items(vec![movie], &CatalogQuery::default(), &viewer);
        assert!(!page.items[0].stream_url.is_empty());
    }

    #[tokio::test]
    async fn test_admin_crud() {
        let env = test_env();
        let now = Utc::now();
        let mut movie = test_movie("", "<i>Alpha</i>", 1999, AgeRating::G);
        movie.views = 99;
        let created = create(&env.repos.movies, movie, now).await.unwrap();
        assert!(!created.id.is_empty());
        assert_eq!(created.title, "Alpha");
        assert_eq!(created.views, 0);

        let mut changed = created.clone();
        changed.title = "Alpha 2".to_string();
        let replaced = replace(&env.repos.movies, &created.id, changed).await.unwrap();
        assert_eq!(replaced.added_at, created.added_at);
        assert_eq!(get(&env.repos.movies, &created.id, &Viewer::default()).await.unwrap().title, "Alpha 2");

        let mut invalid = created.clone();
        invalid.stream_url = "file:///etc/passwd".to_string();
        assert_eq!(replace(&env.repos.movies, &created.id, invalid).await.unwrap_err().kind, StreamHubErrorKind::Validation);

        find_stream(&env.repos, ContentKind::Movie, &created.id, None, &Viewer::default()).await.unwrap();
        assert_eq!(get(&env.repos.movies, &created.id, &Viewer::default()).await.unwrap().views, 0);
        count_view(&env.repos, ContentKind::Movie, &created.id).await.unwrap();
        assert_eq!(get(&env.repos.movies, &created.id, &Viewer::default()).await.unwrap().views, 1);

        delete(&env.repos.movies, &created.id).await.unwrap();
        assert_eq!(delete(&env.repos.movies, &created.id).await.unwrap_err().kind, StreamHubErrorKind::NotFound);
    }

    #[test]
    fn test_render_playlist() {
        let channels = vec![test_channel("c2", 2, false), test_channel("c1", 1, false), test_channel("c3", 3, true)];
        let playlist = render_playlist(channels.clone(), &Viewer::default());
        assert!(playlist.starts_with("#EXTM3U\n#EXTINF:-1 tvg-id=\"c1.fr\" tvg-name=\"Channel c1\" group-title=\"News\" tvg-chno=\"1\",Channel c1\nhttp://iptv.example.org/c1.ts\n"));
        assert!(!playlist.contains("c3.ts"));
        let premium = render_playlist(channels, &Viewer { premium: true, ..Viewer::default() });
        assert!(premium.contains("c3.ts"));
    }

    #[test]
    fn test_huge_page_is_empty() {
        let movies = vec![test_movie("m1", "Alpha", 1999, AgeRating::G)];
        let query = CatalogQuery { page: Some(usize::MAX), limit: Some(50), ..CatalogQuery::default() };
        let page = query_items(movies, &query, &Viewer::default());
        assert!(page.items.is_empty());
        assert_eq!(page.total, 1);
        assert_eq!(page.page, usize::MAX);
    }

    #[test]
    fn test_stream_resource() {
        assert_eq!(stream_resource(ContentKind::Movie, "m1", Some("e1")), "movie/m1");
        assert_eq!(stream_resource(ContentKind::Series, "s1", Some("e1")), "series/s1/e1");
        assert_eq!(stream_resource(ContentKind::Series, "s1", None), "series/s1");
        assert_eq!(stream_resource(ContentKind::Channel, "c1", None), "channel/c1");
    }
}
