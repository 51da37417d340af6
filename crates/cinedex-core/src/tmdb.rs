//! TMDB v3 client implementing [`CatalogSource`].

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::catalog::{CatalogSource, Listing};
use crate::config::CatalogConfig;
use crate::error::{CoreError, Result};
use crate::model::{CatalogItem, Genre, PersonRecord, RawResult, TitleRecord};

// ── Wire types ────────────────────────────────────────────────────────────────

/// Paged result envelope.  `results` is required: a body without it is
/// treated as malformed rather than as an empty page.
#[derive(Debug, Deserialize)]
struct Page<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct GenreList {
    genres: Vec<Genre>,
}

/// One record as TMDB sends it.  Movies carry `title`/`release_date`, shows
/// carry `name`/`first_air_date`, people carry `name`/`profile_path`.
#[derive(Debug, Deserialize)]
struct TmdbRecord {
    id: u64,
    media_type: Option<String>,
    title: Option<String>,
    name: Option<String>,
    vote_average: Option<f32>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    #[serde(default)]
    genre_ids: Vec<u32>,
    poster_path: Option<String>,
    profile_path: Option<String>,
    #[serde(default)]
    known_for: Vec<KnownFor>,
}

#[derive(Debug, Deserialize)]
struct KnownFor {
    title: Option<String>,
    name: Option<String>,
}

impl TmdbRecord {
    /// Tag the record by `media_type`, falling back to `default_kind` for
    /// endpoints that only ever return one kind and omit the field.
    fn into_raw(self, default_kind: Option<&str>) -> RawResult {
        let kind = self.media_type.clone();
        match kind.as_deref().or(default_kind) {
            Some("movie") => RawResult::Movie(TitleRecord {
                id: self.id,
                title: self.title.or(self.name).unwrap_or_default(),
                rating: self.vote_average,
                release_date: non_empty(self.release_date),
                genre_ids: self.genre_ids,
                poster_path: non_empty(self.poster_path),
            }),
            Some("tv") => RawResult::Show(TitleRecord {
                id: self.id,
                title: self.name.or(self.title).unwrap_or_default(),
                rating: self.vote_average,
                release_date: non_empty(self.first_air_date).or(non_empty(self.release_date)),
                genre_ids: self.genre_ids,
                poster_path: non_empty(self.poster_path),
            }),
            Some("person") => RawResult::Person(PersonRecord {
                id: self.id,
                name: self.name.or(self.title).unwrap_or_default(),
                profile_path: non_empty(self.profile_path),
                known_for: self
                    .known_for
                    .into_iter()
                    .filter_map(|k| k.title.or(k.name))
                    .collect(),
            }),
            _ => RawResult::Unknown {
                id: self.id,
                media_type: kind,
            },
        }
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

fn into_items(records: Vec<TmdbRecord>, default_kind: &str) -> Vec<CatalogItem> {
    records
        .into_iter()
        .filter_map(|r| r.into_raw(Some(default_kind)).to_item())
        .collect()
}

// ── Client ────────────────────────────────────────────────────────────────────

pub struct TmdbClient {
    http: Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl TmdbClient {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("cinedex/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()
            .map_err(CoreError::fetch)?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.resolved_api_key(),
            language: config.language.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .query(&[("api_key", self.api_key.as_str()), ("language", self.language.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| CoreError::FetchFailed(format!("request {path} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CoreError::FetchFailed(format!(
                "{path} returned status: {}",
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CoreError::FetchFailed(format!("invalid JSON from {path}: {e}")))
    }

    async fn page(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<TmdbRecord>> {
        let page: Page<TmdbRecord> = self.get_json(path, query).await?;
        Ok(page.results)
    }
}

#[async_trait]
impl CatalogSource for TmdbClient {
    async fn search(&self, text: &str) -> Result<Vec<RawResult>> {
        let records = self
            .page(
                "/search/multi",
                &[
                    ("query", text.to_string()),
                    ("page", "1".to_string()),
                    ("include_adult", "false".to_string()),
                ],
            )
            .await?;
        Ok(records.into_iter().map(|r| r.into_raw(None)).collect())
    }

    async fn list(&self, listing: Listing) -> Result<Vec<CatalogItem>> {
        let first_page = [("page", "1".to_string())];
        let (path, kind) = match listing {
            Listing::Popular => ("/movie/popular", "movie"),
            Listing::Trending => ("/trending/movie/week", "movie"),
            Listing::Upcoming => ("/movie/upcoming", "movie"),
            Listing::PopularPeople => ("/person/popular", "person"),
        };
        let records = self.page(path, &first_page).await?;
        Ok(into_items(records, kind))
    }

    async fn genre_catalog(&self) -> Result<Vec<Genre>> {
        let list: GenreList = self.get_json("/genre/movie/list", &[]).await?;
        Ok(list.genres)
    }

    async fn discover(&self, genre_ids: &[u32]) -> Result<Vec<CatalogItem>> {
        let with_genres = genre_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let records = self
            .page(
                "/discover/movie",
                &[("with_genres", with_genres), ("page", "1".to_string())],
            )
            .await?;
        Ok(into_items(records, "movie"))
    }
}
