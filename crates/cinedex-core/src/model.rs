use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The three kinds of record the catalog knows how to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
    Person,
}

impl MediaKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Show => "show",
            Self::Person => "person",
        }
    }
}

/// One displayable catalog entry, already normalised from whatever the
/// provider returned.  Identity is `(kind, id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: u64,
    pub kind: MediaKind,
    pub title: String,
    /// Average rating, clamped to `0.0..=10.0`.
    pub rating: f32,
    pub year: Option<i32>,
    #[serde(default)]
    pub genre_ids: BTreeSet<u32>,
    pub image_path: Option<String>,
}

impl CatalogItem {
    pub fn key(&self) -> (MediaKind, u64) {
        (self.kind, self.id)
    }

    /// The year as the facet engine compares it (`"2023"`), if known.
    pub fn year_label(&self) -> Option<String> {
        self.year.map(|y| y.to_string())
    }

    pub fn image_url(&self, base: &str) -> Option<String> {
        self.image_path.as_deref().map(|p| join_image_url(base, p))
    }
}

// ── Raw search records ────────────────────────────────────────────────────────

/// Payload shared by movies and shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitleRecord {
    pub id: u64,
    pub title: String,
    pub rating: Option<f32>,
    /// `YYYY-MM-DD` release or first-air date as sent by the provider.
    pub release_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    pub poster_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: u64,
    pub name: String,
    pub profile_path: Option<String>,
    /// Titles the person is known for, in provider order.
    #[serde(default)]
    pub known_for: Vec<String>,
}

/// A single heterogeneous search hit, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RawResult {
    Movie(TitleRecord),
    Show(TitleRecord),
    Person(PersonRecord),
    /// Anything the provider sent with a missing or unrecognised kind.
    Unknown {
        id: u64,
        media_type: Option<String>,
    },
}

impl RawResult {
    pub fn id(&self) -> u64 {
        match self {
            Self::Movie(r) | Self::Show(r) => r.id,
            Self::Person(p) => p.id,
            Self::Unknown { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> Option<MediaKind> {
        match self {
            Self::Movie(_) => Some(MediaKind::Movie),
            Self::Show(_) => Some(MediaKind::Show),
            Self::Person(_) => Some(MediaKind::Person),
            Self::Unknown { .. } => None,
        }
    }

    /// Normalise into the common item shape; `None` for unknown kinds.
    pub fn to_item(&self) -> Option<CatalogItem> {
        match self {
            Self::Movie(r) => Some(r.to_item(MediaKind::Movie)),
            Self::Show(r) => Some(r.to_item(MediaKind::Show)),
            Self::Person(p) => Some(p.to_item()),
            Self::Unknown { .. } => None,
        }
    }
}

impl TitleRecord {
    pub fn year(&self) -> Option<i32> {
        self.release_date.as_deref().and_then(year_from_date)
    }

    pub fn to_item(&self, kind: MediaKind) -> CatalogItem {
        CatalogItem {
            id: self.id,
            kind,
            title: self.title.clone(),
            rating: clamp_rating(self.rating.unwrap_or(0.0)),
            year: self.year(),
            genre_ids: self.genre_ids.iter().copied().collect(),
            image_path: self.poster_path.clone(),
        }
    }
}

impl PersonRecord {
    pub fn to_item(&self) -> CatalogItem {
        CatalogItem {
            id: self.id,
            kind: MediaKind::Person,
            title: self.name.clone(),
            rating: 0.0,
            year: None,
            genre_ids: BTreeSet::new(),
            image_path: self.profile_path.clone(),
        }
    }
}

/// A `{id, name}` pair from the provider's genre catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

// ── Profile collections ───────────────────────────────────────────────────────

/// The per-profile collections the sync layer mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Watchlist,
    Ratings,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Watchlist, Collection::Ratings];

    /// Path segment under `users/{id}/`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Watchlist => "watchlist",
            Self::Ratings => "ratings",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One watchlist or rating record as stored on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCollectionEntry {
    /// Server-assigned document id.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub poster_path: String,
    #[serde(default)]
    pub rating: Option<f32>,
}

impl ProfileCollectionEntry {
    pub fn poster_url(&self, base: &str) -> String {
        join_image_url(base, &self.poster_path)
    }
}

/// A complete point-in-time copy of one collection, in delivery order.
pub type Snapshot = Vec<ProfileCollectionEntry>;

// ── Helpers ───────────────────────────────────────────────────────────────────

pub fn year_from_date(date: &str) -> Option<i32> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .ok()
        .map(|d| d.year())
}

pub fn clamp_rating(rating: f32) -> f32 {
    if rating.is_nan() {
        return 0.0;
    }
    rating.clamp(0.0, 10.0)
}

fn join_image_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
