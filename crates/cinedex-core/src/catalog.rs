//! The catalog-query collaborator seen from the core.
//!
//! Everything that talks to the metadata provider goes through
//! [`CatalogSource`], so the search and recommendation flows can run against
//! a fake in tests.  Non-2xx, transport and parse failures all collapse into
//! [`CoreError::FetchFailed`](crate::error::CoreError::FetchFailed).

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{CatalogItem, Genre, RawResult};

/// Fixed catalog listings used to populate the browse cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Popular,
    Trending,
    Upcoming,
    PopularPeople,
}

impl Listing {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Popular => "popular",
            Self::Trending => "trending",
            Self::Upcoming => "upcoming",
            Self::PopularPeople => "people",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "popular" => Some(Self::Popular),
            "trending" => Some(Self::Trending),
            "upcoming" => Some(Self::Upcoming),
            "people" | "actors" => Some(Self::PopularPeople),
            _ => None,
        }
    }
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Multi-kind text search.  Records come back in provider order.
    async fn search(&self, text: &str) -> Result<Vec<RawResult>>;

    /// One of the fixed listings, already normalised.
    async fn list(&self, listing: Listing) -> Result<Vec<CatalogItem>>;

    /// The provider's genre id → name catalog.
    async fn genre_catalog(&self) -> Result<Vec<Genre>>;

    /// Titles matching any of `genre_ids`.  An empty slice is a valid
    /// request and yields the provider's untargeted default list.
    async fn discover(&self, genre_ids: &[u32]) -> Result<Vec<CatalogItem>>;
}

/// Fetch a listing for the browse cache.  On failure the cache is empty
/// and the error is handed back for an inline notice.
pub async fn load_listing(
    catalog: &dyn CatalogSource,
    listing: Listing,
) -> (Vec<CatalogItem>, Option<String>) {
    match catalog.list(listing).await {
        Ok(items) => {
            tracing::debug!("loaded {} items for listing {}", items.len(), listing.label());
            (items, None)
        }
        Err(e) => {
            tracing::warn!("listing {} failed: {}", listing.label(), e);
            (Vec::new(), Some(e.to_string()))
        }
    }
}
