//! Preference-driven recommendations.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::CatalogSource;
use crate::model::CatalogItem;

pub const DEFAULT_MAX_RESULTS: usize = 6;

/// Preference genre names and their TMDB ids.
pub const GENRE_TABLE: [(&str, u32); 10] = [
    ("Action", 28),
    ("Comedy", 35),
    ("Drama", 18),
    ("Fantasy", 14),
    ("Horror", 27),
    ("Mystery", 9648),
    ("Romance", 10749),
    ("Science Fiction", 878),
    ("Thriller", 53),
    ("Western", 37),
];

pub fn genre_id(name: &str) -> Option<u32> {
    let name = name.trim();
    GENRE_TABLE
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, id)| id)
}

/// Map names to ids in input order, skipping unknown names and repeats.
pub fn genre_ids(names: &[String]) -> Vec<u32> {
    let mut ids = Vec::new();
    for id in names.iter().filter_map(|n| genre_id(n)) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

pub struct RecommendationDeriver {
    catalog: Arc<dyn CatalogSource>,
    limit: usize,
    last_genres: Option<BTreeSet<String>>,
}

impl RecommendationDeriver {
    pub fn new(catalog: Arc<dyn CatalogSource>, limit: usize) -> Self {
        Self {
            catalog,
            limit,
            last_genres: None,
        }
    }

    /// Query the catalog for `genres`.  An id set that maps to nothing is
    /// still sent and yields the provider's default list.  Failures are
    /// logged and come back as an empty list.
    pub async fn derive(&self, genres: &[String]) -> Vec<CatalogItem> {
        let ids = genre_ids(genres);
        debug!("deriving recommendations for {:?} -> {:?}", genres, ids);

        match self.catalog.discover(&ids).await {
            Ok(mut items) => {
                items.truncate(self.limit);
                items
            }
            Err(e) => {
                warn!("recommendation fetch failed: {}", e);
                Vec::new()
            }
        }
    }

    /// [`derive`](Self::derive), but only when the genre set differs from
    /// the previous call.
    pub async fn derive_if_changed(&mut self, genres: &[String]) -> Option<Vec<CatalogItem>> {
        let set: BTreeSet<String> = genres.iter().map(|g| g.trim().to_string()).collect();
        if self.last_genres.as_ref() == Some(&set) {
            return None;
        }
        self.last_genres = Some(set);
        Some(self.derive(genres).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unknown_genres_are_dropped() {
        assert_eq!(
            genre_ids(&names(&["Horror", "Anime", "science fiction", "Horror"])),
            vec![27, 878]
        );
        assert!(genre_ids(&names(&["Documentary"])).is_empty());
    }

    #[test]
    fn test_genre_lookup() {
        assert_eq!(genre_id("Western"), Some(37));
        assert_eq!(genre_id(" Mystery "), Some(9648));
        assert_eq!(genre_id(""), None);
    }
}
