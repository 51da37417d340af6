#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cinedex_core::catalog::{CatalogSource, Listing};
use cinedex_core::error::{CoreError, Result};
use cinedex_core::model::{
    CatalogItem, Genre, MediaKind, PersonRecord, ProfileCollectionEntry, RawResult, TitleRecord,
};

/// Scriptable catalog.  Search answers with one movie and one person per
/// query, titled after the query text.
#[derive(Default)]
pub struct FakeCatalog {
    searches: Mutex<Vec<String>>,
    discovers: Mutex<Vec<Vec<u32>>>,
    delays: Mutex<HashMap<String, Duration>>,
    failing: Mutex<HashSet<String>>,
    panicking: Mutex<HashSet<String>>,
    discover_count: Mutex<usize>,
    discover_fails: Mutex<bool>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self {
            discover_count: Mutex::new(20),
            ..Self::default()
        }
    }

    pub fn delay(&self, query: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(query.to_string(), delay);
    }

    pub fn fail(&self, query: &str) {
        self.failing.lock().unwrap().insert(query.to_string());
    }

    /// Make the search task for `query` panic instead of answering.
    pub fn panic_on(&self, query: &str) {
        self.panicking.lock().unwrap().insert(query.to_string());
    }

    pub fn set_discover_count(&self, count: usize) {
        *self.discover_count.lock().unwrap() = count;
    }

    pub fn fail_discover(&self) {
        *self.discover_fails.lock().unwrap() = true;
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    pub fn discovers(&self) -> Vec<Vec<u32>> {
        self.discovers.lock().unwrap().clone()
    }
}

pub fn movie_item(id: u64, title: &str) -> CatalogItem {
    CatalogItem {
        id,
        kind: MediaKind::Movie,
        title: title.to_string(),
        rating: 7.0,
        year: Some(2020),
        genre_ids: Default::default(),
        image_path: None,
    }
}

pub fn entry(id: &str, title: &str, rating: Option<f32>) -> ProfileCollectionEntry {
    ProfileCollectionEntry {
        id: id.to_string(),
        title: title.to_string(),
        poster_path: format!("/{id}.jpg"),
        rating,
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn search(&self, text: &str) -> Result<Vec<RawResult>> {
        self.searches.lock().unwrap().push(text.to_string());
        let delay = self.delays.lock().unwrap().get(text).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.panicking.lock().unwrap().contains(text) {
            panic!("catalog blew up on {text:?}");
        }
        if self.failing.lock().unwrap().contains(text) {
            return Err(CoreError::FetchFailed(format!("{text}: 503")));
        }
        Ok(vec![
            RawResult::Movie(TitleRecord {
                id: 1,
                title: text.to_string(),
                rating: Some(7.0),
                release_date: Some("2021-09-15".to_string()),
                genre_ids: vec![878],
                poster_path: None,
            }),
            RawResult::Person(PersonRecord {
                id: 2,
                name: format!("{text} person"),
                ..PersonRecord::default()
            }),
        ])
    }

    async fn list(&self, _listing: Listing) -> Result<Vec<CatalogItem>> {
        Ok(vec![movie_item(1, "Listed")])
    }

    async fn genre_catalog(&self) -> Result<Vec<Genre>> {
        Ok(vec![Genre {
            id: 28,
            name: "Action".to_string(),
        }])
    }

    async fn discover(&self, genre_ids: &[u32]) -> Result<Vec<CatalogItem>> {
        self.discovers.lock().unwrap().push(genre_ids.to_vec());
        if *self.discover_fails.lock().unwrap() {
            return Err(CoreError::FetchFailed("discover: 500".to_string()));
        }
        let count = *self.discover_count.lock().unwrap();
        Ok((0..count as u64)
            .map(|i| movie_item(100 + i, &format!("Pick {i}")))
            .collect())
    }
}
