//! Faceted filtering over the cached catalog list.
//!
//! Categories combine with AND; values inside a multi-valued category
//! combine with OR.  Filtering is pure and keeps the cache order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::CatalogItem;

pub const RATING_FLOOR: f32 = 0.0;
pub const RATING_CEIL: f32 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl ViewMode {
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "grid" => Some(Self::Grid),
            "list" => Some(Self::List),
            _ => None,
        }
    }
}

/// Inclusive rating bounds.  `min <= max` holds after every edit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingRange {
    pub min: f32,
    pub max: f32,
}

impl Default for RatingRange {
    fn default() -> Self {
        Self {
            min: RATING_FLOOR,
            max: RATING_CEIL,
        }
    }
}

impl RatingRange {
    pub fn contains(&self, rating: f32) -> bool {
        self.min <= rating && rating <= self.max
    }
}

/// The active facets.  `Default` is the identity: nothing is filtered out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetState {
    pub selected_genres: BTreeSet<u32>,
    pub selected_year: Option<String>,
    pub rating_range: RatingRange,
    /// Free-text tokens in insertion order, no duplicates.
    pub custom_tokens: Vec<String>,
    pub view_mode: ViewMode,
}

impl FacetState {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

// ── Predicates ────────────────────────────────────────────────────────────────

fn genre_matches(item: &CatalogItem, facets: &FacetState) -> bool {
    facets.selected_genres.is_empty()
        || item
            .genre_ids
            .iter()
            .any(|g| facets.selected_genres.contains(g))
}

/// A custom token equal to the item's year counts as a year match too.
fn year_matches(item: &CatalogItem, facets: &FacetState) -> bool {
    let Some(selected) = facets.selected_year.as_deref() else {
        return true;
    };
    let Some(year) = item.year_label() else {
        return false;
    };
    year == selected || facets.custom_tokens.iter().any(|t| *t == year)
}

fn rating_matches(item: &CatalogItem, facets: &FacetState) -> bool {
    facets.rating_range.contains(item.rating)
}

fn text_matches(item: &CatalogItem, facets: &FacetState) -> bool {
    if facets.custom_tokens.is_empty() {
        return true;
    }
    let title = item.title.to_lowercase();
    facets
        .custom_tokens
        .iter()
        .any(|t| title.contains(&t.to_lowercase()))
}

pub fn matches(item: &CatalogItem, facets: &FacetState) -> bool {
    genre_matches(item, facets)
        && year_matches(item, facets)
        && rating_matches(item, facets)
        && text_matches(item, facets)
}

/// The visible subset of `items`, in cache order.
pub fn apply(items: &[CatalogItem], facets: &FacetState) -> Vec<CatalogItem> {
    items
        .iter()
        .filter(|item| matches(item, facets))
        .cloned()
        .collect()
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Owns the facet values and the edit rules for them.  Holds nothing else,
/// so [`FacetFilterEngine::apply`] can run on every render.
#[derive(Debug, Clone, Default)]
pub struct FacetFilterEngine {
    state: FacetState,
}

impl FacetFilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FacetState {
        &self.state
    }

    /// Select the genre, or deselect it if it already was.
    pub fn toggle_genre(&mut self, genre_id: u32) {
        if !self.state.selected_genres.remove(&genre_id) {
            self.state.selected_genres.insert(genre_id);
        }
    }

    /// Select the year, or clear it if it was already the selected one.
    pub fn toggle_year(&mut self, year: &str) {
        let year = year.trim();
        if self.state.selected_year.as_deref() == Some(year) {
            self.state.selected_year = None;
        } else {
            self.state.selected_year = Some(year.to_string());
        }
    }

    /// Setting the lower bound above the upper raises the upper to match.
    pub fn set_min_rating(&mut self, value: f32) {
        let value = clamp_bound(value);
        let range = &mut self.state.rating_range;
        range.min = value;
        if range.max < value {
            range.max = value;
        }
    }

    /// Setting the upper bound below the lower drops the lower to match.
    pub fn set_max_rating(&mut self, value: f32) {
        let value = clamp_bound(value);
        let range = &mut self.state.rating_range;
        range.max = value;
        if range.min > value {
            range.min = value;
        }
    }

    /// Returns false for blank or already-present tokens.
    pub fn add_token(&mut self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() || self.state.custom_tokens.iter().any(|t| t == token) {
            return false;
        }
        self.state.custom_tokens.push(token.to_string());
        true
    }

    pub fn remove_token(&mut self, token: &str) -> bool {
        let before = self.state.custom_tokens.len();
        self.state.custom_tokens.retain(|t| t != token.trim());
        self.state.custom_tokens.len() != before
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.state.view_mode = mode;
    }

    /// Reset every facet in one step.
    pub fn clear(&mut self) {
        self.state = FacetState::default();
    }

    pub fn apply(&self, items: &[CatalogItem]) -> Vec<CatalogItem> {
        apply(items, &self.state)
    }
}

fn clamp_bound(value: f32) -> f32 {
    if value.is_nan() {
        return RATING_FLOOR;
    }
    value.clamp(RATING_FLOOR, RATING_CEIL)
}
