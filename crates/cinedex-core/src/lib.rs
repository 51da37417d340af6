pub mod catalog;
pub mod classify;
pub mod config;
pub mod error;
pub mod facets;
pub mod firestore;
pub mod model;
pub mod platform;
pub mod profile;
pub mod recommend;
pub mod search;
pub mod store;
pub mod sync;
pub mod tmdb;

pub use error::{CoreError, Result};
