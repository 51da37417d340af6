//! Splits a mixed search batch into movie / show / person buckets and
//! decides where selecting a hit should navigate.

use serde::Serialize;

use crate::model::{PersonRecord, RawResult, TitleRecord};

/// A search batch partitioned by kind.  Each bucket keeps the relative
/// order the records had in the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassifiedResults {
    pub movies: Vec<TitleRecord>,
    pub shows: Vec<TitleRecord>,
    pub people: Vec<PersonRecord>,
}

impl ClassifiedResults {
    pub fn is_empty(&self) -> bool {
        self.movies.is_empty() && self.shows.is_empty() && self.people.is_empty()
    }

    pub fn len(&self) -> usize {
        self.movies.len() + self.shows.len() + self.people.len()
    }
}

/// Partition `batch`.  Total: records of unknown kind land in no bucket.
pub fn classify(batch: &[RawResult]) -> ClassifiedResults {
    let mut out = ClassifiedResults::default();
    for record in batch {
        match record {
            RawResult::Movie(r) => out.movies.push(r.clone()),
            RawResult::Show(r) => out.shows.push(r.clone()),
            RawResult::Person(p) => out.people.push(p.clone()),
            RawResult::Unknown { .. } => {}
        }
    }
    out
}

/// Navigation target for a selected hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Route {
    Movie(u64),
    Show(u64),
    Actor(u64),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Movie(id) => format!("/movie/{id}"),
            Route::Show(id) => format!("/tv/{id}"),
            Route::Actor(id) => format!("/actor/{id}"),
        }
    }
}

/// People go to the actor page, shows to the show page, and everything
/// else (unknown kinds included) falls back to the movie page.
pub fn resolve_target(record: &RawResult) -> Route {
    match record {
        RawResult::Person(p) => Route::Actor(p.id),
        RawResult::Show(r) => Route::Show(r.id),
        RawResult::Movie(r) => Route::Movie(r.id),
        RawResult::Unknown { id, .. } => Route::Movie(*id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: u64, title: &str) -> RawResult {
        RawResult::Movie(TitleRecord {
            id,
            title: title.to_string(),
            ..TitleRecord::default()
        })
    }

    fn show(id: u64, title: &str) -> RawResult {
        RawResult::Show(TitleRecord {
            id,
            title: title.to_string(),
            ..TitleRecord::default()
        })
    }

    fn person(id: u64, name: &str) -> RawResult {
        RawResult::Person(PersonRecord {
            id,
            name: name.to_string(),
            ..PersonRecord::default()
        })
    }

    #[test]
    fn test_classify_preserves_order_within_buckets() {
        let batch = vec![
            show(10, "Dune: Prophecy"),
            movie(1, "Dune"),
            person(100, "Zendaya"),
            RawResult::Unknown {
                id: 55,
                media_type: Some("collection".to_string()),
            },
            movie(2, "Dune: Part Two"),
            person(101, "Timothée Chalamet"),
        ];

        let out = classify(&batch);
        let movie_ids: Vec<u64> = out.movies.iter().map(|r| r.id).collect();
        let show_ids: Vec<u64> = out.shows.iter().map(|r| r.id).collect();
        let people_ids: Vec<u64> = out.people.iter().map(|p| p.id).collect();

        assert_eq!(movie_ids, vec![1, 2]);
        assert_eq!(show_ids, vec![10]);
        assert_eq!(people_ids, vec![100, 101]);
        // the unknown record is dropped from every bucket
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn test_classify_empty_batch() {
        assert!(classify(&[]).is_empty());
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target(&person(3, "x")), Route::Actor(3));
        assert_eq!(resolve_target(&show(4, "x")), Route::Show(4));
        assert_eq!(resolve_target(&movie(5, "x")), Route::Movie(5));
        let unknown = RawResult::Unknown {
            id: 6,
            media_type: None,
        };
        assert_eq!(resolve_target(&unknown), Route::Movie(6));
        assert_eq!(Route::Actor(3).path(), "/actor/3");
        assert_eq!(Route::Show(4).path(), "/tv/4");
    }
}
