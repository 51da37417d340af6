//! Live mirror of a profile's watchlist and ratings.
//!
//! Each delivery replaces the local copy of that collection wholesale.
//! Ratings are folded to one visible entry per title.  Subscriptions are
//! closed exactly once on profile change or teardown, after which nothing
//! writes into the mirrors.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::select_all;
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::model::{Collection, ProfileCollectionEntry, Snapshot};
use crate::store::{ProfileStore, SnapshotEvent, Subscription};

/// What a call to [`LiveCollectionSync::next_update`] changed.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncUpdate {
    /// The mirror for `collection` was replaced; `len` is the visible count.
    Replaced {
        collection: Collection,
        rev: u64,
        len: usize,
    },
    /// The stream reported an error or ended.  The mirror is unchanged.
    Disconnected {
        collection: Collection,
        error: CoreError,
    },
}

/// Collapse a ratings snapshot to one entry per title.  The value seen last
/// in delivery order wins; the entry keeps the slot of its first appearance.
pub fn fold_ratings(snapshot: Snapshot) -> Vec<ProfileCollectionEntry> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<ProfileCollectionEntry> = Vec::with_capacity(snapshot.len());
    for entry in snapshot {
        match slots.get(&entry.title) {
            Some(&i) => out[i] = entry,
            None => {
                slots.insert(entry.title.clone(), out.len());
                out.push(entry);
            }
        }
    }
    out
}

pub struct LiveCollectionSync {
    store: Arc<dyn ProfileStore>,
    profile_id: Option<String>,
    subscriptions: Vec<Subscription>,
    watchlist: Vec<ProfileCollectionEntry>,
    rated: Vec<ProfileCollectionEntry>,
    rev: u64,
}

impl LiveCollectionSync {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            profile_id: None,
            subscriptions: Vec::new(),
            watchlist: Vec::new(),
            rated: Vec::new(),
            rev: 0,
        }
    }

    pub fn profile_id(&self) -> Option<&str> {
        self.profile_id.as_deref()
    }

    pub fn watchlist(&self) -> &[ProfileCollectionEntry] {
        &self.watchlist
    }

    /// Ratings, deduplicated by title.
    pub fn rated_items(&self) -> &[ProfileCollectionEntry] {
        &self.rated
    }

    /// Bumped on every mirror replacement.
    pub fn rev(&self) -> u64 {
        self.rev
    }

    pub fn open_subscriptions(&self) -> usize {
        self.subscriptions.iter().filter(|s| !s.is_closed()).count()
    }

    /// Point the mirror at `profile_id`.  Re-attaching to the current
    /// profile is a no-op; a different profile closes the old streams,
    /// empties the mirrors and opens one stream per tracked collection.
    pub fn attach(&mut self, profile_id: &str) -> bool {
        if self.profile_id.as_deref() == Some(profile_id) && self.open_subscriptions() > 0 {
            return false;
        }

        self.teardown();
        self.watchlist.clear();
        self.rated.clear();
        self.rev += 1;

        info!("attaching live sync to profile {}", profile_id);
        self.subscriptions = Collection::ALL
            .iter()
            .map(|&c| self.store.subscribe(profile_id, c))
            .collect();
        self.profile_id = Some(profile_id.to_string());
        true
    }

    /// Close every open stream.  Returns how many were closed; a second
    /// call closes nothing.
    pub fn teardown(&mut self) -> usize {
        let closed = self
            .subscriptions
            .iter_mut()
            .map(|s| s.unsubscribe())
            .filter(|&closed| closed)
            .count();
        self.subscriptions.clear();
        if closed > 0 {
            info!("closed {} live subscriptions", closed);
        }
        closed
    }

    /// Wait for the next delivery on any open stream and fold it in.
    /// `None` when no stream is open.
    pub async fn next_update(&mut self) -> Option<SyncUpdate> {
        let open: Vec<_> = self
            .subscriptions
            .iter_mut()
            .enumerate()
            .filter(|(_, s)| !s.is_closed())
            .map(|(i, s)| {
                Box::pin(async move {
                    let collection = s.collection();
                    (i, collection, s.recv().await)
                })
            })
            .collect();
        if open.is_empty() {
            return None;
        }

        let ((index, collection, event), _, _) = select_all(open).await;

        match event {
            Some(SnapshotEvent::Snapshot(snapshot)) => Some(self.replace(collection, snapshot)),
            Some(SnapshotEvent::Error(message)) => {
                let error = CoreError::SyncDisconnected(format!("{collection}: {message}"));
                warn!("{}", error);
                Some(SyncUpdate::Disconnected { collection, error })
            }
            None => {
                if let Some(sub) = self.subscriptions.get_mut(index) {
                    sub.unsubscribe();
                }
                let error = CoreError::SyncDisconnected(format!("{collection}: stream ended"));
                warn!("{}", error);
                Some(SyncUpdate::Disconnected { collection, error })
            }
        }
    }

    /// Replace the mirror for `collection` with `snapshot`.
    fn replace(&mut self, collection: Collection, snapshot: Snapshot) -> SyncUpdate {
        let len = match collection {
            Collection::Watchlist => {
                self.watchlist = snapshot;
                self.watchlist.len()
            }
            Collection::Ratings => {
                self.rated = fold_ratings(snapshot);
                self.rated.len()
            }
        };
        self.rev += 1;
        debug!("{} mirror replaced: rev={} len={}", collection, self.rev, len);
        SyncUpdate::Replaced {
            collection,
            rev: self.rev,
            len,
        }
    }

    /// Ask the store to delete a watchlist entry.  The local mirror only
    /// changes when the resulting snapshot arrives.
    pub async fn remove_from_watchlist(&self, entry_id: &str) -> Result<()> {
        let profile_id = self
            .profile_id
            .as_deref()
            .ok_or_else(|| CoreError::Store("no profile attached".to_string()))?;
        self.store
            .delete_entry(profile_id, Collection::Watchlist, entry_id)
            .await
    }
}

impl Drop for LiveCollectionSync {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(id: &str, title: &str, value: f32) -> ProfileCollectionEntry {
        ProfileCollectionEntry {
            id: id.to_string(),
            title: title.to_string(),
            poster_path: format!("/{id}.jpg"),
            rating: Some(value),
        }
    }

    #[test]
    fn test_fold_keeps_last_value_per_title() {
        let folded = fold_ratings(vec![
            rating("r1", "Dune", 6.0),
            rating("r2", "Heat", 9.0),
            rating("r3", "Dune", 8.5),
        ]);
        assert_eq!(folded.len(), 2);
        assert_eq!(folded[0].title, "Dune");
        assert_eq!(folded[0].rating, Some(8.5));
        assert_eq!(folded[0].id, "r3");
        assert_eq!(folded[1].title, "Heat");
    }

    #[test]
    fn test_fold_empty_snapshot() {
        assert!(fold_ratings(Vec::new()).is_empty());
    }
}
