//! Profile-store collaborator: per-profile collection subscriptions,
//! delete-by-id, and the `users/{id}` document.
//!
//! A [`Subscription`] is a cancellable push stream of full snapshots.  The
//! first event is the current state of the collection; every later event
//! is the whole collection again after a server-side change.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::model::{Collection, ProfileCollectionEntry, Snapshot};
use crate::profile::UserDocument;

/// Buffered snapshot events per subscription.
pub const SUBSCRIPTION_BUFFER: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEvent {
    Snapshot(Snapshot),
    /// The store reported a problem with the stream.  The subscription may
    /// keep delivering afterwards.
    Error(String),
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Open a snapshot stream.  Must be called inside a tokio runtime.
    fn subscribe(&self, profile_id: &str, collection: Collection) -> Subscription;

    async fn delete_entry(&self, profile_id: &str, collection: Collection, entry_id: &str)
        -> Result<()>;

    /// Read the user document once.  `Ok(None)` if it does not exist.
    async fn fetch_user(&self, profile_id: &str) -> Result<Option<UserDocument>>;

    /// Merge-write `username`, `profilePicture` and `preferences`; other
    /// fields on the stored document are left alone.
    async fn merge_user(&self, profile_id: &str, user: &UserDocument) -> Result<()>;
}

// ── Subscription ──────────────────────────────────────────────────────────────

pub struct Subscription {
    collection: Collection,
    rx: mpsc::Receiver<SnapshotEvent>,
    cancel: CancellationToken,
    closed: bool,
}

impl Subscription {
    /// Wrap the receiving half of a producer task.  The producer must stop
    /// once `cancel` fires.
    pub fn new(
        collection: Collection,
        rx: mpsc::Receiver<SnapshotEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            collection,
            rx,
            cancel,
            closed: false,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Next event, or `None` once unsubscribed or the producer has ended.
    pub async fn recv(&mut self) -> Option<SnapshotEvent> {
        if self.closed {
            return None;
        }
        self.rx.recv().await
    }

    /// Stop delivery.  Returns false if this subscription was already closed.
    pub fn unsubscribe(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.cancel.cancel();
        self.rx.close();
        true
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── In-memory store ───────────────────────────────────────────────────────────

type CollectionKey = (String, Collection);

#[derive(Default)]
struct MemoryInner {
    entries: HashMap<CollectionKey, Vec<ProfileCollectionEntry>>,
    channels: HashMap<CollectionKey, watch::Sender<SnapshotEvent>>,
    users: HashMap<String, UserDocument>,
    offline: bool,
}

impl MemoryInner {
    fn channel(&mut self, key: &CollectionKey) -> &watch::Sender<SnapshotEvent> {
        let snapshot = self.entries.get(key).cloned().unwrap_or_default();
        self.channels
            .entry(key.clone())
            .or_insert_with(|| watch::channel(SnapshotEvent::Snapshot(snapshot)).0)
    }

    fn publish(&mut self, key: &CollectionKey) {
        let snapshot = self.entries.get(key).cloned().unwrap_or_default();
        self.channel(key)
            .send_replace(SnapshotEvent::Snapshot(snapshot));
    }

    fn check_online(&self) -> Result<()> {
        if self.offline {
            Err(CoreError::Store("store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

/// A process-local [`ProfileStore`] that pushes a fresh snapshot to every
/// subscriber whenever a collection changes.
#[derive(Default)]
pub struct MemoryProfileStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace a collection wholesale and notify subscribers.
    pub fn publish(&self, profile_id: &str, collection: Collection, snapshot: Snapshot) {
        let key = (profile_id.to_string(), collection);
        let mut inner = self.lock();
        inner.entries.insert(key.clone(), snapshot);
        inner.publish(&key);
    }

    /// Insert or replace one entry by id and notify subscribers.
    pub fn upsert(&self, profile_id: &str, collection: Collection, entry: ProfileCollectionEntry) {
        let key = (profile_id.to_string(), collection);
        let mut inner = self.lock();
        let entries = inner.entries.entry(key.clone()).or_default();
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        inner.publish(&key);
    }

    /// Push a stream error to current subscribers of a collection.  Later
    /// subscribers still start from the stored snapshot.
    pub fn inject_error(&self, profile_id: &str, collection: Collection, message: &str) {
        let key = (profile_id.to_string(), collection);
        self.lock()
            .channel(&key)
            .send_replace(SnapshotEvent::Error(message.to_string()));
    }

    pub fn entries(&self, profile_id: &str, collection: Collection) -> Snapshot {
        self.lock()
            .entries
            .get(&(profile_id.to_string(), collection))
            .cloned()
            .unwrap_or_default()
    }

    /// Make every one-shot request fail with [`CoreError::Store`].
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Live forwarding tasks for a collection.
    pub fn active_subscriptions(&self, profile_id: &str, collection: Collection) -> usize {
        self.lock()
            .channels
            .get(&(profile_id.to_string(), collection))
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    fn subscribe(&self, profile_id: &str, collection: Collection) -> Subscription {
        let key = (profile_id.to_string(), collection);
        // The first delivery is always the stored collection, even if the
        // channel's latest value is an error.
        let (initial, mut source) = {
            let mut inner = self.lock();
            let snapshot = inner.entries.get(&key).cloned().unwrap_or_default();
            (snapshot, inner.channel(&key).subscribe())
        };
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let cancel = CancellationToken::new();
        let stop = cancel.clone();

        tokio::spawn(async move {
            if tx.send(SnapshotEvent::Snapshot(initial)).await.is_err() {
                return;
            }
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    changed = source.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let event = source.borrow_and_update().clone();
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("memory subscription for {}/{} ended", key.0, key.1);
        });

        Subscription::new(collection, rx, cancel)
    }

    async fn delete_entry(
        &self,
        profile_id: &str,
        collection: Collection,
        entry_id: &str,
    ) -> Result<()> {
        let key = (profile_id.to_string(), collection);
        let mut inner = self.lock();
        inner.check_online()?;
        if let Some(entries) = inner.entries.get_mut(&key) {
            entries.retain(|e| e.id != entry_id);
        }
        inner.publish(&key);
        Ok(())
    }

    async fn fetch_user(&self, profile_id: &str) -> Result<Option<UserDocument>> {
        let inner = self.lock();
        inner.check_online()?;
        Ok(inner.users.get(profile_id).cloned())
    }

    async fn merge_user(&self, profile_id: &str, user: &UserDocument) -> Result<()> {
        let mut inner = self.lock();
        inner.check_online()?;
        inner.users.insert(profile_id.to_string(), user.clone());
        Ok(())
    }
}
