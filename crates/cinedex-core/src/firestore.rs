//! Firestore REST implementation of [`ProfileStore`].
//!
//! Collections live at `users/{uid}/{watchlist|ratings}` and the profile at
//! `users/{uid}`.  The REST API has no push channel, so a subscription polls
//! the collection and emits a snapshot only when its contents change.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ProfileStoreConfig;
use crate::error::{CoreError, Result};
use crate::model::{Collection, ProfileCollectionEntry, Snapshot};
use crate::profile::UserDocument;
use crate::store::{ProfileStore, SnapshotEvent, Subscription, SUBSCRIPTION_BUFFER};

const PAGE_SIZE: &str = "300";
const USER_FIELDS: [&str; 3] = ["username", "profilePicture", "preferences"];

#[derive(Clone)]
struct FirestoreApi {
    http: Client,
    documents_url: String,
    api_key: String,
    id_token: Option<String>,
}

impl FirestoreApi {
    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        let req = req.query(&[("key", self.api_key.as_str())]);
        match &self.id_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn collection_url(&self, profile_id: &str, collection: Collection) -> String {
        format!("{}/users/{}/{}", self.documents_url, profile_id, collection)
    }

    fn user_url(&self, profile_id: &str) -> String {
        format!("{}/users/{}", self.documents_url, profile_id)
    }

    async fn list_collection(&self, profile_id: &str, collection: Collection) -> Result<Snapshot> {
        let url = self.collection_url(profile_id, collection);
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self
                .authed(self.http.get(&url))
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token.as_str())]);
            }

            let body: Value = req
                .send()
                .await
                .map_err(|e| CoreError::store(format!("list {collection} failed: {e}")))?
                .error_for_status()
                .map_err(|e| CoreError::store(format!("list {collection} non-2xx: {e}")))?
                .json()
                .await
                .map_err(|e| CoreError::store(format!("invalid firestore JSON for {collection}: {e}")))?;

            // an empty collection comes back without a `documents` key
            if let Some(docs) = body.get("documents").and_then(Value::as_array) {
                entries.extend(docs.iter().filter_map(parse_entry));
            }

            page_token = body
                .get("nextPageToken")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            if page_token.is_none() {
                break;
            }
        }

        Ok(entries)
    }
}

pub struct FirestoreStore {
    api: FirestoreApi,
    poll_interval: Duration,
}

impl FirestoreStore {
    pub fn new(config: &ProfileStoreConfig) -> Result<Self> {
        if config.project_id.trim().is_empty() {
            return Err(CoreError::Store(
                "profile_store.project_id is not set".to_string(),
            ));
        }
        let http = Client::builder()
            .user_agent(concat!("cinedex/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(CoreError::store)?;
        Ok(Self {
            api: FirestoreApi {
                http,
                documents_url: format!(
                    "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
                    config.project_id.trim()
                ),
                api_key: config.api_key.clone(),
                id_token: config.id_token.clone(),
            },
            poll_interval: config.poll_interval(),
        })
    }
}

#[async_trait]
impl ProfileStore for FirestoreStore {
    fn subscribe(&self, profile_id: &str, collection: Collection) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        let api = self.api.clone();
        let poll_interval = self.poll_interval;
        let profile_id = profile_id.to_string();

        tokio::spawn(async move {
            info!("polling {}/{} every {:?}", profile_id, collection, poll_interval);
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last: Option<Snapshot> = None;

            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let fetched = tokio::select! {
                    _ = stop.cancelled() => break,
                    r = api.list_collection(&profile_id, collection) => r,
                };

                let event = match fetched {
                    Ok(snapshot) => {
                        if last.as_ref() == Some(&snapshot) {
                            continue;
                        }
                        last = Some(snapshot.clone());
                        SnapshotEvent::Snapshot(snapshot)
                    }
                    Err(e) => SnapshotEvent::Error(e.to_string()),
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            debug!("poller for {}/{} stopped", profile_id, collection);
        });

        Subscription::new(collection, rx, cancel)
    }

    async fn delete_entry(
        &self,
        profile_id: &str,
        collection: Collection,
        entry_id: &str,
    ) -> Result<()> {
        let url = format!("{}/{}", self.api.collection_url(profile_id, collection), entry_id);
        debug!("DELETE {}", url);
        self.api
            .authed(self.api.http.delete(&url))
            .send()
            .await
            .map_err(|e| CoreError::store(format!("delete {entry_id} failed: {e}")))?
            .error_for_status()
            .map_err(|e| CoreError::store(format!("delete {entry_id} non-2xx: {e}")))?;
        Ok(())
    }

    async fn fetch_user(&self, profile_id: &str) -> Result<Option<UserDocument>> {
        let response = self
            .api
            .authed(self.api.http.get(self.api.user_url(profile_id)))
            .send()
            .await
            .map_err(|e| CoreError::store(format!("read user {profile_id} failed: {e}")))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: Value = response
            .error_for_status()
            .map_err(|e| CoreError::store(format!("read user {profile_id} non-2xx: {e}")))?
            .json()
            .await
            .map_err(|e| CoreError::store(format!("invalid user JSON for {profile_id}: {e}")))?;
        Ok(Some(parse_user(&doc)))
    }

    async fn merge_user(&self, profile_id: &str, user: &UserDocument) -> Result<()> {
        let mask: Vec<(&str, &str)> = USER_FIELDS
            .iter()
            .map(|f| ("updateMask.fieldPaths", *f))
            .collect();
        self.api
            .authed(self.api.http.patch(self.api.user_url(profile_id)))
            .query(&mask)
            .json(&user_fields(user))
            .send()
            .await
            .map_err(|e| CoreError::store(format!("write user {profile_id} failed: {e}")))?
            .error_for_status()
            .map_err(|e| CoreError::store(format!("write user {profile_id} non-2xx: {e}")))?;
        Ok(())
    }
}

// ── Document parsing ──────────────────────────────────────────────────────────

fn fields(doc: &Value) -> Map<String, Value> {
    doc.get("fields")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn field_string(fields: &Map<String, Value>, name: &str) -> Option<String> {
    let value = fields.get(name)?.as_object()?;
    if let Some(s) = value.get("stringValue").and_then(Value::as_str) {
        return Some(s.to_string());
    }
    value
        .get("integerValue")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn field_number(fields: &Map<String, Value>, name: &str) -> Option<f32> {
    let value = fields.get(name)?.as_object()?;
    if let Some(n) = value.get("doubleValue").and_then(Value::as_f64) {
        return Some(n as f32);
    }
    // integerValue is sent as a decimal string
    value
        .get("integerValue")
        .and_then(Value::as_str)
        .and_then(|s| s.trim().parse::<f32>().ok())
}

/// Document id is the last segment of `name`.
fn parse_entry(doc: &Value) -> Option<ProfileCollectionEntry> {
    let id = doc.get("name")?.as_str()?.rsplit('/').next()?.to_string();
    let fields = fields(doc);
    Some(ProfileCollectionEntry {
        id,
        title: field_string(&fields, "title").unwrap_or_default(),
        poster_path: field_string(&fields, "posterPath").unwrap_or_default(),
        rating: field_number(&fields, "rating"),
    })
}

fn parse_user(doc: &Value) -> UserDocument {
    let fields = fields(doc);
    UserDocument {
        username: field_string(&fields, "username").unwrap_or_default(),
        profile_picture: field_string(&fields, "profilePicture").unwrap_or_default(),
        preferences: field_string(&fields, "preferences").unwrap_or_default(),
    }
}

fn user_fields(user: &UserDocument) -> Value {
    json!({
        "fields": {
            "username": { "stringValue": user.username },
            "profilePicture": { "stringValue": user.profile_picture },
            "preferences": { "stringValue": user.preferences },
        }
    })
}
