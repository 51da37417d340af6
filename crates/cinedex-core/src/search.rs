//! Type-ahead search lifecycle.
//!
//! [`DebouncedQuery`] coalesces keystrokes into one request per quiescence
//! window and tags every request with a generation token.  A response is
//! applied only if its token is still the latest one issued; anything older
//! is dropped without touching state.  The underlying request is never
//! aborted, only ignored.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::catalog::CatalogSource;
use crate::classify::{classify, ClassifiedResults};
use crate::error::{CoreError, Result};
use crate::model::RawResult;

pub const NO_RESULTS_NOTICE: &str = "No results found.";
pub const FETCH_FAILED_NOTICE: &str = "Failed to fetch results. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    Idle,
    Pending,
    Resolved,
    Failed,
}

/// What woke [`DebouncedQuery::next_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryEvent {
    /// The window elapsed and a request went out.
    Fired { token: u64, text: String },
    Resolved { token: u64 },
    Failed { token: u64 },
    /// A superseded response arrived and was dropped.
    Discarded { token: u64 },
}

/// A completed request, tagged with the token it was issued under.
#[derive(Debug)]
pub struct QueryResponse {
    pub token: u64,
    pub outcome: Result<Vec<RawResult>>,
}

#[derive(Debug)]
struct Scheduled {
    token: u64,
    text: String,
    due: Instant,
}

/// Delivers exactly one response for a fired request.  A task that dies
/// before finishing reports a failure from `Drop`.
struct ResponseGuard {
    token: u64,
    tx: Option<mpsc::UnboundedSender<QueryResponse>>,
}

impl ResponseGuard {
    fn new(token: u64, tx: mpsc::UnboundedSender<QueryResponse>) -> Self {
        Self { token, tx: Some(tx) }
    }

    fn finish(mut self, outcome: Result<Vec<RawResult>>) {
        self.send(outcome);
    }

    fn send(&mut self, outcome: Result<Vec<RawResult>>) {
        if let Some(tx) = self.tx.take() {
            // receiver lives as long as the query; a send error means it was dropped
            let _ = tx.send(QueryResponse {
                token: self.token,
                outcome,
            });
        }
    }
}

impl Drop for ResponseGuard {
    fn drop(&mut self) {
        if self.tx.is_some() {
            warn!("search task for token {} ended without a response", self.token);
            self.send(Err(CoreError::FetchFailed(
                "search task ended without a response".to_string(),
            )));
        }
    }
}

enum Wake {
    Response(QueryResponse),
    Due,
}

pub struct DebouncedQuery {
    catalog: Arc<dyn CatalogSource>,
    window: Duration,
    token: u64,
    scheduled: Option<Scheduled>,
    in_flight: usize,
    phase: QueryPhase,
    results: ClassifiedResults,
    notice: Option<String>,
    response_tx: mpsc::UnboundedSender<QueryResponse>,
    response_rx: mpsc::UnboundedReceiver<QueryResponse>,
}

impl DebouncedQuery {
    pub fn new(catalog: Arc<dyn CatalogSource>, window: Duration) -> Self {
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        Self {
            catalog,
            window,
            token: 0,
            scheduled: None,
            in_flight: 0,
            phase: QueryPhase::Idle,
            results: ClassifiedResults::default(),
            notice: None,
            response_tx,
            response_rx,
        }
    }

    pub fn phase(&self) -> QueryPhase {
        self.phase
    }

    pub fn results(&self) -> &ClassifiedResults {
        &self.results
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// The latest token issued.  Only a response carrying this value is applied.
    pub fn current_token(&self) -> u64 {
        self.token
    }

    /// True while a keystroke is waiting out the quiescence window.
    pub fn is_debouncing(&self) -> bool {
        self.scheduled.is_some()
    }

    /// Record a keystroke.  Every call invalidates whatever was issued before.
    ///
    /// Blank input goes straight to `Idle` and clears the buckets without a
    /// request; anything else (re)starts the window.
    pub fn on_input(&mut self, text: &str) {
        self.token += 1;

        if text.trim().is_empty() {
            self.scheduled = None;
            self.phase = QueryPhase::Idle;
            self.results = ClassifiedResults::default();
            self.notice = None;
            return;
        }

        self.scheduled = Some(Scheduled {
            token: self.token,
            text: text.to_string(),
            due: Instant::now() + self.window,
        });
    }

    /// Fire the scheduled request now, ignoring the remaining window.
    pub fn flush(&mut self) -> Option<QueryEvent> {
        let scheduled = self.scheduled.take()?;
        Some(self.fire(scheduled))
    }

    fn fire(&mut self, scheduled: Scheduled) -> QueryEvent {
        let Scheduled { token, text, .. } = scheduled;
        debug!("search fired: token={} text={:?}", token, text);

        self.phase = QueryPhase::Pending;
        self.in_flight += 1;

        let catalog = Arc::clone(&self.catalog);
        let guard = ResponseGuard::new(token, self.response_tx.clone());
        let query = text.clone();
        tokio::spawn(async move {
            let outcome = catalog.search(&query).await;
            guard.finish(outcome);
        });

        QueryEvent::Fired { token, text }
    }

    /// Fold a completed request into state.
    pub fn apply_response(&mut self, response: QueryResponse) -> QueryEvent {
        let QueryResponse { token, outcome } = response;

        if token != self.token {
            debug!(
                "discarding stale search response: token={} current={}",
                token, self.token
            );
            return QueryEvent::Discarded { token };
        }

        match outcome {
            Ok(batch) => {
                self.results = classify(&batch);
                self.notice = self
                    .results
                    .is_empty()
                    .then(|| NO_RESULTS_NOTICE.to_string());
                self.phase = QueryPhase::Resolved;
                debug!("search resolved: token={} hits={}", token, self.results.len());
                QueryEvent::Resolved { token }
            }
            Err(e) => {
                warn!("search failed: token={} {}", token, e);
                self.results = ClassifiedResults::default();
                self.notice = Some(FETCH_FAILED_NOTICE.to_string());
                self.phase = QueryPhase::Failed;
                QueryEvent::Failed { token }
            }
        }
    }

    /// Wait for the next thing that happens: the window elapsing or a
    /// response arriving.  Returns `None` once nothing is scheduled and no
    /// request is outstanding.
    pub async fn next_event(&mut self) -> Option<QueryEvent> {
        if self.scheduled.is_none() && self.in_flight == 0 {
            return None;
        }

        let due = self.scheduled.as_ref().map(|s| s.due);
        let wake = tokio::select! {
            biased;
            response = self.response_rx.recv(), if self.in_flight > 0 => match response {
                Some(r) => Wake::Response(r),
                None => return None,
            },
            _ = tokio::time::sleep_until(due.unwrap_or_else(Instant::now)), if due.is_some() => Wake::Due,
        };

        match wake {
            Wake::Response(response) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(self.apply_response(response))
            }
            Wake::Due => self.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Listing;
    use crate::model::{CatalogItem, Genre, TitleRecord};
    use async_trait::async_trait;

    struct NoCatalog;

    #[async_trait]
    impl CatalogSource for NoCatalog {
        async fn search(&self, _text: &str) -> Result<Vec<RawResult>> {
            Ok(Vec::new())
        }
        async fn list(&self, _listing: Listing) -> Result<Vec<CatalogItem>> {
            Ok(Vec::new())
        }
        async fn genre_catalog(&self) -> Result<Vec<Genre>> {
            Ok(Vec::new())
        }
        async fn discover(&self, _genre_ids: &[u32]) -> Result<Vec<CatalogItem>> {
            Ok(Vec::new())
        }
    }

    fn query() -> DebouncedQuery {
        DebouncedQuery::new(Arc::new(NoCatalog), Duration::from_millis(300))
    }

    fn hit(id: u64, title: &str) -> RawResult {
        RawResult::Movie(TitleRecord {
            id,
            title: title.to_string(),
            ..TitleRecord::default()
        })
    }

    #[tokio::test]
    async fn test_out_of_order_responses_keep_newest() {
        let mut q = query();
        q.on_input("cat");
        assert_eq!(q.current_token(), 1);
        q.on_input("dog");
        assert_eq!(q.current_token(), 2);

        // "dog" lands first, then the stale "cat" response
        let ev = q.apply_response(QueryResponse {
            token: 2,
            outcome: Ok(vec![hit(2, "Dog Day Afternoon")]),
        });
        assert_eq!(ev, QueryEvent::Resolved { token: 2 });

        let ev = q.apply_response(QueryResponse {
            token: 1,
            outcome: Ok(vec![hit(1, "Cat People")]),
        });
        assert_eq!(ev, QueryEvent::Discarded { token: 1 });

        assert_eq!(q.phase(), QueryPhase::Resolved);
        assert_eq!(q.results().movies.len(), 1);
        assert_eq!(q.results().movies[0].title, "Dog Day Afternoon");
    }

    #[tokio::test]
    async fn test_stale_failure_is_silent() {
        let mut q = query();
        q.on_input("cat");
        q.on_input("dog");
        q.apply_response(QueryResponse {
            token: 2,
            outcome: Ok(vec![hit(2, "Dog Soldiers")]),
        });
        let ev = q.apply_response(QueryResponse {
            token: 1,
            outcome: Err(CoreError::FetchFailed("timeout".to_string())),
        });
        assert_eq!(ev, QueryEvent::Discarded { token: 1 });
        assert_eq!(q.phase(), QueryPhase::Resolved);
        assert!(q.notice().is_none());
    }

    #[tokio::test]
    async fn test_failure_clears_previous_buckets() {
        let mut q = query();
        q.on_input("alien");
        q.apply_response(QueryResponse {
            token: 1,
            outcome: Ok(vec![hit(1, "Alien")]),
        });
        q.on_input("aliens");
        let ev = q.apply_response(QueryResponse {
            token: 2,
            outcome: Err(CoreError::FetchFailed("502".to_string())),
        });
        assert_eq!(ev, QueryEvent::Failed { token: 2 });
        assert!(q.results().is_empty());
        assert_eq!(q.notice(), Some(FETCH_FAILED_NOTICE));
    }

    #[tokio::test]
    async fn test_empty_result_sets_notice() {
        let mut q = query();
        q.on_input("zzzz");
        q.apply_response(QueryResponse {
            token: 1,
            outcome: Ok(Vec::new()),
        });
        assert_eq!(q.phase(), QueryPhase::Resolved);
        assert_eq!(q.notice(), Some(NO_RESULTS_NOTICE));
    }

    #[tokio::test]
    async fn test_blank_input_goes_idle_without_scheduling() {
        let mut q = query();
        q.on_input("dune");
        assert!(q.is_debouncing());
        q.on_input("   ");
        assert!(!q.is_debouncing());
        assert_eq!(q.phase(), QueryPhase::Idle);
        assert!(q.next_event().await.is_none());
    }
}
