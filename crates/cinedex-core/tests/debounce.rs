mod common;

use std::sync::Arc;
use std::time::Duration;

use cinedex_core::search::{DebouncedQuery, QueryEvent, QueryPhase, FETCH_FAILED_NOTICE};
use common::fakes::FakeCatalog;

const WINDOW: Duration = Duration::from_millis(300);

fn fired(token: u64, text: &str) -> Option<QueryEvent> {
    Some(QueryEvent::Fired {
        token,
        text: text.to_string(),
    })
}

#[tokio::test(start_paused = true)]
async fn fast_typing_issues_one_request_after_quiescence() {
    let catalog = Arc::new(FakeCatalog::new());
    let mut query = DebouncedQuery::new(catalog.clone(), WINDOW);

    for text in ["d", "du", "dun", "dune"] {
        query.on_input(text);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(catalog.searches().is_empty());

    assert_eq!(query.next_event().await, fired(4, "dune"));
    assert_eq!(query.phase(), QueryPhase::Pending);
    assert_eq!(query.next_event().await, Some(QueryEvent::Resolved { token: 4 }));

    assert_eq!(catalog.searches(), vec!["dune".to_string()]);
    assert_eq!(query.results().movies[0].title, "dune");
    assert_eq!(query.results().people.len(), 1);
    assert!(query.next_event().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn superseded_response_never_becomes_visible() {
    let catalog = Arc::new(FakeCatalog::new());
    catalog.delay("cat", Duration::from_millis(500));
    catalog.delay("dog", Duration::from_millis(10));
    let mut query = DebouncedQuery::new(catalog.clone(), WINDOW);

    query.on_input("cat");
    assert_eq!(query.next_event().await, fired(1, "cat"));

    query.on_input("dog");
    assert_eq!(query.next_event().await, fired(2, "dog"));
    assert_eq!(query.next_event().await, Some(QueryEvent::Resolved { token: 2 }));
    assert_eq!(query.next_event().await, Some(QueryEvent::Discarded { token: 1 }));

    assert_eq!(query.phase(), QueryPhase::Resolved);
    assert_eq!(query.results().movies.len(), 1);
    assert_eq!(query.results().movies[0].title, "dog");
    assert_eq!(catalog.searches(), vec!["cat".to_string(), "dog".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn stale_response_while_newer_is_pending_changes_nothing() {
    let catalog = Arc::new(FakeCatalog::new());
    catalog.delay("cat", Duration::from_millis(500));
    catalog.delay("dog", Duration::from_millis(1000));
    let mut query = DebouncedQuery::new(catalog.clone(), WINDOW);

    query.on_input("cat");
    assert_eq!(query.next_event().await, fired(1, "cat"));
    query.on_input("dog");
    assert_eq!(query.next_event().await, fired(2, "dog"));

    assert_eq!(query.next_event().await, Some(QueryEvent::Discarded { token: 1 }));
    assert_eq!(query.phase(), QueryPhase::Pending);
    assert!(query.results().is_empty());
    assert!(query.notice().is_none());

    assert_eq!(query.next_event().await, Some(QueryEvent::Resolved { token: 2 }));
    assert_eq!(query.results().movies[0].title, "dog");
}

#[tokio::test(start_paused = true)]
async fn blank_input_never_reaches_the_catalog() {
    let catalog = Arc::new(FakeCatalog::new());
    let mut query = DebouncedQuery::new(catalog.clone(), WINDOW);

    query.on_input("");
    assert!(query.next_event().await.is_none());

    query.on_input("dune");
    tokio::time::sleep(Duration::from_millis(50)).await;
    query.on_input("   ");
    assert!(query.next_event().await.is_none());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(catalog.searches().is_empty());
    assert_eq!(query.phase(), QueryPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn clearing_input_drops_resolved_results() {
    let catalog = Arc::new(FakeCatalog::new());
    let mut query = DebouncedQuery::new(catalog.clone(), WINDOW);

    query.on_input("heat");
    while query.next_event().await.is_some() {}
    assert!(!query.results().is_empty());

    query.on_input("");
    assert_eq!(query.phase(), QueryPhase::Idle);
    assert!(query.results().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_clears_buckets_and_sets_notice() {
    let catalog = Arc::new(FakeCatalog::new());
    catalog.fail("boom");
    let mut query = DebouncedQuery::new(catalog.clone(), WINDOW);

    query.on_input("alien");
    while query.next_event().await.is_some() {}
    assert_eq!(query.results().movies.len(), 1);

    query.on_input("boom");
    assert_eq!(query.next_event().await, fired(2, "boom"));
    assert_eq!(query.next_event().await, Some(QueryEvent::Failed { token: 2 }));
    assert_eq!(query.phase(), QueryPhase::Failed);
    assert!(query.results().is_empty());
    assert_eq!(query.notice(), Some(FETCH_FAILED_NOTICE));
}

#[tokio::test(start_paused = true)]
async fn panicking_search_reports_failure_instead_of_hanging() {
    let catalog = Arc::new(FakeCatalog::new());
    catalog.panic_on("boom");
    let mut query = DebouncedQuery::new(catalog.clone(), WINDOW);

    query.on_input("boom");
    assert_eq!(query.next_event().await, fired(1, "boom"));
    assert_eq!(query.next_event().await, Some(QueryEvent::Failed { token: 1 }));
    assert!(query.next_event().await.is_none());

    assert_eq!(query.phase(), QueryPhase::Failed);
    assert_eq!(query.notice(), Some(FETCH_FAILED_NOTICE));
}
