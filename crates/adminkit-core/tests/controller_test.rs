#![allow(clippy::unwrap_used)]

// End-to-end tests driving the list controller and job monitor against a
// mock HTTP server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use adminkit_api::{ApiClient, TransportConfig};
use adminkit_core::{
    CachePolicy, HttpJobBackend, JobMonitor, JobPhase, ListController, ListQueryState,
    NoticeLevel, PollSettings, ResultCache,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client =
        ApiClient::new(&format!("{}/api", server.uri()), &TransportConfig::default()).unwrap();
    (server, client)
}

fn widgets(count: u64) -> serde_json::Value {
    let rows: Vec<_> = (1..=count)
        .map(|id| json!({ "id": id, "name": format!("widget-{id}") }))
        .collect();
    json!({ "data": rows, "meta": { "total": count } })
}

fn fast_polling() -> PollSettings {
    PollSettings {
        initial_delay: Duration::from_millis(10),
        interval: Duration::from_millis(20),
        max_attempts: 10,
    }
}

// ── List controller ─────────────────────────────────────────────────

#[tokio::test]
async fn second_fetch_is_served_from_cache_until_refresh() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/widgets"))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "20"))
        .and(query_param("search", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(widgets(5)))
        .expect(2)
        .mount(&server)
        .await;

    let cache = Arc::new(ResultCache::new(CachePolicy::unbounded()));
    let controller =
        ListController::with_cache(client, "widgets", cache).with_state(ListQueryState {
            per_page: 20,
            ..ListQueryState::default()
        });

    let first = controller.fetch(Default::default()).await;
    assert_eq!(first.total_count, 5);
    assert_eq!(first.items.len(), 5);

    let view = controller.view();
    assert!(!view.loading);
    assert_eq!(view.total_rows, 5);

    let second = controller.fetch(Default::default()).await;
    assert!(Arc::ptr_eq(&first, &second), "cache hit returns the stored entry");

    // A mutation happened elsewhere: refresh bypasses the cache.
    let refreshed = controller.refresh().await;
    assert_eq!(refreshed.total_count, 5);
    assert!(!Arc::ptr_eq(&first, &refreshed));
}

#[tokio::test]
async fn server_error_yields_empty_result_and_one_notice() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/widgets"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "message": "database down" })),
        )
        .expect(2)
        .mount(&server)
        .await;

    let (tx, mut notices) = mpsc::unbounded_channel();
    let cache = Arc::new(ResultCache::new(CachePolicy::unbounded()));
    let controller =
        ListController::with_cache(client, "widgets", Arc::clone(&cache)).with_notifier(Arc::new(tx));

    let entry = controller.fetch(Default::default()).await;
    assert!(entry.items.is_empty());
    assert_eq!(entry.total_count, 0);
    assert!(!controller.view().loading);
    assert!(cache.is_empty(), "failures are not cached");

    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notices.try_recv().is_err());

    // Not cached, so the next fetch goes back to the server.
    controller.fetch(Default::default()).await;
}

#[tokio::test]
async fn search_resets_to_first_page() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(widgets(3)))
        .mount(&server)
        .await;

    let cache = Arc::new(ResultCache::new(CachePolicy::unbounded()));
    let mut controller = ListController::with_cache(client, "widgets", cache);

    controller.set_current_page(4).await;
    assert_eq!(controller.state().current_page, 4);

    controller.handle_search("blue").await;
    assert_eq!(controller.state().current_page, 1);
    assert_eq!(controller.view().search_term, "blue");

    let requests = server.received_requests().await.unwrap();
    let last = requests.last().unwrap();
    let pairs: Vec<(String, String)> = last
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert!(pairs.contains(&("page".to_owned(), "1".to_owned())));
    assert!(pairs.contains(&("search".to_owned(), "blue".to_owned())));
}

// ── Job monitor ─────────────────────────────────────────────────────

#[tokio::test]
async fn sync_runs_to_completion_over_http() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/email-accounts/42/sync"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "message": "queued" })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/email-accounts/42/sync-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "status": "queued", "is_recent": false }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/email-accounts/42/sync-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "status": "completed",
                "is_recent": true,
                "stats": { "total_fetched": 10, "new_emails": 3 }
            }
        })))
        .mount(&server)
        .await;

    let completions = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&completions);
    let (tx, mut notices) = mpsc::unbounded_channel();
    let monitor = JobMonitor::builder(HttpJobBackend::new(client, "email-accounts"), 42_u64)
        .settings(fast_polling())
        .notifier(Arc::new(tx))
        .on_complete(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    assert!(monitor.start());
    let mut rx = monitor.subscribe();
    let run = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|r| r.phase.is_terminal()),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();

    assert_eq!(run.phase, JobPhase::Completed);
    assert_eq!(run.attempts, 2);
    let stats = run.result.unwrap();
    assert_eq!(stats.total_fetched, Some(10));
    assert_eq!(stats.new_emails, Some(3));
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    assert_eq!(notices.try_recv().unwrap().level, NoticeLevel::Success);
}

#[tokio::test]
async fn rejected_submission_fails_without_polling() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/email-accounts/7/sync"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "The given data was invalid.",
            "errors": { "imap_host": ["The IMAP host is required."] }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/email-accounts/7/sync-status"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (tx, mut notices) = mpsc::unbounded_channel();
    let monitor = JobMonitor::builder(HttpJobBackend::new(client, "email-accounts"), "7")
        .settings(fast_polling())
        .notifier(Arc::new(tx))
        .build();

    assert!(monitor.start());
    let mut rx = monitor.subscribe();
    let run = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|r| r.phase.is_terminal()),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();

    assert_eq!(run.phase, JobPhase::Failed);
    assert_eq!(run.error.unwrap().message, "The IMAP host is required.");
    assert_eq!(notices.try_recv().unwrap().level, NoticeLevel::Error);
    assert!(notices.try_recv().is_err());
}
