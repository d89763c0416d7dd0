#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use adminkit_api::{ApiClient, Error, FilterValue, Filters, JobState, ListQuery};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client =
        ApiClient::from_reqwest(&format!("{}/api", server.uri()), reqwest::Client::new()).unwrap();
    (server, client)
}

// ── List tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_sends_pagination_and_filters() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/widgets"))
        .and(query_param("page", "3"))
        .and(query_param("per_page", "25"))
        .and(query_param("search", "blue"))
        .and(query_param("status", "active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": 7, "name": "blue widget" }],
            "meta": { "total": 51 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut filters = Filters::new();
    filters.insert("status".into(), FilterValue::from("active"));
    let query = ListQuery {
        page: 3,
        per_page: 25,
        search: "blue".into(),
        filters,
    };

    let envelope = client.list("widgets", &query).await.unwrap();

    assert_eq!(envelope.items.len(), 1);
    assert_eq!(envelope.items[0]["name"], "blue widget");
    assert_eq!(envelope.total, 51);
    assert_eq!(envelope.raw["meta"]["total"], 51);
}

#[tokio::test]
async fn test_list_rejects_non_array_data() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
        .mount(&server)
        .await;

    let result = client.list("widgets", &ListQuery::default()).await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_list_server_error_is_classified() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/widgets"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "message": "maintenance" })),
        )
        .mount(&server)
        .await;

    let result = client.list("widgets", &ListQuery::default()).await;
    match result {
        Err(Error::Server { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("expected Server error, got: {other:?}"),
    }
}

// ── Job submit tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_start_sync_accepts_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/email-accounts/42/sync"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    client.start_sync("email-accounts/42").await.unwrap();
}

#[tokio::test]
async fn test_start_sync_validation_errors_are_aggregated() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/email-accounts/42/sync"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "The given data was invalid.",
            "errors": {
                "imap_host": ["The IMAP host is required."],
                "password": ["The password is required."]
            }
        })))
        .mount(&server)
        .await;

    let result = client.start_sync("email-accounts/42").await;
    match result {
        Err(Error::Validation { message, fields }) => {
            assert_eq!(
                message,
                "The IMAP host is required. The password is required."
            );
            assert_eq!(fields.len(), 2);
        }
        other => panic!("expected Validation error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_start_sync_status_taxonomy() {
    let cases: [(u16, fn(&Error) -> bool); 5] = [
        (401, |e| matches!(e, Error::Authentication { .. })),
        (403, |e| matches!(e, Error::PermissionDenied { .. })),
        (404, |e| matches!(e, Error::NotFound { .. })),
        (429, |e| {
            matches!(
                e,
                Error::RateLimited {
                    retry_after_secs: Some(30)
                }
            )
        }),
        (409, |e| matches!(e, Error::Api { status: 409, .. })),
    ];

    for (status, check) in cases {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/api/email-accounts/1/sync"))
            .respond_with(ResponseTemplate::new(status).insert_header("Retry-After", "30"))
            .mount(&server)
            .await;

        let err = client.start_sync("email-accounts/1").await.unwrap_err();
        assert!(check(&err), "HTTP {status} classified as {err:?}");
    }
}

// ── Job status tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_sync_status_unwraps_data() {
    let (server, client) = setup().await;

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

    let status = client.sync_status("email-accounts/42").await.unwrap();

    assert_eq!(status.status, JobState::Completed);
    assert!(status.is_recent);
    let stats = status.stats.unwrap();
    assert_eq!(stats.total_fetched, Some(10));
    assert_eq!(stats.new_emails, Some(3));
}
