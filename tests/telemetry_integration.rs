//! Integration tests for feedback submission, search logging and geolocation.

use std::sync::Arc;

use genwiki_core::rate_limit::{FEEDBACK_STORAGE_KEY, SEARCH_LOG_STORAGE_KEY};
use genwiki_core::storage::GEOLOCATION_CACHE_KEY;
use genwiki_core::telemetry::{GeolocationService, SearchEventKind};
use genwiki_core::{
    FeedbackData, FileStore, KeyValueStore, MemoryStore, Rating, TelemetryClient, TelemetryError,
    TelemetrySettings, WindowRateLimiter,
};
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample_feedback() -> FeedbackData {
    FeedbackData {
        topic: "Entropy".into(),
        rating: Rating::Up,
        reason: "clear".into(),
        definition: "Entropy is a measure of disorder.".into(),
        expanded_article: String::new(),
        was_deep_search_used: false,
    }
}

async fn mount_location(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ip": "203.0.113.7",
            "country_code": "FR",
            "country_name": "France",
            "region": "Île-de-France",
            "city": "Paris",
            "latitude": 48.85,
            "longitude": 2.35,
            "org": "Example ISP"
        })))
        .mount(server)
        .await;
}

fn client_for(
    server: &MockServer,
    local: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
) -> TelemetryClient {
    TelemetryClient::new(
        TelemetrySettings {
            endpoint: Some(format!("{}/collect", server.uri())),
            geolocation_url: Some(format!("{}/json/", server.uri())),
            ..TelemetrySettings::default()
        },
        WindowRateLimiter::new(local),
        session,
    )
    .unwrap()
}

#[tokio::test]
async fn test_feedback_is_posted_as_plain_text_json() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    Mock::given(method("POST"))
        .and(path("/collect"))
        .and(header("content-type", "text/plain;charset=utf-8"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(
        &server,
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
    );
    assert!(client.is_configured());
    client.submit_feedback(&sample_feedback()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let post = requests
        .iter()
        .find(|request| request.url.path() == "/collect")
        .unwrap();
    let body: Value = serde_json::from_slice(&post.body).unwrap();
    assert_eq!(body["type"], "feedback");
    assert_eq!(body["topic"], "Entropy");
    assert_eq!(body["rating"], "up");
    assert_eq!(body["wasDeepSearchUsed"], false);
    assert_eq!(body["location"]["city"], "Paris");
    assert_eq!(body["location"]["countryCode"], "FR");
}

#[tokio::test]
async fn test_feedback_limited_to_five_per_hour() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    Mock::given(method("POST"))
        .and(path("/collect"))
        .respond_with(ResponseTemplate::new(200))
        .expect(5)
        .mount(&server)
        .await;

    let local: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let client = client_for(&server, Arc::clone(&local), Arc::new(MemoryStore::new()));
    for _ in 0..5 {
        client.submit_feedback(&sample_feedback()).await.unwrap();
    }
    let err = client.submit_feedback(&sample_feedback()).await.unwrap_err();
    assert!(matches!(err, TelemetryError::RateLimited(_)));
    assert_eq!(
        err.to_string(),
        "Rate limit for feedback exceeded. Please try again later. You can submit 5 times per hour."
    );

    let limiter = WindowRateLimiter::new(local);
    assert_eq!(limiter.recorded_in_window(FEEDBACK_STORAGE_KEY), 5);
}

#[tokio::test]
async fn test_collector_error_status_is_not_an_error() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    Mock::given(method("POST"))
        .and(path("/collect"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(
        &server,
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
    );
    client.submit_feedback(&sample_feedback()).await.unwrap();
}

#[tokio::test]
async fn test_search_logs_carry_kind_and_topic() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    Mock::given(method("POST"))
        .and(path("/collect"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let local: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let client = client_for(&server, Arc::clone(&local), Arc::new(MemoryStore::new()));
    client.log_search("Harmony").await;
    client.log_deep_search("Harmony").await;
    client
        .spawn_log(SearchEventKind::Search, "Harmony")
        .unwrap()
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let kinds: Vec<String> = requests
        .iter()
        .filter(|request| request.url.path() == "/collect")
        .map(|request| {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            assert_eq!(body["topic"], "Harmony");
            body["type"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(kinds, vec!["search", "deep_search", "search"]);
    assert_eq!(
        WindowRateLimiter::new(local).recorded_in_window(SEARCH_LOG_STORAGE_KEY),
        3
    );
}

#[tokio::test]
async fn test_geolocation_is_fetched_once_per_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ip": "198.51.100.2",
            "city": "Lyon",
            "latitude": 45.76,
            "longitude": 4.83
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cache: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let service = GeolocationService::new(
        reqwest::Client::new(),
        Some(format!("{}/json/", server.uri())),
        Arc::clone(&cache),
    );
    let first = service.lookup().await.unwrap();
    let second = service.lookup().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.city, "Lyon");
    assert_eq!(first.country, "N/A");
    assert!(cache.get(GEOLOCATION_CACHE_KEY).unwrap().is_some());
}

#[tokio::test]
async fn test_geolocation_error_payload_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": true,
            "reason": "RateLimited"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let cache: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let service = GeolocationService::new(
        reqwest::Client::new(),
        Some(format!("{}/json/", server.uri())),
        Arc::clone(&cache),
    );
    assert!(service.lookup().await.is_none());
    assert!(service.lookup().await.is_none());
    assert!(cache.get(GEOLOCATION_CACHE_KEY).unwrap().is_none());
}

#[tokio::test]
async fn test_feedback_window_persists_in_file_store() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    Mock::given(method("POST"))
        .and(path("/collect"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    {
        let local: Arc<dyn KeyValueStore> = Arc::new(FileStore::in_dir(dir.path()));
        let client = client_for(&server, local, Arc::new(MemoryStore::new()));
        for _ in 0..5 {
            client.submit_feedback(&sample_feedback()).await.unwrap();
        }
    }

    let reopened: Arc<dyn KeyValueStore> = Arc::new(FileStore::in_dir(dir.path()));
    let client = client_for(&server, reopened, Arc::new(MemoryStore::new()));
    let err = client.submit_feedback(&sample_feedback()).await.unwrap_err();
    assert!(matches!(err, TelemetryError::RateLimited(_)));
}
