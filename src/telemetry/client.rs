//! Feedback submission and search-event logging.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::location::{DEFAULT_GEOLOCATION_URL, GeolocationService, Location, location_or_empty};
use crate::rate_limit::{
    FEEDBACK_STORAGE_KEY, MAX_FEEDBACK_SUBMISSIONS_PER_HOUR, MAX_SEARCH_LOGS_PER_HOUR,
    RateLimitExceeded, SEARCH_LOG_STORAGE_KEY, WindowRateLimiter,
};
use crate::storage::KeyValueStore;
use crate::user_agent;

/// The collector parses the body as JSON but must be posted as plain text.
const PAYLOAD_CONTENT_TYPE: &str = "text/plain;charset=utf-8";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Errors surfaced to the user by feedback submission.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Too many submissions within the last hour.
    #[error(transparent)]
    RateLimited(#[from] RateLimitExceeded),

    /// The request could not be delivered.
    #[error("failed to submit to {endpoint}: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The payload could not be encoded.
    #[error("failed to encode telemetry payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// A configured URL is not a valid absolute URL.
    #[error("invalid telemetry URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build telemetry HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl TelemetryError {
    fn invalid_url(url: &str, source: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            source,
        }
    }
}

/// Thumbs up or down on a generated definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Up,
    Down,
}

impl Rating {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown rating.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown rating '{0}' (expected 'up' or 'down')")]
pub struct ParseRatingError(pub String);

impl FromStr for Rating {
    type Err = ParseRatingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "+" => Ok(Self::Up),
            "down" | "-" => Ok(Self::Down),
            _ => Err(ParseRatingError(s.to_string())),
        }
    }
}

/// User feedback on one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackData {
    pub topic: String,
    pub rating: Rating,
    /// Free-text reason; may be empty.
    pub reason: String,
    /// The rated definition.
    pub definition: String,
    /// The deep article, empty when none was generated.
    pub expanded_article: String,
    pub was_deep_search_used: bool,
}

/// Kind of a logged search event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchEventKind {
    Search,
    DeepSearch,
}

impl SearchEventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::DeepSearch => "deep_search",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackPayload<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    topic: &'a str,
    rating: Rating,
    reason: &'a str,
    definition: &'a str,
    expanded_article: &'a str,
    was_deep_search_used: bool,
    #[serde(serialize_with = "location_or_empty")]
    location: Option<Location>,
}

#[derive(Debug, Serialize)]
struct SearchLogPayload<'a> {
    #[serde(rename = "type")]
    kind: SearchEventKind,
    topic: &'a str,
    #[serde(serialize_with = "location_or_empty")]
    location: Option<Location>,
}

/// Endpoints and timeouts for [`TelemetryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    /// Collector receiving feedback and search logs; `None` simulates submissions.
    pub endpoint: Option<String>,
    /// IP geolocation service; `None` disables location lookups.
    pub geolocation_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            geolocation_url: Some(DEFAULT_GEOLOCATION_URL.to_string()),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Sends feedback and search logs to the collector.
///
/// Cheap to clone; clones share the HTTP client, limiter store and location cache.
#[derive(Debug, Clone)]
pub struct TelemetryClient {
    client: Client,
    endpoint: Option<Url>,
    limiter: WindowRateLimiter,
    geolocation: GeolocationService,
}

impl TelemetryClient {
    /// Builds a client.
    ///
    /// `limiter` persists submission windows; `session_store` caches the
    /// location lookup.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidUrl`] for malformed URLs and
    /// [`TelemetryError::Client`] when the HTTP client cannot be built.
    pub fn new(
        settings: TelemetrySettings,
        limiter: WindowRateLimiter,
        session_store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, TelemetryError> {
        let endpoint = settings
            .endpoint
            .as_deref()
            .map(|raw| Url::parse(raw).map_err(|e| TelemetryError::invalid_url(raw, e)))
            .transpose()?;
        if let Some(raw) = settings.geolocation_url.as_deref() {
            Url::parse(raw).map_err(|e| TelemetryError::invalid_url(raw, e))?;
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(user_agent::default_telemetry_user_agent())
            .build()
            .map_err(TelemetryError::Client)?;

        if endpoint.is_none() {
            info!("no telemetry endpoint configured; submissions will be simulated");
        }

        Ok(Self {
            geolocation: GeolocationService::new(
                client.clone(),
                settings.geolocation_url,
                session_store,
            ),
            client,
            endpoint,
            limiter,
        })
    }

    /// Whether submissions are sent to a real collector.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Submits feedback on one generation.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::RateLimited`] when five submissions were made
    /// within the last hour, and [`TelemetryError::Network`] when the request
    /// fails. The collector's response is not inspected.
    #[instrument(skip(self, data), fields(topic = %data.topic, rating = %data.rating))]
    pub async fn submit_feedback(&self, data: &FeedbackData) -> Result<(), TelemetryError> {
        self.limiter.check_and_record(
            FEEDBACK_STORAGE_KEY,
            MAX_FEEDBACK_SUBMISSIONS_PER_HOUR,
            "feedback",
        )?;

        let payload = FeedbackPayload {
            kind: "feedback",
            topic: &data.topic,
            rating: data.rating,
            reason: &data.reason,
            definition: &data.definition,
            expanded_article: &data.expanded_article,
            was_deep_search_used: data.was_deep_search_used,
            location: self.geolocation.lookup().await,
        };
        let body = serde_json::to_string(&payload)?;

        let Some(endpoint) = &self.endpoint else {
            info!(payload = %body, "feedback submission simulated: no endpoint configured");
            return Ok(());
        };

        self.post(endpoint, body).await?;
        info!("feedback submitted");
        Ok(())
    }

    /// Logs a search for `topic`. Failures are logged, never returned.
    pub async fn log_search(&self, topic: &str) {
        self.log_event(SearchEventKind::Search, topic).await;
    }

    /// Logs a deep search for `topic`. Failures are logged, never returned.
    pub async fn log_deep_search(&self, topic: &str) {
        self.log_event(SearchEventKind::DeepSearch, topic).await;
    }

    /// Logs a search event on a background task of the current runtime.
    ///
    /// Outside a tokio runtime the event is dropped with a warning and `None`
    /// is returned.
    pub fn spawn_log(
        &self,
        kind: SearchEventKind,
        topic: impl Into<String>,
    ) -> Option<JoinHandle<()>> {
        let Ok(handle) = Handle::try_current() else {
            warn!(kind = kind.as_str(), "no async runtime; search log skipped");
            return None;
        };
        let client = self.clone();
        let topic = topic.into();
        Some(handle.spawn(async move { client.log_event(kind, &topic).await }))
    }

    #[instrument(skip(self), fields(kind = kind.as_str()))]
    async fn log_event(&self, kind: SearchEventKind, topic: &str) {
        if let Err(error) = self.limiter.check_and_record(
            SEARCH_LOG_STORAGE_KEY,
            MAX_SEARCH_LOGS_PER_HOUR,
            "search logs",
        ) {
            warn!(error = %error, "search log rate limit exceeded; skipping log");
            return;
        }

        let payload = SearchLogPayload {
            kind,
            topic,
            location: self.geolocation.lookup().await,
        };
        let body = match serde_json::to_string(&payload) {
            Ok(body) => body,
            Err(error) => {
                warn!(error = %error, "could not encode search log");
                return;
            }
        };

        let Some(endpoint) = &self.endpoint else {
            debug!(payload = %body, "search log simulated: no endpoint configured");
            return;
        };

        if let Err(error) = self.post(endpoint, body).await {
            warn!(error = %error, "failed to submit search log");
        }
    }

    async fn post(&self, endpoint: &Url, body: String) -> Result<(), TelemetryError> {
        let response = self
            .client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, PAYLOAD_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|source| TelemetryError::Network {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "collector responded with an error status");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn offline_client() -> TelemetryClient {
        let settings = TelemetrySettings {
            endpoint: None,
            geolocation_url: None,
            timeout_secs: 1,
        };
        let limiter = WindowRateLimiter::new(Arc::new(MemoryStore::new()));
        TelemetryClient::new(settings, limiter, Arc::new(MemoryStore::new())).unwrap()
    }

    fn feedback() -> FeedbackData {
        FeedbackData {
            topic: "Entropy".into(),
            rating: Rating::Up,
            reason: String::new(),
            definition: "A measure of disorder.".into(),
            expanded_article: String::new(),
            was_deep_search_used: false,
        }
    }

    #[test]
    fn test_rating_parse_and_display() {
        assert_eq!("UP".parse::<Rating>().unwrap(), Rating::Up);
        assert_eq!("-".parse::<Rating>().unwrap(), Rating::Down);
        assert!("sideways".parse::<Rating>().is_err());
        assert_eq!(Rating::Down.to_string(), "down");
    }

    #[test]
    fn test_feedback_payload_shape() {
        let data = feedback();
        let payload = FeedbackPayload {
            kind: "feedback",
            topic: &data.topic,
            rating: data.rating,
            reason: &data.reason,
            definition: &data.definition,
            expanded_article: &data.expanded_article,
            was_deep_search_used: true,
            location: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "feedback");
        assert_eq!(value["rating"], "up");
        assert_eq!(value["wasDeepSearchUsed"], true);
        assert_eq!(value["expandedArticle"], "");
        assert_eq!(value["location"], serde_json::json!({}));
    }

    #[test]
    fn test_search_payload_type_names() {
        let payload = SearchLogPayload {
            kind: SearchEventKind::DeepSearch,
            topic: "Entropy",
            location: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "deep_search");
        assert_eq!(value["topic"], "Entropy");
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let settings = TelemetrySettings {
            endpoint: Some("not a url".into()),
            ..TelemetrySettings::default()
        };
        let limiter = WindowRateLimiter::new(Arc::new(MemoryStore::new()));
        let err = TelemetryClient::new(settings, limiter, Arc::new(MemoryStore::new())).unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_simulated_feedback_still_counts_against_limit() {
        let client = offline_client();
        for _ in 0..MAX_FEEDBACK_SUBMISSIONS_PER_HOUR {
            client.submit_feedback(&feedback()).await.unwrap();
        }
        let err = client.submit_feedback(&feedback()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Rate limit for feedback exceeded. Please try again later. You can submit 5 times per hour."
        );
    }

    #[tokio::test]
    async fn test_simulated_search_log_is_counted() {
        let store = Arc::new(MemoryStore::new());
        let limiter = WindowRateLimiter::new(store.clone());
        let settings = TelemetrySettings {
            endpoint: None,
            geolocation_url: None,
            timeout_secs: 1,
        };
        let client = TelemetryClient::new(settings, limiter.clone(), Arc::new(MemoryStore::new()))
            .unwrap();

        client.log_search("Entropy").await;
        client.log_deep_search("Entropy").await;
        client
            .spawn_log(SearchEventKind::DeepSearch, "Entropy")
            .unwrap()
            .await
            .unwrap();

        assert_eq!(limiter.recorded_in_window(SEARCH_LOG_STORAGE_KEY), 3);
    }

    #[test]
    fn test_spawn_log_without_runtime_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let limiter = WindowRateLimiter::new(store.clone());
        let settings = TelemetrySettings {
            endpoint: None,
            geolocation_url: None,
            timeout_secs: 1,
        };
        let client = TelemetryClient::new(settings, limiter.clone(), Arc::new(MemoryStore::new()))
            .unwrap();

        assert!(client.spawn_log(SearchEventKind::Search, "Entropy").is_none());
        assert_eq!(limiter.recorded_in_window(SEARCH_LOG_STORAGE_KEY), 0);
    }
}
