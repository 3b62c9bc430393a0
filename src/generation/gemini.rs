//! Gemini REST client.
//!
//! Streams use `:streamGenerateContent?alt=sse`; each SSE frame carries a
//! partial `GenerateContentResponse`. Structured requests use
//! `:generateContent` with a JSON response schema.

use std::collections::VecDeque;
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use super::error::{GenerationError, MISSING_API_KEY_MESSAGE, stream_error_message};
use super::sse::SseDecoder;
use super::wire::GenerateContentRequest;
use super::wire::GenerateContentResponse;
use super::{GenerationBackend, GenerationRequest, ResultStream, StreamResult};
use crate::sources::SourceTracker;
use crate::user_agent;

/// Public Gemini API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const API_KEY_HEADER: &str = "x-goog-api-key";
const CONNECT_TIMEOUT_SECS: u64 = 30;
/// Deep articles think for a while before the first byte arrives.
const READ_TIMEOUT_SECS: u64 = 300;

/// Connection settings for [`GeminiClient`].
#[derive(Clone)]
pub struct GeminiSettings {
    /// API credential; `None` makes every request fail with a configuration error.
    pub api_key: Option<String>,
    /// Scheme and host of the API, without a trailing slash.
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .finish()
    }
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_API_BASE_URL.to_string(),
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

impl GeminiSettings {
    /// Default settings with the key read from `GEMINI_API_KEY`, falling back to `API_KEY`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_key: api_key_from_env(),
            ..Self::default()
        }
    }
}

/// Reads the API key from `GEMINI_API_KEY` or `API_KEY`, ignoring blank values.
#[must_use]
pub fn api_key_from_env() -> Option<String> {
    ["GEMINI_API_KEY", "API_KEY"].into_iter().find_map(|name| {
        env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

/// Client for the Gemini generation API.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: Option<Arc<str>>,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Builds a client from `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Client`] when the HTTP client cannot be built.
    pub fn new(settings: GeminiSettings) -> Result<Self, GenerationError> {
        if settings.api_key.is_none() {
            error!("API key is not set; generation requests will fail");
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .read_timeout(Duration::from_secs(settings.read_timeout_secs))
            .user_agent(user_agent::default_generation_user_agent())
            .gzip(true)
            .build()
            .map_err(GenerationError::Client)?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.map(Arc::from),
        })
    }

    /// Whether an API key is configured.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{model}:{method}", self.base_url)
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    fn stream(&self, request: GenerationRequest) -> ResultStream {
        let Some(api_key) = self.api_key.clone() else {
            error!(topic = %request.topic, "stream skipped: API key is not configured");
            return Box::pin(stream::once(async {
                StreamResult::Error(MISSING_API_KEY_MESSAGE.to_string())
            }));
        };

        let endpoint = format!(
            "{}?alt=sse",
            self.endpoint(&request.model, "streamGenerateContent")
        );
        info!(
            kind = request.kind.as_str(),
            model = %request.model,
            topic = %request.topic,
            "starting generation stream"
        );
        let builder = self
            .client
            .post(&endpoint)
            .header(API_KEY_HEADER, api_key.as_ref())
            .json(&GenerateContentRequest::from(&request));

        let driver = StreamDriver {
            phase: Phase::Pending(builder),
            pending: VecDeque::new(),
            decoder: SseDecoder::new(),
            tracker: SourceTracker::new(),
            topic: request.topic,
            endpoint,
        };

        Box::pin(stream::unfold(driver, |mut driver| async move {
            let next = driver.next().await?;
            Some((next, driver))
        }))
    }

    #[instrument(skip(self, request), fields(kind = request.kind.as_str(), topic = %request.topic))]
    async fn generate_json(&self, request: GenerationRequest) -> Result<Value, GenerationError> {
        let api_key = self.api_key.clone().ok_or(GenerationError::MissingApiKey)?;
        let endpoint = self.endpoint(&request.model, "generateContent");

        let builder = self
            .client
            .post(&endpoint)
            .header(API_KEY_HEADER, api_key.as_ref())
            .json(&GenerateContentRequest::from(&request));
        let response = send_checked(builder, &endpoint).await?;

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::network(&endpoint, e))?;
        let frame = parsed
            .into_frame()
            .map_err(|body| GenerationError::upstream(200, body))?;

        let text = frame.text.trim();
        if text.is_empty() {
            return Err(GenerationError::decode("structured response was empty"));
        }
        debug!(bytes = text.len(), "structured response received");
        serde_json::from_str(text)
            .map_err(|e| GenerationError::decode(format!("structured response is not JSON: {e}")))
    }
}

/// Sends `builder` and converts non-success statuses into [`GenerationError::Upstream`].
async fn send_checked(builder: RequestBuilder, endpoint: &str) -> Result<Response, GenerationError> {
    let response = builder
        .send()
        .await
        .map_err(|e| GenerationError::network(endpoint, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GenerationError::upstream(status.as_u16(), body));
    }
    Ok(response)
}

enum Phase {
    Pending(RequestBuilder),
    Body(BoxStream<'static, Result<Vec<u8>, reqwest::Error>>),
    Done,
}

/// State behind one generation stream.
struct StreamDriver {
    phase: Phase,
    pending: VecDeque<StreamResult>,
    decoder: SseDecoder,
    tracker: SourceTracker,
    topic: String,
    endpoint: String,
}

impl StreamDriver {
    async fn next(&mut self) -> Option<StreamResult> {
        loop {
            if let Some(result) = self.pending.pop_front() {
                return Some(result);
            }

            match std::mem::replace(&mut self.phase, Phase::Done) {
                Phase::Done => return None,
                Phase::Pending(builder) => match send_checked(builder, &self.endpoint).await {
                    Ok(response) => {
                        let body = response
                            .bytes_stream()
                            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                            .boxed();
                        self.phase = Phase::Body(body);
                    }
                    Err(error) => self.fail(&error),
                },
                Phase::Body(mut body) => match body.next().await {
                    Some(Ok(chunk)) => {
                        let outcome = self
                            .decoder
                            .push(&chunk)
                            .iter()
                            .try_for_each(|event| self.handle_event(event));
                        match outcome {
                            Ok(()) => self.phase = Phase::Body(body),
                            Err(error) => self.fail(&error),
                        }
                    }
                    Some(Err(e)) => {
                        let error = GenerationError::network(&self.endpoint, e);
                        self.fail(&error);
                    }
                    None => {
                        if let Some(event) = self.decoder.finish()
                            && let Err(error) = self.handle_event(&event)
                        {
                            self.fail(&error);
                        }
                        debug!(topic = %self.topic, sources = self.tracker.len(), "generation stream finished");
                    }
                },
            }
        }
    }

    fn handle_event(&mut self, payload: &str) -> Result<(), GenerationError> {
        let payload = payload.trim();
        if payload.is_empty() || payload == "[DONE]" {
            return Ok(());
        }

        let response: GenerateContentResponse = serde_json::from_str(payload)
            .map_err(|e| GenerationError::decode(format!("invalid stream frame: {e}")))?;
        let frame = response
            .into_frame()
            .map_err(|body| GenerationError::upstream(200, body))?;

        if !frame.text.is_empty() {
            self.pending.push_back(StreamResult::Text(frame.text));
        }
        let new_sources = self.tracker.take_new(frame.sources);
        if !new_sources.is_empty() {
            self.pending.push_back(StreamResult::Sources(new_sources));
        }
        Ok(())
    }

    fn fail(&mut self, error: &GenerationError) {
        error!(topic = %self.topic, error = %error, "generation stream failed");
        self.phase = Phase::Done;
        self.pending.push_back(StreamResult::Error(stream_error_message(
            &self.topic,
            &error.user_detail(),
        )));
    }
}
