//! Error types for the generation module.
//!
//! Upstream failures are reduced to a single user-facing string. The API
//! reports errors as JSON (`{"error": {"status": ..., "message": ...}}`),
//! sometimes prefixed by transport text, so the payload is parsed
//! best-effort from the first `{`.

use serde::Deserialize;
use thiserror::Error;

/// Shown when no API key is configured.
pub const MISSING_API_KEY_MESSAGE: &str =
    "Error: API_KEY is not configured. Please check your environment variables to continue.";

/// Shown when the upstream quota is exhausted.
pub const QUOTA_EXHAUSTED_MESSAGE: &str = "Whoa there, tiger... this is a free service, too many tokens being burned! Come back later.";

/// Shown when nothing better can be extracted from a failure.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

/// Errors raised while talking to the generation API.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No API key was configured.
    #[error("API key is not configured")]
    MissingApiKey,

    /// Network-level failure (DNS, connect, TLS, broken stream).
    #[error("network error calling {endpoint}: {source}")]
    Network {
        /// Model endpoint that failed.
        endpoint: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[error("generation API returned HTTP {status}: {body}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Raw response body, usually a JSON error envelope.
        body: String,
    },

    /// A response could not be decoded into the expected shape.
    #[error("unexpected generation response: {message}")]
    Decode {
        /// What was wrong with the payload.
        message: String,
    },

    /// Building the HTTP client failed.
    #[error("failed to build generation HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl GenerationError {
    /// Creates a network error.
    pub fn network(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Creates an upstream status error.
    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// User-facing description of the failure, without the topic prefix.
    #[must_use]
    pub fn user_detail(&self) -> String {
        match self {
            Self::MissingApiKey => MISSING_API_KEY_MESSAGE.to_string(),
            Self::Upstream { body, .. } => describe_upstream_error(body),
            other => describe_upstream_error(&other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Maps raw upstream error text to a user-facing message.
///
/// ```
/// use genwiki_core::generation::{QUOTA_EXHAUSTED_MESSAGE, describe_upstream_error};
///
/// let raw = r#"got status 429: {"error": {"code": 429, "status": "RESOURCE_EXHAUSTED"}}"#;
/// assert_eq!(describe_upstream_error(raw), QUOTA_EXHAUSTED_MESSAGE);
/// assert_eq!(describe_upstream_error("connection reset"), "connection reset");
/// ```
#[must_use]
pub fn describe_upstream_error(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return UNKNOWN_ERROR_MESSAGE.to_string();
    }

    let json_part = raw.find('{').map_or(raw, |start| &raw[start..]);
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(json_part) else {
        return raw.to_string();
    };
    let Some(body) = envelope.error else {
        return raw.to_string();
    };

    if body.status.as_deref() == Some("RESOURCE_EXHAUSTED") {
        return QUOTA_EXHAUSTED_MESSAGE.to_string();
    }
    match body.message {
        Some(message) if !message.trim().is_empty() => message,
        _ => raw.to_string(),
    }
}

/// Formats the terminal error emitted by a failed stream.
#[must_use]
pub fn stream_error_message(topic: &str, detail: &str) -> String {
    format!("Error: Could not generate content for \"{topic}\". {detail}")
}
