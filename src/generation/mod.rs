//! Boundary to the hosted generative-language API.
//!
//! The crate needs two capabilities from the API:
//!
//! - stream a response to a prompt, optionally grounded in web search results
//! - generate a structured (JSON) response to a prompt
//!
//! Both sit behind the [`GenerationBackend`] trait. [`GeminiClient`] is the
//! production implementation; tests substitute scripted backends.
//!
//! A stream is a lazy, finite, single-shot sequence of [`StreamResult`]s. It
//! never fails as a whole: every failure, including a missing API key, is
//! delivered as one final [`StreamResult::Error`].
//!
//! # Example
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use genwiki_core::generation::{
//!     GeminiClient, GeminiSettings, GenerationBackend, GenerationRequest, ModelSettings,
//! };
//! use genwiki_core::language::Language;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeminiClient::new(GeminiSettings::from_env())?;
//! let request = GenerationRequest::definition("Entropy", Language::En, &ModelSettings::default());
//! let mut stream = client.stream(request);
//! while let Some(result) = stream.next().await {
//!     println!("{result:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod gemini;
pub mod sse;
mod wire;

pub use error::{
    GenerationError, MISSING_API_KEY_MESSAGE, QUOTA_EXHAUSTED_MESSAGE, UNKNOWN_ERROR_MESSAGE,
    describe_upstream_error, stream_error_message,
};
pub use gemini::{DEFAULT_API_BASE_URL, GeminiClient, GeminiSettings, api_key_from_env};

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::language::Language;
use crate::sources::Source;

/// Default model for quick definitions.
pub const DEFAULT_DEFINITION_MODEL: &str = "gemini-flash-lite-latest";
/// Default model for deep articles.
pub const DEFAULT_DEEP_MODEL: &str = "gemini-2.5-pro";
/// Thinking budget for deep articles.
pub const DEEP_THINKING_BUDGET: u32 = 4096;
/// Maximum number of synonyms requested.
pub const MAX_SYNONYMS: usize = 5;

/// One unit of a generation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamResult {
    /// A fragment of generated text.
    Text(String),
    /// Grounding sources not reported earlier in this stream.
    Sources(Vec<Source>),
    /// Terminal, user-facing error; nothing follows it.
    Error(String),
}

/// Lazy stream of generation results.
pub type ResultStream = Pin<Box<dyn Stream<Item = StreamResult> + Send>>;

/// What a request is for. Selects prompt, model and logging labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    /// Concise single-paragraph definition.
    Definition,
    /// Detailed article synthesized from several web sources.
    DeepArticle,
    /// JSON list of synonyms.
    Synonyms,
}

impl GenerationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Definition => "definition",
            Self::DeepArticle => "deep_article",
            Self::Synonyms => "synonyms",
        }
    }
}

/// Models used for each kind of request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    pub definition_model: String,
    pub deep_model: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            definition_model: DEFAULT_DEFINITION_MODEL.to_string(),
            deep_model: DEFAULT_DEEP_MODEL.to_string(),
        }
    }
}

/// A fully specified request to the generation API.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub kind: GenerationKind,
    /// Topic the prompt is about; used in error messages.
    pub topic: String,
    pub prompt: String,
    pub model: String,
    /// Ground the answer in web search results and report sources.
    pub web_grounding: bool,
    pub thinking_budget: Option<u32>,
    /// JSON schema for structured responses.
    pub response_schema: Option<Value>,
}

impl GenerationRequest {
    /// Concise encyclopedia-style definition of `topic`.
    #[must_use]
    pub fn definition(topic: &str, language: Language, models: &ModelSettings) -> Self {
        let prompt = format!(
            "Provide a concise, single-paragraph encyclopedia-style definition for the term: \"{topic}\". \
             The entire definition must be written in {}. Be informative and neutral. \
             Do not use markdown, titles, or any special formatting. \
             Respond with only the text of the definition itself.",
            language.prompt_name()
        );
        Self {
            kind: GenerationKind::Definition,
            topic: topic.to_string(),
            prompt,
            model: models.definition_model.clone(),
            web_grounding: true,
            thinking_budget: Some(0),
            response_schema: None,
        }
    }

    /// Thoroughly researched article about `topic` using the deep model.
    #[must_use]
    pub fn deep_article(topic: &str, language: Language, models: &ModelSettings) -> Self {
        let prompt = format!(
            "Perform a comprehensive analysis of the term: \"{topic}\". \
             Synthesize information from multiple reliable web sources. \
             Compare different perspectives or definitions if they exist. \
             Provide a detailed, well-structured article that explains the topic thoroughly. \
             The article must be written in {}. Be informative and neutral. \
             Do not use markdown, titles, or any special formatting. \
             Respond with only the text of the article itself.",
            language.prompt_name()
        );
        Self {
            kind: GenerationKind::DeepArticle,
            topic: topic.to_string(),
            prompt,
            model: models.deep_model.clone(),
            web_grounding: true,
            thinking_budget: Some(DEEP_THINKING_BUDGET),
            response_schema: None,
        }
    }

    /// Structured request for up to [`MAX_SYNONYMS`] synonyms of `topic`.
    #[must_use]
    pub fn synonyms(topic: &str, language: Language, models: &ModelSettings) -> Self {
        let prompt = format!(
            "Provide up to {MAX_SYNONYMS} common synonyms for the word \"{topic}\". \
             The synonyms must be in {}.",
            language.prompt_name()
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "synonyms": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": format!("An array of up to {MAX_SYNONYMS} synonyms for the word {topic}."),
                }
            },
            "required": ["synonyms"],
        });
        Self {
            kind: GenerationKind::Synonyms,
            topic: topic.to_string(),
            prompt,
            model: models.definition_model.clone(),
            web_grounding: false,
            thinking_budget: None,
            response_schema: Some(schema),
        }
    }
}

/// Capability to run generation requests.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Starts a streamed generation. Failures arrive as a final
    /// [`StreamResult::Error`].
    fn stream(&self, request: GenerationRequest) -> ResultStream;

    /// Runs a structured generation and returns the parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] when the key is missing, the request fails
    /// or the response is not valid JSON.
    async fn generate_json(&self, request: GenerationRequest) -> Result<Value, GenerationError>;
}

#[derive(Debug, Deserialize)]
struct SynonymsResponse {
    #[serde(default)]
    synonyms: Vec<String>,
}

/// Fetches synonyms for `topic`. Returns `None` on any failure.
pub async fn fetch_synonyms(
    backend: &dyn GenerationBackend,
    topic: &str,
    language: Language,
    models: &ModelSettings,
) -> Option<Vec<String>> {
    let request = GenerationRequest::synonyms(topic, language, models);
    let value = match backend.generate_json(request).await {
        Ok(value) => value,
        Err(error) => {
            warn!(topic, error = %error, "failed to fetch synonyms");
            return None;
        }
    };

    match serde_json::from_value::<SynonymsResponse>(value) {
        Ok(response) => Some(
            response
                .synonyms
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .take(MAX_SYNONYMS)
                .collect(),
        ),
        Err(error) => {
            warn!(topic, error = %error, "synonym response had unexpected shape");
            None
        }
    }
}
