//! One interactive browsing session.
//!
//! [`Session`] ties the pieces together: it owns the navigation history and
//! preferences, runs definition and deep-article streams through a
//! [`GenerationBackend`], and records ratings and feedback for the topic on
//! screen.
//!
//! Navigation methods only move the history cursor and report whether the
//! current topic changed; the caller then runs [`Session::load_current`] with
//! a fresh [`CancellationToken`]. Streams borrow the session mutably, so at
//! most one stream per session is in flight and the topic cannot change
//! underneath it.

use std::sync::Arc;

use rand::Rng;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::consumer::{ConsumeOutcome, Generation, GenerationUpdate, consume_stream};
use crate::generation::{GenerationBackend, GenerationRequest, ModelSettings, fetch_synonyms};
use crate::history::{History, HistoryError, NavigateOutcome};
use crate::language::Language;
use crate::preferences::{Preferences, Theme};
use crate::telemetry::{FeedbackData, Rating, SearchEventKind, TelemetryClient, TelemetryError};
use crate::words::{interactive_words, random_topic};

/// Errors returned by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no topic selected")]
    NoTopic,

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("no definition has been generated for \"{topic}\"")]
    NoDefinition { topic: String },

    #[error("word {} does not exist (the definition has {count} words)", .index + 1)]
    NoSuchWord { index: usize, count: usize },

    #[error("this definition was already rated {0}")]
    AlreadyRated(Rating),

    #[error("rate the definition before sending feedback")]
    NotRated,

    #[error("feedback for this definition was already submitted")]
    FeedbackAlreadySubmitted,

    #[error("could not find synonyms for \"{topic}\"")]
    SynonymsUnavailable { topic: String },

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// Results and curation state for the topic on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicState {
    /// Last finished definition stream, successful or failed.
    pub definition: Option<Generation>,
    /// Last finished deep-article stream.
    pub deep_article: Option<Generation>,
    pub rating: Option<Rating>,
    pub feedback_submitted: bool,
}

impl TopicState {
    /// Text of a successful definition, if any.
    #[must_use]
    pub fn definition_text(&self) -> Option<&str> {
        self.definition
            .as_ref()
            .filter(|generation| generation.error.is_none() && !generation.content.is_empty())
            .map(|generation| generation.content.as_str())
    }

    /// Text of a successful deep article, if any.
    #[must_use]
    pub fn deep_article_text(&self) -> Option<&str> {
        self.deep_article
            .as_ref()
            .filter(|generation| generation.error.is_none() && !generation.content.is_empty())
            .map(|generation| generation.content.as_str())
    }
}

/// Interactive encyclopedia session.
pub struct Session {
    backend: Arc<dyn GenerationBackend>,
    telemetry: TelemetryClient,
    preferences: Preferences,
    models: ModelSettings,
    history: History,
    state: TopicState,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("preferences", &self.preferences)
            .field("models", &self.models)
            .field("history", &self.history)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Session {
    #[must_use]
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        telemetry: TelemetryClient,
        preferences: Preferences,
        models: ModelSettings,
    ) -> Self {
        Self {
            backend,
            telemetry,
            preferences,
            models,
            history: History::new(),
            state: TopicState::default(),
        }
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn current_topic(&self) -> Option<&str> {
        self.history.current()
    }

    #[must_use]
    pub fn state(&self) -> &TopicState {
        &self.state
    }

    #[must_use]
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.preferences.language()
    }

    /// Navigates to `topic`. Returns `true` when the current topic changed.
    ///
    /// A new history entry also logs a search event in the background when
    /// called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::History`] for a blank topic.
    pub fn navigate(&mut self, topic: &str) -> Result<bool, SessionError> {
        let outcome = self.history.navigate(topic)?;
        let NavigateOutcome::Appended { evicted } = outcome else {
            debug!(topic, "already on this topic");
            return Ok(false);
        };
        if let Some(evicted) = evicted {
            debug!(%evicted, "oldest history entry evicted");
        }

        self.state = TopicState::default();
        if let Some(current) = self.history.current() {
            info!(topic = current, "navigated");
            self.telemetry.spawn_log(SearchEventKind::Search, current);
        }
        Ok(true)
    }

    /// Jumps to history entry `index`. Returns `true` when the topic changed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::History`] when `index` is out of range.
    pub fn go_to(&mut self, index: usize) -> Result<bool, SessionError> {
        if self.history.current_index() == Some(index) {
            return Ok(false);
        }
        self.history.go_to(index)?;
        self.state = TopicState::default();
        Ok(true)
    }

    /// Steps back in history. Returns `true` when the topic changed.
    pub fn back(&mut self) -> bool {
        let moved = self.history.back().is_some();
        if moved {
            self.state = TopicState::default();
        }
        moved
    }

    /// Steps forward in history. Returns `true` when the topic changed.
    pub fn forward(&mut self) -> bool {
        let moved = self.history.forward().is_some();
        if moved {
            self.state = TopicState::default();
        }
        moved
    }

    /// Navigates to a random suggested topic.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::History`] only if the suggestion list is empty.
    pub fn random(&mut self) -> Result<bool, SessionError> {
        self.random_with(&mut rand::thread_rng())
    }

    /// [`Session::random`] with an explicit random source.
    ///
    /// # Errors
    ///
    /// See [`Session::random`].
    pub fn random_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<bool, SessionError> {
        let topic = random_topic(self.language(), self.current_topic(), rng).unwrap_or_default();
        self.navigate(topic)
    }

    /// Clickable words of the current definition.
    #[must_use]
    pub fn words(&self) -> Vec<String> {
        self.state
            .definition_text()
            .map(interactive_words)
            .unwrap_or_default()
    }

    /// Navigates to the word at `index` (zero-based) of the current definition.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSuchWord`] when `index` is out of range.
    pub fn pick_word(&mut self, index: usize) -> Result<bool, SessionError> {
        let words = self.words();
        let word = words.get(index).ok_or(SessionError::NoSuchWord {
            index,
            count: words.len(),
        })?;
        self.navigate(word)
    }

    /// Streams the definition of the current topic.
    ///
    /// Clears content, error, rating and deep article before starting. A
    /// cancelled stream leaves the cleared state in place.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoTopic`] before the first navigation.
    #[instrument(skip(self, token, observer))]
    pub async fn load_current<F>(
        &mut self,
        token: &CancellationToken,
        observer: F,
    ) -> Result<ConsumeOutcome, SessionError>
    where
        F: FnMut(GenerationUpdate<'_>),
    {
        let topic = self.current_topic().ok_or(SessionError::NoTopic)?.to_string();
        self.state = TopicState::default();

        let request = GenerationRequest::definition(&topic, self.language(), &self.models);
        let outcome = consume_stream(self.backend.stream(request), token, observer).await;

        if let Some(generation) = outcome.generation() {
            self.state.definition = Some(generation.clone());
        }
        Ok(outcome)
    }

    /// Streams a deep article for the current topic.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoDefinition`] until a definition was generated.
    #[instrument(skip(self, token, observer))]
    pub async fn deeper_search<F>(
        &mut self,
        token: &CancellationToken,
        observer: F,
    ) -> Result<ConsumeOutcome, SessionError>
    where
        F: FnMut(GenerationUpdate<'_>),
    {
        let topic = self.require_definition()?.to_string();
        self.telemetry.spawn_log(SearchEventKind::DeepSearch, topic.as_str());

        let request = GenerationRequest::deep_article(&topic, self.language(), &self.models);
        let outcome = consume_stream(self.backend.stream(request), token, observer).await;

        if let Some(generation) = outcome.generation() {
            self.state.deep_article = Some(generation.clone());
        }
        Ok(outcome)
    }

    /// Rates the current definition. Each definition can be rated once.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyRated`] on a second rating and
    /// [`SessionError::NoDefinition`] when there is nothing to rate.
    pub fn rate(&mut self, rating: Rating) -> Result<(), SessionError> {
        self.require_definition()?;
        if let Some(existing) = self.state.rating {
            return Err(SessionError::AlreadyRated(existing));
        }
        self.state.rating = Some(rating);
        Ok(())
    }

    /// Sends feedback on the current, rated definition.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotRated`] without a rating,
    /// [`SessionError::FeedbackAlreadySubmitted`] on a second submission and
    /// [`SessionError::Telemetry`] when the submission fails or is rate limited.
    pub async fn submit_feedback(&mut self, reason: &str) -> Result<(), SessionError> {
        let topic = self.require_definition()?.to_string();
        let rating = self.state.rating.ok_or(SessionError::NotRated)?;
        if self.state.feedback_submitted {
            return Err(SessionError::FeedbackAlreadySubmitted);
        }

        let data = FeedbackData {
            topic,
            rating,
            reason: reason.trim().to_string(),
            definition: self.state.definition_text().unwrap_or_default().to_string(),
            expanded_article: self
                .state
                .deep_article_text()
                .unwrap_or_default()
                .to_string(),
            was_deep_search_used: self.state.deep_article.is_some(),
        };
        self.telemetry.submit_feedback(&data).await?;
        self.state.feedback_submitted = true;
        Ok(())
    }

    /// Synonyms of the current topic.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SynonymsUnavailable`] when the lookup fails.
    pub async fn synonyms(&self) -> Result<Vec<String>, SessionError> {
        let topic = self.current_topic().ok_or(SessionError::NoTopic)?;
        fetch_synonyms(self.backend.as_ref(), topic, self.language(), &self.models)
            .await
            .ok_or_else(|| SessionError::SynonymsUnavailable {
                topic: topic.to_string(),
            })
    }

    /// Changes the content language. Returns `true` when it changed and a
    /// topic is on screen, meaning the definition should be reloaded.
    pub fn set_language(&mut self, language: Language) -> bool {
        if self.preferences.language() == language {
            return false;
        }
        self.preferences.set_language(language);
        self.state = TopicState::default();
        self.current_topic().is_some()
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.preferences.toggle_theme()
    }

    fn require_definition(&self) -> Result<&str, SessionError> {
        let topic = self.current_topic().ok_or(SessionError::NoTopic)?;
        if self.state.definition_text().is_none() {
            return Err(SessionError::NoDefinition {
                topic: topic.to_string(),
            });
        }
        Ok(topic)
    }
}
