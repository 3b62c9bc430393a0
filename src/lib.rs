//! genwiki Core Library
//!
//! An "infinite encyclopedia": every topic gets a short, streamed,
//! web-grounded definition, and every word of that definition is itself a
//! topic. This library holds everything except the terminal front end.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`history`] - capped, branch-truncating navigation history
//! - [`generation`] - generation API boundary and the Gemini client
//! - [`consumer`] - cancellable accumulation of a generation stream
//! - [`sources`] - grounding source deduplication
//! - [`storage`] - persistent and session key-value stores
//! - [`rate_limit`] - sliding one-hour submission windows
//! - [`telemetry`] - feedback and search logging with geolocation
//! - [`preferences`] - theme and language
//! - [`words`] - suggested topics and clickable words
//! - [`session`] - orchestration of one browsing session

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod consumer;
pub mod generation;
pub mod history;
pub mod language;
pub mod preferences;
pub mod rate_limit;
pub mod session;
pub mod sources;
pub mod storage;
pub mod telemetry;
pub mod topic;
pub mod words;

mod user_agent;

// Re-export commonly used types
pub use consumer::{ConsumeOutcome, Generation, GenerationUpdate, consume_stream};
pub use generation::{
    GeminiClient, GeminiSettings, GenerationBackend, GenerationError, GenerationRequest,
    ModelSettings, ResultStream, StreamResult,
};
pub use history::{HISTORY_CAP, History, HistoryError, NavigateOutcome};
pub use language::Language;
pub use preferences::{Preferences, Theme};
pub use rate_limit::{Admission, RateLimitExceeded, WindowRateLimiter};
pub use session::{Session, SessionError, TopicState};
pub use sources::{Source, SourceTracker, merge_sources};
pub use storage::{DisabledStore, FileStore, KeyValueStore, MemoryStore, StorageError};
pub use telemetry::{FeedbackData, Rating, TelemetryClient, TelemetryError, TelemetrySettings};
