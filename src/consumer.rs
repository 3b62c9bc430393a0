//! Consumes a generation stream into display state.
//!
//! [`consume_stream`] accumulates text fragments into one buffer and merges
//! source batches into a deduplicated, insertion-ordered list. An observer
//! sees every state change as it happens so callers can render progressively.
//!
//! Cancellation is cooperative: the [`CancellationToken`] is checked before
//! waiting for the next item and again before applying it, and it also wins
//! over an item that has not arrived yet. A cancelled consumption returns
//! [`ConsumeOutcome::Cancelled`] and none of its partial state. Dropping the
//! stream at that point also drops the underlying HTTP response.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::generation::{ResultStream, StreamResult};
use crate::sources::{Source, merge_sources};

/// Accumulated result of one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    /// Concatenated text; cleared when the stream ends in an error.
    pub content: String,
    /// Unique sources in first-seen order.
    pub sources: Vec<Source>,
    /// User-facing error, when the stream failed.
    pub error: Option<String>,
    /// Time from the start of consumption to the last item.
    pub elapsed: Duration,
}

/// State change reported to the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationUpdate<'a> {
    /// A fragment arrived; `content` is the whole buffer including it.
    Text { chunk: &'a str, content: &'a str },
    /// New sources arrived; the slice is the full merged list.
    Sources(&'a [Source]),
}

/// How a consumption ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The stream finished without an error.
    Completed(Generation),
    /// The stream delivered an error; `error` is set and `content` is empty.
    Failed(Generation),
    /// The token was cancelled; results were discarded.
    Cancelled,
}

impl ConsumeOutcome {
    /// The generation, unless consumption was cancelled.
    #[must_use]
    pub fn generation(&self) -> Option<&Generation> {
        match self {
            Self::Completed(generation) | Self::Failed(generation) => Some(generation),
            Self::Cancelled => None,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Drives `stream` to completion, error or cancellation.
pub async fn consume_stream<F>(
    mut stream: ResultStream,
    token: &CancellationToken,
    mut observer: F,
) -> ConsumeOutcome
where
    F: FnMut(GenerationUpdate<'_>),
{
    let started = Instant::now();
    let mut generation = Generation::default();

    loop {
        if token.is_cancelled() {
            debug!(chars = generation.content.len(), "generation cancelled");
            return ConsumeOutcome::Cancelled;
        }

        let next = tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!(chars = generation.content.len(), "generation cancelled while waiting");
                return ConsumeOutcome::Cancelled;
            }
            next = stream.next() => next,
        };

        let Some(result) = next else {
            break;
        };

        if token.is_cancelled() {
            debug!("generation cancelled; discarding received item");
            return ConsumeOutcome::Cancelled;
        }

        match result {
            StreamResult::Text(chunk) => {
                generation.content.push_str(&chunk);
                observer(GenerationUpdate::Text {
                    chunk: &chunk,
                    content: &generation.content,
                });
            }
            StreamResult::Sources(batch) => {
                generation.sources = merge_sources(&generation.sources, &batch);
                observer(GenerationUpdate::Sources(&generation.sources));
            }
            StreamResult::Error(message) => {
                generation.content.clear();
                generation.error = Some(message);
                generation.elapsed = started.elapsed();
                return ConsumeOutcome::Failed(generation);
            }
        }
    }

    generation.elapsed = started.elapsed();
    debug!(
        chars = generation.content.len(),
        sources = generation.sources.len(),
        elapsed_ms = generation.elapsed.as_millis(),
        "generation complete"
    );
    ConsumeOutcome::Completed(generation)
}
