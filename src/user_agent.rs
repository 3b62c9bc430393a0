//! Shared User-Agent strings for generation and telemetry HTTP clients.
//!
//! Single source for the UA format so both clients identify the tool the
//! same way.

/// Default User-Agent for generation API requests.
#[must_use]
pub(crate) fn default_generation_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("genwiki/{version} (infinite-encyclopedia)")
}

/// Default User-Agent for feedback, logging and geolocation requests.
#[must_use]
pub(crate) fn default_telemetry_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("genwiki/{version} (telemetry)")
}
