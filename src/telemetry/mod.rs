//! Feedback and usage logging.
//!
//! Feedback and search events are posted as JSON to a collector endpoint
//! together with an approximate location. Both are rate limited per hour
//! through [`WindowRateLimiter`](crate::rate_limit::WindowRateLimiter):
//! exceeding the feedback limit is reported to the user, exceeding the search
//! log limit silently drops the event. Without a configured endpoint,
//! submissions are only logged.

mod client;
mod location;

pub use client::{
    FeedbackData, ParseRatingError, Rating, SearchEventKind, TelemetryClient, TelemetryError,
    TelemetrySettings,
};
pub use location::{Coordinate, DEFAULT_GEOLOCATION_URL, GeolocationService, Location};
