//! Approximate geolocation attached to telemetry payloads.
//!
//! The lookup is best-effort: every failure is logged and yields `None`.
//! Successful lookups are cached for the session; error payloads are not,
//! since they are usually transient (rate limiting on the lookup service).

use std::sync::Arc;

use reqwest::Client;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, instrument, warn};

use crate::storage::{GEOLOCATION_CACHE_KEY, KeyValueStore};

/// Public IP geolocation endpoint used when none is configured.
pub const DEFAULT_GEOLOCATION_URL: &str = "https://ipapi.co/json/";

const NOT_AVAILABLE: &str = "N/A";

/// A latitude or longitude, or a placeholder when the service omitted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Degrees(f64),
    Unavailable(String),
}

impl Coordinate {
    fn from_option(value: Option<f64>) -> Self {
        value.map_or_else(|| Self::Unavailable(NOT_AVAILABLE.to_string()), Self::Degrees)
    }
}

/// Location record sent with feedback and search logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub ip: String,
    pub country_code: Option<String>,
    pub country: String,
    pub region_name: String,
    pub city: String,
    pub lat: Coordinate,
    pub lon: Coordinate,
    pub isp: String,
    pub org: String,
}

/// Raw response of the lookup service.
#[derive(Debug, Default, Deserialize)]
struct LookupResponse {
    ip: Option<String>,
    country_code: Option<String>,
    country_name: Option<String>,
    region: Option<String>,
    city: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    org: Option<String>,
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

fn or_not_available(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

impl From<LookupResponse> for Location {
    fn from(raw: LookupResponse) -> Self {
        Self {
            ip: or_not_available(raw.ip),
            country_code: raw.country_code.filter(|c| !c.trim().is_empty()),
            country: or_not_available(raw.country_name),
            region_name: or_not_available(raw.region),
            city: or_not_available(raw.city),
            lat: Coordinate::from_option(raw.latitude),
            lon: Coordinate::from_option(raw.longitude),
            isp: or_not_available(raw.org.clone()),
            org: or_not_available(raw.org),
        }
    }
}

/// Serializes a missing location as an empty JSON object.
pub(crate) fn location_or_empty<S: Serializer>(
    location: &Option<Location>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match location {
        Some(location) => location.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

/// Looks up and caches the caller's approximate location.
#[derive(Clone)]
pub struct GeolocationService {
    client: Client,
    url: Option<String>,
    cache: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for GeolocationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeolocationService")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl GeolocationService {
    /// Creates a service querying `url`; `None` disables lookups.
    #[must_use]
    pub fn new(client: Client, url: Option<String>, cache: Arc<dyn KeyValueStore>) -> Self {
        Self { client, url, cache }
    }

    /// Returns the cached location, or fetches and caches it.
    #[instrument(skip(self))]
    pub async fn lookup(&self) -> Option<Location> {
        if let Some(cached) = self.cached() {
            return Some(cached);
        }

        let url = self.url.as_deref()?;
        let location = self.fetch(url).await?;

        match serde_json::to_string(&location) {
            Ok(raw) => {
                if let Err(error) = self.cache.set(GEOLOCATION_CACHE_KEY, &raw) {
                    warn!(error = %error, "could not cache geolocation");
                }
            }
            Err(error) => warn!(error = %error, "could not encode geolocation for caching"),
        }
        Some(location)
    }

    fn cached(&self) -> Option<Location> {
        let raw = match self.cache.get(GEOLOCATION_CACHE_KEY) {
            Ok(raw) => raw?,
            Err(error) => {
                warn!(error = %error, "could not read cached geolocation");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(location) => {
                debug!("using cached geolocation");
                Some(location)
            }
            Err(error) => {
                warn!(error = %error, "ignoring unreadable cached geolocation");
                None
            }
        }
    }

    async fn fetch(&self, url: &str) -> Option<Location> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(url, error = %error, "could not fetch geolocation");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "geolocation lookup failed");
            return None;
        }

        let raw: LookupResponse = match response.json().await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(url, error = %error, "geolocation response was not understood");
                return None;
            }
        };

        if raw.error {
            warn!(
                reason = raw.reason.as_deref().unwrap_or("unknown"),
                "geolocation service returned an error"
            );
            return None;
        }

        Some(raw.into())
    }
}
