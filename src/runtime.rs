//! Effective settings and component wiring for the binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use genwiki_core::generation::api_key_from_env;
use genwiki_core::telemetry::DEFAULT_GEOLOCATION_URL;
use genwiki_core::{
    DisabledStore, FileStore, GeminiClient, GeminiSettings, KeyValueStore, Language, MemoryStore,
    ModelSettings, Preferences, Session, TelemetryClient, TelemetrySettings, WindowRateLimiter,
};
use tracing::{debug, warn};

use crate::app_config::{self, FileConfig, LoadedConfig, VerbositySetting};
use crate::cli::Cli;

const DEFAULT_LOG_LEVEL: &str = "warn";

/// Settings after merging CLI flags, config file and environment.
#[derive(Debug, Clone)]
pub(crate) struct RuntimeSettings {
    pub(crate) gemini: GeminiSettings,
    pub(crate) models: ModelSettings,
    pub(crate) telemetry: TelemetrySettings,
    pub(crate) persist: bool,
    pub(crate) data_dir: Option<PathBuf>,
    pub(crate) storage_quota_bytes: Option<u64>,
    pub(crate) language: Option<Language>,
    pub(crate) log_level: &'static str,
}

impl RuntimeSettings {
    /// CLI flags win over the config file, which wins over built-in defaults.
    pub(crate) fn resolve(cli: &Cli, file: Option<&FileConfig>, api_key: Option<String>) -> Self {
        let file = file.cloned().unwrap_or_default();

        let mut gemini = GeminiSettings {
            api_key,
            ..GeminiSettings::default()
        };
        if let Some(base_url) = file.api_base_url {
            gemini.base_url = base_url;
        }
        if let Some(secs) = file.connect_timeout_secs {
            gemini.connect_timeout_secs = secs;
        }
        if let Some(secs) = file.read_timeout_secs {
            gemini.read_timeout_secs = secs;
        }

        let mut models = ModelSettings::default();
        if let Some(model) = file.definition_model {
            models.definition_model = model;
        }
        if let Some(model) = file.deep_model {
            models.deep_model = model;
        }

        let telemetry = TelemetrySettings {
            endpoint: file.feedback_url.filter(|url| !url.is_empty()),
            geolocation_url: match file.geolocation_url {
                Some(url) if url.is_empty() => None,
                Some(url) => Some(url),
                None => Some(DEFAULT_GEOLOCATION_URL.to_string()),
            },
            ..TelemetrySettings::default()
        };

        Self {
            gemini,
            models,
            telemetry,
            persist: !cli.no_persist && file.persist.unwrap_or(true),
            data_dir: cli
                .data_dir
                .clone()
                .or(file.data_dir)
                .or_else(app_config::resolve_default_data_dir),
            storage_quota_bytes: file.storage_quota_bytes,
            language: cli.language,
            log_level: default_log_level(cli.verbose, cli.quiet, file.verbosity),
        }
    }

    /// Resolves settings from the parsed CLI, the default config file and the environment.
    pub(crate) fn load(cli: &Cli) -> Result<(Self, LoadedConfig)> {
        let loaded = app_config::load_default_file_config()?;
        let settings = Self::resolve(cli, loaded.config.as_ref(), api_key_from_env());
        Ok((settings, loaded))
    }
}

/// Priority: quiet flag > verbose flag > config verbosity > default.
pub(crate) fn default_log_level(
    verbose: u8,
    quiet: bool,
    config: Option<VerbositySetting>,
) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => {}
        1 => return "debug",
        _ => return "trace",
    }
    match config {
        Some(VerbositySetting::Quiet) => "error",
        Some(VerbositySetting::Verbose) => "debug",
        Some(VerbositySetting::Debug) => "trace",
        Some(VerbositySetting::Default) | None => DEFAULT_LOG_LEVEL,
    }
}

/// Installs the tracing subscriber on stderr. `RUST_LOG` overrides `default_level`.
pub(crate) fn init_tracing(default_level: &str, no_color: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_env_filter(filter)
        .try_init();
}

pub(crate) fn no_color_env_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty())
}

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

/// Store for preferences and rate-limit windows.
fn persistent_store(settings: &RuntimeSettings) -> Arc<dyn KeyValueStore> {
    if !settings.persist {
        debug!("persistence disabled");
        return Arc::new(DisabledStore);
    }
    let Some(data_dir) = settings.data_dir.as_deref() else {
        warn!("no data directory could be resolved; state will not persist");
        return Arc::new(MemoryStore::new());
    };

    let mut store = FileStore::in_dir(data_dir);
    if let Some(quota) = settings.storage_quota_bytes {
        store = store.with_quota(quota);
    }
    debug!(path = %store.path().display(), "using persistent store");
    Arc::new(store)
}

/// Builds a session from resolved settings.
pub(crate) fn build_session(settings: &RuntimeSettings) -> Result<Session> {
    let local = persistent_store(settings);
    let session_store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

    let backend = GeminiClient::new(settings.gemini.clone())
        .context("Failed to create generation client")?;
    let telemetry = TelemetryClient::new(
        settings.telemetry.clone(),
        WindowRateLimiter::new(Arc::clone(&local)),
        session_store,
    )
    .context("Failed to create telemetry client")?;

    let mut preferences = Preferences::load(local);
    if let Some(language) = settings.language {
        preferences.set_language(language);
    }

    Ok(Session::new(
        Arc::new(backend),
        telemetry,
        preferences,
        settings.models.clone(),
    ))
}

/// Prints the effective configuration, one `key = value` per line.
pub(crate) fn print_config(settings: &RuntimeSettings, loaded: &LoadedConfig) {
    let resolved_path = loaded.path.as_ref().map_or_else(
        || "<unresolved>".to_string(),
        |path| path.display().to_string(),
    );
    println!("config_path = {resolved_path}");
    println!(
        "config_file = {}",
        if loaded.loaded_from_file {
            "loaded"
        } else {
            "not found (using defaults)"
        }
    );
    println!(
        "api_key = {}",
        if settings.gemini.api_key.is_some() {
            "set"
        } else {
            "missing"
        }
    );
    println!("api_base_url = {}", settings.gemini.base_url);
    println!("definition_model = {}", settings.models.definition_model);
    println!("deep_model = {}", settings.models.deep_model);
    println!(
        "feedback_url = {}",
        settings
            .telemetry
            .endpoint
            .as_deref()
            .unwrap_or("<none> (submissions simulated)")
    );
    println!(
        "geolocation_url = {}",
        settings
            .telemetry
            .geolocation_url
            .as_deref()
            .unwrap_or("<disabled>")
    );
    println!("persist = {}", settings.persist);
    println!(
        "data_dir = {}",
        settings
            .data_dir
            .as_ref()
            .map_or_else(|| "<unresolved>".to_string(), |dir| dir.display().to_string())
    );
    if let Some(quota) = settings.storage_quota_bytes {
        println!("storage_quota_bytes = {quota}");
    }
    println!("connect_timeout_secs = {}", settings.gemini.connect_timeout_secs);
    println!("read_timeout_secs = {}", settings.gemini.read_timeout_secs);
    if let Some(language) = settings.language {
        println!("language = {language}");
    }
    if let Some(verbosity) = loaded.config.as_ref().and_then(|config| config.verbosity) {
        println!("verbosity = {}", verbosity.as_str());
    }
    println!("log_level = {}", settings.log_level);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;
    use genwiki_core::generation::DEFAULT_API_BASE_URL;

    use super::*;

    #[test]
    fn test_log_level_priority() {
        assert_eq!(default_log_level(2, true, None), "error");
        assert_eq!(default_log_level(1, false, Some(VerbositySetting::Quiet)), "debug");
        assert_eq!(default_log_level(3, false, None), "trace");
        assert_eq!(default_log_level(0, false, Some(VerbositySetting::Debug)), "trace");
        assert_eq!(default_log_level(0, false, None), DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_resolve_defaults_without_file() {
        let cli = Cli::try_parse_from(["genwiki", "--data-dir", "/tmp/x"]).unwrap();
        let settings = RuntimeSettings::resolve(&cli, None, None);
        assert_eq!(settings.gemini.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.models, ModelSettings::default());
        assert!(settings.telemetry.endpoint.is_none());
        assert_eq!(
            settings.telemetry.geolocation_url.as_deref(),
            Some(DEFAULT_GEOLOCATION_URL)
        );
        assert!(settings.persist);
        assert_eq!(settings.data_dir, Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn test_resolve_applies_file_and_cli_overrides() {
        let file = FileConfig {
            api_base_url: Some("http://127.0.0.1:9".into()),
            deep_model: Some("deep".into()),
            feedback_url: Some(String::new()),
            geolocation_url: Some(String::new()),
            data_dir: Some(PathBuf::from("/from/file")),
            persist: Some(true),
            read_timeout_secs: Some(42),
            ..FileConfig::default()
        };
        let cli = Cli::try_parse_from(["genwiki", "--no-persist", "--data-dir", "/from/cli"]).unwrap();
        let settings = RuntimeSettings::resolve(&cli, Some(&file), Some("k".into()));

        assert_eq!(settings.gemini.base_url, "http://127.0.0.1:9");
        assert_eq!(settings.gemini.read_timeout_secs, 42);
        assert_eq!(settings.models.deep_model, "deep");
        assert!(settings.telemetry.endpoint.is_none());
        assert!(settings.telemetry.geolocation_url.is_none());
        assert!(!settings.persist);
        assert_eq!(settings.data_dir, Some(PathBuf::from("/from/cli")));
    }

    #[tokio::test]
    async fn test_build_session_without_persistence() {
        let cli = Cli::try_parse_from(["genwiki", "--no-persist", "-L", "fr"]).unwrap();
        let settings = RuntimeSettings::resolve(&cli, None, None);
        let session = build_session(&settings).unwrap();
        assert_eq!(session.language(), Language::Fr);
        assert!(session.current_topic().is_none());
    }
}
