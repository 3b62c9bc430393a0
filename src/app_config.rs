//! Configuration file loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use url::Url;

const APP_DIR: &str = "genwiki";

/// TOML-style file configuration for genwiki defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Base URL of the generation API.
    pub api_base_url: Option<String>,
    /// Model used for quick definitions and synonyms.
    pub definition_model: Option<String>,
    /// Model used for deep articles.
    pub deep_model: Option<String>,
    /// Collector for feedback and search logs; empty disables submissions.
    pub feedback_url: Option<String>,
    /// IP geolocation service; empty disables lookups.
    pub geolocation_url: Option<String>,
    /// Directory holding persisted preferences and rate-limit windows.
    pub data_dir: Option<PathBuf>,
    /// Persist state across runs.
    pub persist: Option<bool>,
    /// Upper bound for the persisted store in bytes.
    pub storage_quota_bytes: Option<u64>,
    /// Generation API connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Generation API read timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        validate_url("api_base_url", self.api_base_url.as_deref())?;
        validate_optional_url("feedback_url", self.feedback_url.as_deref())?;
        validate_optional_url("geolocation_url", self.geolocation_url.as_deref())?;
        validate_model("definition_model", self.definition_model.as_deref())?;
        validate_model("deep_model", self.deep_model.as_deref())?;
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;

        if let Some(quota) = self.storage_quota_bytes
            && quota < 1024
        {
            bail!(
                "Invalid config value for `storage_quota_bytes`: {quota}. Expected at least 1024"
            );
        }
        Ok(())
    }
}

fn validate_url(field: &str, value: Option<&str>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    let url = Url::parse(value)
        .with_context(|| format!("Invalid config value for `{field}`: '{value}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("Invalid config value for `{field}`: '{value}'. Expected an http(s) URL");
    }
    Ok(())
}

/// Like [`validate_url`], but an empty string is allowed and means "disabled".
fn validate_optional_url(field: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some("") | None => Ok(()),
        Some(value) => validate_url(field, Some(value)),
    }
}

fn validate_model(field: &str, value: Option<&str>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if value.trim().is_empty() || value.contains(['/', ' ', '?']) {
        bail!("Invalid config value for `{field}`: '{value}'. Expected a model name");
    }
    Ok(())
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Returns the stable string label for display output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Verbose => "verbose",
            Self::Quiet => "quiet",
            Self::Debug => "debug",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
    /// Indicates whether configuration was loaded from disk.
    pub loaded_from_file: bool,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/genwiki/config.toml`
/// 2. `$HOME/.config/genwiki/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join("config.toml"));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml"),
    )
}

/// Resolves default data directory.
///
/// Priority:
/// 1. `$XDG_DATA_HOME/genwiki`
/// 2. `$HOME/.local/share/genwiki`
#[must_use]
pub fn resolve_default_data_dir() -> Option<PathBuf> {
    if let Some(xdg_data_home) = env_var_non_empty_os("XDG_DATA_HOME") {
        return Some(PathBuf::from(xdg_data_home).join(APP_DIR));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(PathBuf::from(home).join(".local").join("share").join(APP_DIR))
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig {
            path,
            config: None,
            loaded_from_file: false,
        });
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig {
            path,
            config: None,
            loaded_from_file: false,
        });
    }

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
        loaded_from_file: true,
    })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_number = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let string_value = || {
            parse_string_literal(value)
                .with_context(|| format!("Invalid `{key}` value on line {line_number}"))
        };
        let integer_value = || {
            parse_integer_u64(value)
                .with_context(|| format!("Invalid `{key}` value on line {line_number}"))
        };

        match key {
            "api_base_url" => cfg.api_base_url = Some(string_value()?),
            "definition_model" => cfg.definition_model = Some(string_value()?),
            "deep_model" => cfg.deep_model = Some(string_value()?),
            "feedback_url" => cfg.feedback_url = Some(string_value()?),
            "geolocation_url" => cfg.geolocation_url = Some(string_value()?),
            "data_dir" => cfg.data_dir = Some(PathBuf::from(string_value()?)),
            "persist" => {
                let parsed = parse_boolean(value)
                    .with_context(|| format!("Invalid `persist` value on line {line_number}"))?;
                cfg.persist = Some(parsed);
            }
            "storage_quota_bytes" => cfg.storage_quota_bytes = Some(integer_value()?),
            "connect_timeout_secs" => cfg.connect_timeout_secs = Some(integer_value()?),
            "read_timeout_secs" => cfg.read_timeout_secs = Some(integer_value()?),
            "verbosity" => {
                let parsed = string_value()?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_number}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(
            r#"
deep_model = "gemini-2.5-flash"
verbosity = "verbose"
"#,
        )
        .expect("partial config should parse");
        assert_eq!(cfg.deep_model.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Verbose));
        assert!(cfg.api_base_url.is_none());
    }

    #[test]
    fn test_parse_config_all_fields() {
        let cfg = parse_config_str(
            r#"
api_base_url = "http://127.0.0.1:8080"
definition_model = "fast"
deep_model = "deep"
feedback_url = "https://collector.example/exec"
geolocation_url = ""
data_dir = "/tmp/genwiki"
persist = false
storage_quota_bytes = 5242880
connect_timeout_secs = 10
read_timeout_secs = 600
verbosity = "quiet"
"#,
        )
        .expect("full config should parse");
        assert_eq!(cfg.geolocation_url.as_deref(), Some(""));
        assert_eq!(cfg.data_dir, Some(PathBuf::from("/tmp/genwiki")));
        assert_eq!(cfg.persist, Some(false));
        assert_eq!(cfg.storage_quota_bytes, Some(5_242_880));
        assert_eq!(cfg.read_timeout_secs, Some(600));
    }

    #[test]
    fn test_parse_config_rejects_invalid_base_url() {
        let err = parse_config_str(r#"api_base_url = "not a url""#).expect_err("invalid url");
        assert!(err.to_string().contains("api_base_url"));

        let err = parse_config_str(r#"feedback_url = "ftp://example.com""#).expect_err("ftp");
        assert!(err.to_string().contains("feedback_url"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_model_name() {
        let err = parse_config_str(r#"deep_model = "a/b""#).expect_err("invalid model");
        assert!(err.to_string().contains("deep_model"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_timeout_value() {
        let err = parse_config_str("connect_timeout_secs = 0").expect_err("invalid timeout");
        assert!(err.to_string().contains("connect_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_small_quota() {
        let err = parse_config_str("storage_quota_bytes = 10").expect_err("tiny quota");
        assert!(err.to_string().contains("storage_quota_bytes"));
    }

    #[test]
    fn test_parse_config_rejects_numeric_values_with_trailing_tokens() {
        let err = parse_config_str("read_timeout_secs = 4 trailing")
            .expect_err("expected trailing token error");
        assert!(format!("{err:#}").contains("read_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_boolean() {
        let err = parse_config_str("persist = yes").expect_err("invalid boolean expected");
        assert!(err.to_string().contains("persist"));
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r#"
feedback_url = "https://collector.example/exec#frag" # collector
verbosity = "debug" # noisy
"#,
        )
        .expect("config with comments should parse");
        assert_eq!(
            cfg.feedback_url.as_deref(),
            Some("https://collector.example/exec#frag")
        );
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Debug));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("unknown_key = 123").expect_err("unknown key error expected");
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(err.to_string().contains("unknown_key"));
    }

    #[test]
    fn test_parse_config_reports_line_number_for_bad_syntax() {
        let err = parse_config_str("persist = true\njust words").expect_err("syntax error");
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_verbosity_as_str() {
        assert_eq!(VerbositySetting::Default.as_str(), "default");
        assert_eq!(VerbositySetting::Quiet.as_str(), "quiet");
        assert_eq!(VerbositySetting::Debug.as_str(), "debug");
    }
}
