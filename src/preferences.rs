//! Persisted user preferences: colour theme and content language.
//!
//! Values are read once at startup and written back on every change.
//! Storage failures are logged and otherwise ignored; the in-memory value
//! always reflects the user's latest choice.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::language::Language;
use crate::storage::{KeyValueStore, LANGUAGE_KEY, THEME_KEY};

/// Terminal colour theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown theme '{0}' (expected 'light' or 'dark')")]
pub struct ParseThemeError(pub String);

impl FromStr for Theme {
    type Err = ParseThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(ParseThemeError(other.to_string())),
        }
    }
}

/// Theme and language, backed by persistent storage.
#[derive(Clone)]
pub struct Preferences {
    theme: Theme,
    language: Language,
    store: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for Preferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preferences")
            .field("theme", &self.theme)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl Preferences {
    /// Loads preferences from `store`, falling back to defaults for missing
    /// or unreadable values.
    #[must_use]
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let theme = read_value::<Theme>(store.as_ref(), THEME_KEY).unwrap_or_default();
        let language = read_value::<Language>(store.as_ref(), LANGUAGE_KEY).unwrap_or_default();
        debug!(%theme, %language, "preferences loaded");
        Self {
            theme,
            language,
            store,
        }
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.save(THEME_KEY, theme.as_str());
    }

    /// Switches between light and dark and returns the new theme.
    pub fn toggle_theme(&mut self) -> Theme {
        self.set_theme(self.theme.toggled());
        self.theme
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
        self.save(LANGUAGE_KEY, language.code());
    }

    fn save(&self, key: &str, value: &str) {
        if let Err(error) = self.store.set(key, value) {
            warn!(key, error = %error, "could not save preference");
        }
    }
}

fn read_value<T>(store: &dyn KeyValueStore, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match store.get(key) {
        Ok(Some(raw)) => match raw.parse() {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(key, error = %error, "ignoring invalid stored preference");
                None
            }
        },
        Ok(None) => None,
        Err(error) => {
            warn!(key, error = %error, "could not read preference");
            None
        }
    }
}
