//! Supported output languages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Language a definition is generated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
    Fr,
    De,
    Ja,
    Zh,
    Ar,
}

/// Unknown language code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported language '{0}' (expected one of: en, es, fr, de, ja, zh, ar)")]
pub struct ParseLanguageError(pub String);

impl Language {
    /// Every supported language, in menu order.
    pub const ALL: [Self; 7] = [
        Self::En,
        Self::Es,
        Self::Fr,
        Self::De,
        Self::Ja,
        Self::Zh,
        Self::Ar,
    ];

    /// Two-letter code used for storage and the CLI.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Fr => "fr",
            Self::De => "de",
            Self::Ja => "ja",
            Self::Zh => "zh",
            Self::Ar => "ar",
        }
    }

    /// English name of the language, as written into prompts.
    #[must_use]
    pub fn prompt_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Es => "Spanish",
            Self::Fr => "French",
            Self::De => "German",
            Self::Ja => "Japanese",
            Self::Zh => "Mandarin Chinese",
            Self::Ar => "Arabic",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == code)
            .ok_or_else(|| ParseLanguageError(s.to_string()))
    }
}
