//! Terminal rendering: theme palette, spinner and text blocks.

use std::fmt::Write as _;
use std::io::IsTerminal;
use std::time::Duration;

use genwiki_core::{Source, Theme};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::{OwoColorize, Style};

#[derive(Debug, Clone)]
struct Styles {
    heading: Style,
    accent: Style,
    muted: Style,
    error: Style,
}

/// Text styles for one theme. Plain when colour is off.
#[derive(Debug, Clone)]
pub(crate) struct Palette {
    styles: Option<Styles>,
}

impl Palette {
    pub(crate) fn for_theme(theme: Theme, color: bool) -> Self {
        if !color {
            return Self::plain();
        }
        let styles = match theme {
            Theme::Light => Styles {
                heading: Style::new().blue().bold(),
                accent: Style::new().magenta(),
                muted: Style::new().bright_black(),
                error: Style::new().red(),
            },
            Theme::Dark => Styles {
                heading: Style::new().bright_cyan().bold(),
                accent: Style::new().bright_magenta(),
                muted: Style::new().white(),
                error: Style::new().bright_red(),
            },
        };
        Self {
            styles: Some(styles),
        }
    }

    pub(crate) fn plain() -> Self {
        Self { styles: None }
    }

    fn paint(&self, text: &str, pick: fn(&Styles) -> Style) -> String {
        match &self.styles {
            Some(styles) => text.style(pick(styles)).to_string(),
            None => text.to_string(),
        }
    }

    pub(crate) fn heading(&self, text: &str) -> String {
        self.paint(text, |styles| styles.heading)
    }

    pub(crate) fn accent(&self, text: &str) -> String {
        self.paint(text, |styles| styles.accent)
    }

    pub(crate) fn muted(&self, text: &str) -> String {
        self.paint(text, |styles| styles.muted)
    }

    pub(crate) fn error(&self, text: &str) -> String {
        self.paint(text, |styles| styles.error)
    }
}

/// Spinner shown on stderr until the first chunk arrives.
pub(crate) fn start_spinner(message: &str, enabled: bool) -> Option<ProgressBar> {
    if !enabled || !std::io::stderr().is_terminal() {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Some(spinner)
}

pub(crate) fn stop_spinner(spinner: &mut Option<ProgressBar>) {
    if let Some(spinner) = spinner.take() {
        spinner.finish_and_clear();
    }
}

pub(crate) fn render_sources(palette: &Palette, sources: &[Source]) -> String {
    let mut out = palette.muted("Sources:");
    for (index, source) in sources.iter().enumerate() {
        let _ = write!(
            out,
            "\n  {} {} {}",
            palette.muted(&format!("[{}]", index + 1)),
            source.display_title(),
            palette.muted(&source.uri)
        );
    }
    out
}

/// Numbered clickable words, for `:w <n>`.
pub(crate) fn render_words(palette: &Palette, words: &[String]) -> String {
    words
        .iter()
        .enumerate()
        .map(|(index, word)| format!("{}{word}", palette.muted(&format!("{}:", index + 1))))
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn render_history(palette: &Palette, entries: &[String], current: Option<usize>) -> String {
    let mut out = palette.muted("History:");
    for (index, entry) in entries.iter().enumerate() {
        let label = format!("{:>3}. {entry}", index + 1);
        let line = if Some(index) == current {
            palette.accent(&format!("{label}  <"))
        } else {
            label
        };
        let _ = write!(out, "\n{line}");
    }
    out
}

pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    format!("Generated in {:.2}s", elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_palette_adds_no_escapes() {
        let palette = Palette::for_theme(Theme::Dark, false);
        assert_eq!(palette.heading("Entropy"), "Entropy");
        assert_eq!(palette.error("boom"), "boom");
        assert!(Palette::plain().styles.is_none());
    }

    #[test]
    fn test_themes_use_different_palettes() {
        let light = Palette::for_theme(Theme::Light, true);
        let dark = Palette::for_theme(Theme::Dark, true);
        assert_ne!(light.heading("Entropy"), dark.heading("Entropy"));
        assert_ne!(light.muted("Entropy"), dark.muted("Entropy"));
        assert!(light.error("x").starts_with("\x1b["));
        assert!(light.heading("Entropy").contains("Entropy"));
    }

    #[test]
    fn test_render_words_numbers_from_one() {
        let words = vec!["Paris".to_string(), "is".to_string()];
        assert_eq!(render_words(&Palette::plain(), &words), "1:Paris 2:is");
    }

    #[test]
    fn test_render_history_marks_current() {
        let entries = vec!["Balance".to_string(), "Harmony".to_string()];
        let out = render_history(&Palette::plain(), &entries, Some(1));
        assert_eq!(out, "History:\n  1. Balance\n  2. Harmony  <");
    }

    #[test]
    fn test_render_sources_uses_title_fallback() {
        let sources = vec![Source::new("https://a.example/x", "")];
        let out = render_sources(&Palette::plain(), &sources);
        assert!(out.starts_with("Sources:\n  [1] "));
        assert!(out.ends_with("https://a.example/x"));
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(1234)), "Generated in 1.23s");
    }
}
