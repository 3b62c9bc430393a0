//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use genwiki_core::Language;

/// An encyclopedia where every word is a link.
///
/// Type a topic to stream a short definition, then follow any word in it to
/// the next topic. Runs an interactive session unless a subcommand is given.
#[derive(Parser, Debug)]
#[command(name = "genwiki")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Content language (en, es, fr, de, ja, zh, ar)
    #[arg(short = 'L', long, global = true)]
    pub language: Option<Language>,

    /// Keep preferences and rate limits in memory only
    #[arg(long, global = true)]
    pub no_persist: bool,

    /// Directory for persisted state (overrides config file)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stream the definition of a topic and exit
    Define {
        /// Topic to define; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        topic: Vec<String>,
    },
    /// Stream a definition followed by an in-depth article
    Deep {
        /// Topic to research
        #[arg(required = true, num_args = 1..)]
        topic: Vec<String>,
    },
    /// List synonyms of a word
    Synonyms {
        /// Word to look up
        #[arg(required = true, num_args = 1..)]
        topic: Vec<String>,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
}

/// Joins positional words into one topic.
pub fn join_topic(words: &[String]) -> String {
    words.join(" ")
}
