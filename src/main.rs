//! CLI entry point for genwiki.

use std::io::{self, IsTerminal};

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

mod app_config;
mod cli;
mod render;
mod repl;
mod runtime;

use cli::{Cli, Command, ConfigCommand, join_topic};
use runtime::RuntimeSettings;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();
    let (settings, loaded) = RuntimeSettings::load(&cli)?;

    let no_color = runtime::no_color_env_requested() || runtime::is_dumb_terminal();
    runtime::init_tracing(settings.log_level, no_color);

    debug!(?cli, "CLI arguments parsed");
    if let Some(path) = loaded.path.as_ref().filter(|_| loaded.loaded_from_file) {
        info!(path = %path.display(), "configuration loaded");
    }

    let ui = repl::Ui {
        color: !no_color && io::stdout().is_terminal(),
        spinner: !cli.quiet && !runtime::is_dumb_terminal(),
    };

    match &cli.command {
        Some(Command::Config {
            command: ConfigCommand::Show,
        }) => {
            runtime::print_config(&settings, &loaded);
            Ok(())
        }
        Some(Command::Define { topic }) => {
            let mut session = runtime::build_session(&settings)?;
            repl::run_define(&mut session, ui, &join_topic(topic)).await
        }
        Some(Command::Deep { topic }) => {
            let mut session = runtime::build_session(&settings)?;
            repl::run_deep(&mut session, ui, &join_topic(topic)).await
        }
        Some(Command::Synonyms { topic }) => {
            let mut session = runtime::build_session(&settings)?;
            repl::run_synonyms(&mut session, &join_topic(topic)).await
        }
        None => {
            let mut session = runtime::build_session(&settings)?;
            repl::run_interactive(&mut session, ui).await
        }
    }
}
