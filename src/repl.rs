//! Interactive session loop and one-shot commands.

use std::io::{self, Write};

use anyhow::{Result, bail};
use genwiki_core::telemetry::Rating;
use genwiki_core::words::unique_words;
use genwiki_core::{ConsumeOutcome, GenerationUpdate, Language, Session};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::render::{self, Palette};

const HELP: &str = "\
Type a topic to look it up, or one of:
  :w <n>            follow word <n> of the definition
  :words            list the words of the definition
  :back, :forward   move through history
  :history          show history
  :go <n>           jump to history entry <n>
  :random           look up a random topic
  :deep             research the topic in depth
  :sources          show sources of the definition
  :rate up|down     rate the definition
  :feedback <text>  send feedback on the rated definition
  :synonyms         list synonyms of the topic
  :lang <code>      switch language (en, es, fr, de, ja, zh, ar)
  :theme            toggle light/dark colours
  :help             show this help
  :quit             leave (or Ctrl-D)
Ctrl-C stops the text that is streaming.";

const SUGGESTIONS_SHOWN: usize = 12;

/// Terminal capabilities for rendering.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ui {
    pub(crate) color: bool,
    pub(crate) spinner: bool,
}

impl Ui {
    fn palette(self, session: &Session) -> Palette {
        Palette::for_theme(session.preferences().theme(), self.color)
    }
}

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReplCommand {
    Empty,
    Topic(String),
    Word(usize),
    Words,
    Back,
    Forward,
    History,
    Go(usize),
    Random,
    Deep,
    Sources,
    Rate(Rating),
    Feedback(String),
    Synonyms,
    Language(Language),
    Theme,
    Help,
    Quit,
}

/// Parses one input line. Numbers are one-based as displayed.
pub(crate) fn parse_command(line: &str) -> Result<ReplCommand> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ReplCommand::Empty);
    }
    let Some(command) = line.strip_prefix(':') else {
        return Ok(ReplCommand::Topic(line.to_string()));
    };

    let (name, argument) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, rest)| (name, rest.trim()));

    let parsed = match name {
        "w" | "word" => ReplCommand::Word(parse_position(argument)?),
        "words" => ReplCommand::Words,
        "b" | "back" => ReplCommand::Back,
        "f" | "forward" => ReplCommand::Forward,
        "history" => ReplCommand::History,
        "go" => ReplCommand::Go(parse_position(argument)?),
        "r" | "random" => ReplCommand::Random,
        "deep" => ReplCommand::Deep,
        "sources" => ReplCommand::Sources,
        "rate" => ReplCommand::Rate(argument.parse()?),
        "feedback" => ReplCommand::Feedback(argument.to_string()),
        "synonyms" => ReplCommand::Synonyms,
        "lang" | "language" => ReplCommand::Language(argument.parse()?),
        "theme" => ReplCommand::Theme,
        "h" | "help" | "?" => ReplCommand::Help,
        "q" | "quit" | "exit" => ReplCommand::Quit,
        other => bail!("Unknown command ':{other}'. Type :help for a list."),
    };
    Ok(parsed)
}

fn parse_position(argument: &str) -> Result<usize> {
    let Ok(position) = argument.parse::<usize>() else {
        bail!("Expected a number, got '{argument}'");
    };
    if position == 0 {
        bail!("Numbers start at 1");
    }
    Ok(position - 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    Definition,
    DeepArticle,
}

fn cancel_on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received; cancelling stream");
            token.cancel();
        }
    })
}

/// Streams the current definition or deep article to stdout.
async fn run_stream(session: &mut Session, ui: Ui, kind: StreamKind) -> Result<ConsumeOutcome> {
    let palette = ui.palette(session);
    let token = CancellationToken::new();
    let canceller = cancel_on_ctrl_c(token.clone());

    let label = match kind {
        StreamKind::Definition => "Generating definition...",
        StreamKind::DeepArticle => "Researching sources...",
    };
    let mut spinner = render::start_spinner(label, ui.spinner);
    let mut stdout = io::stdout();
    let mut wrote = false;

    let observer = |update: GenerationUpdate<'_>| {
        if let GenerationUpdate::Text { chunk, .. } = update {
            render::stop_spinner(&mut spinner);
            let _ = write!(stdout, "{chunk}");
            let _ = stdout.flush();
            wrote = true;
        }
    };
    let outcome = match kind {
        StreamKind::Definition => session.load_current(&token, observer).await,
        StreamKind::DeepArticle => session.deeper_search(&token, observer).await,
    };
    canceller.abort();
    render::stop_spinner(&mut spinner);
    if wrote {
        println!();
    }
    let outcome = outcome?;

    match &outcome {
        ConsumeOutcome::Cancelled => eprintln!("{}", palette.muted("(stopped)")),
        ConsumeOutcome::Failed(generation) => {
            let message = generation.error.as_deref().unwrap_or_default();
            eprintln!("{}", palette.error(&format!("An error occurred. {message}")));
        }
        ConsumeOutcome::Completed(generation) => {
            if generation.content.is_empty() {
                println!("{}", palette.muted("Content could not be generated."));
            }
            if !generation.sources.is_empty() {
                println!("{}", render::render_sources(&palette, &generation.sources));
            }
            println!("{}", palette.muted(&render::format_elapsed(generation.elapsed)));
        }
    }
    Ok(outcome)
}

/// Shows the topic now current: heading, streamed definition, words and history.
async fn show_topic(session: &mut Session, ui: Ui) -> Result<()> {
    let palette = ui.palette(session);
    let Some(topic) = session.current_topic() else {
        return Ok(());
    };
    println!("\n{}", palette.heading(topic));

    let outcome = run_stream(session, ui, StreamKind::Definition).await?;
    if !matches!(outcome, ConsumeOutcome::Completed(_)) {
        return Ok(());
    }

    let words = session.words();
    if !words.is_empty() {
        println!("{}", render::render_words(&palette, &words));
    }
    let history = session.history();
    if history.len() > 1 {
        println!(
            "{}",
            render::render_history(&palette, history.entries(), history.current_index())
        );
    }
    Ok(())
}

fn print_welcome(session: &Session, ui: Ui) {
    let palette = ui.palette(session);
    println!("{}", palette.heading("genwiki - an infinite encyclopedia"));
    println!("{}", palette.muted("Type a topic, :random, or :help."));
    let suggestions = unique_words(session.language())
        .into_iter()
        .take(SUGGESTIONS_SHOWN)
        .collect::<Vec<_>>()
        .join(", ");
    println!("{} {suggestions}", palette.muted("Try:"));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

async fn execute(session: &mut Session, ui: Ui, command: ReplCommand) -> Result<Flow> {
    let palette = ui.palette(session);
    match command {
        ReplCommand::Empty => {}
        ReplCommand::Topic(topic) => {
            if session.navigate(&topic)? {
                show_topic(session, ui).await?;
            } else {
                println!("{}", palette.muted("Already showing that topic."));
            }
        }
        ReplCommand::Word(index) => {
            if session.pick_word(index)? {
                show_topic(session, ui).await?;
            }
        }
        ReplCommand::Words => {
            let words = session.words();
            if words.is_empty() {
                println!("{}", palette.muted("No definition on screen."));
            } else {
                println!("{}", render::render_words(&palette, &words));
            }
        }
        ReplCommand::Back => {
            if session.back() {
                show_topic(session, ui).await?;
            } else {
                println!("{}", palette.muted("No earlier topic."));
            }
        }
        ReplCommand::Forward => {
            if session.forward() {
                show_topic(session, ui).await?;
            } else {
                println!("{}", palette.muted("No later topic."));
            }
        }
        ReplCommand::History => {
            let history = session.history();
            println!(
                "{}",
                render::render_history(&palette, history.entries(), history.current_index())
            );
        }
        ReplCommand::Go(index) => {
            if session.go_to(index)? {
                show_topic(session, ui).await?;
            }
        }
        ReplCommand::Random => {
            if session.random()? {
                show_topic(session, ui).await?;
            }
        }
        ReplCommand::Deep => {
            println!("\n{}", palette.heading("Deeper search"));
            run_stream(session, ui, StreamKind::DeepArticle).await?;
        }
        ReplCommand::Sources => {
            let sources = session
                .state()
                .definition
                .as_ref()
                .map(|generation| generation.sources.as_slice())
                .unwrap_or_default();
            if sources.is_empty() {
                println!("{}", palette.muted("No sources."));
            } else {
                println!("{}", render::render_sources(&palette, sources));
            }
        }
        ReplCommand::Rate(rating) => {
            session.rate(rating)?;
            println!(
                "{}",
                palette.muted("Thanks! Add a comment with :feedback <text> if you like.")
            );
        }
        ReplCommand::Feedback(reason) => {
            session.submit_feedback(&reason).await?;
            println!("{}", palette.accent("Thank you for your feedback!"));
        }
        ReplCommand::Synonyms => {
            let synonyms = session.synonyms().await?;
            if synonyms.is_empty() {
                println!("{}", palette.muted("No synonyms found."));
            } else {
                println!("{}", synonyms.join(", "));
            }
        }
        ReplCommand::Language(language) => {
            let reload = session.set_language(language);
            println!("{}", palette.muted(&format!("Language: {}", language.prompt_name())));
            if reload {
                show_topic(session, ui).await?;
            }
        }
        ReplCommand::Theme => {
            let theme = session.toggle_theme();
            let palette = ui.palette(session);
            println!("{}", palette.accent(&format!("Theme: {theme}")));
        }
        ReplCommand::Help => println!("{HELP}"),
        ReplCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// Runs the interactive loop until `:quit` or end of input.
pub(crate) async fn run_interactive(session: &mut Session, ui: Ui) -> Result<()> {
    print_welcome(session, ui);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        let flow = match parse_command(&line) {
            Ok(command) => execute(session, ui, command).await,
            Err(error) => Err(error),
        };
        match flow {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(error) => {
                let palette = ui.palette(session);
                eprintln!("{}", palette.error(&format!("{error:#}")));
            }
        }
    }
    Ok(())
}

/// Streams the definition of `topic` and exits; fails when generation fails.
pub(crate) async fn run_define(session: &mut Session, ui: Ui, topic: &str) -> Result<()> {
    session.navigate(topic)?;
    require_completed(run_stream(session, ui, StreamKind::Definition).await?)
}

/// Streams the definition of `topic`, then a deep article.
pub(crate) async fn run_deep(session: &mut Session, ui: Ui, topic: &str) -> Result<()> {
    run_define(session, ui, topic).await?;
    println!();
    require_completed(run_stream(session, ui, StreamKind::DeepArticle).await?)
}

/// Prints synonyms of `topic`, one per line.
pub(crate) async fn run_synonyms(session: &mut Session, topic: &str) -> Result<()> {
    session.navigate(topic)?;
    for synonym in session.synonyms().await? {
        println!("{synonym}");
    }
    Ok(())
}

fn require_completed(outcome: ConsumeOutcome) -> Result<()> {
    match outcome {
        ConsumeOutcome::Completed(_) => Ok(()),
        ConsumeOutcome::Cancelled => bail!("Generation was cancelled"),
        ConsumeOutcome::Failed(generation) => {
            bail!("{}", generation.error.unwrap_or_default())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_text_is_topic() {
        assert_eq!(
            parse_command("  Order and chaos ").unwrap(),
            ReplCommand::Topic("Order and chaos".into())
        );
        assert_eq!(parse_command("   ").unwrap(), ReplCommand::Empty);
    }

    #[test]
    fn test_parse_positions_are_one_based() {
        assert_eq!(parse_command(":w 3").unwrap(), ReplCommand::Word(2));
        assert_eq!(parse_command(":go 1").unwrap(), ReplCommand::Go(0));
        assert!(parse_command(":w 0").is_err());
        assert!(parse_command(":go x").is_err());
        assert!(parse_command(":w").is_err());
    }

    #[test]
    fn test_parse_rating_and_feedback() {
        assert_eq!(parse_command(":rate down").unwrap(), ReplCommand::Rate(Rating::Down));
        assert!(parse_command(":rate maybe").is_err());
        assert_eq!(
            parse_command(":feedback too   short ").unwrap(),
            ReplCommand::Feedback("too   short".into())
        );
        assert_eq!(parse_command(":feedback").unwrap(), ReplCommand::Feedback(String::new()));
    }

    #[test]
    fn test_parse_language_and_aliases() {
        assert_eq!(
            parse_command(":lang zh").unwrap(),
            ReplCommand::Language(Language::Zh)
        );
        assert_eq!(parse_command(":b").unwrap(), ReplCommand::Back);
        assert_eq!(parse_command(":q").unwrap(), ReplCommand::Quit);
        assert_eq!(parse_command(":random").unwrap(), ReplCommand::Random);
    }

    #[test]
    fn test_parse_unknown_command() {
        let err = parse_command(":fly").unwrap_err();
        assert!(err.to_string().contains(":fly"));
    }

    #[test]
    fn test_require_completed_surfaces_error_message() {
        let generation = genwiki_core::Generation {
            error: Some("Error: boom".into()),
            ..Default::default()
        };
        let err = require_completed(ConsumeOutcome::Failed(generation)).unwrap_err();
        assert_eq!(err.to_string(), "Error: boom");
        assert!(require_completed(ConsumeOutcome::Cancelled).is_err());
    }
}
