/*!
 * BUDDY CLI - offline assistant from the command line
 *
 * Runs utterances through the assistant pipeline, passes raw commands to the
 * terminal, and inspects the stored notes, events, preferences and history.
 */

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use buddy_core::{
    classify_output, format_output, logging, Assistant, AssistantConfig, Clock, CommandResult,
    Feedback, Mode, OutputKind, SystemClock, TaskResponse, Terminal,
};

#[derive(Parser)]
#[command(name = "buddy_cli")]
#[command(about = "BUDDY - offline assistant", long_about = None)]
struct Cli {
    /// Directory for stored notes, events and history
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// YAML config file (default: ./buddy.yaml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Allow handlers to run commands on this machine
    #[arg(long, global = true)]
    desktop: bool,

    /// Emit JSON instead of plain text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session over stdin
    Chat,

    /// Process a single utterance
    Ask {
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Run a raw terminal command
    Exec {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Show terminal command history
    History {
        /// Delete the stored history
        #[arg(long)]
        clear: bool,

        /// Only entries whose command or output contains this text
        #[arg(long)]
        search: Option<String>,
    },

    /// List stored notes
    Notes {
        #[arg(long)]
        search: Option<String>,
    },

    /// List calendar events
    Events {
        #[arg(long, conflicts_with = "upcoming")]
        today: bool,

        #[arg(long)]
        upcoming: bool,
    },

    /// Show learned preferences
    Prefs,

    /// Rate the most recent answer
    Feedback {
        #[arg(value_enum)]
        rating: Rating,
    },

    /// Show version information
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum Rating {
    Positive,
    Negative,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Version = cli.command {
        println!("buddy_cli v{}", env!("CARGO_PKG_VERSION"));
        println!("BUDDY offline assistant");
        return Ok(());
    }

    let config = load_config(&cli)?;
    logging::init(&config.log_level);
    tracing::debug!(data_dir = ?config.data_dir, mode = ?config.mode, "Loaded config");

    let assistant = Assistant::from_config(&config);
    let json = cli.json;

    match cli.command {
        Commands::Chat => chat(&assistant, json).await?,
        Commands::Ask { text } => {
            let response = assistant.process_command(&text.join(" ")).await;
            print_response(&response, json)?;
        }
        Commands::Exec { command } => {
            let terminal = Terminal::new(assistant.store(), assistant.executor(), config.max_command_history);
            match terminal.execute(&command.join(" ")).await? {
                Some(result) if json => emit(&HighlightedResult::from(result))?,
                Some(result) => {
                    let shown = HighlightedResult::from(result);
                    if shown.result.error {
                        eprintln!("{}", shown.text().trim_end());
                    } else {
                        println!("{}", shown.text().trim_end());
                    }
                }
                None => {}
            }
        }
        Commands::History { clear, search } => {
            let terminal = Terminal::new(assistant.store(), assistant.executor(), config.max_command_history);
            if clear {
                terminal.clear()?;
                println!("Command history cleared.");
                return Ok(());
            }

            let history = match search {
                Some(term) => terminal.search(&term)?,
                None => terminal.history()?,
            };
            let history: Vec<HighlightedResult> = history.into_iter().map(HighlightedResult::from).collect();
            if json {
                return emit(&history);
            }
            for entry in history {
                let marker = if entry.result.error { " [error]" } else { "" };
                println!(
                    "[{}] $ {}{}",
                    entry.result.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.result.command,
                    marker
                );
                println!("{}", entry.text().trim_end());
            }
        }
        Commands::Notes { search } => {
            let notes = assistant.context().notes.clone();
            let list = match search {
                Some(q) => notes.search_notes(&q)?,
                None => notes.recent_notes(usize::MAX)?,
            };
            if json {
                return emit(&list);
            }
            if list.is_empty() {
                println!("No notes.");
            }
            for note in list {
                let tags = if note.tags.is_empty() {
                    String::new()
                } else {
                    format!(" #{}", note.tags.join(" #"))
                };
                println!("- {} ({}){}", note.title, note.updated_at.format("%Y-%m-%d"), tags);
            }
        }
        Commands::Events { today, upcoming } => {
            let calendar = assistant.context().calendar.clone();
            let now = SystemClock.today();
            let mut events = if today {
                calendar.events_by_date(now)?
            } else if upcoming {
                calendar.upcoming_events(now)?
            } else {
                calendar.events()?
            };
            events.sort_by_key(|e| e.date);

            if json {
                return emit(&events);
            }
            if events.is_empty() {
                println!("No events.");
            }
            for event in events {
                let time = event.time.map(|t| format!(" at {}", t)).unwrap_or_default();
                let done = if event.is_completed { " [done]" } else { "" };
                println!("- {} {}{}{}", event.date, event.title, time, done);
            }
        }
        Commands::Prefs => {
            let prefs = assistant.context().preferences.preferences()?;
            if json {
                return emit(&prefs);
            }
            if prefs.is_empty() {
                println!("Nothing learned yet.");
            }
            for pref in prefs {
                let kind = serde_json::to_value(pref.kind)?;
                println!(
                    "{}: {} (confidence {:.2})",
                    kind.as_str().unwrap_or_default(),
                    pref.value,
                    pref.confidence
                );
            }
        }
        Commands::Feedback { rating } => {
            let feedback = match rating {
                Rating::Positive => Feedback::Positive,
                Rating::Negative => Feedback::Negative,
            };
            if assistant.interactions().record_feedback(feedback)? {
                println!("Thanks for the feedback!");
            } else {
                println!("There is no answer to rate yet.");
            }
        }
        Commands::Version => {}
    }

    Ok(())
}

/// A terminal result tagged with how its output reads.
#[derive(Serialize)]
struct HighlightedResult {
    #[serde(flatten)]
    result: CommandResult,
    kind: OutputKind,
}

impl From<CommandResult> for HighlightedResult {
    fn from(result: CommandResult) -> Self {
        let kind = classify_output(&result.output);
        Self { result, kind }
    }
}

impl HighlightedResult {
    fn text(&self) -> String {
        format_output(&self.result.output, self.kind)
    }
}

fn load_config(cli: &Cli) -> Result<AssistantConfig> {
    let mut config = match &cli.config {
        Some(path) => AssistantConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => AssistantConfig::load_default()?,
    };

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if cli.desktop {
        config.mode = Mode::Desktop;
    }
    Ok(config)
}

async fn chat(assistant: &Assistant, json: bool) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    if !json {
        println!("BUDDY is listening. Type 'exit' to leave.");
    }

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit") {
            break;
        }

        let response = assistant.process_command(text).await;
        print_response(&response, json)?;
        stdout.flush()?;
    }

    Ok(())
}

fn print_response(response: &TaskResponse, json: bool) -> Result<()> {
    if json {
        return emit(response);
    }
    println!("{}", response.message);
    Ok(())
}

fn emit<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
