//! buddy_core - offline assistant engine behind BUDDY
//!
//! Modules:
//! - assistant: extract -> classify -> dispatch -> log pipeline
//! - intent: ordered intent table
//! - extract: calendar event and note extractors
//! - dates: natural-language date parsing and the clock
//! - handlers: one response builder per intent
//! - calc: whitelisted arithmetic evaluator
//! - notes / calendar: record managers
//! - learning: preferences and the interaction log
//! - shell: platform command table and shell execution
//! - terminal: raw command passthrough with history
//! - store: key-value persistence
//! - config / logging: ambient setup

pub mod assistant;
pub mod calc;
pub mod calendar;
pub mod config;
pub mod dates;
pub mod extract;
pub mod handlers;
pub mod intent;
pub mod learning;
pub mod logging;
pub mod notes;
pub mod shell;
pub mod store;
pub mod terminal;

// Re-export key types for convenience
pub use assistant::{Assistant, CALCULATION_FALLBACK};

pub use calc::{evaluate, CalcError};

pub use calendar::{CalendarEvent, CalendarManager};

pub use config::{AssistantConfig, ConfigError, Mode};

pub use dates::{parse_date, Clock, FixedClock, SystemClock};

pub use extract::{extract_event, extract_note, EventDraft, NoteDraft};

pub use handlers::{HandlerContext, TaskResponse, Utterance};

pub use intent::{Intent, IntentClassifier};

pub use learning::{
    Feedback, InteractionLog, PreferenceInput, PreferenceKind, PreferenceManager, UserInteraction,
    UserPreference,
};

pub use notes::{Note, NoteManager, NoteUpdate};

pub use shell::{
    command_for, make_id, quote, CommandExecutor, Platform, ShellAction, ShellError, ShellOutput,
    SystemShell,
};

pub use store::{JsonFileStore, KeyValueStore, MemoryStore};

pub use terminal::{classify_output, format_output, CommandResult, OutputKind, Terminal};
