//! terminal - raw command passthrough with a persisted, bounded history
//!
//! Unlike the chat handlers, the terminal hands the user's text straight to the
//! executor. History lives under `buddy_command_history` and keeps the newest
//! `max_history` entries.

use anyhow::Result;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::shell::CommandExecutor;
use crate::store::{load_collection, save_collection, KeyValueStore, COMMAND_HISTORY_KEY};

pub const MAX_COMMAND_HISTORY: usize = 100;

pub const NO_OUTPUT: &str = "Command executed successfully with no output";
pub const DESKTOP_ONLY: &str = "This command requires the desktop app version with system access.";

lazy_static::lazy_static! {
    static ref FILE_LISTING: Vec<Regex> = vec![
        Regex::new(r"(?m)^total \d+").unwrap(),
        Regex::new(r"(?m)^d[-rwx]{9}").unwrap(),
        Regex::new(r"(?m)^[-l][-rwx]{9}").unwrap(),
        Regex::new(r"(?m)^ ?Volume in drive").unwrap(),
        Regex::new(r"(?m)^ Directory of").unwrap(),
        Regex::new(r"(?m)^\d{2}/\d{2}/\d{4}\s+\d{2}:\d{2}\s+(AM|PM)").unwrap(),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub command: String,
    pub output: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub error: bool,
}

/// How a block of output should be highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Json,
    Error,
    Success,
    Warning,
    File,
    Code,
    Plain,
}

/// Keyword and shape heuristics, checked in priority order.
pub fn classify_output(output: &str) -> OutputKind {
    if output.trim().is_empty() {
        return OutputKind::Plain;
    }

    let lower = output.to_lowercase();
    if ["error", "exception", "failed", "cannot"].iter().any(|k| lower.contains(k)) {
        return OutputKind::Error;
    }
    if lower.contains("success") || lower.contains("completed successfully") {
        return OutputKind::Success;
    }
    if lower.contains("warning") || lower.contains("deprecated") {
        return OutputKind::Warning;
    }
    if serde_json::from_str::<serde_json::Value>(output).is_ok() {
        return OutputKind::Json;
    }
    if FILE_LISTING.iter().any(|re| re.is_match(output)) {
        return OutputKind::File;
    }

    let code_markers = ['{', '}', '=', ';'];
    if output.contains(code_markers)
        || output.contains("function")
        || output.trim().lines().count() > 2
    {
        return OutputKind::Code;
    }

    OutputKind::Plain
}

/// Pretty-print JSON output; everything else passes through unchanged.
pub fn format_output(output: &str, kind: OutputKind) -> String {
    if kind != OutputKind::Json {
        return output.to_string();
    }

    serde_json::from_str::<serde_json::Value>(output)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or_else(|_| output.to_string())
}

pub struct Terminal {
    store: Arc<dyn KeyValueStore>,
    executor: Option<Arc<dyn CommandExecutor>>,
    max_history: usize,
}

impl Terminal {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        executor: Option<Arc<dyn CommandExecutor>>,
        max_history: usize,
    ) -> Self {
        Self {
            store,
            executor,
            max_history: max_history.max(1),
        }
    }

    /// Run `command` and record the result. Blank input is ignored.
    pub async fn execute(&self, command: &str) -> Result<Option<CommandResult>> {
        let command = command.trim();
        if command.is_empty() {
            return Ok(None);
        }

        let (output, error) = match &self.executor {
            None => (DESKTOP_ONLY.to_string(), true),
            Some(executor) => match executor.execute(command).await {
                Ok(out) => {
                    let error = !out.stderr.is_empty();
                    let output = if !out.stdout.is_empty() {
                        out.stdout
                    } else if !out.stderr.is_empty() {
                        out.stderr
                    } else {
                        NO_OUTPUT.to_string()
                    };
                    (output, error)
                }
                Err(e) => {
                    tracing::warn!(command, error = %e.error, "Terminal command failed");
                    let output = if e.error.is_empty() {
                        "Unknown error occurred".to_string()
                    } else {
                        e.error
                    };
                    (output, true)
                }
            },
        };

        let result = CommandResult {
            command: command.to_string(),
            output,
            timestamp: Utc::now(),
            error,
        };

        let mut history = self.history()?;
        history.push(result.clone());
        if history.len() > self.max_history {
            let overflow = history.len() - self.max_history;
            history.drain(..overflow);
        }
        save_collection(self.store.as_ref(), COMMAND_HISTORY_KEY, &history)?;

        Ok(Some(result))
    }

    pub fn history(&self) -> Result<Vec<CommandResult>> {
        load_collection(self.store.as_ref(), COMMAND_HISTORY_KEY)
    }

    /// Case-insensitive match over command and output.
    pub fn search(&self, term: &str) -> Result<Vec<CommandResult>> {
        let needle = term.to_lowercase();
        Ok(self
            .history()?
            .into_iter()
            .filter(|r| {
                r.command.to_lowercase().contains(&needle) || r.output.to_lowercase().contains(&needle)
            })
            .collect())
    }

    pub fn clear(&self) -> Result<()> {
        save_collection::<CommandResult>(self.store.as_ref(), COMMAND_HISTORY_KEY, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::FakeExecutor;
    use crate::store::MemoryStore;

    fn terminal(executor: Option<Arc<dyn CommandExecutor>>, max: usize) -> Terminal {
        Terminal::new(Arc::new(MemoryStore::new()), executor, max)
    }

    #[tokio::test]
    async fn test_blank_command_ignored() {
        let term = terminal(None, 10);
        assert!(term.execute("   ").await.unwrap().is_none());
        assert!(term.history().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_browser_mode_result() {
        let term = terminal(None, 10);
        let r = term.execute("ls").await.unwrap().unwrap();
        assert!(r.error);
        assert_eq!(r.output, DESKTOP_ONLY);
    }

    #[tokio::test]
    async fn test_output_selection() {
        let exec: Arc<dyn CommandExecutor> = Arc::new(FakeExecutor::returning("", ""));
        let term = terminal(Some(exec), 10);
        let r = term.execute("true").await.unwrap().unwrap();
        assert!(!r.error);
        assert_eq!(r.output, NO_OUTPUT);

        let exec: Arc<dyn CommandExecutor> = Arc::new(FakeExecutor::returning("", "warn: x"));
        let term = terminal(Some(exec), 10);
        let r = term.execute("thing").await.unwrap().unwrap();
        assert!(r.error);
        assert_eq!(r.output, "warn: x");
    }

    #[tokio::test]
    async fn test_rejection_recorded_as_error() {
        let exec: Arc<dyn CommandExecutor> = Arc::new(FakeExecutor::failing("Command failed: nope (exit 127)", "sh: nope: not found"));
        let term = terminal(Some(exec), 10);
        let r = term.execute("nope").await.unwrap().unwrap();
        assert!(r.error);
        assert_eq!(r.output, "Command failed: nope (exit 127)");
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let exec: Arc<dyn CommandExecutor> = Arc::new(FakeExecutor::returning("ok", ""));
        let term = terminal(Some(exec), 3);
        for i in 0..5 {
            term.execute(&format!("echo {}", i)).await.unwrap();
        }
        let commands: Vec<String> = term.history().unwrap().into_iter().map(|r| r.command).collect();
        assert_eq!(commands, vec!["echo 2", "echo 3", "echo 4"]);

        assert_eq!(term.search("ECHO 3").unwrap().len(), 1);
        term.clear().unwrap();
        assert!(term.history().unwrap().is_empty());
    }

    #[test]
    fn test_classify_output() {
        assert_eq!(classify_output(""), OutputKind::Plain);
        assert_eq!(classify_output("fatal error: no such file"), OutputKind::Error);
        assert_eq!(classify_output("Build completed successfully"), OutputKind::Success);
        assert_eq!(classify_output("warning: unused variable"), OutputKind::Warning);
        assert_eq!(classify_output(r#"{"a": 1}"#), OutputKind::Json);
        assert_eq!(
            classify_output("total 8\ndrwxr-xr-x  2 root root 4096 ."),
            OutputKind::File
        );
        assert_eq!(classify_output("let x = 1"), OutputKind::Code);
        assert_eq!(classify_output("hello"), OutputKind::Plain);
    }

    #[test]
    fn test_format_output_pretty_prints_json() {
        assert_eq!(format_output(r#"{"a":1}"#, OutputKind::Json), "{\n  \"a\": 1\n}");
        assert_eq!(format_output("plain", OutputKind::Plain), "plain");
    }
}
