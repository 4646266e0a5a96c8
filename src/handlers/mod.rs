//! handlers - one response builder per intent
//!
//! Each handler re-matches the utterance more specifically than the classifier
//! did and always produces a `TaskResponse`. Handlers that touch the store
//! return `anyhow::Result`; the assistant turns any `Err` into a failed turn.

pub mod calculation;
pub mod calendar;
pub mod chat;
pub mod learning;
pub mod note;
pub mod system;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::calendar::CalendarManager;
use crate::dates::Clock;
use crate::learning::PreferenceManager;
use crate::notes::NoteManager;
use crate::shell::{CommandExecutor, Platform};

/// What the assistant says back for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub message: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl TaskResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
            data: None,
        }
    }

    pub fn ok_with(message: impl Into<String>, data: Value) -> Self {
        Self {
            message: message.into(),
            success: true,
            data: Some(data),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
            data: None,
        }
    }
}

/// One user turn, kept in two views.
///
/// `raw` is the trimmed input and is what titles, names and queries are cut
/// from. `lower` is what keyword checks run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    raw: String,
    lower: String,
}

impl Utterance {
    pub fn new(text: &str) -> Self {
        let raw = text.trim().to_string();
        let lower = raw.to_lowercase();
        Self { raw, lower }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn lower(&self) -> &str {
        &self.lower
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Services shared by every handler.
#[derive(Clone)]
pub struct HandlerContext {
    pub notes: NoteManager,
    pub calendar: CalendarManager,
    pub preferences: PreferenceManager,
    pub clock: Arc<dyn Clock>,
    pub platform: Platform,
    /// Present only in desktop mode.
    pub executor: Option<Arc<dyn CommandExecutor>>,
}

impl HandlerContext {
    pub fn is_desktop(&self) -> bool {
        self.executor.is_some()
    }
}
