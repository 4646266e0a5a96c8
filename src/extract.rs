//! Structured extractors that run ahead of intent classification.
//!
//! Both return `None` when the utterance does not have their shape, in which
//! case the assistant falls through to the ordered intent table.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dates::parse_date;

lazy_static::lazy_static! {
    static ref EVENT: Regex = Regex::new(
        r#"(?i)(?:add|create|schedule|set)(?:\s+an?)?\s+event(?:\s+called|\s+titled|\s+named|\s+for)?\s+"([^"]+)"(?:\s+on|\s+at|\s+for)?\s+(.+?)(?:\s+at\s+(\d{1,2}(?::\d{2})?(?:\s*[ap]m)?)|$)"#
    ).unwrap();
    static ref REMINDER_RELATIVE: Regex = Regex::new(
        r"(?i)(?:remind me|set a reminder|add a reminder)(?:\s+to)?\s+(.+?)\s+(today|tomorrow|next\s+\w+)(?:\s+at\s+(\d{1,2}(?::\d{2})?(?:\s*[ap]m)?))?$"
    ).unwrap();
    static ref REMINDER: Regex = Regex::new(
        r"(?i)(?:remind me|set a reminder|add a reminder)(?:\s+to)?\s+(.+?)\s+(?:on|at|by)\s+(.+?)(?:\s+at\s+(\d{1,2}(?::\d{2})?(?:\s*[ap]m)?)|$)"
    ).unwrap();
    static ref NOTE: Regex = Regex::new(
        r#"(?i)(?:take|make|create|add)(?:\s+a)?\s+note(?:\s+about|\s+on)?:?\s+(?:"([^"]+)"|(.*))$"#
    ).unwrap();
    static ref HASHTAG: Regex = Regex::new(r"#(\w+)").unwrap();
}

const TITLE_LEN: usize = 30;

/// Calendar event details pulled out of free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub description: Option<String>,
}

/// Note details pulled out of free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

/// Match "add an event "<title>" on <date> [at <time>]" or a reminder phrasing.
pub fn extract_event(text: &str, today: NaiveDate) -> Option<EventDraft> {
    let text = text.trim();

    for pattern in [&*EVENT, &*REMINDER_RELATIVE, &*REMINDER] {
        let Some(caps) = pattern.captures(text) else {
            continue;
        };

        let title = caps[1].trim();
        let Some(date) = parse_date(&caps[2], today) else {
            tracing::debug!(date_text = &caps[2], "Event phrasing matched but date did not parse");
            continue;
        };

        return Some(EventDraft {
            title: title.to_string(),
            date,
            time: caps.get(3).map(|m| m.as_str().trim().to_string()),
            description: Some(format!("Created from: \"{}\"", text)),
        });
    }

    None
}

/// Match "take a note [about] "<content>"" or the unquoted rest-of-line form.
pub fn extract_note(text: &str) -> Option<NoteDraft> {
    let caps = NOTE.captures(text.trim())?;
    let content = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().trim())
        .filter(|c| !c.is_empty())?;

    let tags = extract_tags(content);
    let title = derive_title(content);

    Some(NoteDraft {
        title,
        content: content.to_string(),
        tags,
    })
}

/// `#tag` tokens, without the hash.
pub fn extract_tags(content: &str) -> Vec<String> {
    HASHTAG
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect()
}

/// Content with hashtags removed, cut to 30 chars; "..." when the content is longer.
pub fn derive_title(content: &str) -> String {
    let stripped = HASHTAG.replace_all(content, "");
    let mut title: String = stripped.trim().chars().take(TITLE_LEN).collect();
    if content.chars().count() > TITLE_LEN {
        title.push_str("...");
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_event_with_time() {
        let draft = extract_event(r#"Add an event called "Team Meeting" on tomorrow at 3pm"#, today()).unwrap();
        assert_eq!(draft.title, "Team Meeting");
        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(draft.time.as_deref(), Some("3pm"));
        assert!(draft.description.unwrap().starts_with("Created from:"));
    }

    #[test]
    fn test_event_without_time() {
        let draft = extract_event(r#"schedule event "Dentist" 14/1"#, today()).unwrap();
        assert_eq!(draft.title, "Dentist");
        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2024, 1, 14).unwrap());
        assert_eq!(draft.time, None);
    }

    #[test]
    fn test_reminder_relative_day() {
        let draft = extract_event("remind me to call mom tomorrow", today()).unwrap();
        assert_eq!(draft.title, "call mom");
        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn test_reminder_with_preposition_and_time() {
        let draft = extract_event("remind me to pay rent on 5/1 at 9am", today()).unwrap();
        assert_eq!(draft.title, "pay rent");
        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(draft.time.as_deref(), Some("9am"));
    }

    #[test]
    fn test_event_without_resolvable_date() {
        assert!(extract_event(r#"add an event "Party" sometime"#, today()).is_none());
        assert!(extract_event("remind me about the report", today()).is_none());
    }

    #[test]
    fn test_note_quoted_with_tags() {
        let draft = extract_note(r#"take a note "buy milk #shopping #home""#).unwrap();
        assert_eq!(draft.content, "buy milk #shopping #home");
        assert_eq!(draft.tags, vec!["shopping", "home"]);
        assert_eq!(draft.title, "buy milk");
    }

    #[test]
    fn test_note_long_title_truncated() {
        let draft = extract_note("make a note about the quarterly planning session needs a bigger room").unwrap();
        assert_eq!(draft.content, "the quarterly planning session needs a bigger room");
        assert_eq!(draft.title, "the quarterly planning session...");
    }

    #[test]
    fn test_note_requires_content() {
        assert!(extract_note("take a note").is_none());
        assert!(extract_note("what is a note").is_none());
    }

    #[test]
    fn test_title_ellipsis_uses_original_length() {
        // 27 visible chars + a tag pushes the original over 30
        let content = "short text that stays short #verylongtag";
        let title = derive_title(content);
        assert_eq!(title, "short text that stays short...");
    }
}
