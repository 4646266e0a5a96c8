use anyhow::Result;
use regex::Regex;
use serde_json::json;

use super::{HandlerContext, TaskResponse, Utterance};
use crate::extract::{derive_title, extract_tags, NoteDraft};
use crate::notes::Note;

lazy_static::lazy_static! {
    static ref SHOW: Regex = Regex::new(r"(?i)show( me)? my notes").unwrap();
    static ref SEARCH: Regex = Regex::new(r"(?i)search notes for (.*)").unwrap();
    static ref KEYWORD: Regex = Regex::new(
        r"(?i)(?:write down|remember|remind me about|take a note)[:\s]+(.+)"
    ).unwrap();
}

const ECHO_LEN: usize = 100;
const RECENT_COUNT: usize = 3;

pub fn handle(utterance: &Utterance, ctx: &HandlerContext, draft: Option<NoteDraft>) -> Result<TaskResponse> {
    if let Some(draft) = draft {
        return save(ctx, draft);
    }

    if SHOW.is_match(utterance.raw()) {
        let total = ctx.notes.notes()?.len();
        if total == 0 {
            return Ok(TaskResponse::ok("You don't have any saved notes yet."));
        }

        let recent = ctx.notes.recent_notes(RECENT_COUNT)?;
        return Ok(TaskResponse::ok_with(
            format!(
                "Here are your most recent notes:\n{}\n\nYou have {} notes in total.",
                bullet_list(&recent),
                total
            ),
            json!({ "recentNotes": recent }),
        ));
    }

    if let Some(caps) = SEARCH.captures(utterance.raw()) {
        let query = caps[1].trim();
        if !query.is_empty() {
            let results = ctx.notes.search_notes(query)?;
            if results.is_empty() {
                return Ok(TaskResponse::ok(format!(
                    "I couldn't find any notes matching \"{}\".",
                    query
                )));
            }

            return Ok(TaskResponse::ok_with(
                format!(
                    "Found {} note{} matching \"{}\":\n{}",
                    results.len(),
                    if results.len() > 1 { "s" } else { "" },
                    query,
                    bullet_list(&results)
                ),
                json!({ "results": results }),
            ));
        }
    }

    if let Some(caps) = KEYWORD.captures(utterance.raw()) {
        let content = caps[1].trim();
        if !content.is_empty() {
            let draft = NoteDraft {
                title: derive_title(content),
                content: content.to_string(),
                tags: extract_tags(content),
            };
            return save(ctx, draft);
        }
    }

    Ok(TaskResponse::ok(
        "I can help you take and manage notes. Try saying \"Take a note: Remember to buy groceries\" or \"Show me my notes\".",
    ))
}

fn save(ctx: &HandlerContext, draft: NoteDraft) -> Result<TaskResponse> {
    let note = ctx.notes.add_note(draft, Some("chat".to_string()))?;

    let mut echo: String = note.content.chars().take(ECHO_LEN).collect();
    if note.content.chars().count() > ECHO_LEN {
        echo.push_str("...");
    }

    Ok(TaskResponse::ok_with(
        format!("I've saved your note: \"{}\"", echo),
        json!({ "note": note }),
    ))
}

fn bullet_list(notes: &[Note]) -> String {
    notes
        .iter()
        .map(|n| format!("- {} ({})", n.title, n.updated_at.format("%-m/%-d/%Y")))
        .collect::<Vec<_>>()
        .join("\n")
}
