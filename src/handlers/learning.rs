use anyhow::Result;
use regex::Regex;

use super::{HandlerContext, TaskResponse, Utterance};
use crate::learning::{PreferenceInput, PreferenceKind};

lazy_static::lazy_static! {
    static ref NAME: Regex = Regex::new(r"(?i)(?:my name is|call me) (\w+)").unwrap();
    static ref LIKE: Regex = Regex::new(r"(?i)\bi (?:like|love|enjoy) ([\w\s]+)").unwrap();
    static ref DISLIKE: Regex = Regex::new(r"(?i)\bi (?:don'?t like|hate|dislike) ([\w\s]+)").unwrap();
    static ref FORGET: Regex = Regex::new(r"(?i)forget (?:about|that) ([\w\s]+)").unwrap();
    static ref MY_NAME: Regex = Regex::new(r"(?i)my name").unwrap();
}

const EXPLICIT_NAME_CONFIDENCE: f64 = 0.9;
const EXPLICIT_TASTE_CONFIDENCE: f64 = 0.8;

pub fn handle(utterance: &Utterance, ctx: &HandlerContext) -> Result<TaskResponse> {
    let text = utterance.raw();
    let context = Some(format!("User explicitly mentioned: \"{}\"", text));

    if let Some(caps) = NAME.captures(text) {
        let name = caps[1].to_string();
        ctx.preferences.save_preference(PreferenceInput {
            kind: PreferenceKind::Name,
            value: name.clone(),
            confidence: EXPLICIT_NAME_CONFIDENCE,
            context,
        })?;
        return Ok(TaskResponse::ok(format!("Thanks, I'll remember that your name is {}!", name)));
    }

    if let Some(caps) = LIKE.captures(text) {
        let interest = caps[1].trim().to_string();
        ctx.preferences.save_preference(PreferenceInput {
            kind: PreferenceKind::Interest,
            value: interest.clone(),
            confidence: EXPLICIT_TASTE_CONFIDENCE,
            context,
        })?;
        return Ok(TaskResponse::ok(format!("I'll remember that you enjoy {}!", interest)));
    }

    if let Some(caps) = DISLIKE.captures(text) {
        let dislike = caps[1].trim().to_string();
        ctx.preferences.save_preference(PreferenceInput {
            kind: PreferenceKind::Dislike,
            value: dislike.clone(),
            confidence: EXPLICIT_TASTE_CONFIDENCE,
            context,
        })?;
        return Ok(TaskResponse::ok(format!("I'll remember that you don't like {}.", dislike)));
    }

    if let Some(caps) = FORGET.captures(text) {
        return forget(ctx, caps[1].trim());
    }

    Ok(TaskResponse::ok(
        "I'm learning about your preferences to provide a more personalized experience. You can tell me things like \"My name is Alex\" or \"I like hiking\".",
    ))
}

fn forget(ctx: &HandlerContext, item: &str) -> Result<TaskResponse> {
    if MY_NAME.is_match(item) {
        if let Some(name) = ctx.preferences.user_name()? {
            ctx.preferences.remove_preference(PreferenceKind::Name, &name)?;
            return Ok(TaskResponse::ok("I've forgotten your name."));
        }
    }

    let needle = item.to_lowercase();
    let mut candidates = ctx.preferences.preferences_by_kind(PreferenceKind::Interest)?;
    candidates.extend(ctx.preferences.preferences_by_kind(PreferenceKind::Dislike)?);

    if let Some(pref) = candidates
        .into_iter()
        .find(|p| p.value.to_lowercase().contains(&needle))
    {
        ctx.preferences.remove_preference(pref.kind, &pref.value)?;
        let verb = if pref.kind == PreferenceKind::Interest {
            "like"
        } else {
            "dislike"
        };
        return Ok(TaskResponse::ok(format!(
            "I've forgotten that you {} {}.",
            verb, pref.value
        )));
    }

    Ok(TaskResponse::fail(format!(
        "I couldn't find anything specific about \"{}\" to forget.",
        item
    )))
}
