//! Small talk and the catch-all response.

use anyhow::Result;
use rand::seq::SliceRandom;
use regex::Regex;

use super::{HandlerContext, TaskResponse, Utterance};

lazy_static::lazy_static! {
    static ref GREETING: Regex = Regex::new(r"\b(hello|hi)\b|^hey").unwrap();
    static ref TIME: Regex = Regex::new(r"\btime\b").unwrap();
    static ref DATE: Regex = Regex::new(r"\bdate\b").unwrap();
}

pub const JOKES: &[&str] = &[
    "Why do programmers prefer dark mode? Because light attracts bugs!",
    "Why did the AI go to therapy? It had too many deep learning issues!",
    "I asked the computer to solve a problem, but it said \"That's not in my domain.\"",
    "Why did the developer go broke? Because they lost their cache!",
    "What do you call a computer that sings? A Dell!",
    "I told my computer I needed a break, and now it won't stop sending me vacation ads.",
    "Why was the computer cold? It left its Windows open!",
    "What's a computer's favorite snack? Microchips!",
    "Why don't programmers like nature? It has too many bugs and no debugging tool.",
];

pub fn handle(utterance: &Utterance, ctx: &HandlerContext) -> Result<TaskResponse> {
    let text = utterance.lower();

    let message = if GREETING.is_match(text) {
        ctx.preferences.personalized_greeting()?
    } else if text.contains("how are you") {
        "I'm functioning optimally! How are you doing today?".to_string()
    } else if text.contains("joke") {
        JOKES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(JOKES[0])
            .to_string()
    } else if TIME.is_match(text) {
        format!("The current time is {}.", ctx.clock.now().format("%-I:%M:%S %p"))
    } else if DATE.is_match(text) {
        format!("Today is {}.", ctx.clock.now().format("%A, %B %-d, %Y"))
    } else if text.contains("thank") {
        match ctx.preferences.user_name()? {
            Some(name) => format!("You're welcome, {}! Is there anything else I can help you with?", name),
            None => "You're welcome! Is there anything else I can help you with?".to_string(),
        }
    } else if text.contains("who are you") || text.contains("what are you") {
        "I'm BUDDY, your offline AI assistant. I'm designed to help you with various tasks without sending your data to any servers. Everything I do stays on your device.".to_string()
    } else if text.contains("can you do") {
        "I can help with tasks like taking notes, managing your calendar, finding files, opening apps, setting timers, playing music, answering questions, and just chatting with you. Since I'm an offline assistant, I process everything locally on your device for privacy.".to_string()
    } else {
        "I'm here to help with various tasks. You can ask me to manage your calendar, take notes, open apps, manage files, play music, search for information, perform calculations, or just chat!".to_string()
    };

    Ok(TaskResponse::ok(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::context;
    use crate::learning::{PreferenceInput, PreferenceKind};

    fn run(ctx: &HandlerContext, text: &str) -> String {
        handle(&Utterance::new(text), ctx).unwrap().message
    }

    #[test]
    fn test_greeting_is_personalized() {
        let ctx = context(None);
        assert_eq!(run(&ctx, "hello"), "Hello! How can I help you today?");

        ctx.preferences
            .save_preference(PreferenceInput {
                kind: PreferenceKind::Name,
                value: "Alex".into(),
                confidence: 0.9,
                context: None,
            })
            .unwrap();
        assert_eq!(run(&ctx, "Hey there"), "Hello Alex! How can I help you today?");
        assert_eq!(
            run(&ctx, "thanks!"),
            "You're welcome, Alex! Is there anything else I can help you with?"
        );
    }

    #[test]
    fn test_hi_needs_word_boundary() {
        let ctx = context(None);
        assert!(run(&ctx, "this is nothing").starts_with("I'm here to help"));
    }

    #[test]
    fn test_joke_comes_from_list() {
        let ctx = context(None);
        let joke = run(&ctx, "tell me a joke");
        assert!(JOKES.contains(&joke.as_str()));
    }

    #[test]
    fn test_time_and_date_use_clock() {
        let ctx = context(None);
        assert_eq!(run(&ctx, "what time is it"), "The current time is 12:00:00 PM.");
        assert_eq!(run(&ctx, "what's the date"), "Today is Monday, January 1, 2024.");
    }

    #[test]
    fn test_identity_and_fallback() {
        let ctx = context(None);
        assert!(run(&ctx, "who are you").starts_with("I'm BUDDY"));
        assert!(run(&ctx, "what can you do").starts_with("I can help with tasks"));
        assert!(run(&ctx, "blorp").starts_with("I'm here to help"));
    }
}
