//! Ordered intent classification.
//!
//! Patterns overlap ("remember to save the file" hits note, file and more), so
//! the table is walked top to bottom and the first match wins. The order below
//! is part of the public behaviour: `IntentClassifier::order()` exposes it.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    App,
    File,
    Search,
    Note,
    Music,
    Timer,
    Chat,
    Weather,
    Calculation,
    Calendar,
    Learning,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::App => "app",
            Intent::File => "file",
            Intent::Search => "search",
            Intent::Note => "note",
            Intent::Music => "music",
            Intent::Timer => "timer",
            Intent::Chat => "chat",
            Intent::Weather => "weather",
            Intent::Calculation => "calculation",
            Intent::Calendar => "calendar",
            Intent::Learning => "learning",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct IntentClassifier {
    table: Vec<(Intent, Regex)>,
}

impl IntentClassifier {
    pub fn new() -> Self {
        let table = [
            (
                Intent::Learning,
                r"\bmy name is\b|\bcall me\b|\bi (?:like|love|enjoy|hate|dislike)\b|\bi don'?t like\b|\bforget (?:about|that)\b",
            ),
            (
                Intent::Calendar,
                r"\b(?:calendar|events?|schedule|appointments?|meetings?)\b|\bwhat'?s coming up\b|\bwhat is coming up\b",
            ),
            // A trailing `.word` is a file name ("notes.txt"), not a note request
            (
                Intent::Note,
                r"\b(?:notes?|write down|remember|save|remind me about)(?:[^\w.]|\.(?:\W|$)|$)",
            ),
            (Intent::File, r"\b(?:files?|folders?|documents?|create|delete|rename)\b"),
            (Intent::App, r"\b(?:open|launch|start)\b|\brun\s+\w+"),
            (Intent::Search, r"\b(?:search|find|look for|google)\b"),
            (Intent::Music, r"\b(?:play|pause|stop|music|song|volume|turn up|turn down)\b"),
            (Intent::Timer, r"\b(?:timer|remind|alert|alarm)\b"),
            (Intent::Weather, r"\b(?:weather|temperature|forecast|rain|sunny)\b"),
            (
                Intent::Calculation,
                r"\b(?:calculate|compute|what is|how much is|math|sum of|add|subtract|multiply|divide)\b",
            ),
            (
                Intent::Chat,
                r"\b(?:hello|hi|hey|how are you|joke|thanks?|thank you|time|date|who are you|what are you)\b",
            ),
        ]
        .into_iter()
        .map(|(intent, pattern)| {
            let re = Regex::new(&format!("(?i){}", pattern)).unwrap();
            (intent, re)
        })
        .collect();

        Self { table }
    }

    /// First matching intent in declaration order, `Chat` when nothing matches.
    pub fn classify(&self, text: &str) -> Intent {
        let text = text.trim().to_lowercase();
        let intent = self
            .table
            .iter()
            .find(|(_, re)| re.is_match(&text))
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::Chat);

        tracing::debug!(%intent, "Classified utterance");
        intent
    }

    pub fn order(&self) -> Vec<Intent> {
        self.table.iter().map(|(intent, _)| *intent).collect()
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_order() {
        let classifier = IntentClassifier::new();
        assert_eq!(
            classifier.order(),
            vec![
                Intent::Learning,
                Intent::Calendar,
                Intent::Note,
                Intent::File,
                Intent::App,
                Intent::Search,
                Intent::Music,
                Intent::Timer,
                Intent::Weather,
                Intent::Calculation,
                Intent::Chat,
            ]
        );
    }

    #[test]
    fn test_note_beats_chat() {
        let classifier = IntentClassifier::new();
        // "thanks" alone is chat; "note" earlier in the table wins
        assert_eq!(classifier.classify("thanks"), Intent::Chat);
        assert_eq!(classifier.classify("thanks, save a note for me"), Intent::Note);
    }

    #[test]
    fn test_single_intents() {
        let c = IntentClassifier::new();
        assert_eq!(c.classify("My name is Alex"), Intent::Learning);
        assert_eq!(c.classify("what's coming up"), Intent::Calendar);
        assert_eq!(c.classify("rename draft.txt to final.txt"), Intent::File);
        assert_eq!(c.classify("launch spotify"), Intent::App);
        assert_eq!(c.classify("google rust lifetimes"), Intent::Search);
        assert_eq!(c.classify("play some jazz"), Intent::Music);
        assert_eq!(c.classify("set a timer for 5 minutes"), Intent::Timer);
        assert_eq!(c.classify("will it rain today"), Intent::Weather);
        assert_eq!(c.classify("calculate 2 + 2"), Intent::Calculation);
        assert_eq!(c.classify("tell me a joke"), Intent::Chat);
    }

    #[test]
    fn test_unmatched_defaults_to_chat() {
        let c = IntentClassifier::new();
        assert_eq!(c.classify("zxcv"), Intent::Chat);
        assert_eq!(c.classify(""), Intent::Chat);
    }

    #[test]
    fn test_word_boundaries() {
        let c = IntentClassifier::new();
        // "profile" must not look like "file", "address" not like "add"
        assert_eq!(c.classify("update my profile address"), Intent::Chat);
    }

    #[test]
    fn test_file_names_are_not_note_requests() {
        let c = IntentClassifier::new();
        assert_eq!(c.classify("create file notes.txt"), Intent::File);
        assert_eq!(c.classify("delete save.dat"), Intent::File);
        assert_eq!(c.classify("show my notes."), Intent::Note);
        assert_eq!(c.classify("show my notes"), Intent::Note);
        assert_eq!(c.classify("search notes for plants"), Intent::Note);
    }

    #[test]
    fn test_display_matches_serde() {
        assert_eq!(Intent::Calculation.to_string(), "calculation");
        assert_eq!(serde_json::to_string(&Intent::Calculation).unwrap(), "\"calculation\"");
    }
}
