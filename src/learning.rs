//! learning - user preferences and the interaction log that feeds them
//!
//! Preferences are keyed by (kind, value) case-insensitively. Observing a pair
//! again raises its confidence by `CONFIDENCE_STEP` (capped at 1.0) instead of
//! storing a duplicate. Two writers share that rule:
//! - the explicit learning handler ("my name is ...", confidence 0.8-0.9)
//! - `InteractionLog`, which re-scans every raw query after logging it (0.6-0.8)

use anyhow::Result;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::store::{load_collection, save_collection, KeyValueStore, INTERACTIONS_KEY, PREFERENCES_KEY};

pub const CONFIDENCE_STEP: f64 = 0.2;
pub const MAX_INTERACTIONS: usize = 50;

const PASSIVE_NAME_CONFIDENCE: f64 = 0.8;
const PASSIVE_INTEREST_CONFIDENCE: f64 = 0.6;

lazy_static::lazy_static! {
    static ref NAME_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)my name is (\w+)").unwrap(),
        Regex::new(r"(?i)call me (\w+)").unwrap(),
    ];
    static ref INTEREST_PATTERNS: Vec<(Regex, PreferenceKind)> = vec![
        (Regex::new(r"(?i)i (?:like|love|enjoy) (\w+)").unwrap(), PreferenceKind::Interest),
        (Regex::new(r"(?i)i'm (?:interested in|passionate about) (\w+)").unwrap(), PreferenceKind::Interest),
        (Regex::new(r"(?i)i (?:don'?t like|hate|dislike) (\w+)").unwrap(), PreferenceKind::Dislike),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceKind {
    Name,
    Interest,
    Dislike,
    Relationship,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreference {
    #[serde(rename = "type")]
    pub kind: PreferenceKind,
    pub value: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// A preference observation before it is merged into the store.
#[derive(Debug, Clone)]
pub struct PreferenceInput {
    pub kind: PreferenceKind,
    pub value: String,
    pub confidence: f64,
    pub context: Option<String>,
}

#[derive(Clone)]
pub struct PreferenceManager {
    store: Arc<dyn KeyValueStore>,
}

impl PreferenceManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn preferences(&self) -> Result<Vec<UserPreference>> {
        load_collection(self.store.as_ref(), PREFERENCES_KEY)
    }

    /// Insert, or bump the confidence of the matching (kind, value) record.
    pub fn save_preference(&self, input: PreferenceInput) -> Result<UserPreference> {
        let mut prefs = self.preferences()?;
        let now = Utc::now();

        let existing = prefs
            .iter_mut()
            .find(|p| p.kind == input.kind && p.value.to_lowercase() == input.value.to_lowercase());

        let saved = match existing {
            Some(pref) => {
                pref.confidence = (pref.confidence + CONFIDENCE_STEP).min(1.0);
                if input.context.is_some() {
                    pref.context = input.context;
                }
                pref.last_updated = now;
                pref.clone()
            }
            None => {
                let pref = UserPreference {
                    kind: input.kind,
                    value: input.value,
                    confidence: input.confidence.clamp(0.0, 1.0),
                    context: input.context,
                    last_updated: now,
                };
                prefs.push(pref.clone());
                pref
            }
        };

        self.save(&prefs)?;
        tracing::debug!(kind = ?saved.kind, value = %saved.value, confidence = saved.confidence, "Preference saved");
        Ok(saved)
    }

    pub fn preferences_by_kind(&self, kind: PreferenceKind) -> Result<Vec<UserPreference>> {
        Ok(self
            .preferences()?
            .into_iter()
            .filter(|p| p.kind == kind)
            .collect())
    }

    /// Remove the (kind, value) record, matched case-insensitively.
    pub fn remove_preference(&self, kind: PreferenceKind, value: &str) -> Result<bool> {
        let mut prefs = self.preferences()?;
        let before = prefs.len();
        let needle = value.to_lowercase();
        prefs.retain(|p| !(p.kind == kind && p.value.to_lowercase() == needle));

        if prefs.len() == before {
            return Ok(false);
        }
        self.save(&prefs)?;
        Ok(true)
    }

    /// The most confidently known name.
    pub fn user_name(&self) -> Result<Option<String>> {
        let mut names = self.preferences_by_kind(PreferenceKind::Name)?;
        names.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(names.into_iter().next().map(|p| p.value))
    }

    pub fn top_interests(&self, limit: usize) -> Result<Vec<UserPreference>> {
        let mut interests = self.preferences_by_kind(PreferenceKind::Interest)?;
        interests.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        interests.truncate(limit);
        Ok(interests)
    }

    pub fn personalized_greeting(&self) -> Result<String> {
        let name = self.user_name()?;
        let interests = self.top_interests(2)?;

        Ok(match (name, interests.first()) {
            (Some(name), Some(top)) => format!("Hello {}! Ready to talk about {} today?", name, top.value),
            (Some(name), None) => format!("Hello {}! How can I help you today?", name),
            (None, Some(top)) => format!("Hello! Want to discuss {} today?", top.value),
            (None, None) => "Hello! How can I help you today?".to_string(),
        })
    }

    fn save(&self, prefs: &[UserPreference]) -> Result<()> {
        save_collection(self.store.as_ref(), PREFERENCES_KEY, prefs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInteraction {
    pub timestamp: DateTime<Utc>,
    pub user_query: String,
    pub assistant_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_provided: Option<Feedback>,
}

/// Bounded FIFO log of turns; oldest entries go first.
#[derive(Clone)]
pub struct InteractionLog {
    store: Arc<dyn KeyValueStore>,
    preferences: PreferenceManager,
    max_entries: usize,
}

impl InteractionLog {
    pub fn new(store: Arc<dyn KeyValueStore>, preferences: PreferenceManager, max_entries: usize) -> Self {
        Self {
            store,
            preferences,
            max_entries: max_entries.max(1),
        }
    }

    pub fn interactions(&self) -> Result<Vec<UserInteraction>> {
        load_collection(self.store.as_ref(), INTERACTIONS_KEY)
    }

    /// Append a turn, evict beyond the cap, then learn from the raw query.
    pub fn log(&self, user_query: &str, assistant_response: &str) -> Result<()> {
        let mut entries = self.interactions()?;
        entries.push(UserInteraction {
            timestamp: Utc::now(),
            user_query: user_query.to_string(),
            assistant_response: assistant_response.to_string(),
            feedback_provided: None,
        });

        if entries.len() > self.max_entries {
            let overflow = entries.len() - self.max_entries;
            entries.drain(..overflow);
        }

        save_collection(self.store.as_ref(), INTERACTIONS_KEY, &entries)?;
        self.learn_from(user_query)
    }

    /// Attach feedback to the most recent interaction.
    pub fn record_feedback(&self, feedback: Feedback) -> Result<bool> {
        let mut entries = self.interactions()?;
        let Some(last) = entries.last_mut() else {
            return Ok(false);
        };

        last.feedback_provided = Some(feedback);
        save_collection(self.store.as_ref(), INTERACTIONS_KEY, &entries)?;
        Ok(true)
    }

    fn learn_from(&self, query: &str) -> Result<()> {
        let context = Some(format!("User mentioned: \"{}\"", query));

        if let Some(caps) = NAME_PATTERNS.iter().find_map(|re| re.captures(query)) {
            self.preferences.save_preference(PreferenceInput {
                kind: PreferenceKind::Name,
                value: caps[1].to_string(),
                confidence: PASSIVE_NAME_CONFIDENCE,
                context: context.clone(),
            })?;
        }

        for (re, kind) in INTEREST_PATTERNS.iter() {
            if let Some(caps) = re.captures(query) {
                self.preferences.save_preference(PreferenceInput {
                    kind: *kind,
                    value: caps[1].to_string(),
                    confidence: PASSIVE_INTEREST_CONFIDENCE,
                    context: context.clone(),
                })?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn setup() -> (PreferenceManager, InteractionLog) {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let prefs = PreferenceManager::new(store.clone());
        let log = InteractionLog::new(store, prefs.clone(), MAX_INTERACTIONS);
        (prefs, log)
    }

    fn input(kind: PreferenceKind, value: &str, confidence: f64) -> PreferenceInput {
        PreferenceInput {
            kind,
            value: value.to_string(),
            confidence,
            context: None,
        }
    }

    #[test]
    fn test_duplicate_preference_bumps_confidence() {
        let (prefs, _) = setup();
        prefs.save_preference(input(PreferenceKind::Interest, "Hiking", 0.6)).unwrap();
        prefs.save_preference(input(PreferenceKind::Interest, "hiking", 0.6)).unwrap();

        let stored = prefs.preferences().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].value, "Hiking");
        assert!((stored[0].confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_caps_at_one() {
        let (prefs, _) = setup();
        for _ in 0..4 {
            prefs.save_preference(input(PreferenceKind::Name, "Alex", 0.9)).unwrap();
        }
        let stored = prefs.preferences().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].confidence, 1.0);
    }

    #[test]
    fn test_same_value_different_kind_is_separate() {
        let (prefs, _) = setup();
        prefs.save_preference(input(PreferenceKind::Interest, "rain", 0.6)).unwrap();
        prefs.save_preference(input(PreferenceKind::Dislike, "rain", 0.6)).unwrap();
        assert_eq!(prefs.preferences().unwrap().len(), 2);
    }

    #[test]
    fn test_user_name_prefers_highest_confidence() {
        let (prefs, _) = setup();
        prefs.save_preference(input(PreferenceKind::Name, "Sam", 0.5)).unwrap();
        prefs.save_preference(input(PreferenceKind::Name, "Alex", 0.9)).unwrap();
        assert_eq!(prefs.user_name().unwrap().as_deref(), Some("Alex"));

        assert!(prefs.remove_preference(PreferenceKind::Name, "ALEX").unwrap());
        assert_eq!(prefs.user_name().unwrap().as_deref(), Some("Sam"));
    }

    #[test]
    fn test_greeting_variants() {
        let (prefs, _) = setup();
        assert_eq!(prefs.personalized_greeting().unwrap(), "Hello! How can I help you today?");

        prefs.save_preference(input(PreferenceKind::Interest, "chess", 0.6)).unwrap();
        assert_eq!(prefs.personalized_greeting().unwrap(), "Hello! Want to discuss chess today?");

        prefs.save_preference(input(PreferenceKind::Name, "Kim", 0.9)).unwrap();
        assert_eq!(
            prefs.personalized_greeting().unwrap(),
            "Hello Kim! Ready to talk about chess today?"
        );
    }

    #[test]
    fn test_log_is_capped_fifo() {
        let (_, log) = setup();
        for i in 0..(MAX_INTERACTIONS + 1) {
            log.log(&format!("query {}", i), "ok").unwrap();
        }
        let entries = log.interactions().unwrap();
        assert_eq!(entries.len(), MAX_INTERACTIONS);
        assert_eq!(entries[0].user_query, "query 1");
        assert_eq!(entries.last().unwrap().user_query, "query 50");
    }

    #[test]
    fn test_passive_learning_from_raw_query() {
        let (prefs, log) = setup();
        log.log("Call me Robin, I love jazz and I hate traffic", "noted").unwrap();

        assert_eq!(prefs.user_name().unwrap().as_deref(), Some("Robin"));
        let interests = prefs.preferences_by_kind(PreferenceKind::Interest).unwrap();
        assert_eq!(interests[0].value, "jazz");
        assert!((interests[0].confidence - 0.6).abs() < 1e-9);
        let dislikes = prefs.preferences_by_kind(PreferenceKind::Dislike).unwrap();
        assert_eq!(dislikes[0].value, "traffic");
    }

    #[test]
    fn test_feedback_marks_latest() {
        let (_, log) = setup();
        assert!(!log.record_feedback(Feedback::Positive).unwrap());
        log.log("hello", "hi").unwrap();
        log.log("thanks", "welcome").unwrap();
        assert!(log.record_feedback(Feedback::Negative).unwrap());

        let entries = log.interactions().unwrap();
        assert_eq!(entries[0].feedback_provided, None);
        assert_eq!(entries[1].feedback_provided, Some(Feedback::Negative));
    }
}
