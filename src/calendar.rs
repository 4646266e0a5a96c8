//! Calendar events on top of the key-value store.

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::extract::EventDraft;
use crate::shell::make_id;
use crate::store::{load_collection, save_collection, KeyValueStore, EVENTS_KEY};

/// How far ahead `upcoming_events` looks, inclusive.
pub const UPCOMING_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Clone)]
pub struct CalendarManager {
    store: Arc<dyn KeyValueStore>,
}

impl CalendarManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn events(&self) -> Result<Vec<CalendarEvent>> {
        load_collection(self.store.as_ref(), EVENTS_KEY)
    }

    pub fn add_event(&self, draft: EventDraft) -> Result<CalendarEvent> {
        let mut events = self.events()?;

        let event = CalendarEvent {
            id: make_id("event"),
            title: draft.title,
            date: draft.date,
            time: draft.time,
            description: draft.description,
            is_completed: false,
        };

        events.push(event.clone());
        self.save(&events)?;
        tracing::info!(id = %event.id, date = %event.date, "Calendar event added");
        Ok(event)
    }

    pub fn delete_event(&self, id: &str) -> Result<bool> {
        let mut events = self.events()?;
        let before = events.len();
        events.retain(|e| e.id != id);

        if events.len() == before {
            return Ok(false);
        }
        self.save(&events)?;
        Ok(true)
    }

    /// Replace the stored event with the same id.
    pub fn update_event(&self, updated: CalendarEvent) -> Result<bool> {
        let mut events = self.events()?;
        let Some(slot) = events.iter_mut().find(|e| e.id == updated.id) else {
            return Ok(false);
        };

        *slot = updated;
        self.save(&events)?;
        Ok(true)
    }

    pub fn toggle_event_completion(&self, id: &str) -> Result<bool> {
        let mut events = self.events()?;
        let Some(event) = events.iter_mut().find(|e| e.id == id) else {
            return Ok(false);
        };

        event.is_completed = !event.is_completed;
        self.save(&events)?;
        Ok(true)
    }

    pub fn events_by_date(&self, date: NaiveDate) -> Result<Vec<CalendarEvent>> {
        Ok(self
            .events()?
            .into_iter()
            .filter(|e| e.date == date)
            .collect())
    }

    /// Events dated `today..=today + 7 days`, earliest first.
    pub fn upcoming_events(&self, today: NaiveDate) -> Result<Vec<CalendarEvent>> {
        let horizon = today + Duration::days(UPCOMING_DAYS);
        let mut events: Vec<CalendarEvent> = self
            .events()?
            .into_iter()
            .filter(|e| e.date >= today && e.date <= horizon)
            .collect();
        events.sort_by_key(|e| e.date);
        Ok(events)
    }

    fn save(&self, events: &[CalendarEvent]) -> Result<()> {
        save_collection(self.store.as_ref(), EVENTS_KEY, events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft(title: &str, date: NaiveDate) -> EventDraft {
        EventDraft {
            title: title.to_string(),
            date,
            time: None,
            description: None,
        }
    }

    fn manager() -> CalendarManager {
        CalendarManager::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_add_event_starts_incomplete() {
        let cal = manager();
        let event = cal.add_event(draft("Dentist", ymd(2024, 5, 1))).unwrap();
        assert!(event.id.starts_with("event-"));
        assert!(!event.is_completed);
        assert_eq!(cal.events().unwrap(), vec![event]);
    }

    #[test]
    fn test_toggle_completion() {
        let cal = manager();
        let event = cal.add_event(draft("Gym", ymd(2024, 5, 1))).unwrap();

        assert!(cal.toggle_event_completion(&event.id).unwrap());
        assert!(cal.events().unwrap()[0].is_completed);
        assert!(cal.toggle_event_completion(&event.id).unwrap());
        assert!(!cal.events().unwrap()[0].is_completed);
        assert!(!cal.toggle_event_completion("event-missing").unwrap());
    }

    #[test]
    fn test_events_by_date() {
        let cal = manager();
        cal.add_event(draft("A", ymd(2024, 5, 1))).unwrap();
        cal.add_event(draft("B", ymd(2024, 5, 2))).unwrap();
        let found = cal.events_by_date(ymd(2024, 5, 2)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "B");
    }

    #[test]
    fn test_upcoming_window_and_order() {
        let cal = manager();
        let today = ymd(2024, 5, 10);
        cal.add_event(draft("past", ymd(2024, 5, 9))).unwrap();
        cal.add_event(draft("edge", ymd(2024, 5, 17))).unwrap();
        cal.add_event(draft("today", today)).unwrap();
        cal.add_event(draft("too far", ymd(2024, 5, 18))).unwrap();
        cal.add_event(draft("midweek", ymd(2024, 5, 13))).unwrap();

        let titles: Vec<String> = cal
            .upcoming_events(today)
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["today", "midweek", "edge"]);
    }

    #[test]
    fn test_update_and_delete() {
        let cal = manager();
        let mut event = cal.add_event(draft("Old", ymd(2024, 5, 1))).unwrap();
        event.title = "New".into();
        assert!(cal.update_event(event.clone()).unwrap());
        assert_eq!(cal.events().unwrap()[0].title, "New");

        assert!(cal.delete_event(&event.id).unwrap());
        assert!(cal.events().unwrap().is_empty());
    }
}
