//! Note storage on top of the key-value store.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::extract::NoteDraft;
use crate::shell::make_id;
use crate::store::{load_collection, save_collection, KeyValueStore, NOTES_KEY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Partial edit; `None` fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct NoteManager {
    store: Arc<dyn KeyValueStore>,
}

impl NoteManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn notes(&self) -> Result<Vec<Note>> {
        load_collection(self.store.as_ref(), NOTES_KEY)
    }

    pub fn add_note(&self, draft: NoteDraft, source: Option<String>) -> Result<Note> {
        let mut notes = self.notes()?;
        let now = Utc::now();

        let note = Note {
            id: make_id("note"),
            title: draft.title,
            content: draft.content,
            tags: draft.tags,
            created_at: now,
            updated_at: now,
            source,
        };

        notes.push(note.clone());
        self.save(&notes)?;
        tracing::info!(id = %note.id, tags = note.tags.len(), "Note saved");
        Ok(note)
    }

    pub fn delete_note(&self, id: &str) -> Result<bool> {
        let mut notes = self.notes()?;
        let before = notes.len();
        notes.retain(|n| n.id != id);

        if notes.len() == before {
            return Ok(false);
        }
        self.save(&notes)?;
        Ok(true)
    }

    /// Apply `update` and bump `updated_at`.
    pub fn update_note(&self, id: &str, update: NoteUpdate) -> Result<bool> {
        let mut notes = self.notes()?;
        let Some(note) = notes.iter_mut().find(|n| n.id == id) else {
            return Ok(false);
        };

        if let Some(title) = update.title {
            note.title = title;
        }
        if let Some(content) = update.content {
            note.content = content;
        }
        if let Some(tags) = update.tags {
            note.tags = tags;
        }
        note.updated_at = Utc::now();

        self.save(&notes)?;
        Ok(true)
    }

    /// Case-insensitive substring match over title, content and tags.
    pub fn search_notes(&self, query: &str) -> Result<Vec<Note>> {
        let needle = query.to_lowercase();
        Ok(self
            .notes()?
            .into_iter()
            .filter(|n| {
                n.title.to_lowercase().contains(&needle)
                    || n.content.to_lowercase().contains(&needle)
                    || n.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .collect())
    }

    pub fn notes_by_tag(&self, tag: &str) -> Result<Vec<Note>> {
        Ok(self
            .notes()?
            .into_iter()
            .filter(|n| n.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
            .collect())
    }

    /// Most recently updated first.
    pub fn recent_notes(&self, limit: usize) -> Result<Vec<Note>> {
        let mut notes = self.notes()?;
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        notes.truncate(limit);
        Ok(notes)
    }

    fn save(&self, notes: &[Note]) -> Result<()> {
        save_collection(self.store.as_ref(), NOTES_KEY, notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::derive_title;
    use crate::store::MemoryStore;

    fn draft(content: &str, tags: &[&str]) -> NoteDraft {
        NoteDraft {
            title: derive_title(content),
            content: content.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn manager() -> NoteManager {
        NoteManager::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_add_and_list() {
        let notes = manager();
        let note = notes.add_note(draft("buy milk", &[]), None).unwrap();
        assert!(note.id.starts_with("note-"));
        assert_eq!(note.created_at, note.updated_at);
        assert_eq!(notes.notes().unwrap().len(), 1);
    }

    #[test]
    fn test_search_matches_title_content_and_tags() {
        let notes = manager();
        notes.add_note(draft("Buy MILK", &[]), None).unwrap();
        notes.add_note(draft("call the plumber", &["House"]), None).unwrap();
        notes.add_note(draft("unrelated", &[]), None).unwrap();

        assert_eq!(notes.search_notes("milk").unwrap().len(), 1);
        assert_eq!(notes.search_notes("house").unwrap().len(), 1);
        assert!(notes.search_notes("zebra").unwrap().is_empty());
    }

    #[test]
    fn test_update_bumps_timestamp() {
        let notes = manager();
        let note = notes.add_note(draft("first", &[]), None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        let updated = notes
            .update_note(
                &note.id,
                NoteUpdate {
                    content: Some("second".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(updated);

        let stored = &notes.notes().unwrap()[0];
        assert_eq!(stored.content, "second");
        assert!(stored.updated_at > note.updated_at);
        assert_eq!(stored.created_at, note.created_at);
    }

    #[test]
    fn test_delete_and_tags() {
        let notes = manager();
        let a = notes.add_note(draft("a", &["work"]), None).unwrap();
        notes.add_note(draft("b", &["home"]), None).unwrap();

        assert_eq!(notes.notes_by_tag("WORK").unwrap().len(), 1);
        assert!(notes.delete_note(&a.id).unwrap());
        assert!(!notes.delete_note(&a.id).unwrap());
        assert!(notes.notes_by_tag("work").unwrap().is_empty());
    }

    #[test]
    fn test_recent_notes_order() {
        let notes = manager();
        for content in ["one", "two", "three", "four"] {
            notes.add_note(draft(content, &[]), None).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        let recent: Vec<String> = notes
            .recent_notes(3)
            .unwrap()
            .into_iter()
            .map(|n| n.content)
            .collect();
        assert_eq!(recent, vec!["four", "three", "two"]);
    }
}
