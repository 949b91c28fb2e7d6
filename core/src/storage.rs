//! Single-blob project persistence.
//!
//! The whole editable state that survives a session is one record: the deck
//! title and slides. It is written whenever the project is complete and has
//! at least one slide, and read once at startup to restore a prior session.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use deckgen_common::Slide;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// The persisted blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedProject {
    pub title: String,
    pub slides: Vec<Slide>,
    pub saved_at: DateTime<Utc>,
}

pub trait ProjectStore: Send + Sync {
    /// `Ok(None)` when no project has been saved yet.
    fn load(&self) -> Result<Option<SavedProject>, StorageError>;
    fn save(&self, project: &SavedProject) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Pretty-printed JSON file under the user's home directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location: `~/.deckgen/project.json`.
    pub fn default_path() -> Self {
        let mut path = home_dir();
        path.push(".deckgen");
        path.push("project.json");
        Self { path }
    }

    fn ensure_parent_dir(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl ProjectStore for JsonFileStore {
    fn load(&self) -> Result<Option<SavedProject>, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, project: &SavedProject) -> Result<(), StorageError> {
        self.ensure_parent_dir()?;
        let raw = serde_json::to_string_pretty(project)?;
        std::fs::write(&self.path, raw)?;
        tracing::debug!(path = %self.path.display(), "project saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn home_dir() -> PathBuf {
    if let Ok(h) = std::env::var("HOME") {
        return PathBuf::from(h);
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Option<SavedProject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectStore for MemoryStore {
    fn load(&self) -> Result<Option<SavedProject>, StorageError> {
        Ok(self.inner.lock().ok().and_then(|g| g.clone()))
    }

    fn save(&self, project: &SavedProject) -> Result<(), StorageError> {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = Some(project.clone());
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckgen_common::{MediaKind, SlideLayout};

    fn project() -> SavedProject {
        SavedProject {
            title: "Quarterly review".to_string(),
            slides: vec![Slide {
                id: "s1".to_string(),
                layout: SlideLayout::Title,
                title: "Q3".to_string(),
                subtitle: Some("2026".to_string()),
                bullets: vec!["revenue".to_string()],
                image_prompt: "a chart".to_string(),
                media_kind: MediaKind::Image,
                media_url: Some("data:image/png;base64,AAAA".to_string()),
                generating: false,
                notes: None,
            }],
            saved_at: Utc::now(),
        }
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("project.json"));

        assert!(store.load().unwrap().is_none());

        let p = project();
        store.save(&p).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, p);
    }

    #[test]
    fn file_store_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("project.json"));

        store.clear().unwrap();
        store.save(&project()).unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());

        let p = project();
        store.save(&p).unwrap();
        assert_eq!(store.load().unwrap().unwrap(), p);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
