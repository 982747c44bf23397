//! Persisted translation history.
//!
//! Successful turns are appended as JSON lines under the local data
//! directory, one entry per translation, so `history` works without the
//! network. Entries carry the synthesized clip base64-encoded so a saved
//! translation can be spoken again later.

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dirs::data_dir;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::APP_NAME;

/// One successful translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub original_text: String,
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    pub timestamp: DateTime<Utc>,
    pub has_audio: bool,
    /// Base64-encoded synthesized speech, present when `has_audio`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<String>,
}

impl HistoryEntry {
    pub fn new(
        original_text: impl Into<String>,
        translated_text: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
        audio_data: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_text: original_text.into(),
            translated_text: translated_text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            timestamp: Utc::now(),
            has_audio: audio_data.is_some(),
            audio_data,
        }
    }
}

/// Append-only store of translation history.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Creates a store at the default location in the user data directory.
    pub fn new() -> Result<Self> {
        let data_dir = data_dir().context("Failed to retrieve data directory")?;
        Ok(Self {
            path: data_dir.join(APP_NAME).join("history.jsonl"),
        })
    }

    /// Creates a store backed by the given file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the history file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry.
    pub fn append(&self, entry: &HistoryEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create history directory at {:?}", parent))?;
        }

        let mut line = serde_json::to_string(entry).context("Failed to serialize history entry")?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open history file at {:?}", self.path))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to write history file at {:?}", self.path))?;

        Ok(())
    }

    /// Returns all entries, newest first. Unreadable lines are skipped.
    pub fn list(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read history file at {:?}", self.path))?;

        let mut entries: Vec<HistoryEntry> = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("skipping unreadable history line: {e}"),
            }
        }

        entries.reverse();
        Ok(entries)
    }

    /// Deletes the entry with the given id. Returns whether it existed.
    pub fn delete(&self, id: Uuid) -> Result<bool> {
        let mut entries = self.list()?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() == before {
            return Ok(false);
        }

        entries.reverse();
        let mut content = String::new();
        for entry in &entries {
            content.push_str(&serde_json::to_string(entry)?);
            content.push('\n');
        }
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to rewrite history file at {:?}", self.path))?;
        Ok(true)
    }

    /// Removes all entries.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove history file at {:?}", self.path))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(original: &str) -> HistoryEntry {
        HistoryEntry::new(original, "translated", "hi-IN", "telugu", None)
    }

    #[test]
    fn test_append_and_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::with_path(dir.path().join("history.jsonl"));

        store.append(&entry("first")).unwrap();
        store.append(&entry("second")).unwrap();

        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].original_text, "second");
        assert_eq!(entries[1].original_text, "first");
    }

    #[test]
    fn test_audio_flag() {
        let with_audio = HistoryEntry::new("a", "b", "hi-IN", "tamil", Some("aGVsbG8=".into()));
        assert!(with_audio.has_audio);
        assert!(!entry("a").has_audio);
    }

    #[test]
    fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::with_path(dir.path().join("history.jsonl"));

        let keep = entry("keep");
        let remove = entry("remove");
        store.append(&keep).unwrap();
        store.append(&remove).unwrap();

        assert!(store.delete(remove.id).unwrap());
        assert!(!store.delete(remove.id).unwrap());

        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, keep.id);
    }

    #[test]
    fn test_list_skips_corrupt_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let store = HistoryStore::with_path(&path);

        store.append(&entry("good")).unwrap();
        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("{not json}\n");
        fs::write(&path, content).unwrap();

        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].original_text, "good");
    }

    #[test]
    fn test_clear_and_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::with_path(dir.path().join("history.jsonl"));

        assert!(store.list().unwrap().is_empty());
        store.append(&entry("only")).unwrap();
        store.clear().unwrap();
        assert!(store.list().unwrap().is_empty());
    }
}
