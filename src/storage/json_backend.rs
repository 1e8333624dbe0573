//! JSON file persistence: pretty-printed books under a managed data
//! directory, staged through temp files so a failed write never clobbers
//! the committed copy.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::book::{Book, CURRENT_SCHEMA_VERSION};
use crate::errors::{LedgerError, Result};
use crate::storage::StorageBackend;
use crate::utils::app_data_dir;

const BOOK_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const DEFAULT_RETENTION: usize = 5;

const BOOKS_DIR: &str = "books";
const BACKUPS_DIR: &str = "backups";
const STATE_FILE: &str = "state.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_book: Option<String>,
}

/// File-backed storage rooted at a data directory.
#[derive(Clone)]
pub struct JsonStorage {
    books_dir: PathBuf,
    backups_dir: PathBuf,
    state_file: PathBuf,
    retention: usize,
}

impl JsonStorage {
    pub fn new(root: Option<PathBuf>, retention: Option<usize>) -> Result<Self> {
        let root = root.unwrap_or_else(app_data_dir);
        let books_dir = root.join(BOOKS_DIR);
        let backups_dir = root.join(BACKUPS_DIR);
        fs::create_dir_all(&books_dir)?;
        fs::create_dir_all(&backups_dir)?;
        Ok(Self {
            books_dir,
            backups_dir,
            state_file: root.join(STATE_FILE),
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None, None)
    }

    pub fn book_path(&self, name: &str) -> PathBuf {
        self.books_dir
            .join(format!("{}.{}", canonical_name(name), BOOK_EXTENSION))
    }

    fn backup_dir(&self, name: &str) -> PathBuf {
        self.backups_dir.join(canonical_name(name))
    }

    fn read_state(&self) -> Result<StoreState> {
        if self.state_file.exists() {
            let data = fs::read_to_string(&self.state_file)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(StoreState::default())
        }
    }

    fn prune_backups(&self, dir: &Path) -> Result<()> {
        let mut backups = backup_files(dir)?;
        // Newest first; everything past the retention window goes.
        backups.sort_by(|a, b| b.cmp(a));
        for stale in backups.iter().skip(self.retention) {
            let _ = fs::remove_file(dir.join(stale));
        }
        Ok(())
    }
}

impl StorageBackend for JsonStorage {
    fn save(&self, book: &Book, name: &str) -> Result<()> {
        let path = self.book_path(name);
        write_atomic(&path, &serde_json::to_string_pretty(book)?)?;
        debug!(book = %name, path = %path.display(), "book saved");
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Book> {
        let path = self.book_path(name);
        if !path.exists() {
            return Err(LedgerError::Storage(format!("book `{name}` not found")));
        }
        load_book_from_path(&path)
    }

    fn backup(&self, book: &Book, name: &str, note: Option<&str>) -> Result<String> {
        let dir = self.backup_dir(name);
        fs::create_dir_all(&dir)?;
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let mut file_name = format!("{}_{}", canonical_name(name), timestamp);
        if let Some(label) = sanitize_note(note) {
            file_name.push('_');
            file_name.push_str(&label);
        }
        file_name.push('.');
        file_name.push_str(BOOK_EXTENSION);
        write_atomic(&dir.join(&file_name), &serde_json::to_string_pretty(book)?)?;
        self.prune_backups(&dir)?;
        debug!(book = %name, backup = %file_name, "backup created");
        Ok(file_name)
    }

    fn list_backups(&self, name: &str) -> Result<Vec<String>> {
        let dir = self.backup_dir(name);
        let mut backups = backup_files(&dir)?;
        backups.sort_by(|a, b| b.cmp(a));
        Ok(backups)
    }

    fn restore(&self, name: &str, backup_name: &str) -> Result<Book> {
        let path = self.backup_dir(name).join(backup_name);
        if !path.exists() {
            return Err(LedgerError::Storage(format!(
                "backup `{backup_name}` not found for book `{name}`"
            )));
        }
        let book = load_book_from_path(&path)?;
        self.save(&book, name)?;
        Ok(book)
    }

    fn last_book(&self) -> Result<Option<String>> {
        Ok(self.read_state()?.last_book)
    }

    fn record_last_book(&self, name: Option<&str>) -> Result<()> {
        let mut state = self.read_state()?;
        state.last_book = name.map(canonical_name);
        write_atomic(&self.state_file, &serde_json::to_string_pretty(&state)?)
    }
}

/// Loads a book, rejecting snapshots written by a newer schema.
pub fn load_book_from_path(path: &Path) -> Result<Book> {
    let data = fs::read_to_string(path)?;
    let book: Book = serde_json::from_str(&data)?;
    if book.schema_version > CURRENT_SCHEMA_VERSION {
        return Err(LedgerError::Storage(format!(
            "book schema v{} is newer than supported v{}",
            book.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }
    Ok(book)
}

fn backup_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(BOOK_EXTENSION) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
            out.push(name.to_string());
        }
    }
    Ok(out)
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Slugs a user-facing name into a safe file stem.
fn canonical_name(name: &str) -> String {
    let mut out = String::new();
    let mut last_dash = false;
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !out.is_empty() && !last_dash {
            out.push('_');
            last_dash = true;
        }
    }
    let trimmed = out.trim_matches('_').to_string();
    if trimmed.is_empty() {
        "book".into()
    } else {
        trimmed
    }
}

fn sanitize_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    if raw.is_empty() {
        return None;
    }
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || matches!(ch, '-' | '.')) && !sanitized.is_empty() && !last_dash {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-').to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_are_file_safe() {
        assert_eq!(canonical_name("My Shop 2024"), "my_shop_2024");
        assert_eq!(canonical_name("  weird//name  "), "weird_name");
        assert_eq!(canonical_name("***"), "book");
    }

    #[test]
    fn notes_are_sanitized_into_slugs() {
        assert_eq!(sanitize_note(Some("Quarter Close")).as_deref(), Some("quarter-close"));
        assert_eq!(sanitize_note(Some("   ")), None);
        assert_eq!(sanitize_note(None), None);
    }
}
