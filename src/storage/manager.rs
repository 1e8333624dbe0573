//! Facade coordinating a live engine with the persistence backend.

use tracing::info;

use crate::domain::Book;
use crate::errors::{LedgerError, Result};
use crate::ledger::LedgerEngine;
use crate::storage::StorageBackend;

/// Owns the current book's engine plus a storage backend, and keeps the
/// two in step: saves flatten the engine into a snapshot, loads rebuild
/// the engine (recomputing balances) from one.
pub struct BookManager {
    engine: Option<LedgerEngine>,
    current_name: Option<String>,
    storage: Box<dyn StorageBackend>,
}

impl BookManager {
    pub fn new(storage: Box<dyn StorageBackend>) -> Self {
        Self {
            engine: None,
            current_name: None,
            storage,
        }
    }

    pub fn storage(&self) -> &dyn StorageBackend {
        self.storage.as_ref()
    }

    pub fn engine(&self) -> Result<&LedgerEngine> {
        self.engine
            .as_ref()
            .ok_or_else(|| LedgerError::Storage("no book loaded".into()))
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current_name.as_deref()
    }

    /// Starts a fresh book without persisting it yet.
    pub fn open_new(&mut self, name: impl Into<String>) -> &LedgerEngine {
        let name = name.into();
        self.engine = Some(LedgerEngine::new(name.clone()));
        self.current_name = Some(name);
        self.engine.as_ref().unwrap()
    }

    pub fn load(&mut self, name: &str) -> Result<()> {
        let book = self.storage.load(name)?;
        self.engine = Some(LedgerEngine::from_book(book)?);
        self.current_name = Some(name.to_string());
        self.storage.record_last_book(Some(name))?;
        info!(book = %name, "book loaded");
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let name = self
            .current_name
            .as_deref()
            .ok_or_else(|| LedgerError::Storage("current book is unnamed".into()))?;
        let snapshot = self.engine()?.snapshot()?;
        self.storage.save(&snapshot, name)?;
        self.storage.record_last_book(Some(name))?;
        Ok(())
    }

    pub fn save_as(&mut self, name: &str) -> Result<()> {
        let snapshot = self.engine()?.snapshot()?;
        self.storage.save(&snapshot, name)?;
        self.storage.record_last_book(Some(name))?;
        self.current_name = Some(name.to_string());
        Ok(())
    }

    pub fn backup(&self, note: Option<&str>) -> Result<String> {
        let name = self
            .current_name
            .as_deref()
            .ok_or_else(|| LedgerError::Storage("current book is unnamed".into()))?;
        let snapshot = self.engine()?.snapshot()?;
        self.storage.backup(&snapshot, name, note)
    }

    pub fn list_backups(&self, name: &str) -> Result<Vec<String>> {
        self.storage.list_backups(name)
    }

    /// Restores a backup as the current book and reloads the engine.
    pub fn restore(&mut self, name: &str, backup_name: &str) -> Result<()> {
        let book = self.storage.restore(name, backup_name)?;
        self.engine = Some(LedgerEngine::from_book(book)?);
        self.current_name = Some(name.to_string());
        info!(book = %name, backup = %backup_name, "book restored from backup");
        Ok(())
    }

    pub fn last_opened(&self) -> Result<Option<String>> {
        self.storage.last_book()
    }

    pub fn snapshot(&self) -> Result<Book> {
        self.engine()?.snapshot()
    }

    pub fn close(&mut self) {
        self.engine = None;
        self.current_name = None;
    }
}
