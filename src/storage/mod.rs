pub mod json_backend;
pub mod manager;

use crate::domain::Book;
use crate::errors::Result;

/// Abstraction over persistence backends capable of storing books and
/// snapshots. Writes must be atomic: a failed save leaves any previously
/// committed book untouched.
pub trait StorageBackend: Send + Sync {
    fn save(&self, book: &Book, name: &str) -> Result<()>;
    fn load(&self, name: &str) -> Result<Book>;
    fn backup(&self, book: &Book, name: &str, note: Option<&str>) -> Result<String>;
    fn list_backups(&self, name: &str) -> Result<Vec<String>>;
    fn restore(&self, name: &str, backup_name: &str) -> Result<Book>;
    fn last_book(&self) -> Result<Option<String>>;
    fn record_last_book(&self, name: Option<&str>) -> Result<()>;
}

pub use json_backend::JsonStorage;
pub use manager::BookManager;
