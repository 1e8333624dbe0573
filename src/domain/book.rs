use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Account, CashbookEntry, PaymentReminder, Transaction};

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

/// Serializable snapshot of a whole book: every account with its
/// entries, the cashbook log, and payment reminders.
///
/// This is the persistence unit; the live engine is rebuilt from it on
/// load and flattened back into it on save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub cashbook: Vec<CashbookEntry>,
    #[serde(default)]
    pub reminders: Vec<PaymentReminder>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "Book::schema_version_default")]
    pub schema_version: u8,
}

impl Book {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            accounts: Vec::new(),
            transactions: Vec::new(),
            cashbook: Vec::new(),
            reminders: Vec::new(),
            created_at: now,
            updated_at: now,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    /// One account's entries, sorted by the ledger's `(date, seq)` key.
    pub fn transactions_for(&self, account_id: Uuid) -> Vec<&Transaction> {
        let mut entries: Vec<&Transaction> = self
            .transactions
            .iter()
            .filter(|entry| entry.account_id == account_id)
            .collect();
        entries.sort_by(|a, b| a.cmp_order(b));
        entries
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }
}
