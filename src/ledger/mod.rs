pub mod account_ledger;
pub mod balance;
pub mod engine;

pub use account_ledger::AccountLedger;
pub use engine::{AccountChanges, EntryPatch, LedgerEngine};
