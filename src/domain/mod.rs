pub mod account;
pub mod book;
pub mod cashbook;
pub mod common;
pub mod reminder;
pub mod transaction;

pub use account::{Account, AccountStatus, ContactDetails};
pub use book::Book;
pub use cashbook::{CashFlow, CashbookEntry};
pub use common::{Identifiable, NamedEntity};
pub use reminder::PaymentReminder;
pub use transaction::{EntryKind, PaymentStatus, Transaction};
