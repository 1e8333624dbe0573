use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::Identifiable;

/// A dated credit or debit entry against an account.
///
/// Entries are totally ordered within an account by
/// `(transaction_date, seq)`. `seq` is assigned once at insertion and
/// never changes, so two entries sharing a date keep a deterministic
/// order for running-balance purposes even across later edits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: EntryKind,
    pub amount_cents: i64,
    pub transaction_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub payment_status: PaymentStatus,
    /// Derived: balance of the account immediately after this entry.
    pub running_balance_cents: i64,
    /// Immutable per-account insertion sequence; the ordering tie-break.
    pub seq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        account_id: Uuid,
        kind: EntryKind,
        amount_cents: i64,
        transaction_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            kind,
            amount_cents,
            transaction_date,
            due_date: None,
            payment_status: PaymentStatus::Pending,
            running_balance_cents: 0,
            seq: 0,
            reference: None,
            attachment_url: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_attachment(mut self, url: impl Into<String>) -> Self {
        self.attachment_url = Some(url.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Credit counts positive, debit negative.
    pub fn signed_amount_cents(&self) -> i64 {
        self.kind.signed(self.amount_cents)
    }

    /// The `(date, seq)` ordering key used by the ledger.
    pub fn order_key(&self) -> (NaiveDate, u64) {
        (self.transaction_date, self.seq)
    }

    pub fn cmp_order(&self, other: &Transaction) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

impl Identifiable for Transaction {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntryKind {
    Credit,
    Debit,
}

impl EntryKind {
    pub fn signed(self, amount_cents: i64) -> i64 {
        match self {
            EntryKind::Credit => amount_cents,
            EntryKind::Debit => -amount_cents,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntryKind::Credit => "Credit",
            EntryKind::Debit => "Debit",
        };
        f.write_str(label)
    }
}

/// Settlement state of an entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    PartiallyPaid,
    Paid,
    Overdue,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::PartiallyPaid => "Partially Paid",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Overdue => "Overdue",
        };
        f.write_str(label)
    }
}
