use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::Identifiable;

/// A standalone income or expense record, not tied to any account and
/// carrying no running balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CashbookEntry {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub flow: CashFlow,
    pub amount_cents: i64,
    pub entry_date: NaiveDate,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CashbookEntry {
    pub fn new(
        owner_id: Uuid,
        flow: CashFlow,
        amount_cents: i64,
        entry_date: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            flow,
            amount_cents,
            entry_date,
            description: description.into(),
            attachment_url: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_attachment(mut self, url: impl Into<String>) -> Self {
        self.attachment_url = Some(url.into());
        self
    }

    /// Income counts positive, expense negative.
    pub fn signed_amount_cents(&self) -> i64 {
        match self.flow {
            CashFlow::Income => self.amount_cents,
            CashFlow::Expense => -self.amount_cents,
        }
    }
}

impl Identifiable for CashbookEntry {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Direction of a cashbook record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CashFlow {
    Income,
    Expense,
}

impl fmt::Display for CashFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CashFlow::Income => "Income",
            CashFlow::Expense => "Expense",
        };
        f.write_str(label)
    }
}
