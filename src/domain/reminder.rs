use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::Identifiable;

/// A scheduled payment reminder for an account, optionally pinned to a
/// specific transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentReminder {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub account_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<Uuid>,
    pub remind_on: NaiveDate,
    pub message: String,
    #[serde(default)]
    pub sent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PaymentReminder {
    pub fn new(
        owner_id: Uuid,
        account_id: Uuid,
        remind_on: NaiveDate,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            account_id,
            transaction_id: None,
            remind_on,
            message: message.into(),
            sent: false,
            sent_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn for_transaction(mut self, transaction_id: Uuid) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    /// Due when unsent and the reminder date has arrived.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        !self.sent && self.remind_on <= today
    }

    pub fn mark_sent(&mut self, at: DateTime<Utc>) {
        self.sent = true;
        self.sent_at = Some(at);
    }
}

impl Identifiable for PaymentReminder {
    fn id(&self) -> Uuid {
        self.id
    }
}
