//! Owner-scoped ledger operations over per-account locks.
//!
//! Each account's ledger lives behind its own mutex: mutations touching
//! one account are serialized, mutations on different accounts proceed in
//! parallel. Lock acquisition is bounded; contention past the deadline
//! surfaces as `ConcurrencyConflict` and is never retried internally.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, TryLockError};
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{
    Account, AccountStatus, Book, CashbookEntry, ContactDetails, EntryKind, PaymentReminder,
    PaymentStatus, Transaction,
};
use crate::errors::{LedgerError, Result};
use crate::ledger::account_ledger::AccountLedger;

static LOCK_DEADLINE: Lazy<Duration> = Lazy::new(|| {
    std::env::var("CASHBOOK_LOCK_TIMEOUT_MS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
});

type SharedLedger = Arc<Mutex<AccountLedger>>;

/// Field changes applied to an account. `None` leaves a field untouched.
#[derive(Debug, Default, Clone)]
pub struct AccountChanges {
    pub name: Option<String>,
    pub category: Option<Option<String>>,
    pub contact: Option<ContactDetails>,
    pub credit_limit_cents: Option<i64>,
    pub opening_balance_cents: Option<i64>,
}

/// Field changes applied to a ledger entry. `None` leaves a field
/// untouched; amount, kind, and date changes re-trigger recalculation.
#[derive(Debug, Default, Clone)]
pub struct EntryPatch {
    pub kind: Option<EntryKind>,
    pub amount_cents: Option<i64>,
    pub transaction_date: Option<NaiveDate>,
    pub due_date: Option<Option<NaiveDate>>,
    pub payment_status: Option<PaymentStatus>,
    pub reference: Option<Option<String>>,
    pub attachment_url: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

/// The ledger balance engine: account store, transaction ledger, cashbook
/// log, and payment reminders for one book.
///
/// Every operation takes the owner identity explicitly; the engine
/// rejects access to accounts held by a different owner.
pub struct LedgerEngine {
    name: String,
    book_id: Uuid,
    accounts: RwLock<HashMap<Uuid, SharedLedger>>,
    /// `(owner, normalized name)` -> account id, guarding duplicates.
    names: Mutex<HashMap<(Uuid, String), Uuid>>,
    /// entry id -> owning account id.
    entry_owners: Mutex<HashMap<Uuid, Uuid>>,
    cashbook: Mutex<Vec<CashbookEntry>>,
    reminders: Mutex<Vec<PaymentReminder>>,
}

fn normalized(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

impl LedgerEngine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            book_id: Uuid::new_v4(),
            accounts: RwLock::new(HashMap::new()),
            names: Mutex::new(HashMap::new()),
            entry_owners: Mutex::new(HashMap::new()),
            cashbook: Mutex::new(Vec::new()),
            reminders: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ---------------------------------------------------------------
    // Locking
    // ---------------------------------------------------------------

    fn shared_ledger(&self, account_id: Uuid) -> Result<SharedLedger> {
        let map = self
            .accounts
            .read()
            .map_err(|_| LedgerError::Storage("account registry poisoned".into()))?;
        map.get(&account_id)
            .cloned()
            .ok_or(LedgerError::UnknownAccount(account_id))
    }

    fn lock_ledger<'a>(
        &self,
        shared: &'a SharedLedger,
        account_id: Uuid,
    ) -> Result<MutexGuard<'a, AccountLedger>> {
        let deadline = Instant::now() + *LOCK_DEADLINE;
        loop {
            match shared.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(LedgerError::ConcurrencyConflict(account_id));
                    }
                    std::thread::yield_now();
                }
                Err(TryLockError::Poisoned(_)) => {
                    return Err(LedgerError::Storage("account lock poisoned".into()))
                }
            }
        }
    }

    /// Locks an owned account's ledger, verifying owner scope.
    fn owned_ledger<'a>(
        &self,
        shared: &'a SharedLedger,
        owner: Uuid,
        account_id: Uuid,
    ) -> Result<MutexGuard<'a, AccountLedger>> {
        let guard = self.lock_ledger(shared, account_id)?;
        if guard.is_removed() || guard.account.owner_id != owner {
            return Err(LedgerError::UnknownAccount(account_id));
        }
        Ok(guard)
    }

    fn account_of_entry(&self, entry_id: Uuid) -> Result<Uuid> {
        self.entry_owners
            .lock()
            .map_err(|_| LedgerError::Storage("entry index poisoned".into()))?
            .get(&entry_id)
            .copied()
            .ok_or(LedgerError::UnknownTransaction(entry_id))
    }

    // ---------------------------------------------------------------
    // Account store
    // ---------------------------------------------------------------

    /// Registers an account and returns its identifier. Rejects negative
    /// credit limits and duplicate `(owner, name)` pairs.
    pub fn create_account(&self, account: Account) -> Result<Uuid> {
        if account.name.trim().is_empty() {
            return Err(LedgerError::Validation("account name is empty".into()));
        }
        if account.credit_limit_cents < 0 {
            return Err(LedgerError::Validation(format!(
                "credit limit must not be negative (got {})",
                account.credit_limit_cents
            )));
        }
        let key = (account.owner_id, normalized(&account.name));
        let mut names = self
            .names
            .lock()
            .map_err(|_| LedgerError::Storage("name index poisoned".into()))?;
        if names.contains_key(&key) {
            return Err(LedgerError::Validation(format!(
                "account `{}` already exists",
                account.name
            )));
        }
        let id = account.id;
        names.insert(key, id);
        drop(names);

        let ledger = AccountLedger::new(account);
        self.accounts
            .write()
            .map_err(|_| LedgerError::Storage("account registry poisoned".into()))?
            .insert(id, Arc::new(Mutex::new(ledger)));
        info!(account_id = %id, "account created");
        Ok(id)
    }

    pub fn account(&self, owner: Uuid, account_id: Uuid) -> Result<Account> {
        let shared = self.shared_ledger(account_id)?;
        let guard = self.owned_ledger(&shared, owner, account_id)?;
        Ok(guard.account.clone())
    }

    pub fn list_accounts(&self, owner: Uuid) -> Result<Vec<Account>> {
        let shareds: Vec<SharedLedger> = {
            let map = self
                .accounts
                .read()
                .map_err(|_| LedgerError::Storage("account registry poisoned".into()))?;
            map.values().cloned().collect()
        };
        let mut out = Vec::new();
        for shared in shareds {
            let guard = shared
                .lock()
                .map_err(|_| LedgerError::Storage("account lock poisoned".into()))?;
            if !guard.is_removed() && guard.account.owner_id == owner {
                out.push(guard.account.clone());
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    pub fn update_account(
        &self,
        owner: Uuid,
        account_id: Uuid,
        changes: AccountChanges,
    ) -> Result<()> {
        if let Some(limit) = changes.credit_limit_cents {
            if limit < 0 {
                return Err(LedgerError::Validation(format!(
                    "credit limit must not be negative (got {limit})"
                )));
            }
        }
        let shared = self.shared_ledger(account_id)?;
        let mut guard = self.owned_ledger(&shared, owner, account_id)?;

        if let Some(new_name) = &changes.name {
            if new_name.trim().is_empty() {
                return Err(LedgerError::Validation("account name is empty".into()));
            }
            let old_key = (owner, normalized(&guard.account.name));
            let new_key = (owner, normalized(new_name));
            if old_key != new_key {
                let mut names = self
                    .names
                    .lock()
                    .map_err(|_| LedgerError::Storage("name index poisoned".into()))?;
                if names.contains_key(&new_key) {
                    return Err(LedgerError::Validation(format!(
                        "account `{new_name}` already exists"
                    )));
                }
                names.remove(&old_key);
                names.insert(new_key, account_id);
            }
            guard.account.name = new_name.clone();
        }
        if let Some(category) = changes.category {
            guard.account.category = category;
        }
        if let Some(contact) = changes.contact {
            guard.account.contact = contact;
        }
        if let Some(limit) = changes.credit_limit_cents {
            guard.account.credit_limit_cents = limit;
        }
        if let Some(opening) = changes.opening_balance_cents {
            guard.set_opening_balance(opening);
        } else {
            guard.account.touch();
        }
        debug!(account_id = %account_id, "account updated");
        Ok(())
    }

    pub fn set_status(&self, owner: Uuid, account_id: Uuid, status: AccountStatus) -> Result<()> {
        let shared = self.shared_ledger(account_id)?;
        let mut guard = self.owned_ledger(&shared, owner, account_id)?;
        guard.account.status = status;
        guard.account.touch();
        debug!(account_id = %account_id, %status, "account status changed");
        Ok(())
    }

    /// Deletes an account, cascading its entries and reminders.
    pub fn remove_account(&self, owner: Uuid, account_id: Uuid) -> Result<()> {
        let shared = self.shared_ledger(account_id)?;
        // Tombstone and deregister the ledger while its lock is held: a
        // writer that cloned the shared handle before deregistration
        // observes the tombstone once it acquires the lock, instead of
        // mutating an orphaned ledger.
        let mut guard = self.owned_ledger(&shared, owner, account_id)?;
        guard.mark_removed();
        let name_key = (owner, normalized(&guard.account.name));
        self.accounts
            .write()
            .map_err(|_| LedgerError::Storage("account registry poisoned".into()))?
            .remove(&account_id);
        {
            let mut owners = self
                .entry_owners
                .lock()
                .map_err(|_| LedgerError::Storage("entry index poisoned".into()))?;
            for entry in guard.entries() {
                owners.remove(&entry.id);
            }
        }
        drop(guard);
        self.names
            .lock()
            .map_err(|_| LedgerError::Storage("name index poisoned".into()))?
            .remove(&name_key);
        self.reminders
            .lock()
            .map_err(|_| LedgerError::Storage("reminder store poisoned".into()))?
            .retain(|reminder| reminder.account_id != account_id);
        info!(account_id = %account_id, "account removed");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Transaction ledger
    // ---------------------------------------------------------------

    /// Records an entry against an account, recalculating balances before
    /// returning.
    pub fn add_entry(&self, owner: Uuid, account_id: Uuid, entry: Transaction) -> Result<Uuid> {
        if entry.amount_cents <= 0 {
            return Err(LedgerError::InvalidAmount(entry.amount_cents));
        }
        let shared = self.shared_ledger(account_id)?;
        let mut guard = self.owned_ledger(&shared, owner, account_id)?;
        if guard.account.is_blocked() {
            return Err(LedgerError::Validation(format!(
                "account `{}` is blocked",
                guard.account.name
            )));
        }
        let id = guard.insert(entry);
        let balance = guard.account.current_balance_cents;
        // Indexed under the account lock, so a concurrent removal either
        // sees this entry in its cascade or refuses the insert outright.
        self.entry_owners
            .lock()
            .map_err(|_| LedgerError::Storage("entry index poisoned".into()))?
            .insert(id, account_id);
        drop(guard);
        debug!(account_id = %account_id, entry_id = %id, balance, "entry added");
        Ok(id)
    }

    pub fn entry(&self, owner: Uuid, entry_id: Uuid) -> Result<Transaction> {
        let account_id = self.account_of_entry(entry_id)?;
        let shared = self.shared_ledger(account_id)?;
        let guard = self.owned_ledger(&shared, owner, account_id)?;
        guard
            .entry(entry_id)
            .cloned()
            .ok_or(LedgerError::UnknownTransaction(entry_id))
    }

    /// Ordered by `(transaction_date, seq)`.
    pub fn entries(&self, owner: Uuid, account_id: Uuid) -> Result<Vec<Transaction>> {
        let shared = self.shared_ledger(account_id)?;
        let guard = self.owned_ledger(&shared, owner, account_id)?;
        Ok(guard.entries().to_vec())
    }

    pub fn update_entry(&self, owner: Uuid, entry_id: Uuid, patch: EntryPatch) -> Result<()> {
        if let Some(amount) = patch.amount_cents {
            if amount <= 0 {
                return Err(LedgerError::InvalidAmount(amount));
            }
        }
        let account_id = self.account_of_entry(entry_id)?;
        let shared = self.shared_ledger(account_id)?;
        let mut guard = self.owned_ledger(&shared, owner, account_id)?;
        guard.update(entry_id, |entry| {
            if let Some(kind) = patch.kind {
                entry.kind = kind;
            }
            if let Some(amount) = patch.amount_cents {
                entry.amount_cents = amount;
            }
            if let Some(date) = patch.transaction_date {
                entry.transaction_date = date;
            }
            if let Some(due) = patch.due_date {
                entry.due_date = due;
            }
            if let Some(status) = patch.payment_status {
                entry.payment_status = status;
            }
            if let Some(reference) = patch.reference {
                entry.reference = reference;
            }
            if let Some(url) = patch.attachment_url {
                entry.attachment_url = url;
            }
            if let Some(notes) = patch.notes {
                entry.notes = notes;
            }
        })?;
        debug!(account_id = %account_id, entry_id = %entry_id, "entry updated");
        Ok(())
    }

    pub fn set_payment_status(
        &self,
        owner: Uuid,
        entry_id: Uuid,
        status: PaymentStatus,
    ) -> Result<()> {
        self.update_entry(
            owner,
            entry_id,
            EntryPatch {
                payment_status: Some(status),
                ..EntryPatch::default()
            },
        )
    }

    pub fn remove_entry(&self, owner: Uuid, entry_id: Uuid) -> Result<Transaction> {
        let account_id = self.account_of_entry(entry_id)?;
        let shared = self.shared_ledger(account_id)?;
        let mut guard = self.owned_ledger(&shared, owner, account_id)?;
        let removed = guard.remove(entry_id)?;
        self.entry_owners
            .lock()
            .map_err(|_| LedgerError::Storage("entry index poisoned".into()))?
            .remove(&entry_id);
        drop(guard);
        debug!(account_id = %account_id, entry_id = %entry_id, "entry removed");
        Ok(removed)
    }

    /// Moves an entry to another account of the same owner. Both ledgers
    /// are recalculated; locks are taken in id order to avoid deadlock.
    pub fn move_entry(&self, owner: Uuid, entry_id: Uuid, to_account: Uuid) -> Result<()> {
        let from_account = self.account_of_entry(entry_id)?;
        if from_account == to_account {
            return Ok(());
        }
        let from_shared = self.shared_ledger(from_account)?;
        let to_shared = self.shared_ledger(to_account)?;

        let (mut from_guard, mut to_guard) = if from_account < to_account {
            let from = self.owned_ledger(&from_shared, owner, from_account)?;
            let to = self.owned_ledger(&to_shared, owner, to_account)?;
            (from, to)
        } else {
            let to = self.owned_ledger(&to_shared, owner, to_account)?;
            let from = self.owned_ledger(&from_shared, owner, from_account)?;
            (from, to)
        };
        if to_guard.account.is_blocked() {
            return Err(LedgerError::Validation(format!(
                "account `{}` is blocked",
                to_guard.account.name
            )));
        }
        let entry = from_guard.remove(entry_id)?;
        to_guard.insert(entry);
        self.entry_owners
            .lock()
            .map_err(|_| LedgerError::Storage("entry index poisoned".into()))?
            .insert(entry_id, to_account);
        drop(from_guard);
        drop(to_guard);
        debug!(entry_id = %entry_id, from = %from_account, to = %to_account, "entry moved");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Cashbook
    // ---------------------------------------------------------------

    pub fn add_cashbook_entry(&self, entry: CashbookEntry) -> Result<Uuid> {
        if entry.amount_cents <= 0 {
            return Err(LedgerError::InvalidAmount(entry.amount_cents));
        }
        let id = entry.id;
        self.cashbook
            .lock()
            .map_err(|_| LedgerError::Storage("cashbook store poisoned".into()))?
            .push(entry);
        debug!(entry_id = %id, "cashbook entry added");
        Ok(id)
    }

    pub fn update_cashbook_entry<F>(&self, owner: Uuid, entry_id: Uuid, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut CashbookEntry),
    {
        let mut entries = self
            .cashbook
            .lock()
            .map_err(|_| LedgerError::Storage("cashbook store poisoned".into()))?;
        let entry = entries
            .iter_mut()
            .find(|entry| entry.id == entry_id && entry.owner_id == owner)
            .ok_or(LedgerError::UnknownCashbookEntry(entry_id))?;
        let mut updated = entry.clone();
        mutate(&mut updated);
        updated.id = entry_id;
        updated.owner_id = owner;
        if updated.amount_cents <= 0 {
            return Err(LedgerError::InvalidAmount(updated.amount_cents));
        }
        *entry = updated;
        Ok(())
    }

    pub fn remove_cashbook_entry(&self, owner: Uuid, entry_id: Uuid) -> Result<CashbookEntry> {
        let mut entries = self
            .cashbook
            .lock()
            .map_err(|_| LedgerError::Storage("cashbook store poisoned".into()))?;
        let index = entries
            .iter()
            .position(|entry| entry.id == entry_id && entry.owner_id == owner)
            .ok_or(LedgerError::UnknownCashbookEntry(entry_id))?;
        Ok(entries.remove(index))
    }

    /// The owner's cashbook, ordered by entry date then creation time.
    pub fn cashbook_entries(&self, owner: Uuid) -> Result<Vec<CashbookEntry>> {
        let entries = self
            .cashbook
            .lock()
            .map_err(|_| LedgerError::Storage("cashbook store poisoned".into()))?;
        let mut out: Vec<CashbookEntry> = entries
            .iter()
            .filter(|entry| entry.owner_id == owner)
            .cloned()
            .collect();
        out.sort_by(|a, b| (a.entry_date, a.created_at).cmp(&(b.entry_date, b.created_at)));
        Ok(out)
    }

    /// Net cash position: income minus expenses.
    pub fn cashbook_total(&self, owner: Uuid) -> Result<i64> {
        Ok(self
            .cashbook_entries(owner)?
            .iter()
            .map(|entry| entry.signed_amount_cents())
            .sum())
    }

    // ---------------------------------------------------------------
    // Payment reminders
    // ---------------------------------------------------------------

    pub fn add_reminder(&self, reminder: PaymentReminder) -> Result<Uuid> {
        // The referenced account (and transaction, if pinned) must exist
        // and belong to the reminder's owner.
        let shared = self.shared_ledger(reminder.account_id)?;
        let guard = self.owned_ledger(&shared, reminder.owner_id, reminder.account_id)?;
        if let Some(txn_id) = reminder.transaction_id {
            if guard.entry(txn_id).is_none() {
                return Err(LedgerError::UnknownTransaction(txn_id));
            }
        }
        let id = reminder.id;
        self.reminders
            .lock()
            .map_err(|_| LedgerError::Storage("reminder store poisoned".into()))?
            .push(reminder);
        drop(guard);
        debug!(reminder_id = %id, "reminder added");
        Ok(id)
    }

    pub fn mark_reminder_sent(&self, owner: Uuid, reminder_id: Uuid) -> Result<()> {
        let mut reminders = self
            .reminders
            .lock()
            .map_err(|_| LedgerError::Storage("reminder store poisoned".into()))?;
        let reminder = reminders
            .iter_mut()
            .find(|reminder| reminder.id == reminder_id && reminder.owner_id == owner)
            .ok_or(LedgerError::UnknownReminder(reminder_id))?;
        reminder.mark_sent(Utc::now());
        Ok(())
    }

    pub fn remove_reminder(&self, owner: Uuid, reminder_id: Uuid) -> Result<PaymentReminder> {
        let mut reminders = self
            .reminders
            .lock()
            .map_err(|_| LedgerError::Storage("reminder store poisoned".into()))?;
        let index = reminders
            .iter()
            .position(|reminder| reminder.id == reminder_id && reminder.owner_id == owner)
            .ok_or(LedgerError::UnknownReminder(reminder_id))?;
        Ok(reminders.remove(index))
    }

    pub fn reminders(&self, owner: Uuid) -> Result<Vec<PaymentReminder>> {
        let reminders = self
            .reminders
            .lock()
            .map_err(|_| LedgerError::Storage("reminder store poisoned".into()))?;
        let mut out: Vec<PaymentReminder> = reminders
            .iter()
            .filter(|reminder| reminder.owner_id == owner)
            .cloned()
            .collect();
        out.sort_by_key(|reminder| reminder.remind_on);
        Ok(out)
    }

    /// Unsent reminders whose date has arrived.
    pub fn due_reminders(&self, owner: Uuid, today: NaiveDate) -> Result<Vec<PaymentReminder>> {
        Ok(self
            .reminders(owner)?
            .into_iter()
            .filter(|reminder| reminder.is_due(today))
            .collect())
    }

    // ---------------------------------------------------------------
    // Snapshots
    // ---------------------------------------------------------------

    /// Flattens the live engine into a serializable book.
    pub fn snapshot(&self) -> Result<Book> {
        let mut book = Book::new(self.name.clone());
        book.id = self.book_id;
        let shareds: Vec<SharedLedger> = {
            let map = self
                .accounts
                .read()
                .map_err(|_| LedgerError::Storage("account registry poisoned".into()))?;
            map.values().cloned().collect()
        };
        for shared in shareds {
            let guard = shared
                .lock()
                .map_err(|_| LedgerError::Storage("account lock poisoned".into()))?;
            if guard.is_removed() {
                continue;
            }
            book.accounts.push(guard.account.clone());
            book.transactions.extend(guard.entries().iter().cloned());
        }
        book.accounts.sort_by(|a, b| a.name.cmp(&b.name));
        book.transactions.sort_by(|a, b| a.cmp_order(b));
        book.cashbook = self
            .cashbook
            .lock()
            .map_err(|_| LedgerError::Storage("cashbook store poisoned".into()))?
            .clone();
        book.reminders = self
            .reminders
            .lock()
            .map_err(|_| LedgerError::Storage("reminder store poisoned".into()))?
            .clone();
        Ok(book)
    }

    /// Rebuilds an engine from a persisted book. Running balances are
    /// recomputed rather than trusted.
    pub fn from_book(book: Book) -> Result<Self> {
        let mut engine = Self::new(book.name.clone());
        engine.book_id = book.id;
        {
            let mut accounts = engine
                .accounts
                .write()
                .map_err(|_| LedgerError::Storage("account registry poisoned".into()))?;
            let mut names = engine
                .names
                .lock()
                .map_err(|_| LedgerError::Storage("name index poisoned".into()))?;
            let mut entry_owners = engine
                .entry_owners
                .lock()
                .map_err(|_| LedgerError::Storage("entry index poisoned".into()))?;
            for account in &book.accounts {
                let entries: Vec<Transaction> = book
                    .transactions_for(account.id)
                    .into_iter()
                    .cloned()
                    .collect();
                for entry in &entries {
                    entry_owners.insert(entry.id, account.id);
                }
                names.insert((account.owner_id, normalized(&account.name)), account.id);
                let ledger = AccountLedger::from_parts(account.clone(), entries);
                accounts.insert(account.id, Arc::new(Mutex::new(ledger)));
            }
        }
        *engine
            .cashbook
            .lock()
            .map_err(|_| LedgerError::Storage("cashbook store poisoned".into()))? = book.cashbook;
        *engine
            .reminders
            .lock()
            .map_err(|_| LedgerError::Storage("reminder store poisoned".into()))? = book.reminders;
        Ok(engine)
    }
}
