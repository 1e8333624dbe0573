//! One account and its chronologically ordered entries.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{Account, Transaction};
use crate::errors::{LedgerError, Result};
use crate::ledger::balance;

/// An account together with its entries, kept sorted by
/// `(transaction_date, seq)`. All mutation paths re-run the balance
/// recalculation before returning, so observers never see stale derived
/// values.
#[derive(Debug)]
pub struct AccountLedger {
    pub account: Account,
    entries: Vec<Transaction>,
    next_seq: u64,
    /// Set while the engine holds this ledger's lock during removal; a
    /// writer that cloned the shared handle before deregistration finds
    /// the tombstone once it acquires the lock.
    removed: bool,
}

impl AccountLedger {
    pub fn new(account: Account) -> Self {
        let mut ledger = Self {
            account,
            entries: Vec::new(),
            next_seq: 0,
            removed: false,
        };
        balance::recalculate(&mut ledger.account, &mut ledger.entries);
        ledger
    }

    /// Rebuilds a ledger from persisted parts. Entries are re-sorted and
    /// balances recomputed rather than trusting stored derived values.
    pub fn from_parts(account: Account, mut entries: Vec<Transaction>) -> Self {
        entries.sort_by(|a, b| a.cmp_order(b));
        let next_seq = entries.iter().map(|e| e.seq + 1).max().unwrap_or(0);
        let mut ledger = Self {
            account,
            entries,
            next_seq,
            removed: false,
        };
        balance::recalculate(&mut ledger.account, &mut ledger.entries);
        ledger
    }

    pub fn entries(&self) -> &[Transaction] {
        &self.entries
    }

    /// True once the engine has deregistered this ledger.
    pub(crate) fn is_removed(&self) -> bool {
        self.removed
    }

    pub(crate) fn mark_removed(&mut self) {
        self.removed = true;
    }

    pub fn entry(&self, id: Uuid) -> Option<&Transaction> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    fn index_of(&self, id: Uuid) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    /// Index at which an entry with the given order key belongs.
    fn insertion_index(&self, date: NaiveDate, seq: u64) -> usize {
        self.entries
            .partition_point(|entry| entry.order_key() < (date, seq))
    }

    /// Inserts an entry, assigning its sequence number, and recomputes the
    /// affected suffix. Back-dated entries land mid-vector and shift every
    /// later running balance.
    pub fn insert(&mut self, mut entry: Transaction) -> Uuid {
        entry.account_id = self.account.id;
        entry.seq = self.next_seq;
        self.next_seq += 1;
        let id = entry.id;
        let index = self.insertion_index(entry.transaction_date, entry.seq);
        self.entries.insert(index, entry);
        balance::recalculate_from(&mut self.account, &mut self.entries, index);
        self.account.touch();
        id
    }

    /// Applies a mutation to an entry, repositions it if its date changed
    /// (the original `seq` is kept), and recomputes from the first
    /// affected position.
    pub fn update<F>(&mut self, id: Uuid, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Transaction),
    {
        let old_index = self
            .index_of(id)
            .ok_or(LedgerError::UnknownTransaction(id))?;
        let mut updated = self.entries[old_index].clone();
        mutate(&mut updated);
        // Identity and tie-break survive any patch.
        updated.id = id;
        updated.seq = self.entries[old_index].seq;
        updated.account_id = self.account.id;
        if updated.amount_cents <= 0 {
            return Err(LedgerError::InvalidAmount(updated.amount_cents));
        }
        self.entries.remove(old_index);
        let new_index = self.insertion_index(updated.transaction_date, updated.seq);
        self.entries.insert(new_index, updated);
        balance::recalculate_from(&mut self.account, &mut self.entries, old_index.min(new_index));
        self.account.touch();
        Ok(())
    }

    /// Removes an entry and recomputes the suffix it vacated.
    pub fn remove(&mut self, id: Uuid) -> Result<Transaction> {
        let index = self
            .index_of(id)
            .ok_or(LedgerError::UnknownTransaction(id))?;
        let removed = self.entries.remove(index);
        balance::recalculate_from(&mut self.account, &mut self.entries, index);
        self.account.touch();
        Ok(removed)
    }

    /// Changes the opening balance and recomputes everything after it.
    pub fn set_opening_balance(&mut self, opening_balance_cents: i64) {
        self.account.opening_balance_cents = opening_balance_cents;
        balance::recalculate(&mut self.account, &mut self.entries);
        self.account.touch();
    }

    pub fn into_parts(self) -> (Account, Vec<Transaction>) {
        (self.account, self.entries)
    }
}
