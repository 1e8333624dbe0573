//! Running-balance recalculation.
//!
//! Entries are kept sorted by `(transaction_date, seq)`. After any
//! mutation the suffix starting at the first affected position is
//! recomputed by carrying the predecessor's running balance forward, and
//! the account's current balance is refreshed from the terminal entry.
//! Re-running the computation without an intervening mutation yields
//! identical values.

use crate::domain::{Account, Transaction};

/// Recomputes running balances from `start` (an index into `entries`)
/// through the end, then refreshes the account's current balance.
///
/// The carry-in for position `start` is the running balance of the entry
/// before it, or the account's opening balance when recomputing from the
/// head.
pub fn recalculate_from(account: &mut Account, entries: &mut [Transaction], start: usize) {
    let start = start.min(entries.len());
    let mut carry = if start == 0 {
        account.opening_balance_cents
    } else {
        entries[start - 1].running_balance_cents
    };
    for entry in entries[start..].iter_mut() {
        carry += entry.signed_amount_cents();
        entry.running_balance_cents = carry;
    }
    account.current_balance_cents = entries
        .last()
        .map(|entry| entry.running_balance_cents)
        .unwrap_or(account.opening_balance_cents);
}

/// Full recomputation from the opening balance.
pub fn recalculate(account: &mut Account, entries: &mut [Transaction]) {
    recalculate_from(account, entries, 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntryKind;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn entry(account: &Account, kind: EntryKind, amount: i64, day: u32, seq: u64) -> Transaction {
        let mut txn = Transaction::new(account.id, kind, amount, date(day));
        txn.seq = seq;
        txn
    }

    #[test]
    fn empty_ledger_current_balance_is_opening() {
        let mut account = Account::new(Uuid::new_v4(), "Empty", 2500);
        let mut entries: Vec<Transaction> = Vec::new();
        recalculate(&mut account, &mut entries);
        assert_eq!(account.current_balance_cents, 2500);
    }

    #[test]
    fn carries_signed_amounts_forward() {
        let mut account = Account::new(Uuid::new_v4(), "Carry", 0);
        let mut entries = vec![
            entry(&account, EntryKind::Credit, 10_000, 1, 0),
            entry(&account, EntryKind::Debit, 3_000, 3, 1),
        ];
        recalculate(&mut account, &mut entries);
        assert_eq!(entries[0].running_balance_cents, 10_000);
        assert_eq!(entries[1].running_balance_cents, 7_000);
        assert_eq!(account.current_balance_cents, 7_000);
    }

    #[test]
    fn partial_recompute_matches_full_recompute() {
        let mut account = Account::new(Uuid::new_v4(), "Partial", 500);
        let mut entries = vec![
            entry(&account, EntryKind::Credit, 100, 1, 0),
            entry(&account, EntryKind::Debit, 40, 2, 1),
            entry(&account, EntryKind::Credit, 25, 4, 2),
        ];
        recalculate(&mut account, &mut entries);
        let full: Vec<i64> = entries.iter().map(|e| e.running_balance_cents).collect();

        // Recompute only the tail; the prefix carry must line up.
        recalculate_from(&mut account, &mut entries, 1);
        let partial: Vec<i64> = entries.iter().map(|e| e.running_balance_cents).collect();
        assert_eq!(full, partial);
    }

    #[test]
    fn recalculation_is_idempotent() {
        let mut account = Account::new(Uuid::new_v4(), "Idem", 0);
        let mut entries = vec![
            entry(&account, EntryKind::Credit, 777, 5, 0),
            entry(&account, EntryKind::Debit, 111, 5, 1),
        ];
        recalculate(&mut account, &mut entries);
        let first: Vec<i64> = entries.iter().map(|e| e.running_balance_cents).collect();
        let current = account.current_balance_cents;
        recalculate(&mut account, &mut entries);
        let second: Vec<i64> = entries.iter().map(|e| e.running_balance_cents).collect();
        assert_eq!(first, second);
        assert_eq!(current, account.current_balance_cents);
    }

    #[test]
    fn start_past_end_only_refreshes_current_balance() {
        let mut account = Account::new(Uuid::new_v4(), "Tail", 0);
        let mut entries = vec![entry(&account, EntryKind::Credit, 900, 2, 0)];
        recalculate(&mut account, &mut entries);
        account.current_balance_cents = 0;
        recalculate_from(&mut account, &mut entries, 5);
        assert_eq!(account.current_balance_cents, 900);
    }
}
