//! Lock-deadline behavior. This suite pins `CASHBOOK_LOCK_TIMEOUT_MS`
//! for the whole process, so it runs as its own binary away from the
//! other concurrency suites.

use std::sync::{Arc, Barrier};
use std::thread;

use cashbook_core::domain::{Account, EntryKind, Transaction};
use cashbook_core::ledger::LedgerEngine;
use cashbook_core::LedgerError;
use chrono::NaiveDate;
use uuid::Uuid;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
}

#[test]
fn contended_lock_times_out_with_concurrency_conflict() {
    // A zero deadline turns any lock contention into an immediate
    // ConcurrencyConflict instead of a wait.
    std::env::set_var("CASHBOOK_LOCK_TIMEOUT_MS", "0");

    let engine = Arc::new(LedgerEngine::new("Deadline"));
    let owner = Uuid::new_v4();
    let account = engine
        .create_account(Account::new(owner, "Contended", 0))
        .unwrap();

    let rounds: u32 = 1_000;
    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for _ in 0..2 {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            let mut accepted = 0u32;
            let mut conflicts = 0u32;
            for round in 0..rounds {
                barrier.wait();
                let entry =
                    Transaction::new(account, EntryKind::Credit, 10, date(1 + round % 28));
                match engine.add_entry(owner, account, entry) {
                    Ok(_) => accepted += 1,
                    Err(LedgerError::ConcurrencyConflict(id)) => {
                        assert_eq!(id, account);
                        conflicts += 1;
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
            (accepted, conflicts)
        }));
    }
    let results: Vec<(u32, u32)> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    let accepted: u32 = results.iter().map(|(accepted, _)| accepted).sum();
    let conflicts: u32 = results.iter().map(|(_, conflicts)| conflicts).sum();
    assert!(conflicts > 0, "no contention observed in {rounds} rounds");

    // A conflicted add changes nothing: the accepted entries alone
    // account for the balance.
    let entries = engine.entries(owner, account).unwrap();
    assert_eq!(entries.len(), accepted as usize);
    let signed: i64 = entries.iter().map(|e| e.signed_amount_cents()).sum();
    assert_eq!(
        engine.account(owner, account).unwrap().current_balance_cents,
        signed
    );
}
