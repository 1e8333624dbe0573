use cashbook_core::domain::{
    Account, AccountStatus, CashFlow, CashbookEntry, ContactDetails, EntryKind, PaymentReminder,
    PaymentStatus, Transaction,
};
use cashbook_core::ledger::{AccountChanges, EntryPatch, LedgerEngine};
use cashbook_core::LedgerError;
use chrono::NaiveDate;
use uuid::Uuid;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, day).unwrap()
}

#[test]
fn duplicate_account_names_per_owner_are_rejected() {
    let engine = LedgerEngine::new("Names");
    let owner = Uuid::new_v4();
    engine
        .create_account(Account::new(owner, "Acme Supplies", 0))
        .unwrap();

    let err = engine
        .create_account(Account::new(owner, "  acme supplies ", 0))
        .expect_err("duplicate name must be rejected");
    assert!(matches!(err, LedgerError::Validation(ref msg) if msg.contains("already exists")));

    // A different owner may reuse the name.
    let other = Uuid::new_v4();
    engine
        .create_account(Account::new(other, "Acme Supplies", 0))
        .unwrap();
}

#[test]
fn negative_credit_limit_is_rejected() {
    let engine = LedgerEngine::new("Limits");
    let owner = Uuid::new_v4();
    let err = engine
        .create_account(Account::new(owner, "Limited", 0).with_credit_limit(-100))
        .expect_err("negative credit limit must be rejected");
    assert!(matches!(err, LedgerError::Validation(_)));

    let account = engine
        .create_account(Account::new(owner, "Limited", 0))
        .unwrap();
    let err = engine
        .update_account(
            owner,
            account,
            AccountChanges {
                credit_limit_cents: Some(-1),
                ..Default::default()
            },
        )
        .expect_err("negative credit limit update must be rejected");
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[test]
fn owner_scoping_hides_foreign_accounts() {
    let engine = LedgerEngine::new("Scope");
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let account = engine
        .create_account(Account::new(owner, "Private", 0))
        .unwrap();

    let err = engine
        .account(stranger, account)
        .expect_err("foreign owner must not see the account");
    assert!(matches!(err, LedgerError::UnknownAccount(id) if id == account));
    assert!(engine.list_accounts(stranger).unwrap().is_empty());
}

#[test]
fn unknown_account_and_transaction_errors() {
    let engine = LedgerEngine::new("Unknown");
    let owner = Uuid::new_v4();
    let missing = Uuid::new_v4();

    let err = engine
        .add_entry(
            owner,
            missing,
            Transaction::new(missing, EntryKind::Credit, 100, date(1)),
        )
        .expect_err("unknown account");
    assert!(matches!(err, LedgerError::UnknownAccount(id) if id == missing));

    let err = engine
        .update_entry(owner, missing, EntryPatch::default())
        .expect_err("unknown transaction");
    assert!(matches!(err, LedgerError::UnknownTransaction(id) if id == missing));
}

#[test]
fn blocked_accounts_reject_new_entries() {
    let engine = LedgerEngine::new("Blocked");
    let owner = Uuid::new_v4();
    let account = engine
        .create_account(Account::new(owner, "Risky", 0))
        .unwrap();
    let kept = engine
        .add_entry(
            owner,
            account,
            Transaction::new(account, EntryKind::Credit, 100, date(1)),
        )
        .unwrap();

    engine
        .set_status(owner, account, AccountStatus::Blocked)
        .unwrap();
    let err = engine
        .add_entry(
            owner,
            account,
            Transaction::new(account, EntryKind::Credit, 100, date(2)),
        )
        .expect_err("blocked account must reject entries");
    assert!(matches!(err, LedgerError::Validation(ref msg) if msg.contains("blocked")));

    // Existing entries stay editable so books can be corrected.
    engine
        .update_entry(
            owner,
            kept,
            EntryPatch {
                amount_cents: Some(150),
                ..EntryPatch::default()
            },
        )
        .unwrap();
    assert_eq!(engine.entry(owner, kept).unwrap().amount_cents, 150);
}

#[test]
fn removing_an_account_cascades_entries_and_reminders() {
    let engine = LedgerEngine::new("Cascade");
    let owner = Uuid::new_v4();
    let account = engine
        .create_account(Account::new(owner, "Doomed", 0))
        .unwrap();
    let entry = engine
        .add_entry(
            owner,
            account,
            Transaction::new(account, EntryKind::Credit, 500, date(1)),
        )
        .unwrap();
    engine
        .add_reminder(PaymentReminder::new(owner, account, date(10), "pay up"))
        .unwrap();

    engine.remove_account(owner, account).unwrap();
    assert!(matches!(
        engine.account(owner, account),
        Err(LedgerError::UnknownAccount(_))
    ));
    assert!(matches!(
        engine.entry(owner, entry),
        Err(LedgerError::UnknownTransaction(_))
    ));
    assert!(engine.reminders(owner).unwrap().is_empty());
}

#[test]
fn account_rename_updates_uniqueness_index() {
    let engine = LedgerEngine::new("Rename");
    let owner = Uuid::new_v4();
    let account = engine
        .create_account(Account::new(owner, "Old Name", 0))
        .unwrap();
    engine
        .update_account(
            owner,
            account,
            AccountChanges {
                name: Some("New Name".into()),
                contact: Some(ContactDetails {
                    email: Some("shop@example.com".into()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
        .unwrap();

    // The old name is free again, the new one is taken.
    engine
        .create_account(Account::new(owner, "Old Name", 0))
        .unwrap();
    let err = engine
        .create_account(Account::new(owner, "new name", 0))
        .expect_err("renamed-to name must be reserved");
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[test]
fn move_entry_recalculates_both_accounts() {
    let engine = LedgerEngine::new("Move");
    let owner = Uuid::new_v4();
    let from = engine
        .create_account(Account::new(owner, "From", 0))
        .unwrap();
    let to = engine.create_account(Account::new(owner, "To", 0)).unwrap();
    let entry = engine
        .add_entry(
            owner,
            from,
            Transaction::new(from, EntryKind::Credit, 300, date(5)),
        )
        .unwrap();

    engine.move_entry(owner, entry, to).unwrap();
    assert_eq!(engine.account(owner, from).unwrap().current_balance_cents, 0);
    assert_eq!(engine.account(owner, to).unwrap().current_balance_cents, 300);
    assert_eq!(engine.entry(owner, entry).unwrap().account_id, to);
}

#[test]
fn payment_status_updates_do_not_disturb_balances() {
    let engine = LedgerEngine::new("Status");
    let owner = Uuid::new_v4();
    let account = engine
        .create_account(Account::new(owner, "Statuses", 0))
        .unwrap();
    let entry = engine
        .add_entry(
            owner,
            account,
            Transaction::new(account, EntryKind::Credit, 400, date(3)).with_due_date(date(20)),
        )
        .unwrap();

    engine
        .set_payment_status(owner, entry, PaymentStatus::Paid)
        .unwrap();
    let fetched = engine.entry(owner, entry).unwrap();
    assert_eq!(fetched.payment_status, PaymentStatus::Paid);
    assert_eq!(fetched.running_balance_cents, 400);
}

#[test]
fn cashbook_totals_and_validation() {
    let engine = LedgerEngine::new("Cashbook");
    let owner = Uuid::new_v4();
    engine
        .add_cashbook_entry(CashbookEntry::new(
            owner,
            CashFlow::Income,
            10_000,
            date(1),
            "cash sale",
        ))
        .unwrap();
    let expense = engine
        .add_cashbook_entry(CashbookEntry::new(
            owner,
            CashFlow::Expense,
            2_500,
            date(2),
            "stationery",
        ))
        .unwrap();

    let err = engine
        .add_cashbook_entry(CashbookEntry::new(owner, CashFlow::Income, 0, date(3), "no-op"))
        .expect_err("zero cashbook amount must be rejected");
    assert!(matches!(err, LedgerError::InvalidAmount(0)));

    assert_eq!(engine.cashbook_total(owner).unwrap(), 7_500);

    engine
        .update_cashbook_entry(owner, expense, |entry| entry.amount_cents = 3_000)
        .unwrap();
    assert_eq!(engine.cashbook_total(owner).unwrap(), 7_000);

    engine.remove_cashbook_entry(owner, expense).unwrap();
    assert_eq!(engine.cashbook_total(owner).unwrap(), 10_000);
    assert_eq!(engine.cashbook_entries(owner).unwrap().len(), 1);
}

#[test]
fn reminders_fall_due_and_can_be_sent() {
    let engine = LedgerEngine::new("Reminders");
    let owner = Uuid::new_v4();
    let account = engine
        .create_account(Account::new(owner, "Late Payer", 0))
        .unwrap();
    let entry = engine
        .add_entry(
            owner,
            account,
            Transaction::new(account, EntryKind::Debit, 900, date(1)).with_due_date(date(8)),
        )
        .unwrap();

    let reminder = engine
        .add_reminder(
            PaymentReminder::new(owner, account, date(9), "invoice overdue").for_transaction(entry),
        )
        .unwrap();
    engine
        .add_reminder(PaymentReminder::new(owner, account, date(25), "month end"))
        .unwrap();

    let due = engine.due_reminders(owner, date(10)).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, reminder);

    engine.mark_reminder_sent(owner, reminder).unwrap();
    assert!(engine.due_reminders(owner, date(10)).unwrap().is_empty());
    let all = engine.reminders(owner).unwrap();
    assert!(all.iter().any(|r| r.id == reminder && r.sent && r.sent_at.is_some()));
}

#[test]
fn reminder_for_unknown_transaction_is_rejected() {
    let engine = LedgerEngine::new("BadReminder");
    let owner = Uuid::new_v4();
    let account = engine
        .create_account(Account::new(owner, "Account", 0))
        .unwrap();
    let missing = Uuid::new_v4();
    let err = engine
        .add_reminder(PaymentReminder::new(owner, account, date(5), "?").for_transaction(missing))
        .expect_err("reminder must reference an existing transaction");
    assert!(matches!(err, LedgerError::UnknownTransaction(id) if id == missing));
}
