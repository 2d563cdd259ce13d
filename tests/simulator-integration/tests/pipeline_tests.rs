//! Scan → classify → confirm → execute, end to end against the memory store.

use pretty_assertions::assert_eq;

use seniorsafe_common::classify::{Reason, Risk};
use seniorsafe_common::directory::ContactDirectory;
use seniorsafe_common::intent::IntentKind;
use seniorsafe_common::wallet::TransactionKind;
use seniorsafe_common::wallet_backend::{LedgerStore, WalletError};
use seniorsafe_integration::harness::TestHarness;
use seniorsafe_integration::{pay_payload, request_payload, rupees, voucher_payload};

#[test]
fn paying_a_recognized_payload_debits_and_lists_first() {
    let h = TestHarness::in_memory();
    let alice = h.sign_in("alice", "Alice");
    let raw = pay_payload("Test User", "test-user-123", Some(100));

    let (intent, verdict) = h.scan(&alice, &raw);
    assert_eq!(intent.kind, IntentKind::AppTransfer);
    assert_eq!(verdict.risk, Risk::Safe);
    assert_eq!(verdict.reasons, vec![Reason::RecognizedAppPayload]);

    h.pay(&alice, &raw, rupees(100)).unwrap();
    assert_eq!(h.balance(&alice), rupees(9_900));

    let history = h.store.transactions(&alice, 50).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, TransactionKind::Debit);
    assert_eq!(history[0].amount, rupees(100));
    assert_eq!(history[0].counterparty_name.as_deref(), Some("Test User"));
}

#[test]
fn voucher_redemption_credits() {
    let h = TestHarness::in_memory();
    let alice = h.sign_in("alice", "Alice");
    let tx = h.pay(&alice, &voucher_payload(50), rupees(50)).unwrap();
    assert_eq!(tx.kind, TransactionKind::Credit);
    assert_eq!(tx.description, "Cash voucher redeemed");
    assert_eq!(h.balance(&alice), rupees(10_050));
}

#[test]
fn history_lists_newest_first_and_is_repeatable() {
    let h = TestHarness::in_memory();
    let alice = h.sign_in("alice", "Alice");
    h.pay(&alice, &pay_payload("Raju Milkman", "raju", Some(40)), rupees(40))
        .unwrap();
    h.pay(&alice, &voucher_payload(10), rupees(10)).unwrap();
    h.pay(&alice, &request_payload("Priya Granddaughter", 25), rupees(25))
        .unwrap();

    let first = h.store.transactions(&alice, 50).unwrap();
    let second = h.store.transactions(&alice, 50).unwrap();
    assert_eq!(first, second);
    let descriptions: Vec<&str> = first.iter().map(|tx| tx.description.as_str()).collect();
    assert_eq!(
        descriptions,
        vec![
            "Paid request from Priya Granddaughter",
            "Cash voucher redeemed",
            "Paid to Raju Milkman",
        ]
    );
    assert_eq!(h.store.transactions(&alice, 2).unwrap().len(), 2);
    assert_eq!(h.balance(&alice), rupees(9_945));
}

#[test]
fn fake_payment_link_is_danger_and_cannot_execute() {
    let h = TestHarness::in_memory();
    let alice = h.sign_in("alice", "Alice");
    let (intent, verdict) = h.scan(&alice, "http://fakepayment.com");
    assert_eq!(intent.kind, IntentKind::ExternalLink);
    assert_eq!(verdict.risk, Risk::Danger);
    assert_eq!(verdict.reasons, vec![Reason::UntrustedLink]);

    let err = h.pay(&alice, "http://fakepayment.com", rupees(100)).unwrap_err();
    assert!(matches!(err, WalletError::BlockedIntent(_)));
    assert_eq!(h.balance(&alice), rupees(10_000));
    assert!(h.store.transactions(&alice, 50).unwrap().is_empty());
}

#[test]
fn missing_amount_needs_user_confirmation() {
    let h = TestHarness::in_memory();
    let alice = h.sign_in("alice", "Alice");
    let raw = pay_payload("Test User", "test-user-123", None);
    let (intent, verdict) = h.scan(&alice, &raw);
    assert_eq!(intent.amount, None);
    assert_eq!(verdict.risk, Risk::Caution);
    assert_eq!(verdict.reasons, vec![Reason::AmbiguousAmount]);

    h.pay(&alice, &raw, rupees(75)).unwrap();
    assert_eq!(h.balance(&alice), rupees(9_925));
}

#[test]
fn saved_contact_is_recognized() {
    let h = TestHarness::in_memory();
    let alice = h.sign_in("alice", "Alice");
    let (intent, verdict) = h.scan(&alice, &pay_payload("raju milkman", "", Some(30)));
    assert!(intent.matched_contact.is_some());
    assert_eq!(verdict.risk, Risk::Safe);
    assert!(verdict.reasons.contains(&Reason::KnownContact));
}

#[test]
fn overdraft_is_refused_without_side_effects() {
    let h = TestHarness::in_memory();
    let alice = h.sign_in("alice", "Alice");
    let raw = pay_payload("Test User", "test-user-123", Some(10_001));
    let err = h.pay(&alice, &raw, rupees(10_001)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "insufficient balance: have 10000, need 10001"
    );
    assert_eq!(h.balance(&alice), rupees(10_000));
}

#[test]
fn accounts_are_isolated() {
    let h = TestHarness::in_memory();
    let alice = h.sign_in("alice", "Alice");
    let bob = h.sign_in("bob", "Bob");
    h.pay(&alice, &voucher_payload(500), rupees(500)).unwrap();
    h.store.add_contact(&bob, "Sharma Uncle", "90000 00001").unwrap();

    assert_eq!(h.balance(&bob), rupees(10_000));
    assert_eq!(h.store.contacts(&alice).unwrap().len(), 2);
    assert_eq!(h.store.contacts(&bob).unwrap().len(), 3);

    let stats = h.store.stats().unwrap();
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.total_balance, rupees(20_500));
    assert_eq!(stats.total_transactions, 1);
}

#[test]
fn pin_gates_payments_once_set() {
    let h = TestHarness::in_memory();
    let alice = h.sign_in("alice", "Alice");
    h.store.set_pin(&alice, "123456").unwrap();
    let raw = pay_payload("Test User", "test-user-123", Some(100));

    assert!(matches!(
        h.pay(&alice, &raw, rupees(100)),
        Err(WalletError::InvalidInput(_))
    ));
    assert_eq!(
        h.pay_with_pin(&alice, &raw, rupees(100), "654321").unwrap_err(),
        WalletError::InvalidInput("incorrect PIN".into())
    );
    assert_eq!(h.balance(&alice), rupees(10_000));

    h.pay_with_pin(&alice, &raw, rupees(100), "123456").unwrap();
    assert_eq!(h.balance(&alice), rupees(9_900));
}

#[test]
fn oversized_vouchers_do_not_break_stats() {
    let h = TestHarness::in_memory();
    let raw = serde_json::json!({ "type": "cash", "amount": "50000000000000000000000000000" })
        .to_string();
    for name in ["alice", "bob"] {
        let owner = h.sign_in(name, name);
        let (intent, _) = h.scan(&owner, &raw);
        let amount = intent.amount.unwrap();
        h.pay(&owner, &raw, amount).unwrap();
    }
    assert!(matches!(
        h.store.stats(),
        Err(WalletError::StoreUnavailable(_))
    ));
}
