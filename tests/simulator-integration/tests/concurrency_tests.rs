//! Concurrent debits against one wallet never overdraw it.

use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;

use seniorsafe_common::store::MemoryStore;
use seniorsafe_common::wallet_backend::{LedgerStore, TransferMeta, WalletError};
use seniorsafe_integration::harness::TestHarness;
use seniorsafe_integration::rupees;

#[test]
fn parallel_debits_cannot_overdraw() {
    let h = TestHarness::in_memory();
    let alice = h.sign_in("alice", "Alice");

    // 16 threads × 10 debits of ₹100 against ₹10000: exactly 100 succeed.
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store: Arc<MemoryStore> = Arc::clone(&h.store);
            let owner = alice.clone();
            thread::spawn(move || {
                let mut ok = 0usize;
                for _ in 0..10 {
                    match store.debit(&owner, rupees(100), TransferMeta::new("QR payment")) {
                        Ok(_) => ok += 1,
                        Err(WalletError::InsufficientFunds { .. }) => {}
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
                ok
            })
        })
        .collect();
    let succeeded: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(succeeded, 100);
    assert_eq!(h.balance(&alice), rupees(0));
    let account = h.store.snapshot(&alice).unwrap();
    assert!(account.check_invariant());
    assert_eq!(account.ledger.len(), 100);

    let mut ids: Vec<u64> = account.ledger.iter().map(|tx| tx.id).collect();
    ids.dedup();
    assert_eq!(ids.len(), 100);
}

#[test]
fn mixed_credits_and_debits_keep_the_invariant() {
    let h = TestHarness::in_memory();
    let owners: Vec<_> = ["alice", "bob", "carol"]
        .iter()
        .map(|name| h.sign_in(name, name))
        .collect();

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let store = Arc::clone(&h.store);
            let owner = owners[i % owners.len()].clone();
            thread::spawn(move || {
                for j in 0..50 {
                    let meta = TransferMeta::new("practice");
                    if (i + j) % 3 == 0 {
                        store.credit(&owner, rupees(7), meta).unwrap();
                    } else {
                        let _ = store.debit(&owner, rupees(3), meta);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for owner in &owners {
        let account = h.store.snapshot(owner).unwrap();
        assert!(account.check_invariant(), "{owner}");
        assert_eq!(account.derive_balance(), Some(h.balance(owner)));
    }
}
