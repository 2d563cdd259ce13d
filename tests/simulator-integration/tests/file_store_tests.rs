//! The durable store behaves like the memory store and survives restarts.

use pretty_assertions::assert_eq;

use seniorsafe_common::directory::ContactDirectory;
use seniorsafe_common::wallet_backend::LedgerStore;
use seniorsafe_integration::harness::TestHarness;
use seniorsafe_integration::{pay_payload, rupees, voucher_payload};

#[test]
fn session_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seniorsafe").join("ledger.json");

    let alice = {
        let h = TestHarness::on_disk(&path);
        let alice = h.sign_in("alice", "Alice");
        h.pay(&alice, &pay_payload("Test User", "test-user-123", Some(100)), rupees(100))
            .unwrap();
        h.pay(&alice, &voucher_payload(20), rupees(20)).unwrap();
        h.store.set_pin(&alice, "4321").unwrap();
        alice
    };

    let h = TestHarness::on_disk(&path);
    // Signing in again must not re-seed contacts or reset the balance.
    h.sign_in("alice", "Alice");
    assert_eq!(h.balance(&alice), rupees(9_920));
    assert_eq!(h.store.contacts(&alice).unwrap().len(), 2);
    assert_eq!(h.store.transactions(&alice, 50).unwrap().len(), 2);
    assert!(h.store.verify_pin(&alice, "4321").unwrap());
    assert!(!h.store.verify_pin(&alice, "1234").unwrap());
    assert!(h.store.snapshot().unwrap().is_consistent());
}

#[test]
fn contact_edits_are_durable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");

    let (alice, raju_id) = {
        let h = TestHarness::on_disk(&path);
        let alice = h.sign_in("alice", "Alice");
        let raju = h.store.find_by_name(&alice, "Raju Milkman").unwrap();
        h.store.rename_contact(&alice, raju.id, "Raju Doodhwala").unwrap();
        h.store.update_phone(&alice, raju.id, "98765-11111").unwrap();
        let priya = h.store.find_by_name(&alice, "priya granddaughter").unwrap();
        h.store.remove_contact(&alice, priya.id).unwrap();
        (alice, raju.id)
    };

    let h = TestHarness::on_disk(&path);
    let contacts = h.store.contacts(&alice).unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].id, raju_id);
    assert_eq!(contacts[0].name, "Raju Doodhwala");
    assert_eq!(contacts[0].phone, "9876511111");
}
