//! Ledger and contact storage backends.
//!
//! Both backends drive the same [`WalletAccount`] and [`ContactBook`] state
//! machines; they differ only in locking and durability.

mod file;
mod memory;

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::directory::{ContactBook, ContactId};
use crate::identity::OwnerId;
use crate::wallet::WalletAccount;
use crate::wallet_backend::{PlatformStats, WalletError};

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Everything a store holds, in serializable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorState {
    #[serde(default)]
    pub wallets: BTreeMap<OwnerId, WalletAccount>,
    #[serde(default)]
    pub contacts: BTreeMap<OwnerId, ContactBook>,
    #[serde(default = "first_contact_id")]
    pub next_contact_id: ContactId,
}

fn first_contact_id() -> ContactId {
    1
}

impl Default for SimulatorState {
    fn default() -> Self {
        Self {
            wallets: BTreeMap::new(),
            contacts: BTreeMap::new(),
            next_contact_id: first_contact_id(),
        }
    }
}

impl SimulatorState {
    pub fn stats(&self) -> Result<PlatformStats, WalletError> {
        accumulate_stats(self.wallets.values())
    }

    /// Every wallet satisfies the ledger invariant.
    pub fn is_consistent(&self) -> bool {
        self.wallets.values().all(WalletAccount::check_invariant)
    }
}

pub(crate) fn accumulate_stats<'a>(
    accounts: impl Iterator<Item = &'a WalletAccount>,
) -> Result<PlatformStats, WalletError> {
    let mut stats = PlatformStats::default();
    for acct in accounts {
        tally(&mut stats, acct)?;
    }
    Ok(stats)
}

pub(crate) fn tally(stats: &mut PlatformStats, acct: &WalletAccount) -> Result<(), WalletError> {
    stats.total_balance = stats
        .total_balance
        .checked_add(acct.wallet.balance)
        .ok_or_else(|| {
            WalletError::StoreUnavailable("total balance exceeds the representable range".into())
        })?;
    stats.total_users += 1;
    stats.total_transactions += acct.ledger.len();
    Ok(())
}

pub(crate) fn wallet_not_found(owner: &OwnerId) -> WalletError {
    WalletError::NotFound(format!("no wallet for owner {owner}"))
}

pub(crate) fn check_starting_balance(balance: Decimal) -> Result<(), WalletError> {
    if balance < Decimal::ZERO {
        return Err(WalletError::InvalidAmount(format!(
            "starting balance must not be negative, got {balance}"
        )));
    }
    Ok(())
}

pub(crate) fn poisoned(what: &str) -> WalletError {
    WalletError::StoreUnavailable(format!("{what} lock poisoned"))
}
