use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::OwnerId;
use crate::wallet::{Wallet, WalletTransaction};

/// Errors from ledger, contact and transfer operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("insufficient balance: have {available}, need {requested}")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("payment blocked: {0}")]
    BlockedIntent(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Caller-supplied details recorded on a new ledger entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransferMeta {
    pub counterparty_name: Option<String>,
    pub description: String,
}

impl TransferMeta {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            counterparty_name: None,
            description: description.into(),
        }
    }

    pub fn with_counterparty(mut self, name: impl Into<String>) -> Self {
        self.counterparty_name = Some(name.into());
        self
    }
}

/// Aggregate numbers across every wallet in a store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStats {
    pub total_users: usize,
    pub total_balance: Decimal,
    pub total_transactions: usize,
}

/// Abstraction over ledger backends (in-memory vs JSON snapshot file).
///
/// `credit` and `debit` are the only balance mutations. Each one updates the
/// balance and appends its transaction as a single unit: either both are
/// visible afterwards or neither is. Calls for the same owner are serialized
/// so the balance check in `debit` never reads stale data.
pub trait LedgerStore: Send + Sync {
    /// Get-or-create the owner's wallet. The flag is `true` when this call created it.
    fn open_wallet(
        &self,
        owner: &OwnerId,
        starting_balance: Decimal,
    ) -> Result<(Wallet, bool), WalletError>;

    /// Current wallet record.
    fn wallet(&self, owner: &OwnerId) -> Result<Wallet, WalletError>;

    /// Current balance.
    fn balance(&self, owner: &OwnerId) -> Result<Decimal, WalletError> {
        self.wallet(owner).map(|w| w.balance)
    }

    /// Add funds and append a credit entry.
    fn credit(
        &self,
        owner: &OwnerId,
        amount: Decimal,
        meta: TransferMeta,
    ) -> Result<WalletTransaction, WalletError>;

    /// Remove funds and append a debit entry. Fails without side effects when
    /// `amount` exceeds the balance.
    fn debit(
        &self,
        owner: &OwnerId,
        amount: Decimal,
        meta: TransferMeta,
    ) -> Result<WalletTransaction, WalletError>;

    /// Snapshot of the newest `limit` entries, most recent first.
    fn transactions(
        &self,
        owner: &OwnerId,
        limit: usize,
    ) -> Result<Vec<WalletTransaction>, WalletError>;

    /// Set or replace the wallet PIN.
    fn set_pin(&self, owner: &OwnerId, pin: &str) -> Result<(), WalletError>;

    /// Check a PIN attempt. Always `false` when no PIN is set.
    fn verify_pin(&self, owner: &OwnerId, pin: &str) -> Result<bool, WalletError>;

    /// Payment precondition: once a wallet has a PIN, money only moves with it.
    fn authorize(&self, owner: &OwnerId, pin: Option<&str>) -> Result<(), WalletError> {
        if !self.wallet(owner)?.has_pin() {
            return Ok(());
        }
        match pin {
            None => Err(WalletError::InvalidInput(
                "this wallet has a PIN; enter it to pay".into(),
            )),
            Some(pin) if self.verify_pin(owner, pin)? => Ok(()),
            Some(_) => Err(WalletError::InvalidInput("incorrect PIN".into())),
        }
    }

    /// Totals across all wallets.
    fn stats(&self) -> Result<PlatformStats, WalletError>;

    /// Human-readable backend name (e.g. "memory", "json-file").
    fn backend_name(&self) -> &str;
}
