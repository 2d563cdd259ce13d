use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::currency::validate_amount;
use crate::identity::OwnerId;
use crate::wallet_backend::{TransferMeta, WalletError};

/// A single wallet transaction (credit or debit) in the simulated ledger.
///
/// Entries are immutable once appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    /// Monotonic per wallet, starting at 1.
    pub id: u64,
    pub owner: OwnerId,
    pub kind: TransactionKind,
    /// Always positive; the sign lives in `kind`.
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_name: Option<String>,
    pub description: String,
    /// Format: "{owner}:{timestamp_millis}:{id}"
    pub tx_ref: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Credit,
    Debit,
}

/// One wallet per owner. The balance never goes below zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub owner: OwnerId,
    pub balance: Decimal,
    /// Salted SHA-256 hex digest; the PIN itself is never stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_hash: Option<String>,
}

impl Wallet {
    pub fn has_pin(&self) -> bool {
        self.pin_hash.is_some()
    }
}

/// A wallet together with its append-only ledger.
///
/// Every store keeps one of these per owner and changes the balance only via
/// [`WalletAccount::apply_credit`] and [`WalletAccount::apply_debit`], which
/// move the balance and append the matching entry in the same step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalletAccount {
    pub wallet: Wallet,
    /// Balance the wallet was opened with.
    pub initial_balance: Decimal,
    /// Oldest first.
    #[serde(default)]
    pub ledger: Vec<WalletTransaction>,
    pub next_tx_id: u64,
}

impl WalletAccount {
    pub fn open(owner: OwnerId, starting_balance: Decimal) -> Self {
        Self {
            wallet: Wallet {
                owner,
                balance: starting_balance,
                pin_hash: None,
            },
            initial_balance: starting_balance,
            ledger: Vec::new(),
            next_tx_id: 1,
        }
    }

    pub fn apply_credit(
        &mut self,
        amount: Decimal,
        meta: TransferMeta,
        now: DateTime<Utc>,
    ) -> Result<WalletTransaction, WalletError> {
        let amount = validate_amount(amount)?;
        let balance = self.wallet.balance.checked_add(amount).ok_or_else(|| {
            WalletError::InvalidAmount(format!("crediting {amount} overflows the balance"))
        })?;
        self.wallet.balance = balance;
        Ok(self.append(TransactionKind::Credit, amount, meta, now))
    }

    pub fn apply_debit(
        &mut self,
        amount: Decimal,
        meta: TransferMeta,
        now: DateTime<Utc>,
    ) -> Result<WalletTransaction, WalletError> {
        let amount = validate_amount(amount)?;
        if amount > self.wallet.balance {
            return Err(WalletError::InsufficientFunds {
                available: self.wallet.balance,
                requested: amount,
            });
        }
        self.wallet.balance -= amount;
        Ok(self.append(TransactionKind::Debit, amount, meta, now))
    }

    fn append(
        &mut self,
        kind: TransactionKind,
        amount: Decimal,
        meta: TransferMeta,
        now: DateTime<Utc>,
    ) -> WalletTransaction {
        let id = self.next_tx_id;
        self.next_tx_id += 1;
        let tx = WalletTransaction {
            id,
            owner: self.wallet.owner.clone(),
            kind,
            amount,
            counterparty_name: meta.counterparty_name,
            description: meta.description,
            tx_ref: format!("{}:{}:{}", self.wallet.owner, now.timestamp_millis(), id),
            created_at: now,
        };
        self.ledger.push(tx.clone());
        tx
    }

    /// Newest `limit` entries, most recent first.
    pub fn recent(&self, limit: usize) -> Vec<WalletTransaction> {
        self.ledger.iter().rev().take(limit).cloned().collect()
    }

    /// Balance implied by the opening balance plus every ledger entry.
    /// `None` when the running total leaves the representable range.
    pub fn derive_balance(&self) -> Option<Decimal> {
        self.ledger
            .iter()
            .try_fold(self.initial_balance, |acc, tx| match tx.kind {
                TransactionKind::Credit => acc.checked_add(tx.amount),
                TransactionKind::Debit => acc.checked_sub(tx.amount),
            })
    }

    /// Σcredits − Σdebits must equal balance − initial balance, and the balance
    /// must be non-negative. An overflowing ledger is never consistent.
    pub fn check_invariant(&self) -> bool {
        self.wallet.balance >= Decimal::ZERO
            && self.derive_balance() == Some(self.wallet.balance)
    }

    pub fn set_pin(&mut self, pin: &str) -> Result<(), WalletError> {
        if !is_valid_pin(pin) {
            return Err(WalletError::InvalidInput(
                "PIN must be 4 or 6 digits".to_string(),
            ));
        }
        self.wallet.pin_hash = Some(hash_pin(&self.wallet.owner, pin));
        Ok(())
    }

    pub fn verify_pin(&self, pin: &str) -> bool {
        match &self.wallet.pin_hash {
            Some(stored) => *stored == hash_pin(&self.wallet.owner, pin),
            None => false,
        }
    }
}

fn is_valid_pin(pin: &str) -> bool {
    matches!(pin.len(), 4 | 6) && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Salted digest of a wallet PIN. The owner id is the salt.
pub fn hash_pin(owner: &OwnerId, pin: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(owner.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(pin.as_bytes());
    format!("{:x}", hasher.finalize())
}
