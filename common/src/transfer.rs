use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::classify::Classifier;
use crate::currency::validate_amount;
use crate::identity::OwnerId;
use crate::intent::{IntentKind, IntentRole, PaymentIntent};
use crate::wallet::WalletTransaction;
use crate::wallet_backend::{LedgerStore, TransferMeta, WalletError};

/// Applies a user-confirmed intent to the ledger.
///
/// Re-classifies every intent it is given and refuses anything `Danger`,
/// whatever the caller decided.
///
/// Wallets protected by a PIN also need the PIN, see [`Self::with_pin`].
pub struct TransferExecutor<'a, L: LedgerStore + ?Sized> {
    ledger: &'a L,
    classifier: &'a Classifier,
    pin: Option<&'a str>,
}

impl<'a, L: LedgerStore + ?Sized> TransferExecutor<'a, L> {
    pub fn new(ledger: &'a L, classifier: &'a Classifier) -> Self {
        Self {
            ledger,
            classifier,
            pin: None,
        }
    }

    /// PIN entered by the user for this payment.
    pub fn with_pin(mut self, pin: &'a str) -> Self {
        self.pin = Some(pin);
        self
    }

    /// Debit for transfers and requests, credit for vouchers.
    ///
    /// `confirmed_amount` must match the payload amount when the payload had
    /// one; when it did not, the user's amount is authoritative.
    pub fn execute(
        &self,
        owner: &OwnerId,
        intent: &PaymentIntent,
        confirmed_amount: Decimal,
    ) -> Result<WalletTransaction, WalletError> {
        if !matches!(intent.kind, IntentKind::AppTransfer | IntentKind::CashVoucher) {
            warn!(%owner, kind = %intent.kind, "refused to execute non-payment intent");
            return Err(WalletError::BlockedIntent(format!(
                "{} payloads cannot be paid",
                intent.kind
            )));
        }
        let classification = self.classifier.classify(intent);
        if classification.is_blocked() {
            let reasons: Vec<&str> = classification.reasons.iter().map(|r| r.as_str()).collect();
            warn!(%owner, ?reasons, "refused to execute dangerous intent");
            return Err(WalletError::BlockedIntent(format!(
                "payload classified {} ({})",
                classification.risk,
                reasons.join(", ")
            )));
        }

        let amount = validate_amount(confirmed_amount)?;
        if let Some(expected) = intent.amount {
            if expected.normalize() != amount {
                return Err(WalletError::InvalidAmount(format!(
                    "confirmed amount {amount} does not match payload amount {expected}"
                )));
            }
        }

        if let Err(e) = self.ledger.authorize(owner, self.pin) {
            warn!(%owner, error = %e, "payment not authorized");
            return Err(e);
        }

        let tx = match intent.kind {
            IntentKind::CashVoucher => self.ledger.credit(owner, amount, voucher_meta())?,
            _ => self.ledger.debit(owner, amount, payment_meta(intent))?,
        };
        info!(%owner, tx_id = tx.id, kind = ?tx.kind, amount = %tx.amount, "executed intent");
        Ok(tx)
    }
}

fn voucher_meta() -> TransferMeta {
    TransferMeta::new("Cash voucher redeemed")
}

fn payment_meta(intent: &PaymentIntent) -> TransferMeta {
    match intent.counterparty_name.as_deref() {
        Some(name) => {
            let description = match intent.role {
                Some(IntentRole::RequestFrom) => format!("Paid request from {name}"),
                _ => format!("Paid to {name}"),
            };
            TransferMeta::new(description).with_counterparty(name)
        }
        None => TransferMeta::new("QR payment"),
    }
}
