use std::path::Path;
use std::sync::Arc;

use rust_decimal::Decimal;

use seniorsafe_common::classify::{Classification, Classifier};
use seniorsafe_common::config::SimulatorConfig;
use seniorsafe_common::directory::ContactDirectory;
use seniorsafe_common::identity::{OwnerId, SessionProfile};
use seniorsafe_common::intent::{parse_payload, resolve_counterparty, PaymentIntent};
use seniorsafe_common::session::start_session;
use seniorsafe_common::store::{JsonFileStore, MemoryStore};
use seniorsafe_common::transfer::TransferExecutor;
use seniorsafe_common::wallet::WalletTransaction;
use seniorsafe_common::wallet_backend::{LedgerStore, WalletError};

/// A store plus the config and classifier every front end builds around it.
pub struct TestHarness<S> {
    pub store: Arc<S>,
    pub config: SimulatorConfig,
    pub classifier: Classifier,
}

impl TestHarness<MemoryStore> {
    pub fn in_memory() -> Self {
        Self::in_memory_with(SimulatorConfig::default())
    }

    pub fn in_memory_with(config: SimulatorConfig) -> Self {
        crate::init_tracing();
        Self {
            store: Arc::new(MemoryStore::from_config(&config)),
            classifier: Classifier::from_config(&config),
            config,
        }
    }
}

impl TestHarness<JsonFileStore> {
    /// Open (or reopen) a file-backed harness at `path`.
    pub fn on_disk(path: &Path) -> Self {
        crate::init_tracing();
        let config = SimulatorConfig::default();
        Self {
            store: Arc::new(JsonFileStore::from_config(path, &config).unwrap()),
            classifier: Classifier::from_config(&config),
            config,
        }
    }
}

impl<S: LedgerStore + ContactDirectory> TestHarness<S> {
    /// Start a session the way the identity hand-off does.
    pub fn sign_in(&self, owner: &str, name: &str) -> OwnerId {
        let profile = SessionProfile {
            owner_id: OwnerId::from(owner),
            display_name: name.to_string(),
        };
        start_session(&*self.store, &self.config, &profile).unwrap();
        profile.owner_id
    }

    /// Parse, resolve and classify one payload.
    pub fn scan(&self, owner: &OwnerId, raw: &str) -> (PaymentIntent, Classification) {
        let intent = resolve_counterparty(&*self.store, owner, parse_payload(raw));
        let verdict = self.classifier.classify(&intent);
        (intent, verdict)
    }

    /// Scan then execute with `amount`.
    pub fn pay(
        &self,
        owner: &OwnerId,
        raw: &str,
        amount: Decimal,
    ) -> Result<WalletTransaction, WalletError> {
        let (intent, _) = self.scan(owner, raw);
        TransferExecutor::new(&*self.store, &self.classifier).execute(owner, &intent, amount)
    }

    /// Same as [`Self::pay`] with a PIN entered.
    pub fn pay_with_pin(
        &self,
        owner: &OwnerId,
        raw: &str,
        amount: Decimal,
        pin: &str,
    ) -> Result<WalletTransaction, WalletError> {
        let (intent, _) = self.scan(owner, raw);
        TransferExecutor::new(&*self.store, &self.classifier)
            .with_pin(pin)
            .execute(owner, &intent, amount)
    }

    pub fn balance(&self, owner: &OwnerId) -> Decimal {
        self.store.balance(owner).unwrap()
    }
}
