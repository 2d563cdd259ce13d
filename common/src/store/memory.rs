use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::{check_starting_balance, poisoned, tally, wallet_not_found};
use crate::config::SimulatorConfig;
use crate::directory::{
    contact_not_found, normalize_name, normalize_phone, Contact, ContactBook, ContactDirectory,
    ContactId,
};
use crate::identity::OwnerId;
use crate::wallet::{Wallet, WalletAccount, WalletTransaction};
use crate::wallet_backend::{LedgerStore, PlatformStats, TransferMeta, WalletError};

type SharedAccount = Arc<Mutex<WalletAccount>>;

/// In-process store for tests and throwaway sessions.
///
/// Each wallet sits behind its own mutex, so the check-then-mutate in `debit`
/// is serialized per owner while other owners proceed in parallel.
pub struct MemoryStore {
    wallets: DashMap<OwnerId, SharedAccount>,
    contacts: DashMap<OwnerId, ContactBook>,
    next_contact_id: AtomicU64,
    phone_digits: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_phone_digits(SimulatorConfig::default().phone_digits)
    }

    pub fn from_config(config: &SimulatorConfig) -> Self {
        Self::with_phone_digits(config.phone_digits)
    }

    pub fn with_phone_digits(phone_digits: usize) -> Self {
        Self {
            wallets: DashMap::new(),
            contacts: DashMap::new(),
            next_contact_id: AtomicU64::new(1),
            phone_digits,
        }
    }

    /// Clone the account handle out so the map shard is released before locking.
    fn account(&self, owner: &OwnerId) -> Result<SharedAccount, WalletError> {
        self.wallets
            .get(owner)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| wallet_not_found(owner))
    }

    fn lock(account: &Mutex<WalletAccount>) -> Result<MutexGuard<'_, WalletAccount>, WalletError> {
        account.lock().map_err(|_| poisoned("wallet"))
    }

    /// Full copy of one owner's account, for invariant checks.
    pub fn snapshot(&self, owner: &OwnerId) -> Result<WalletAccount, WalletError> {
        let account = self.account(owner)?;
        let guard = Self::lock(&account)?;
        Ok(guard.clone())
    }

    /// Edit contact `id` in place. Only `add_contact` creates a book.
    fn edit_contact(
        &self,
        owner: &OwnerId,
        id: ContactId,
        f: impl FnOnce(&mut Contact),
    ) -> Result<Contact, WalletError> {
        let mut book = self
            .contacts
            .get_mut(owner)
            .ok_or_else(|| contact_not_found(owner, id))?;
        let contact = book.get_mut(id).ok_or_else(|| contact_not_found(owner, id))?;
        f(&mut *contact);
        Ok(contact.clone())
    }
}

impl LedgerStore for MemoryStore {
    fn open_wallet(
        &self,
        owner: &OwnerId,
        starting_balance: Decimal,
    ) -> Result<(Wallet, bool), WalletError> {
        check_starting_balance(starting_balance)?;
        let mut created = false;
        let account = Arc::clone(
            self.wallets
                .entry(owner.clone())
                .or_insert_with(|| {
                    created = true;
                    Arc::new(Mutex::new(WalletAccount::open(owner.clone(), starting_balance)))
                })
                .value(),
        );
        if created {
            info!(%owner, %starting_balance, "opened wallet");
        }
        let wallet = Self::lock(&account)?.wallet.clone();
        Ok((wallet, created))
    }

    fn wallet(&self, owner: &OwnerId) -> Result<Wallet, WalletError> {
        let account = self.account(owner)?;
        let guard = Self::lock(&account)?;
        Ok(guard.wallet.clone())
    }

    fn credit(
        &self,
        owner: &OwnerId,
        amount: Decimal,
        meta: TransferMeta,
    ) -> Result<WalletTransaction, WalletError> {
        let account = self.account(owner)?;
        let mut guard = Self::lock(&account)?;
        let tx = guard.apply_credit(amount, meta, Utc::now())?;
        info!(%owner, tx_id = tx.id, amount = %tx.amount, balance = %guard.wallet.balance, "credit");
        Ok(tx)
    }

    fn debit(
        &self,
        owner: &OwnerId,
        amount: Decimal,
        meta: TransferMeta,
    ) -> Result<WalletTransaction, WalletError> {
        let account = self.account(owner)?;
        let mut guard = Self::lock(&account)?;
        match guard.apply_debit(amount, meta, Utc::now()) {
            Ok(tx) => {
                info!(%owner, tx_id = tx.id, amount = %tx.amount, balance = %guard.wallet.balance, "debit");
                Ok(tx)
            }
            Err(e) => {
                warn!(%owner, %amount, error = %e, "debit rejected");
                Err(e)
            }
        }
    }

    fn transactions(
        &self,
        owner: &OwnerId,
        limit: usize,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        let account = self.account(owner)?;
        let guard = Self::lock(&account)?;
        Ok(guard.recent(limit))
    }

    fn set_pin(&self, owner: &OwnerId, pin: &str) -> Result<(), WalletError> {
        let account = self.account(owner)?;
        let mut guard = Self::lock(&account)?;
        guard.set_pin(pin)
    }

    fn verify_pin(&self, owner: &OwnerId, pin: &str) -> Result<bool, WalletError> {
        let account = self.account(owner)?;
        let guard = Self::lock(&account)?;
        Ok(guard.verify_pin(pin))
    }

    fn stats(&self) -> Result<PlatformStats, WalletError> {
        let accounts: Vec<SharedAccount> =
            self.wallets.iter().map(|e| Arc::clone(e.value())).collect();
        let mut stats = PlatformStats::default();
        for account in accounts {
            let guard = Self::lock(&account)?;
            tally(&mut stats, &guard)?;
        }
        Ok(stats)
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

impl ContactDirectory for MemoryStore {
    fn contacts(&self, owner: &OwnerId) -> Result<Vec<Contact>, WalletError> {
        Ok(self
            .contacts
            .get(owner)
            .map(|book| book.contacts.clone())
            .unwrap_or_default())
    }

    fn add_contact(
        &self,
        owner: &OwnerId,
        name: &str,
        phone: &str,
    ) -> Result<Contact, WalletError> {
        let name = normalize_name(name)?;
        let phone = normalize_phone(phone, self.phone_digits)?;
        let id: ContactId = self.next_contact_id.fetch_add(1, Ordering::Relaxed);
        let mut book = self.contacts.entry(owner.clone()).or_default();
        Ok(book.push(id, owner, name, phone, Utc::now()))
    }

    fn find_by_name(&self, owner: &OwnerId, name: &str) -> Result<Contact, WalletError> {
        self.contacts
            .get(owner)
            .and_then(|book| book.find_by_name(name).cloned())
            .ok_or_else(|| WalletError::NotFound(format!("no contact named {name:?}")))
    }

    fn rename_contact(
        &self,
        owner: &OwnerId,
        id: ContactId,
        name: &str,
    ) -> Result<Contact, WalletError> {
        let name = normalize_name(name)?;
        self.edit_contact(owner, id, |contact| contact.name = name)
    }

    fn update_phone(
        &self,
        owner: &OwnerId,
        id: ContactId,
        phone: &str,
    ) -> Result<Contact, WalletError> {
        let phone = normalize_phone(phone, self.phone_digits)?;
        self.edit_contact(owner, id, |contact| contact.phone = phone)
    }

    fn remove_contact(&self, owner: &OwnerId, id: ContactId) -> Result<Contact, WalletError> {
        self.contacts
            .get_mut(owner)
            .and_then(|mut book| book.remove(id))
            .ok_or_else(|| contact_not_found(owner, id))
    }
}
