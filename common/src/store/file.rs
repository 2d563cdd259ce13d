use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use super::{accumulate_stats, check_starting_balance, poisoned, wallet_not_found, SimulatorState};
use crate::config::SimulatorConfig;
use crate::directory::{
    contact_not_found, normalize_name, normalize_phone, Contact, ContactDirectory, ContactId,
};
use crate::identity::OwnerId;
use crate::wallet::{Wallet, WalletAccount, WalletTransaction};
use crate::wallet_backend::{LedgerStore, PlatformStats, TransferMeta, WalletError};

/// Durable store: the whole [`SimulatorState`] as one JSON document.
///
/// Every mutation is applied in memory and then written out via a `.tmp`
/// sibling and a rename. If the write fails the in-memory change is undone,
/// so the file and the live state never disagree about a balance.
pub struct JsonFileStore {
    path: PathBuf,
    phone_digits: usize,
    state: RwLock<SimulatorState>,
}

impl JsonFileStore {
    /// Open the snapshot at `path`, starting empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>, phone_digits: usize) -> Result<Self, WalletError> {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<SimulatorState>(&text).map_err(|e| {
                WalletError::StoreUnavailable(format!("corrupt snapshot {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SimulatorState::default(),
            Err(e) => {
                return Err(WalletError::StoreUnavailable(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        if !state.is_consistent() {
            return Err(WalletError::StoreUnavailable(format!(
                "snapshot {} violates the ledger invariant",
                path.display()
            )));
        }
        info!(
            path = %path.display(),
            wallets = state.wallets.len(),
            "opened ledger snapshot"
        );
        Ok(Self {
            path,
            phone_digits,
            state: RwLock::new(state),
        })
    }

    pub fn from_config(path: impl Into<PathBuf>, config: &SimulatorConfig) -> Result<Self, WalletError> {
        Self::open(path, config.phone_digits)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of everything currently held.
    pub fn snapshot(&self) -> Result<SimulatorState, WalletError> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, SimulatorState>, WalletError> {
        self.state.read().map_err(|_| poisoned("snapshot"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, SimulatorState>, WalletError> {
        self.state.write().map_err(|_| poisoned("snapshot"))
    }

    fn persist(&self, state: &SimulatorState) -> Result<(), WalletError> {
        let unavailable = |what: &str, e: &dyn std::fmt::Display| {
            WalletError::StoreUnavailable(format!("{what} {}: {e}", self.path.display()))
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| unavailable("failed to create dir for", &e))?;
        }
        let data = serde_json::to_vec_pretty(state).map_err(|e| unavailable("failed to encode", &e))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, data).map_err(|e| unavailable("failed to write", &e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| unavailable("failed to replace", &e))?;
        Ok(())
    }

    /// Run `f` against one wallet and persist; undo the change if persisting fails.
    fn mutate_wallet<T>(
        &self,
        owner: &OwnerId,
        f: impl FnOnce(&mut WalletAccount) -> Result<T, WalletError>,
    ) -> Result<T, WalletError> {
        let mut state = self.write()?;
        let account = state.wallets.get_mut(owner).ok_or_else(|| wallet_not_found(owner))?;
        let before = account.clone();
        let out = f(account)?;
        if let Err(e) = self.persist(&state) {
            error!(%owner, error = %e, "snapshot write failed, rolling back wallet");
            state.wallets.insert(owner.clone(), before);
            return Err(e);
        }
        Ok(out)
    }

    /// Same as [`Self::mutate_wallet`] for an owner's contact book.
    ///
    /// `f` sees the whole state so that only additions create a book.
    fn mutate_contacts<T>(
        &self,
        owner: &OwnerId,
        f: impl FnOnce(&mut SimulatorState) -> Result<T, WalletError>,
    ) -> Result<T, WalletError> {
        let mut state = self.write()?;
        let before_book = state.contacts.get(owner).cloned();
        let before_id = state.next_contact_id;
        let out = f(&mut *state)?;
        if let Err(e) = self.persist(&state) {
            error!(%owner, error = %e, "snapshot write failed, rolling back contacts");
            match before_book {
                Some(book) => state.contacts.insert(owner.clone(), book),
                None => state.contacts.remove(owner),
            };
            state.next_contact_id = before_id;
            return Err(e);
        }
        Ok(out)
    }

    /// Edit contact `id` in place; an owner without contacts has nothing to edit.
    fn edit_contact(
        &self,
        owner: &OwnerId,
        id: ContactId,
        f: impl FnOnce(&mut Contact),
    ) -> Result<Contact, WalletError> {
        self.mutate_contacts(owner, |state| {
            let contact = state
                .contacts
                .get_mut(owner)
                .and_then(|book| book.get_mut(id))
                .ok_or_else(|| contact_not_found(owner, id))?;
            f(&mut *contact);
            Ok(contact.clone())
        })
    }
}

impl LedgerStore for JsonFileStore {
    fn open_wallet(
        &self,
        owner: &OwnerId,
        starting_balance: Decimal,
    ) -> Result<(Wallet, bool), WalletError> {
        check_starting_balance(starting_balance)?;
        let mut state = self.write()?;
        if let Some(account) = state.wallets.get(owner) {
            return Ok((account.wallet.clone(), false));
        }
        let account = WalletAccount::open(owner.clone(), starting_balance);
        let wallet = account.wallet.clone();
        state.wallets.insert(owner.clone(), account);
        if let Err(e) = self.persist(&state) {
            error!(%owner, error = %e, "snapshot write failed, dropping new wallet");
            state.wallets.remove(owner);
            return Err(e);
        }
        info!(%owner, %starting_balance, "opened wallet");
        Ok((wallet, true))
    }

    fn wallet(&self, owner: &OwnerId) -> Result<Wallet, WalletError> {
        self.read()?
            .wallets
            .get(owner)
            .map(|account| account.wallet.clone())
            .ok_or_else(|| wallet_not_found(owner))
    }

    fn credit(
        &self,
        owner: &OwnerId,
        amount: Decimal,
        meta: TransferMeta,
    ) -> Result<WalletTransaction, WalletError> {
        let tx = self.mutate_wallet(owner, |account| account.apply_credit(amount, meta, Utc::now()))?;
        info!(%owner, tx_id = tx.id, amount = %tx.amount, "credit");
        Ok(tx)
    }

    fn debit(
        &self,
        owner: &OwnerId,
        amount: Decimal,
        meta: TransferMeta,
    ) -> Result<WalletTransaction, WalletError> {
        match self.mutate_wallet(owner, |account| account.apply_debit(amount, meta, Utc::now())) {
            Ok(tx) => {
                info!(%owner, tx_id = tx.id, amount = %tx.amount, "debit");
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
        self.read()?
            .wallets
            .get(owner)
            .map(|account| account.recent(limit))
            .ok_or_else(|| wallet_not_found(owner))
    }

    fn set_pin(&self, owner: &OwnerId, pin: &str) -> Result<(), WalletError> {
        self.mutate_wallet(owner, |account| account.set_pin(pin))
    }

    fn verify_pin(&self, owner: &OwnerId, pin: &str) -> Result<bool, WalletError> {
        self.read()?
            .wallets
            .get(owner)
            .map(|account| account.verify_pin(pin))
            .ok_or_else(|| wallet_not_found(owner))
    }

    fn stats(&self) -> Result<PlatformStats, WalletError> {
        accumulate_stats(self.read()?.wallets.values())
    }

    fn backend_name(&self) -> &str {
        "json-file"
    }
}

impl ContactDirectory for JsonFileStore {
    fn contacts(&self, owner: &OwnerId) -> Result<Vec<Contact>, WalletError> {
        Ok(self
            .read()?
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
        self.mutate_contacts(owner, |state| {
            let id = state.next_contact_id;
            state.next_contact_id += 1;
            let book = state.contacts.entry(owner.clone()).or_default();
            Ok(book.push(id, owner, name, phone, Utc::now()))
        })
    }

    fn find_by_name(&self, owner: &OwnerId, name: &str) -> Result<Contact, WalletError> {
        self.read()?
            .contacts
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
        self.mutate_contacts(owner, |state| {
            state
                .contacts
                .get_mut(owner)
                .and_then(|book| book.remove(id))
                .ok_or_else(|| contact_not_found(owner, id))
        })
    }
}
