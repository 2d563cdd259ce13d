use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::OwnerId;
use crate::wallet_backend::WalletError;

/// Contact ids are unique within a store.
pub type ContactId = u64;

/// A named payee in an owner's contact list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub owner: OwnerId,
    pub name: String,
    /// Digits only, fixed length.
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// Name and phone used to seed a new account's contact list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSeed {
    pub name: String,
    pub phone: String,
}

/// Contacts every new account starts with.
pub fn default_contacts() -> Vec<ContactSeed> {
    vec![
        ContactSeed {
            name: "Raju Milkman".into(),
            phone: "9876543210".into(),
        },
        ContactSeed {
            name: "Priya Granddaughter".into(),
            phone: "9123456780".into(),
        },
    ]
}

/// Strip everything but ASCII digits and enforce the length policy.
pub fn normalize_phone(raw: &str, digits: usize) -> Result<String, WalletError> {
    let phone: String = raw.chars().filter(char::is_ascii_digit).collect();
    if phone.is_empty() {
        return Err(WalletError::InvalidInput("phone number is empty".into()));
    }
    if phone.len() != digits {
        return Err(WalletError::InvalidInput(format!(
            "phone number must have {digits} digits, got {}",
            phone.len()
        )));
    }
    Ok(phone)
}

/// Trim a contact name; blank names are rejected.
pub fn normalize_name(raw: &str) -> Result<String, WalletError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(WalletError::InvalidInput("contact name is empty".into()));
    }
    Ok(name.to_string())
}

/// One owner's contacts in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactBook {
    pub contacts: Vec<Contact>,
}

impl ContactBook {
    /// Append an already-normalized contact.
    pub fn push(
        &mut self,
        id: ContactId,
        owner: &OwnerId,
        name: String,
        phone: String,
        now: DateTime<Utc>,
    ) -> Contact {
        let contact = Contact {
            id,
            owner: owner.clone(),
            name,
            phone,
            created_at: now,
        };
        self.contacts.push(contact.clone());
        contact
    }

    /// Case-insensitive exact match on the trimmed name; earliest contact wins.
    pub fn find_by_name(&self, name: &str) -> Option<&Contact> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.contacts
            .iter()
            .find(|c| c.name.to_lowercase() == wanted)
    }

    pub fn get_mut(&mut self, id: ContactId) -> Option<&mut Contact> {
        self.contacts.iter_mut().find(|c| c.id == id)
    }

    pub fn remove(&mut self, id: ContactId) -> Option<Contact> {
        let idx = self.contacts.iter().position(|c| c.id == id)?;
        Some(self.contacts.remove(idx))
    }
}

/// Contact storage contract. Lists are per owner, in creation order.
pub trait ContactDirectory: Send + Sync {
    fn contacts(&self, owner: &OwnerId) -> Result<Vec<Contact>, WalletError>;

    /// Normalize and store a new contact.
    fn add_contact(&self, owner: &OwnerId, name: &str, phone: &str)
        -> Result<Contact, WalletError>;

    /// Case-insensitive exact name lookup.
    fn find_by_name(&self, owner: &OwnerId, name: &str) -> Result<Contact, WalletError>;

    fn rename_contact(
        &self,
        owner: &OwnerId,
        id: ContactId,
        name: &str,
    ) -> Result<Contact, WalletError>;

    fn update_phone(
        &self,
        owner: &OwnerId,
        id: ContactId,
        phone: &str,
    ) -> Result<Contact, WalletError>;

    fn remove_contact(&self, owner: &OwnerId, id: ContactId) -> Result<Contact, WalletError>;
}

pub(crate) fn contact_not_found(owner: &OwnerId, id: ContactId) -> WalletError {
    WalletError::NotFound(format!("contact {id} for owner {owner}"))
}
