//! Simulator configuration.
//!
//! Loaded from a TOML file; every field has a default, so a missing file or
//! an empty one yields the demo setup (₹10000 starting balance, two seeded
//! contacts, no trusted links).

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::directory::{default_contacts, ContactSeed};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Fake money every new wallet starts with.
    #[serde(default = "default_starting_balance")]
    pub starting_balance: Decimal,

    /// Required length of a normalized contact phone number.
    #[serde(default = "default_phone_digits")]
    pub phone_digits: usize,

    /// Default number of entries shown in transaction history.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Link schemes or hosts that are downgraded from DANGER to CAUTION.
    #[serde(default)]
    pub link_allow_list: Vec<String>,

    /// Contacts seeded into every new account.
    #[serde(default = "default_contacts")]
    pub default_contacts: Vec<ContactSeed>,

    /// Durable JSON snapshot. Front ends pick a default location when unset.
    #[serde(default)]
    pub data_file: Option<PathBuf>,
}

fn default_starting_balance() -> Decimal {
    Decimal::from(10_000)
}

fn default_phone_digits() -> usize {
    10
}

fn default_history_limit() -> usize {
    50
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            starting_balance: default_starting_balance(),
            phone_digits: default_phone_digits(),
            history_limit: default_history_limit(),
            link_allow_list: Vec::new(),
            default_contacts: default_contacts(),
            data_file: None,
        }
    }
}

impl SimulatorConfig {
    /// Parse and validate TOML text.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`; a file that does not exist yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.starting_balance < Decimal::ZERO {
            return Err(ConfigError::Invalid(
                "starting_balance must not be negative".into(),
            ));
        }
        if self.phone_digits == 0 {
            return Err(ConfigError::Invalid("phone_digits must be at least 1".into()));
        }
        Ok(())
    }
}
