use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SimulatorConfig;
use crate::currency::is_valid_amount;
use crate::intent::{IntentKind, PaymentIntent};

/// Risk label shown to the user. Ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Risk {
    Safe,
    Caution,
    Danger,
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Risk::Safe => write!(f, "SAFE"),
            Risk::Caution => write!(f, "CAUTION"),
            Risk::Danger => write!(f, "DANGER"),
        }
    }
}

/// Identifier of a classification rule that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    UntrustedLink,
    AllowlistedLink,
    RecognizedAppPayload,
    AmbiguousAmount,
    MalformedVoucher,
    UnrecognizedFormat,
    KnownContact,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::UntrustedLink => "UNTRUSTED_LINK",
            Reason::AllowlistedLink => "ALLOWLISTED_LINK",
            Reason::RecognizedAppPayload => "RECOGNIZED_APP_PAYLOAD",
            Reason::AmbiguousAmount => "AMBIGUOUS_AMOUNT",
            Reason::MalformedVoucher => "MALFORMED_VOUCHER",
            Reason::UnrecognizedFormat => "UNRECOGNIZED_FORMAT",
            Reason::KnownContact => "KNOWN_CONTACT",
        }
    }

    /// Severity this rule contributes.
    pub fn risk(self) -> Risk {
        match self {
            Reason::UntrustedLink | Reason::MalformedVoucher | Reason::UnrecognizedFormat => {
                Risk::Danger
            }
            Reason::AllowlistedLink | Reason::AmbiguousAmount => Risk::Caution,
            Reason::RecognizedAppPayload | Reason::KnownContact => Risk::Safe,
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk label plus every rule that fired, in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub risk: Risk,
    pub reasons: Vec<Reason>,
}

impl Classification {
    /// Execution is refused for anything classified `Danger`.
    pub fn is_blocked(&self) -> bool {
        self.risk == Risk::Danger
    }
}

/// Rule-based risk classifier for parsed intents.
///
/// Fails closed: an intent no rule recognizes is `Danger`.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    /// Lower-cased schemes (e.g. `upi`) or hosts (e.g. `pay.example.in`).
    allow_list: Vec<String>,
}

impl Classifier {
    pub fn new<I, S>(allow_list: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allow_list: allow_list
                .into_iter()
                .map(|entry| entry.as_ref().trim().to_ascii_lowercase())
                .filter(|entry| !entry.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &SimulatorConfig) -> Self {
        Self::new(&config.link_allow_list)
    }

    pub fn classify(&self, intent: &PaymentIntent) -> Classification {
        let mut reasons = Vec::new();
        match intent.kind {
            IntentKind::ExternalLink => reasons.push(if self.link_allowed(intent) {
                Reason::AllowlistedLink
            } else {
                Reason::UntrustedLink
            }),
            IntentKind::AppTransfer => reasons.push(if has_valid_amount(intent) {
                Reason::RecognizedAppPayload
            } else {
                Reason::AmbiguousAmount
            }),
            IntentKind::CashVoucher => reasons.push(if has_valid_amount(intent) {
                Reason::RecognizedAppPayload
            } else {
                Reason::MalformedVoucher
            }),
            IntentKind::Unknown => reasons.push(Reason::UnrecognizedFormat),
        }
        if intent.kind == IntentKind::AppTransfer && intent.matched_contact.is_some() {
            reasons.push(Reason::KnownContact);
        }

        let risk = reasons
            .iter()
            .map(|r| r.risk())
            .max()
            .unwrap_or(Risk::Danger);
        debug!(kind = ?intent.kind, %risk, ?reasons, "classified payload");
        Classification { risk, reasons }
    }

    fn link_allowed(&self, intent: &PaymentIntent) -> bool {
        if self.allow_list.is_empty() {
            return false;
        }
        let Some(url) = intent.link_target() else {
            return false;
        };
        let scheme = url.scheme().to_ascii_lowercase();
        let host = url.host_str().map(str::to_ascii_lowercase);
        self.allow_list
            .iter()
            .any(|entry| *entry == scheme || host.as_deref() == Some(entry.as_str()))
    }
}

fn has_valid_amount(intent: &PaymentIntent) -> bool {
    intent.amount.is_some_and(is_valid_amount)
}
