//! QR payload parsing.
//!
//! Turns whatever a scan or paste produced into a [`PaymentIntent`]. Parsing
//! is total: hostile or malformed input degrades to [`IntentKind::Unknown`]
//! with the raw text preserved, never to an error.
//!
//! Recognized wire shape (unknown fields ignored):
//!
//! ```json
//! { "type": "SENIORSAFE_PAY", "amount": 100, "name": "Test User",
//!   "userId": "test-user-123", "timestamp": 1700000000000 }
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::currency::amount_from_json;
use crate::directory::{ContactDirectory, ContactId};
use crate::identity::OwnerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentKind {
    AppTransfer,
    CashVoucher,
    ExternalLink,
    Unknown,
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IntentKind::AppTransfer => "APP_TRANSFER",
            IntentKind::CashVoucher => "CASH_VOUCHER",
            IntentKind::ExternalLink => "EXTERNAL_LINK",
            IntentKind::Unknown => "UNKNOWN",
        })
    }
}

/// What the payload asks the user to do. Decides the ledger direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentRole {
    /// Pay the named counterparty.
    PayTo,
    /// The counterparty is requesting money from the user.
    RequestFrom,
    /// Redeem a voucher into the wallet.
    Redeem,
}

/// Why a payload fell back to [`IntentKind::Unknown`]. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseDegraded {
    Empty,
    NotStructured,
    MissingType,
    UnrecognizedType(String),
}

/// A structured interpretation of one scanned payload. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub kind: IntentKind,
    pub role: Option<IntentRole>,
    pub amount: Option<Decimal>,
    pub counterparty_name: Option<String>,
    pub counterparty_id: Option<String>,
    pub raw_payload: String,
    pub issued_at: Option<DateTime<Utc>>,
    /// Set by [`resolve_counterparty`] when the name matched a saved contact.
    pub matched_contact: Option<ContactId>,
    pub degraded: Option<ParseDegraded>,
}

impl PaymentIntent {
    fn bare(kind: IntentKind, raw: &str) -> Self {
        Self {
            kind,
            role: None,
            amount: None,
            counterparty_name: None,
            counterparty_id: None,
            raw_payload: raw.to_string(),
            issued_at: None,
            matched_contact: None,
            degraded: None,
        }
    }

    fn unknown(raw: &str, why: ParseDegraded) -> Self {
        debug!(?why, len = raw.len(), "payload degraded to unknown");
        Self {
            degraded: Some(why),
            ..Self::bare(IntentKind::Unknown, raw)
        }
    }

    /// The link target of an `ExternalLink` intent.
    pub fn link_target(&self) -> Option<Url> {
        if self.kind != IntentKind::ExternalLink {
            return None;
        }
        parse_link(self.raw_payload.trim())
    }
}

/// Structured `type` values the app itself emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadType {
    Pay,
    Request,
    Cash,
}

impl PayloadType {
    /// Checked in order; matching ignores ASCII case.
    const TAGS: &'static [(&'static str, PayloadType)] = &[
        ("SENIORSAFE_PAY", PayloadType::Pay),
        ("PAY", PayloadType::Pay),
        ("SENIORSAFE_REQUEST", PayloadType::Request),
        ("REQUEST", PayloadType::Request),
        ("SENIORSAFE_CASH", PayloadType::Cash),
        ("CASH_VOUCHER", PayloadType::Cash),
        ("CASH", PayloadType::Cash),
    ];

    fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::TAGS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(tag))
            .map(|(_, t)| *t)
    }
}

/// Wire record. Every field is loosely typed so a bad field degrades to
/// "absent" instead of failing the whole decode.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct QrPayload {
    #[serde(rename = "type")]
    payload_type: Option<Value>,
    amount: Option<Value>,
    name: Option<Value>,
    user_id: Option<Value>,
    id: Option<Value>,
    timestamp: Option<Value>,
    issued_at: Option<Value>,
}

impl QrPayload {
    fn into_intent(self, raw: &str) -> PaymentIntent {
        let tag = match self.payload_type {
            Some(Value::String(tag)) => tag,
            Some(other) => {
                return PaymentIntent::unknown(
                    raw,
                    ParseDegraded::UnrecognizedType(other.to_string()),
                )
            }
            None => return PaymentIntent::unknown(raw, ParseDegraded::MissingType),
        };
        let Some(payload_type) = PayloadType::from_tag(&tag) else {
            return PaymentIntent::unknown(raw, ParseDegraded::UnrecognizedType(tag));
        };
        let amount = self.amount.as_ref().and_then(amount_from_json);
        match payload_type {
            PayloadType::Cash => PaymentIntent {
                role: Some(IntentRole::Redeem),
                amount,
                ..PaymentIntent::bare(IntentKind::CashVoucher, raw)
            },
            PayloadType::Pay | PayloadType::Request => PaymentIntent {
                role: Some(if payload_type == PayloadType::Pay {
                    IntentRole::PayTo
                } else {
                    IntentRole::RequestFrom
                }),
                amount,
                counterparty_name: self.name.as_ref().and_then(text_field),
                counterparty_id: self
                    .user_id
                    .as_ref()
                    .and_then(id_field)
                    .or_else(|| self.id.as_ref().and_then(id_field)),
                issued_at: self
                    .timestamp
                    .as_ref()
                    .and_then(millis_field)
                    .or_else(|| self.issued_at.as_ref().and_then(millis_field)),
                ..PaymentIntent::bare(IntentKind::AppTransfer, raw)
            },
        }
    }
}

fn text_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn id_field(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        other => text_field(other),
    }
}

fn millis_field(value: &Value) -> Option<DateTime<Utc>> {
    let millis = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        _ => return None,
    };
    DateTime::from_timestamp_millis(millis)
}

/// Absolute URL with a real scheme, or a bare `www.` host.
fn parse_link(text: &str) -> Option<Url> {
    if text.is_empty() || text.chars().any(char::is_whitespace) {
        return None;
    }
    let has_www = text
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("www."));
    if has_www {
        return Url::parse(&format!("http://{text}")).ok();
    }
    Url::parse(text).ok().filter(|url| url.scheme().len() >= 2)
}

/// Interpret raw scanned or pasted text. Never fails.
pub fn parse_payload(raw: &str) -> PaymentIntent {
    let text = raw.trim();
    if text.is_empty() {
        return PaymentIntent::unknown(raw, ParseDegraded::Empty);
    }
    // Link forms win over structured decode; JSON text never parses as a URL.
    if parse_link(text).is_some() {
        return PaymentIntent::bare(IntentKind::ExternalLink, raw);
    }
    // Only a top-level object is a record.
    let record = match serde_json::from_str::<Value>(text) {
        Ok(record @ Value::Object(_)) => record,
        _ => return PaymentIntent::unknown(raw, ParseDegraded::NotStructured),
    };
    match serde_json::from_value::<QrPayload>(record) {
        Ok(payload) => payload.into_intent(raw),
        Err(_) => PaymentIntent::unknown(raw, ParseDegraded::NotStructured),
    }
}

/// Attach the saved contact matching the intent's counterparty name.
///
/// Only app transfers are resolved, and only when the payload carried a
/// name. A payload-supplied id is kept as is; otherwise the contact's phone
/// becomes the counterparty id. Lookup failures leave the intent unchanged.
pub fn resolve_counterparty<D>(
    directory: &D,
    owner: &OwnerId,
    intent: PaymentIntent,
) -> PaymentIntent
where
    D: ContactDirectory + ?Sized,
{
    if intent.kind != IntentKind::AppTransfer {
        return intent;
    }
    let Some(name) = intent.counterparty_name.as_deref() else {
        return intent;
    };
    match directory.find_by_name(owner, name) {
        Ok(contact) => PaymentIntent {
            counterparty_id: intent.counterparty_id.clone().or(Some(contact.phone)),
            matched_contact: Some(contact.id),
            ..intent
        },
        Err(_) => intent,
    }
}
