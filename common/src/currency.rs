use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::wallet_backend::WalletError;

/// Fractional digits an amount may carry (whole paise).
pub const AMOUNT_SCALE: u32 = 2;

/// Format a rupee amount for display: `₹100` for whole values, `₹99.50` otherwise.
pub fn format_amount(amount: Decimal) -> String {
    let amount = amount.normalize();
    if amount.fract().is_zero() {
        format!("₹{amount}")
    } else {
        format!("₹{amount:.2}")
    }
}

/// True when `amount` can move money: strictly positive, at most two decimals.
pub fn is_valid_amount(amount: Decimal) -> bool {
    amount > Decimal::ZERO && amount.normalize().scale() <= AMOUNT_SCALE
}

/// Check an amount handed to the ledger, returning it normalized.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, WalletError> {
    if amount <= Decimal::ZERO {
        return Err(WalletError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }
    let normalized = amount.normalize();
    if normalized.scale() > AMOUNT_SCALE {
        return Err(WalletError::InvalidAmount(format!(
            "amount {amount} has more than {AMOUNT_SCALE} decimal places"
        )));
    }
    Ok(normalized)
}

/// Read an amount out of an untrusted JSON value.
///
/// Accepts numbers and numeric strings. Anything that is not a valid transfer
/// amount (non-positive, sub-paisa, out of range, wrong type) yields `None`.
pub fn amount_from_json(value: &Value) -> Option<Decimal> {
    let parsed = match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }?;
    is_valid_amount(parsed).then(|| parsed.normalize())
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    if let Ok(value) = Decimal::from_str(text) {
        return Some(value);
    }
    // Scientific notation, limited to exponents a rupee amount can use.
    let (_, exp) = text.split_once(|c| c == 'e' || c == 'E')?;
    let exp: i32 = exp.parse().ok()?;
    if !(-28..=15).contains(&exp) {
        return None;
    }
    Decimal::from_scientific(text).ok()
}
