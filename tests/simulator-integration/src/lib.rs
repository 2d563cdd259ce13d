use rust_decimal::Decimal;
use serde_json::json;

pub mod harness;

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Payload the app shows on a "receive money" screen.
pub fn pay_payload(name: &str, user_id: &str, amount: Option<u64>) -> String {
    let mut payload = json!({
        "type": "SENIORSAFE_PAY",
        "userId": user_id,
        "name": name,
        "email": format!("{}@example.com", user_id),
        "picture": null,
        "timestamp": 1_700_000_000_000u64,
    });
    if let Some(amount) = amount {
        payload["amount"] = json!(amount);
    }
    payload.to_string()
}

/// Someone asking the user for money.
pub fn request_payload(name: &str, amount: u64) -> String {
    json!({ "type": "SENIORSAFE_REQUEST", "name": name, "amount": amount }).to_string()
}

pub fn voucher_payload(amount: u64) -> String {
    json!({ "type": "SENIORSAFE_CASH", "amount": amount }).to_string()
}

/// Rupees as a `Decimal`.
pub fn rupees(amount: i64) -> Decimal {
    Decimal::from(amount)
}
