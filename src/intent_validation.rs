use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use std::str::FromStr;

use crate::error::TradeError;
use crate::model::TradeIntent;

fn require_string(obj: &Map<String, Value>, key: &str) -> Result<String, TradeError> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(_) => Err(TradeError::Validation(format!("{} must be a non-empty string", key))),
        None => Err(TradeError::Validation(format!("{} is required", key))),
    }
}

fn require_decimal(obj: &Map<String, Value>, key: &str) -> Result<Decimal, TradeError> {
    match obj.get(key) {
        Some(Value::Number(n)) => number_to_decimal(n)
            .ok_or_else(|| TradeError::Validation(format!("{} is out of range", key))),
        Some(_) => Err(TradeError::Validation(format!("{} must be a number", key))),
        None => Err(TradeError::Validation(format!("{} is required", key))),
    }
}

/// Goes through the JSON text rather than f64 so `100.1` stays `100.1`.
fn number_to_decimal(n: &Number) -> Option<Decimal> {
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Validates a `POST /buy` body (`{"crypto": "BTC", "amount": 100}`).
pub fn validate_buy_payload(payload: &[u8], quote_asset: &str) -> Result<TradeIntent, TradeError> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| TradeError::Validation(format!("Invalid JSON: {}", e)))?;

    let obj = value
        .as_object()
        .ok_or_else(|| TradeError::Validation("Payload must be a JSON object".to_string()))?;

    let crypto = require_string(obj, "crypto")?;
    if !crypto.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(TradeError::Validation(
            "crypto must be an asset symbol such as BTC".to_string(),
        ));
    }

    let amount = require_decimal(obj, "amount")?;

    TradeIntent::new(&crypto, amount, quote_asset)
        .ok_or_else(|| TradeError::Validation("amount must be greater than zero".to_string()))
}
