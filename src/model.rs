use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Decimal places used for the quote-currency notional (`quoteOrderQty`).
pub const NOTIONAL_SCALE: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Side {
    #[serde(rename = "BUY")]
    Buy,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum OrderType {
    #[serde(rename = "MARKET")]
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
        }
    }
}

/// One row of the exchange account response. Binance sends `free` as a
/// decimal string, which `Decimal` deserializes without going through f64.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetBalance {
    pub asset: String,
    pub free: Decimal,
}

/// Point-in-time read of account balances. Never cached: stale as soon as
/// it is fetched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AccountSnapshot {
    #[serde(default)]
    pub balances: Vec<AssetBalance>,
}

impl AccountSnapshot {
    pub fn new(balances: Vec<AssetBalance>) -> Self {
        Self { balances }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FiatBalance {
    pub asset: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// A validated market buy: spend `notional` of `quote_asset` on `base_asset`.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeIntent {
    base_asset: String,
    notional: Decimal,
    quote_asset: String,
}

impl TradeIntent {
    /// Returns `None` when the notional is not positive once truncated to
    /// [`NOTIONAL_SCALE`] places, so the amount checked against the balance
    /// is exactly the amount sent to the exchange.
    pub fn new(base_asset: &str, notional: Decimal, quote_asset: &str) -> Option<Self> {
        let notional = truncate_notional(notional);
        if notional <= Decimal::ZERO {
            return None;
        }
        Some(Self {
            base_asset: base_asset.trim().to_uppercase(),
            notional,
            quote_asset: quote_asset.trim().to_uppercase(),
        })
    }

    pub fn base_asset(&self) -> &str {
        &self.base_asset
    }

    pub fn quote_asset(&self) -> &str {
        &self.quote_asset
    }

    pub fn notional(&self) -> Decimal {
        self.notional
    }

    /// Exchange symbol, e.g. `BTCBRL`.
    pub fn symbol(&self) -> String {
        format!("{}{}", self.base_asset, self.quote_asset)
    }
}

pub fn truncate_notional(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(NOTIONAL_SCALE, RoundingStrategy::ToZero)
}

/// `100` -> `"100.00"`, `100.5` -> `"100.50"`.
pub fn format_notional(amount: Decimal) -> String {
    let mut scaled = truncate_notional(amount);
    scaled.rescale(NOTIONAL_SCALE);
    scaled.to_string()
}

/// Accepted order as returned by the exchange. The payload is kept verbatim;
/// spot responses vary (ACK/RESULT/FULL) and may omit fills entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderResult {
    pub order_id: Option<String>,
    pub payload: Value,
}

impl OrderResult {
    pub fn from_payload(payload: Value) -> Self {
        let order_id = payload.get("orderId").and_then(normalize_order_id);
        Self { order_id, payload }
    }
}

fn normalize_order_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// One inbound chat instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub sender_id: String,
    pub text: String,
}

impl ChatMessage {
    pub fn new(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            text: text.into(),
        }
    }
}
