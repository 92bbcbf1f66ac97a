use async_trait::async_trait;
use thiserror::Error;

use crate::credentials::Credentials;
use crate::model::{AccountSnapshot, OrderResult, TradeIntent};

#[derive(Error, Debug, Clone)]
pub enum ExchangeError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out")]
    Timeout,
    /// Non-2xx reply. `body` is the raw provider text, kept for logs only.
    #[error("Exchange returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Request build error: {0}")]
    Request(String),
}

impl ExchangeError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ExchangeError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout
        } else if err.is_decode() {
            ExchangeError::Decode(err.to_string())
        } else if err.is_builder() {
            ExchangeError::Request(err.to_string())
        } else {
            ExchangeError::Network(err.to_string())
        }
    }
}

/// Signed access to one spot exchange.
///
/// Implementations must not retry: a MARKET buy is not idempotent and a
/// silent resubmission could fill twice.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Fresh balances for the account behind `credentials`.
    async fn account_snapshot(&self, credentials: &Credentials) -> Result<AccountSnapshot, ExchangeError>;

    /// Spend `intent.notional()` of the quote asset on the base asset.
    async fn market_buy(&self, credentials: &Credentials, intent: &TradeIntent) -> Result<OrderResult, ExchangeError>;

    fn name(&self) -> &str;
}
