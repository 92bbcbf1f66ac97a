use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

use crate::credentials::CredentialError;
use crate::exchange::ExchangeError;

/// Pipeline step that talks to something outside the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Credentials,
    AccountSnapshot,
    OrderSubmission,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Credentials => "credentials",
            Stage::AccountSnapshot => "account_snapshot",
            Stage::OrderSubmission => "order_submission",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TradeError {
    #[error("{0}")]
    Validation(String),
    #[error("Trading pair {base}/{quote} is not supported")]
    UnsupportedPair { base: String, quote: String },
    #[error("Insufficient {asset} balance: required {required}, available {available}")]
    InsufficientFunds {
        asset: String,
        required: Decimal,
        available: Decimal,
    },
    #[error("{stage} failed: {source}")]
    Upstream {
        stage: Stage,
        #[source]
        source: ExchangeError,
    },
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl TradeError {
    pub fn upstream(stage: Stage, source: ExchangeError) -> Self {
        TradeError::Upstream { stage, source }
    }

    /// Stable machine-readable code returned next to the prose message.
    pub fn code(&self) -> &'static str {
        match self {
            TradeError::Validation(_) => "invalid_input",
            TradeError::UnsupportedPair { .. } => "unsupported_pair",
            TradeError::InsufficientFunds { .. } => "insufficient_funds",
            TradeError::Upstream { .. } => "upstream_error",
            TradeError::Configuration(_) => "configuration_error",
        }
    }

    /// Local, caller-caused failures; everything else is our side or upstream.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TradeError::Validation(_) | TradeError::UnsupportedPair { .. } | TradeError::InsufficientFunds { .. }
        )
    }

    /// Message safe to show an end user. Upstream details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            TradeError::Upstream { stage, .. } => format!("Upstream failure during {}", stage),
            TradeError::Configuration(_) => "Service is not configured for this account".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<CredentialError> for TradeError {
    fn from(err: CredentialError) -> Self {
        TradeError::Configuration(err.to_string())
    }
}
