//! Test doubles shared by unit tests and integration tests.
//!
//! Enabled via `#[cfg(test)]` or the `testkit` feature.

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::credentials::Credentials;
use crate::exchange::{ExchangeClient, ExchangeError};
use crate::model::{AccountSnapshot, AssetBalance, OrderResult, TradeIntent};
use crate::notifier::{Notifier, NotifyError};

pub fn test_credentials() -> Credentials {
    Credentials::new("test-api-key", "test-secret-key")
}

/// In-memory exchange. Filled buys debit the quote balance, so a second
/// buy sees the effect of the first.
#[derive(Default)]
pub struct MockExchange {
    balances: Mutex<Vec<AssetBalance>>,
    submitted: Mutex<Vec<TradeIntent>>,
    snapshot_error: Mutex<Option<ExchangeError>>,
    order_error: Mutex<Option<ExchangeError>>,
    latency: Mutex<Option<Duration>>,
    snapshot_calls: AtomicUsize,
    order_calls: AtomicUsize,
    next_order_id: AtomicU64,
}

impl MockExchange {
    pub fn with_balances(rows: &[(&str, Decimal)]) -> Self {
        let exchange = Self::default();
        exchange.set_balances(rows);
        exchange
    }

    pub fn set_balances(&self, rows: &[(&str, Decimal)]) {
        *self.balances.lock() = rows
            .iter()
            .map(|(asset, free)| AssetBalance {
                asset: asset.to_string(),
                free: *free,
            })
            .collect();
    }

    pub fn fail_snapshot(&self, err: ExchangeError) {
        *self.snapshot_error.lock() = Some(err);
    }

    pub fn fail_order(&self, err: ExchangeError) {
        *self.order_error.lock() = Some(err);
    }

    /// Delay applied to every snapshot call, to widen race windows.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    pub fn submitted(&self) -> Vec<TradeIntent> {
        self.submitted.lock().clone()
    }

    pub fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    pub fn order_calls(&self) -> usize {
        self.order_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExchangeClient for MockExchange {
    async fn account_snapshot(&self, _credentials: &Credentials) -> Result<AccountSnapshot, ExchangeError> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(err) = self.snapshot_error.lock().clone() {
            return Err(err);
        }
        Ok(AccountSnapshot::new(self.balances.lock().clone()))
    }

    async fn market_buy(&self, _credentials: &Credentials, intent: &TradeIntent) -> Result<OrderResult, ExchangeError> {
        self.order_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.order_error.lock().clone() {
            return Err(err);
        }

        {
            let mut balances = self.balances.lock();
            if let Some(row) = balances.iter_mut().find(|b| b.asset == intent.quote_asset()) {
                row.free -= intent.notional();
            }
        }
        self.submitted.lock().push(intent.clone());

        let order_id = 1000 + self.next_order_id.fetch_add(1, Ordering::SeqCst);
        Ok(OrderResult::from_payload(json!({
            "symbol": intent.symbol(),
            "orderId": order_id,
            "status": "FILLED",
            "type": "MARKET",
            "side": "BUY",
            "cummulativeQuoteQty": intent.notional().to_string(),
        })))
    }

    fn name(&self) -> &str {
        "Mock"
    }
}

/// Captures replies instead of sending them.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        let n = Self::default();
        *n.fail.lock() = true;
        n
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }

    /// Polls until `count` replies were recorded or `timeout` elapses.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<(String, String)> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let sent = self.sent();
            if sent.len() >= count || tokio::time::Instant::now() >= deadline {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().push((recipient.to_string(), text.to_string()));
        if *self.fail.lock() {
            return Err(NotifyError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}
