use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clock::{SystemTimeProvider, TimeProvider};
use crate::credentials::Credentials;
use crate::exchange::adapter::{ExchangeClient, ExchangeError};
use crate::model::{format_notional, AccountSnapshot, OrderResult, OrderType, Side, TradeIntent};
use crate::signer;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
pub const ACCOUNT_ENDPOINT: &str = "/api/v3/account";
pub const ORDER_ENDPOINT: &str = "/api/v3/order";
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Binance spot REST client (account + market order).
pub struct BinanceSpotClient {
    client: Client,
    base_url: String,
    recv_window_ms: Option<u64>,
    clock: Arc<dyn TimeProvider>,
}

impl BinanceSpotClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        recv_window_ms: Option<u64>,
        clock: Arc<dyn TimeProvider>,
    ) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExchangeError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            recv_window_ms,
            clock,
        })
    }

    pub fn with_defaults(base_url: &str) -> Result<Self, ExchangeError> {
        Self::new(base_url, DEFAULT_TIMEOUT, None, Arc::new(SystemTimeProvider))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Reads the body on every path so the connection is released, and
    /// classifies non-2xx before any attempt to decode.
    async fn read_body(&self, resp: reqwest::Response, what: &str) -> Result<String, ExchangeError> {
        let status = resp.status();

        if !status.is_success() {
            // A body that fails to read must not hide the status
            let text = resp.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                body = %text,
                "Binance {} request rejected",
                what
            );
            return Err(ExchangeError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(resp.text().await?)
    }
}

pub(crate) fn build_account_query(timestamp: i64, recv_window_ms: Option<u64>) -> String {
    match recv_window_ms {
        Some(window) => format!("recvWindow={}&timestamp={}", window, timestamp),
        None => format!("timestamp={}", timestamp),
    }
}

/// Form body for a quote-notional market buy, in the exact order it is
/// signed and sent.
pub(crate) fn build_market_buy_form(
    intent: &TradeIntent,
    timestamp: i64,
    recv_window_ms: Option<u64>,
) -> Result<String, ExchangeError> {
    let mut params: Vec<(&str, String)> = vec![
        ("symbol", intent.symbol()),
        ("side", Side::Buy.as_str().to_string()),
        ("type", OrderType::Market.as_str().to_string()),
        ("quoteOrderQty", format_notional(intent.notional())),
    ];
    if let Some(window) = recv_window_ms {
        params.push(("recvWindow", window.to_string()));
    }
    params.push(("timestamp", timestamp.to_string()));

    serde_urlencoded::to_string(&params).map_err(|e| ExchangeError::Request(e.to_string()))
}

#[async_trait]
impl ExchangeClient for BinanceSpotClient {
    async fn account_snapshot(&self, credentials: &Credentials) -> Result<AccountSnapshot, ExchangeError> {
        let query = build_account_query(self.clock.now_millis(), self.recv_window_ms);
        let signed = signer::signed_payload(credentials.expose_secret(), &query);
        let url = format!("{}{}?{}", self.base_url, ACCOUNT_ENDPOINT, signed);

        debug!(endpoint = ACCOUNT_ENDPOINT, "GET signed");

        let resp = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, credentials.api_key())
            .send()
            .await?;

        let text = self.read_body(resp, "account").await?;

        serde_json::from_str::<AccountSnapshot>(&text)
            .map_err(|e| ExchangeError::Decode(format!("account snapshot: {}", e)))
    }

    async fn market_buy(&self, credentials: &Credentials, intent: &TradeIntent) -> Result<OrderResult, ExchangeError> {
        let form = build_market_buy_form(intent, self.clock.now_millis(), self.recv_window_ms)?;
        let body = signer::signed_payload(credentials.expose_secret(), &form);
        let url = format!("{}{}", self.base_url, ORDER_ENDPOINT);

        debug!(
            endpoint = ORDER_ENDPOINT,
            symbol = %intent.symbol(),
            notional = %intent.notional(),
            "POST signed market buy"
        );

        let resp = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, credentials.api_key())
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let text = self.read_body(resp, "order").await?;

        let payload: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ExchangeError::Decode(format!("order response: {}", e)))?;

        Ok(OrderResult::from_payload(payload))
    }

    fn name(&self) -> &str {
        "Binance Spot"
    }
}
