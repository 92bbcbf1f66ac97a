use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::balance::BalanceEvaluator;
use crate::credentials::Credentials;
use crate::error::{Stage, TradeError};
use crate::exchange::ExchangeClient;
use crate::metrics;
use crate::model::{AccountSnapshot, FiatBalance, OrderResult, TradeIntent};
use crate::pairs::PairValidator;

/// Sequences snapshot -> sufficiency check -> submission for one account.
///
/// The whole sequence runs under a per-account async mutex keyed by API
/// key, so two buys against the same account can never both pass the
/// check on a balance that only covers one of them.
pub struct TradeOrchestrator {
    exchange: Arc<dyn ExchangeClient>,
    pairs: Arc<dyn PairValidator>,
    balances: BalanceEvaluator,
    quote_asset: String,
    account_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TradeOrchestrator {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        pairs: Arc<dyn PairValidator>,
        balances: BalanceEvaluator,
        quote_asset: &str,
    ) -> Self {
        Self {
            exchange,
            pairs,
            balances,
            quote_asset: quote_asset.trim().to_uppercase(),
            account_locks: DashMap::new(),
        }
    }

    pub fn quote_asset(&self) -> &str {
        &self.quote_asset
    }

    pub fn balances(&self) -> &BalanceEvaluator {
        &self.balances
    }

    /// Builds an intent against the operator's quote asset.
    pub fn intent(&self, base_asset: &str, notional: Decimal) -> Result<TradeIntent, TradeError> {
        TradeIntent::new(base_asset, notional, &self.quote_asset)
            .ok_or_else(|| TradeError::Validation("amount must be greater than zero".to_string()))
    }

    pub async fn snapshot(&self, credentials: &Credentials) -> Result<AccountSnapshot, TradeError> {
        self.exchange.account_snapshot(credentials).await.map_err(|e| {
            error!(
                exchange = self.exchange.name(),
                error = %e,
                "❌ Account snapshot failed"
            );
            metrics::inc_upstream_failure(Stage::AccountSnapshot.as_str());
            TradeError::upstream(Stage::AccountSnapshot, e)
        })
    }

    pub async fn fiat_balances(&self, credentials: &Credentials) -> Result<Vec<FiatBalance>, TradeError> {
        let snapshot = self.snapshot(credentials).await?;
        Ok(self.balances.filter_fiat(&snapshot))
    }

    pub async fn quote_balance(&self, credentials: &Credentials) -> Result<Decimal, TradeError> {
        let snapshot = self.snapshot(credentials).await?;
        Ok(self.balances.free_amount(&snapshot, &self.quote_asset))
    }

    pub async fn buy(&self, credentials: &Credentials, intent: &TradeIntent) -> Result<OrderResult, TradeError> {
        if !self.pairs.is_supported(intent.base_asset(), intent.quote_asset()) {
            warn!(symbol = %intent.symbol(), "Unsupported trading pair");
            metrics::inc_buy_rejection("unsupported_pair");
            return Err(TradeError::UnsupportedPair {
                base: intent.base_asset().to_string(),
                quote: intent.quote_asset().to_string(),
            });
        }

        let lock = self.account_lock(credentials.api_key());
        let _guard = lock.lock().await;
        let started = Instant::now();

        // Same snapshot for the check and the decision; no re-fetch.
        let snapshot = self.snapshot(credentials).await?;

        if !self
            .balances
            .has_sufficient(&snapshot, intent.quote_asset(), intent.notional())
        {
            let available = self.balances.free_amount(&snapshot, intent.quote_asset());
            info!(
                symbol = %intent.symbol(),
                required = %intent.notional(),
                available = %available,
                "Insufficient balance for buy"
            );
            metrics::inc_buy_rejection("insufficient_funds");
            return Err(TradeError::InsufficientFunds {
                asset: intent.quote_asset().to_string(),
                required: intent.notional(),
                available,
            });
        }

        let result = self
            .exchange
            .market_buy(credentials, intent)
            .await
            .map_err(|e| {
                error!(
                    exchange = self.exchange.name(),
                    symbol = %intent.symbol(),
                    error = %e,
                    "❌ Market buy failed"
                );
                metrics::inc_upstream_failure(Stage::OrderSubmission.as_str());
                TradeError::upstream(Stage::OrderSubmission, e)
            })?;

        metrics::inc_orders_placed();
        metrics::observe_order_latency(started.elapsed().as_secs_f64());
        info!(
            symbol = %intent.symbol(),
            notional = %intent.notional(),
            order_id = result.order_id.as_deref().unwrap_or("-"),
            "✅ Market buy placed"
        );

        Ok(result)
    }

    fn account_lock(&self, account: &str) -> Arc<Mutex<()>> {
        // Clone out so the shard guard is released before awaiting.
        let entry = self
            .account_locks
            .entry(account.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())));
        Arc::clone(entry.value())
    }
}
