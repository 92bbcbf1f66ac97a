use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::model::{AccountSnapshot, FiatBalance};

pub const DEFAULT_FIAT_ASSETS: [&str; 3] = ["BRL", "USD", "EUR"];

/// Reads fiat holdings out of an [`AccountSnapshot`].
#[derive(Debug, Clone)]
pub struct BalanceEvaluator {
    fiat_assets: HashSet<String>,
}

impl Default for BalanceEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_FIAT_ASSETS.iter().map(|s| s.to_string()))
    }
}

impl BalanceEvaluator {
    pub fn new<I, S>(fiat_assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            fiat_assets: fiat_assets
                .into_iter()
                .map(|s| s.as_ref().trim().to_uppercase())
                .collect(),
        }
    }

    pub fn is_fiat(&self, asset: &str) -> bool {
        self.fiat_assets.contains(asset)
    }

    /// Positive fiat balances, in snapshot order.
    pub fn filter_fiat(&self, snapshot: &AccountSnapshot) -> Vec<FiatBalance> {
        snapshot
            .balances
            .iter()
            .filter(|b| b.free > Decimal::ZERO && self.is_fiat(&b.asset))
            .map(|b| FiatBalance {
                asset: b.asset.clone(),
                amount: b.free,
            })
            .collect()
    }

    /// Free amount of `asset`; an absent entry reads as zero.
    pub fn free_amount(&self, snapshot: &AccountSnapshot, asset: &str) -> Decimal {
        snapshot
            .balances
            .iter()
            .find(|b| b.asset == asset)
            .map(|b| b.free)
            .unwrap_or(Decimal::ZERO)
    }

    /// Inclusive: a balance equal to `amount` is sufficient.
    pub fn has_sufficient(&self, snapshot: &AccountSnapshot, asset: &str, amount: Decimal) -> bool {
        snapshot
            .balances
            .iter()
            .find(|b| b.asset == asset)
            .is_some_and(|b| b.free >= amount)
    }
}
