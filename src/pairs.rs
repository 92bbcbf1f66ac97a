use std::collections::HashSet;

/// Decides whether `base`/`quote` may be traded.
pub trait PairValidator: Send + Sync {
    fn is_supported(&self, base: &str, quote: &str) -> bool;
}

/// Accepts every pair and lets the exchange reject unknown symbols.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllPairs;

impl PairValidator for AllowAllPairs {
    fn is_supported(&self, _base: &str, _quote: &str) -> bool {
        true
    }
}

/// Whitelist of base assets tradable against the operator's quote asset.
#[derive(Debug, Clone)]
pub struct SupportedPairs {
    quote_asset: String,
    base_assets: HashSet<String>,
}

impl SupportedPairs {
    pub fn new<I, S>(quote_asset: &str, base_assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            quote_asset: quote_asset.trim().to_uppercase(),
            base_assets: base_assets
                .into_iter()
                .map(|s| s.as_ref().trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

impl PairValidator for SupportedPairs {
    fn is_supported(&self, base: &str, quote: &str) -> bool {
        quote == self.quote_asset && self.base_assets.contains(base)
    }
}

impl<F> PairValidator for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn is_supported(&self, base: &str, quote: &str) -> bool {
        self(base, quote)
    }
}

/// Empty list means "no restriction".
pub fn from_config(quote_asset: &str, supported_assets: &[String]) -> Box<dyn PairValidator> {
    if supported_assets.iter().all(|s| s.trim().is_empty()) {
        Box::new(AllowAllPairs)
    } else {
        Box::new(SupportedPairs::new(quote_asset, supported_assets))
    }
}
