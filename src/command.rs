//! Chat command parsing.
//!
//! The recognizer is driven by a [`Grammar`] table: keyword sets plus the
//! positional shape `<buy> <amount> <preposition> <asset>`. The shipped
//! table is Brazilian Portuguese; another locale is a different table, not
//! different code.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::model::truncate_notional;

/// Number of whitespace tokens in a buy instruction.
const BUY_TOKENS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    pub balance_keywords: Vec<String>,
    pub fiat_keywords: Vec<String>,
    pub buy_keywords: Vec<String>,
    pub prepositions: Vec<String>,
    /// Stripped from the amount token, e.g. `100r$`.
    pub currency_markers: Vec<String>,
}

impl Grammar {
    pub fn pt_br() -> Self {
        fn words(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }

        Self {
            balance_keywords: words(&["saldo"]),
            fiat_keywords: words(&["reais", "real", "brl"]),
            buy_keywords: words(&["comprar"]),
            prepositions: words(&["em", "de"]),
            currency_markers: words(&["r$"]),
        }
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::pt_br()
    }
}

/// Why a buy instruction was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyFormatError {
    TokenCount,
    Preposition,
    NonNumericAmount,
    NonPositiveAmount,
    InvalidAsset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    QueryBalance,
    Buy { asset: String, amount: Decimal },
    InvalidBuyFormat(BuyFormatError),
    Unknown,
}

impl ChatCommand {
    /// Label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            ChatCommand::QueryBalance => "balance",
            ChatCommand::Buy { .. } => "buy",
            ChatCommand::InvalidBuyFormat(_) => "invalid_buy",
            ChatCommand::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandParser {
    grammar: Grammar,
}

impl CommandParser {
    pub fn new(grammar: Grammar) -> Self {
        Self { grammar }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn parse(&self, text: &str) -> ChatCommand {
        let normalized = text.trim().to_lowercase();
        let g = &self.grammar;

        if contains_any(&normalized, &g.balance_keywords) && contains_any(&normalized, &g.fiat_keywords) {
            return ChatCommand::QueryBalance;
        }

        if g.buy_keywords.iter().any(|k| normalized.starts_with(k.as_str())) {
            return match self.parse_buy(&normalized) {
                Ok((asset, amount)) => ChatCommand::Buy { asset, amount },
                Err(e) => ChatCommand::InvalidBuyFormat(e),
            };
        }

        ChatCommand::Unknown
    }

    fn parse_buy(&self, normalized: &str) -> Result<(String, Decimal), BuyFormatError> {
        let g = &self.grammar;
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        if tokens.len() != BUY_TOKENS {
            return Err(BuyFormatError::TokenCount);
        }
        let (verb, amount, preposition, asset) = (tokens[0], tokens[1], tokens[2], tokens[3]);

        // "comprarr 100 em btc" passes the prefix test but is not the verb.
        if !g.buy_keywords.iter().any(|k| k == verb) {
            return Err(BuyFormatError::TokenCount);
        }
        if !g.prepositions.iter().any(|p| p == preposition) {
            return Err(BuyFormatError::Preposition);
        }

        let amount = self.parse_amount(amount)?;

        if !asset.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(BuyFormatError::InvalidAsset);
        }

        Ok((asset.to_uppercase(), amount))
    }

    fn parse_amount(&self, token: &str) -> Result<Decimal, BuyFormatError> {
        let mut cleaned = token.to_string();
        for marker in &self.grammar.currency_markers {
            cleaned = cleaned.replace(marker.as_str(), "");
        }
        let cleaned = cleaned.replace(',', ".");

        let value = Decimal::from_str(&cleaned).map_err(|_| BuyFormatError::NonNumericAmount)?;
        if truncate_notional(value) <= Decimal::ZERO {
            return Err(BuyFormatError::NonPositiveAmount);
        }
        Ok(value)
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}
