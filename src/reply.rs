use rust_decimal::{Decimal, RoundingStrategy};

use crate::command::BuyFormatError;
use crate::model::{format_notional, NOTIONAL_SCALE};

/// User-facing chat texts. Kept apart from the parser's [`Grammar`] so a
/// locale is one table for input plus one catalogue for output.
///
/// [`Grammar`]: crate::command::Grammar
#[derive(Debug, Clone)]
pub struct Replies {
    /// Prefix printed before amounts, e.g. `R$`.
    pub currency_symbol: String,
    /// Plural currency name used in sentences, e.g. `reais`.
    pub currency_name: String,
}

impl Default for Replies {
    fn default() -> Self {
        Self::pt_br()
    }
}

impl Replies {
    pub fn pt_br() -> Self {
        Self {
            currency_symbol: "R$".to_string(),
            currency_name: "reais".to_string(),
        }
    }

    fn money(&self, amount: Decimal) -> String {
        format!("{} {}", self.currency_symbol, format_notional(amount))
    }

    /// Balances are shown rounded; notionals are shown as sent (truncated).
    fn rounded_money(&self, amount: Decimal) -> String {
        let mut rounded = amount.round_dp_with_strategy(NOTIONAL_SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(NOTIONAL_SCALE);
        format!("{} {}", self.currency_symbol, rounded)
    }

    pub fn usage(&self) -> String {
        format!(
            "Comandos disponíveis:\n- saldo em {}\n- comprar <valor> em <cripto> (exemplo: comprar 100{} em BTC)",
            self.currency_name, self.currency_symbol
        )
    }

    pub fn balance(&self, amount: Decimal) -> String {
        if amount > Decimal::ZERO {
            format!("Seu saldo em {} é: {}", self.currency_name, self.rounded_money(amount))
        } else {
            format!("Você não tem saldo disponível em {}.", self.currency_name)
        }
    }

    pub fn balance_failed(&self) -> String {
        "Erro ao consultar saldo.".to_string()
    }

    pub fn invalid_buy(&self, reason: BuyFormatError) -> String {
        match reason {
            BuyFormatError::TokenCount | BuyFormatError::Preposition | BuyFormatError::InvalidAsset => format!(
                "Formato inválido. Use: comprar <valor> em <cripto> (exemplo: comprar 100{} em BTC)",
                self.currency_symbol
            ),
            BuyFormatError::NonNumericAmount => {
                "O valor para compra deve ser um número válido (exemplo: 100,50).".to_string()
            }
            BuyFormatError::NonPositiveAmount => "O valor para compra deve ser maior que zero.".to_string(),
        }
    }

    pub fn unsupported_pair(&self, base: &str, quote: &str) -> String {
        format!("Desculpe, o par de moedas {}/{} não é suportado.", base, quote)
    }

    pub fn balance_check_failed(&self) -> String {
        "Erro ao validar saldo para compra.".to_string()
    }

    pub fn insufficient_funds(&self) -> String {
        "Saldo insuficiente para realizar a compra.".to_string()
    }

    pub fn order_failed(&self) -> String {
        "Erro ao realizar a compra.".to_string()
    }

    pub fn order_placed(&self, asset: &str, notional: Decimal, order_id: Option<&str>) -> String {
        format!(
            "Compra realizada com sucesso!\nMoeda: {}\nValor: {}\nID do Pedido: {}",
            asset,
            self.money(notional),
            order_id.unwrap_or("indisponível")
        )
    }

    pub fn unavailable(&self) -> String {
        "Desculpe, não foi possível processar sua solicitação agora. Tente novamente mais tarde.".to_string()
    }

    pub fn unknown(&self) -> String {
        format!("Desculpe, não reconheço este comando.\n{}", self.usage())
    }
}
