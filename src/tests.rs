#[cfg(test)]
mod tests {
    use crate::balance::BalanceEvaluator;
    use crate::command::{ChatCommand, CommandParser};
    use crate::config::Settings;
    use crate::credentials::{CredentialProvider, DEFAULT_IDENTITY};
    use crate::exchange::binance::{build_account_query, build_market_buy_form};
    use crate::model::{AccountSnapshot, TradeIntent};
    use crate::orchestrator::TradeOrchestrator;
    use crate::pairs::AllowAllPairs;
    use crate::signer;
    use crate::testkit::{test_credentials, MockExchange};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_market_buy_form_order_and_signature() {
        let intent = TradeIntent::new("btc", dec!(100), "BRL").unwrap();
        let form = build_market_buy_form(&intent, 1_700_000_000_000, None).unwrap();

        assert_eq!(
            form,
            "symbol=BTCBRL&side=BUY&type=MARKET&quoteOrderQty=100.00&timestamp=1700000000000"
        );

        let signed = signer::signed_payload("secret", &form);
        let (payload, signature) = signed.rsplit_once("&signature=").unwrap();
        assert_eq!(payload, form);
        assert_eq!(signature, signer::sign("secret", &form));
        assert_eq!(signature.len(), 64);
    }

    #[test]
    fn test_recv_window_goes_before_timestamp() {
        let intent = TradeIntent::new("ETH", dec!(50.5), "BRL").unwrap();
        let form = build_market_buy_form(&intent, 42, Some(5000)).unwrap();
        assert!(form.ends_with("quoteOrderQty=50.50&recvWindow=5000&timestamp=42"));

        assert_eq!(build_account_query(42, None), "timestamp=42");
        assert_eq!(build_account_query(42, Some(5000)), "recvWindow=5000&timestamp=42");
    }

    #[test]
    fn test_binance_account_response_decodes_to_fiat_balances() {
        let raw = r#"{
            "makerCommission": 10,
            "canTrade": true,
            "balances": [
                {"asset": "BTC", "free": "0.00150000", "locked": "0.00000000"},
                {"asset": "BRL", "free": "250.50000000", "locked": "0.00000000"},
                {"asset": "EUR", "free": "0.00000000", "locked": "0.00000000"}
            ]
        }"#;
        let snapshot: AccountSnapshot = serde_json::from_str(raw).unwrap();
        let evaluator = BalanceEvaluator::default();

        let fiat = evaluator.filter_fiat(&snapshot);
        assert_eq!(fiat.len(), 1);
        assert_eq!(fiat[0].asset, "BRL");
        assert_eq!(fiat[0].amount, dec!(250.5));
        assert!(evaluator.has_sufficient(&snapshot, "BRL", dec!(250.50)));
        assert!(!evaluator.has_sufficient(&snapshot, "BRL", dec!(250.51)));
    }

    #[test]
    fn test_chat_amount_reaches_wire_truncated() {
        let parser = CommandParser::default();
        let (asset, amount) = match parser.parse("comprar R$100,509 em btc") {
            ChatCommand::Buy { asset, amount } => (asset, amount),
            other => panic!("unexpected command: {other:?}"),
        };
        let intent = TradeIntent::new(&asset, amount, "BRL").unwrap();

        assert_eq!(intent.notional(), dec!(100.50));
        let form = build_market_buy_form(&intent, 1, None).unwrap();
        assert!(form.contains("quoteOrderQty=100.50"));
    }

    #[tokio::test]
    async fn test_configured_accounts_resolve_by_sender() {
        let settings = Settings::from_toml_str(
            r#"
            [exchange]
            api_key = "ops-key"
            secret_key = "ops-secret"

            [accounts.5511999990000]
            api_key = "alice-key"
            secret_key = "alice-secret"
            "#,
        )
        .unwrap();
        let provider = settings.credential_provider();

        let alice = provider.resolve("5511999990000").await.unwrap();
        assert_eq!(alice.api_key(), "alice-key");
        let ops = provider.resolve(DEFAULT_IDENTITY).await.unwrap();
        assert_eq!(ops.api_key(), "ops-key");
        assert!(provider.resolve("5511000000000").await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_buys_same_account_are_serialized() {
        let exchange = Arc::new(MockExchange::with_balances(&[("BRL", dec!(100))]));
        exchange.set_latency(Duration::from_millis(50));
        let orch = Arc::new(TradeOrchestrator::new(
            exchange.clone(),
            Arc::new(AllowAllPairs),
            BalanceEvaluator::default(),
            "BRL",
        ));
        let intent = orch.intent("BTC", dec!(100)).unwrap();

        let a = {
            let orch = orch.clone();
            let intent = intent.clone();
            tokio::spawn(async move { orch.buy(&test_credentials(), &intent).await })
        };
        let b = {
            let orch = orch.clone();
            let intent = intent.clone();
            tokio::spawn(async move { orch.buy(&test_credentials(), &intent).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let placed = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.code() == "insufficient_funds"))
            .count();

        assert_eq!(placed, 1);
        assert_eq!(rejected, 1);
        assert_eq!(exchange.submitted().len(), 1);
    }
}
