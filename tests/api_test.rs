//! HTTP surface tests: routes, status codes and JSON shapes, driven through
//! an in-process actix service backed by the in-memory exchange.

use actix_web::{test, web, App};
use chat_trade_rs::api::{self, AppState};
use chat_trade_rs::balance::BalanceEvaluator;
use chat_trade_rs::chat::ChatService;
use chat_trade_rs::command::CommandParser;
use chat_trade_rs::credentials::{CredentialProvider, Credentials, StaticCredentialProvider};
use chat_trade_rs::orchestrator::TradeOrchestrator;
use chat_trade_rs::pairs::{AllowAllPairs, SupportedPairs};
use chat_trade_rs::reply::Replies;
use chat_trade_rs::testkit::{test_credentials, MockExchange, RecordingNotifier};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const SENDER: &str = "5511999990000";

struct Harness {
    exchange: Arc<MockExchange>,
    notifier: Arc<RecordingNotifier>,
    state: web::Data<AppState>,
}

fn harness(exchange: MockExchange) -> Harness {
    let exchange = Arc::new(exchange);
    let notifier = Arc::new(RecordingNotifier::default());

    let mut provider = StaticCredentialProvider::with_default(test_credentials());
    provider.insert(SENDER, Credentials::new("sender-key", "sender-secret"));
    let credentials: Arc<dyn CredentialProvider> = Arc::new(provider);

    let orchestrator = Arc::new(TradeOrchestrator::new(
        exchange.clone(),
        Arc::new(AllowAllPairs),
        BalanceEvaluator::default(),
        "BRL",
    ));
    let chat = Arc::new(ChatService::new(
        orchestrator.clone(),
        credentials.clone(),
        notifier.clone(),
        CommandParser::default(),
        Replies::default(),
    ));

    Harness {
        exchange,
        notifier,
        state: web::Data::new(AppState {
            orchestrator,
            chat,
            credentials,
            verify_token: "hook-token".to_string(),
        }),
    }
}

fn webhook_body(from: &str, text: &str) -> Value {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "changes": [{
                "value": {
                    "messages": [{"from": from, "type": "text", "text": {"body": text}}]
                }
            }]
        }]
    })
}

#[actix_web::test]
async fn test_health_and_alias() {
    let h = harness(MockExchange::default());
    let app = test::init_service(
        App::new()
            .app_data(h.state.clone())
            .configure(|cfg| api::config(cfg, None)),
    )
    .await;

    for path in ["/health", "/health-check"] {
        let req = test::TestRequest::get().uri(path).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"status": 200}));
    }
}

#[actix_web::test]
async fn test_balance_filters_fiat_and_is_idempotent() {
    let h = harness(MockExchange::with_balances(&[
        ("BTC", dec!(0.5)),
        ("BRL", dec!(150.25)),
        ("USD", dec!(0)),
    ]));
    let app = test::init_service(
        App::new()
            .app_data(h.state.clone())
            .configure(|cfg| api::config(cfg, None)),
    )
    .await;

    let first: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/balance").to_request()).await;
    let second: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/balance").to_request()).await;

    assert_eq!(first, json!({"fiat_balances": [{"asset": "BRL", "amount": 150.25}]}));
    assert_eq!(first, second);
}

#[actix_web::test]
async fn test_balance_without_fiat() {
    let h = harness(MockExchange::with_balances(&[("BTC", dec!(1))]));
    let app = test::init_service(
        App::new()
            .app_data(h.state.clone())
            .configure(|cfg| api::config(cfg, None)),
    )
    .await;

    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/balance").to_request()).await;
    assert_eq!(body, json!({"message": "no balances"}));
}

#[actix_web::test]
async fn test_buy_success_echoes_order() {
    let h = harness(MockExchange::with_balances(&[("BRL", dec!(500))]));
    let app = test::init_service(
        App::new()
            .app_data(h.state.clone())
            .configure(|cfg| api::config(cfg, None)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/buy")
        .set_json(json!({"crypto": "btc", "amount": 100}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["order_details"]["symbol"], "BTCBRL");
    assert!(body["order_details"]["orderId"].is_number());
    assert_eq!(h.exchange.submitted().len(), 1);
}

#[actix_web::test]
async fn test_buy_zero_amount_rejected_without_exchange_call() {
    let h = harness(MockExchange::with_balances(&[("BRL", dec!(500))]));
    let app = test::init_service(
        App::new()
            .app_data(h.state.clone())
            .configure(|cfg| api::config(cfg, None)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/buy")
        .set_json(json!({"crypto": "BTC", "amount": 0}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "invalid_input");
    assert_eq!(body["error"], "amount must be greater than zero");
    assert_eq!(h.exchange.snapshot_calls(), 0);
}

#[actix_web::test]
async fn test_buy_insufficient_funds_is_400() {
    let h = harness(MockExchange::with_balances(&[("BRL", dec!(10))]));
    let app = test::init_service(
        App::new()
            .app_data(h.state.clone())
            .configure(|cfg| api::config(cfg, None)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/buy")
        .set_json(json!({"crypto": "BTC", "amount": 100}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "insufficient_funds");
    assert!(h.exchange.submitted().is_empty());
}

#[actix_web::test]
async fn test_buy_upstream_failure_hides_exchange_body() {
    let h = harness(MockExchange::with_balances(&[("BRL", dec!(500))]));
    h.exchange.fail_order(chat_trade_rs::exchange::ExchangeError::Status {
        status: 400,
        body: r#"{"code":-2010,"msg":"Account has insufficient balance"}"#.to_string(),
    });
    let app = test::init_service(
        App::new()
            .app_data(h.state.clone())
            .configure(|cfg| api::config(cfg, None)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/buy")
        .set_json(json!({"crypto": "BTC", "amount": 100}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "upstream_error");
    assert!(!body["error"].as_str().unwrap().contains("-2010"));
}

#[actix_web::test]
async fn test_unsupported_pair_is_400() {
    let h = harness(MockExchange::with_balances(&[("BRL", dec!(500))]));
    let orchestrator = Arc::new(TradeOrchestrator::new(
        h.exchange.clone(),
        Arc::new(SupportedPairs::new("BRL", ["BTC", "ETH"])),
        BalanceEvaluator::default(),
        "BRL",
    ));
    let state = web::Data::new(AppState {
        orchestrator,
        chat: h.state.chat.clone(),
        credentials: h.state.credentials.clone(),
        verify_token: String::new(),
    });
    let app = test::init_service(
        App::new()
            .app_data(state)
            .configure(|cfg| api::config(cfg, None)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/buy")
        .set_json(json!({"crypto": "DOGE", "amount": 10}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "unsupported_pair");
}

#[actix_web::test]
async fn test_concurrent_buys_one_succeeds() {
    let exchange = MockExchange::with_balances(&[("BRL", dec!(100))]);
    exchange.set_latency(Duration::from_millis(50));
    let h = harness(exchange);
    let app = test::init_service(
        App::new()
            .app_data(h.state.clone())
            .configure(|cfg| api::config(cfg, None)),
    )
    .await;

    let buy = || {
        test::TestRequest::post()
            .uri("/buy")
            .set_json(json!({"crypto": "BTC", "amount": 100}))
            .to_request()
    };
    let (a, b) = futures::join!(
        test::call_service(&app, buy()),
        test::call_service(&app, buy())
    );

    let mut statuses = vec![a.status().as_u16(), b.status().as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![200, 400]);
    assert_eq!(h.exchange.submitted().len(), 1);
}

#[actix_web::test]
async fn test_api_key_guard() {
    let h = harness(MockExchange::with_balances(&[("BRL", dec!(1))]));
    let app = test::init_service(
        App::new()
            .app_data(h.state.clone())
            .configure(|cfg| api::config(cfg, Some("ops-key"))),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/balance").to_request()).await;
    assert_eq!(resp.status(), 401);

    let req = test::TestRequest::get()
        .uri("/balance")
        .insert_header(("x-api-key", "wrong"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let req = test::TestRequest::get()
        .uri("/balance")
        .insert_header(("x-api-key", "ops-key"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    // Health and webhook stay open
    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), 200);
    let req = test::TestRequest::get()
        .uri("/whatsapp/webhook?hub.mode=subscribe&hub.challenge=7&hub.verify_token=hook-token")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
    assert_eq!(h.exchange.snapshot_calls(), 1);
}

#[actix_web::test]
async fn test_webhook_verification() {
    let h = harness(MockExchange::default());
    let app = test::init_service(
        App::new()
            .app_data(h.state.clone())
            .configure(|cfg| api::config(cfg, None)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/whatsapp/webhook?hub.mode=subscribe&hub.challenge=1158201444&hub.verify_token=hook-token")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(test::read_body(resp).await, "1158201444");

    let req = test::TestRequest::get()
        .uri("/whatsapp/webhook?hub.mode=subscribe&hub.challenge=1&hub.verify_token=nope")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);
}

#[actix_web::test]
async fn test_webhook_balance_reply_is_sent() {
    let h = harness(MockExchange::with_balances(&[("BRL", dec!(250.5))]));
    let app = test::init_service(
        App::new()
            .app_data(h.state.clone())
            .configure(|cfg| api::config(cfg, None)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/whatsapp/webhook")
        .set_json(webhook_body(SENDER, "Qual o meu saldo em reais?"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"status": "processed"}));

    let sent = h.notifier.wait_for(1, Duration::from_secs(2)).await;
    assert_eq!(
        sent,
        vec![(SENDER.to_string(), "Seu saldo em reais é: R$ 250.50".to_string())]
    );
}

#[actix_web::test]
async fn test_webhook_buy_places_order() {
    let h = harness(MockExchange::with_balances(&[("BRL", dec!(500))]));
    let app = test::init_service(
        App::new()
            .app_data(h.state.clone())
            .configure(|cfg| api::config(cfg, None)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/whatsapp/webhook")
        .set_json(webhook_body(SENDER, "comprar R$100,50 em btc"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "processed");

    let sent = h.notifier.wait_for(1, Duration::from_secs(2)).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.starts_with("Compra realizada com sucesso!"));
    assert!(sent[0].1.contains("R$ 100.50"));

    let orders = h.exchange.submitted();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].symbol(), "BTCBRL");
    assert_eq!(orders[0].notional(), dec!(100.50));
}

#[actix_web::test]
async fn test_webhook_empty_and_malformed() {
    let h = harness(MockExchange::default());
    let app = test::init_service(
        App::new()
            .app_data(h.state.clone())
            .configure(|cfg| api::config(cfg, None)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/whatsapp/webhook")
        .set_json(json!({"entry": []}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"status": "no messages"}));

    let req = test::TestRequest::post()
        .uri("/whatsapp/webhook")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert!(h.notifier.sent().is_empty());
}
