use actix_web::{web, App, HttpServer};
use chat_trade_rs::api::{self, AppState};
use chat_trade_rs::balance::BalanceEvaluator;
use chat_trade_rs::chat::ChatService;
use chat_trade_rs::clock::SystemTimeProvider;
use chat_trade_rs::command::CommandParser;
use chat_trade_rs::config::Settings;
use chat_trade_rs::credentials::CredentialProvider;
use chat_trade_rs::exchange::{BinanceSpotClient, ExchangeClient};
use chat_trade_rs::notifier::{LogNotifier, Notifier, WhatsAppNotifier};
use chat_trade_rs::orchestrator::TradeOrchestrator;
use chat_trade_rs::pairs::{self, PairValidator};
use chat_trade_rs::reply::Replies;
use std::env;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match env::var("LOG_FORMAT").as_deref() {
        Ok("json") => fmt().json().with_env_filter(filter).init(),
        _ => fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load environment variables before anything reads them
    dotenv::dotenv().ok();
    init_logging();

    info!("🚀 chat-trade-rs v{}", env!("CARGO_PKG_VERSION"));

    let settings = match Settings::new() {
        Ok(s) => s,
        Err(e) => {
            error!("❌ Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let credential_provider = settings.credential_provider();
    if credential_provider.is_empty() {
        error!("❌ No exchange credentials configured (exchange.api_key / BINANCE_API_KEY)");
        std::process::exit(1);
    }
    if !credential_provider.has_default() {
        warn!("No default account: /balance and /buy will answer with configuration errors");
    }
    let credentials: Arc<dyn CredentialProvider> = Arc::new(credential_provider);

    let exchange: Arc<dyn ExchangeClient> = Arc::new(BinanceSpotClient::new(
        &settings.exchange.base_url,
        settings.exchange.request_timeout(),
        settings.exchange.recv_window_ms,
        Arc::new(SystemTimeProvider),
    )?);
    info!(venue = exchange.name(), base_url = %settings.exchange.base_url, "✅ Exchange client ready");

    let pair_validator: Arc<dyn PairValidator> = Arc::from(pairs::from_config(
        &settings.exchange.quote_asset,
        &settings.exchange.supported_assets,
    ));
    let orchestrator = Arc::new(TradeOrchestrator::new(
        exchange,
        pair_validator,
        BalanceEvaluator::new(&settings.exchange.fiat_assets),
        &settings.exchange.quote_asset,
    ));

    let (notifier, verify_token): (Arc<dyn Notifier>, String) = match &settings.whatsapp {
        Some(wa) => (
            Arc::new(WhatsAppNotifier::new(
                &wa.api_url,
                &wa.phone_id,
                &wa.token,
                wa.request_timeout(),
            )?),
            wa.effective_verify_token().to_string(),
        ),
        None => {
            warn!("WhatsApp is not configured: chat replies will only be logged");
            (Arc::new(LogNotifier), String::new())
        }
    };

    let chat = Arc::new(ChatService::new(
        orchestrator.clone(),
        credentials.clone(),
        notifier,
        CommandParser::default(),
        Replies::default(),
    ));

    let state = web::Data::new(AppState {
        orchestrator,
        chat,
        credentials,
        verify_token,
    });

    let api_key = settings.server.api_key.clone();
    if api_key.is_none() {
        warn!("server.api_key is not set: /balance and /buy are open");
    }

    let bind_address = format!("{}:{}", settings.server.host, settings.server.port);
    info!("🚀 Starting API Server on {}", bind_address);

    HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(|cfg| api::config(cfg, api_key.as_deref()))
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
