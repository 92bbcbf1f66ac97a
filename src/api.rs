use actix_web::{http::StatusCode, web, HttpResponse, Responder, ResponseError};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::auth_middleware::ApiKeyGuard;
use crate::chat::ChatService;
use crate::credentials::{CredentialProvider, DEFAULT_IDENTITY};
use crate::error::{Stage, TradeError};
use crate::exchange::ExchangeError;
use crate::intent_validation::validate_buy_payload;
use crate::metrics;
use crate::orchestrator::TradeOrchestrator;
use crate::webhook::{verify_subscription, VerifyQuery, WebhookPayload};

pub const WEBHOOK_PATH: &str = "/whatsapp/webhook";

/// Shared handler state, built once in `main` and cloned per worker.
pub struct AppState {
    pub orchestrator: Arc<TradeOrchestrator>,
    pub chat: Arc<ChatService>,
    pub credentials: Arc<dyn CredentialProvider>,
    /// Expected `hub.verify_token`. Empty rejects every handshake.
    pub verify_token: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl ResponseError for TradeError {
    fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.public_message(),
            code: self.code(),
        })
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: u16,
}

pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse { status: 200 })
}

pub async fn get_metrics() -> impl Responder {
    match metrics::render() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub async fn get_balance(state: web::Data<AppState>) -> Result<HttpResponse, TradeError> {
    let credentials = state.credentials.resolve(DEFAULT_IDENTITY).await?;
    let fiat_balances = state.orchestrator.fiat_balances(&credentials).await?;

    if fiat_balances.is_empty() {
        return Ok(HttpResponse::Ok().json(json!({ "message": "no balances" })));
    }
    Ok(HttpResponse::Ok().json(json!({ "fiat_balances": fiat_balances })))
}

pub async fn post_buy(state: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse, TradeError> {
    let intent = validate_buy_payload(&body, state.orchestrator.quote_asset())?;
    let credentials = state.credentials.resolve(DEFAULT_IDENTITY).await?;

    // Detached so a dropped connection cannot abandon a half-sent order.
    let orchestrator = state.orchestrator.clone();
    let task = actix_web::rt::spawn(async move { orchestrator.buy(&credentials, &intent).await });

    let order = task.await.map_err(|e| {
        error!("Order task aborted: {}", e);
        TradeError::upstream(
            Stage::OrderSubmission,
            ExchangeError::Request(format!("order task aborted: {}", e)),
        )
    })??;

    Ok(HttpResponse::Ok().json(json!({ "order_details": order.payload })))
}

pub async fn receive_webhook(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!("Malformed webhook payload: {}", e);
            return HttpResponse::BadRequest().json(json!({ "error": "Invalid payload" }));
        }
    };

    let messages = payload.chat_messages();
    if messages.is_empty() {
        return HttpResponse::Ok().json(json!({ "status": "no messages" }));
    }

    let delivery_id = Uuid::new_v4();
    info!(%delivery_id, count = messages.len(), "Webhook delivery accepted");

    let chat = state.chat.clone();
    let span = tracing::info_span!("webhook_delivery", %delivery_id);
    actix_web::rt::spawn(
        async move {
            for message in &messages {
                let reply = chat.handle(message).await;
                info!(sender = %message.sender_id, outcome = ?reply.outcome, "Chat message handled");
            }
        }
        .instrument(span),
    );

    HttpResponse::Ok().json(json!({ "status": "processed" }))
}

pub async fn verify_webhook(state: web::Data<AppState>, query: web::Query<VerifyQuery>) -> HttpResponse {
    match verify_subscription(&query, &state.verify_token) {
        Some(challenge) => {
            info!("Webhook subscription verified");
            HttpResponse::Ok().content_type("text/plain").body(challenge)
        }
        None => {
            warn!("Webhook verification rejected");
            HttpResponse::Forbidden().finish()
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig, api_key: Option<&str>) {
    cfg.service(web::resource("/health").route(web::get().to(health_check)))
        .service(web::resource("/health-check").route(web::get().to(health_check)))
        .service(web::resource("/metrics").route(web::get().to(get_metrics)))
        .service(
            web::resource("/balance")
                .wrap(ApiKeyGuard::new(api_key))
                .route(web::get().to(get_balance)),
        )
        .service(
            web::resource("/buy")
                .wrap(ApiKeyGuard::new(api_key))
                .route(web::post().to(post_buy)),
        )
        .service(
            web::resource(WEBHOOK_PATH)
                .route(web::post().to(receive_webhook))
                .route(web::get().to(verify_webhook)),
        );
}
