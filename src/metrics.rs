use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram, IntCounter,
    IntCounterVec, TextEncoder,
};

// --- Order pipeline ---

pub static ORDERS_PLACED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "chat_trade_orders_placed_total",
        "Market buy orders accepted by the exchange"
    )
    .expect("orders_placed counter")
});

pub static BUY_REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "chat_trade_buy_rejections_total",
        "Buy requests refused before submission",
        &["reason"]
    )
    .expect("buy_rejections counter")
});

pub static UPSTREAM_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "chat_trade_upstream_failures_total",
        "Failed calls to the exchange or credential store",
        &["stage"]
    )
    .expect("upstream_failures counter")
});

pub static ORDER_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "chat_trade_order_latency_seconds",
        "Snapshot + check + submit latency for one buy",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0]
    )
    .expect("order_latency histogram")
});

// --- Chat ---

pub static CHAT_COMMANDS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "chat_trade_chat_commands_total",
        "Inbound chat messages by recognized intent",
        &["intent"]
    )
    .expect("chat_commands counter")
});

pub static NOTIFY_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "chat_trade_notify_failures_total",
        "Chat replies that could not be delivered"
    )
    .expect("notify_failures counter")
});

pub fn inc_orders_placed() {
    ORDERS_PLACED.inc();
}

pub fn inc_buy_rejection(reason: &str) {
    BUY_REJECTIONS.with_label_values(&[reason]).inc();
}

pub fn inc_upstream_failure(stage: &str) {
    UPSTREAM_FAILURES.with_label_values(&[stage]).inc();
}

pub fn observe_order_latency(duration_sec: f64) {
    ORDER_LATENCY.observe(duration_sec);
}

pub fn inc_chat_command(intent: &str) {
    CHAT_COMMANDS.with_label_values(&[intent]).inc();
}

pub fn inc_notify_failures() {
    NOTIFY_FAILURES.inc();
}

/// Prometheus text exposition of the default registry.
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
