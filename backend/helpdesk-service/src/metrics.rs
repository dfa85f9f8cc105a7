use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, TextEncoder};

pub static WS_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "helpdesk_ws_connections",
        "Live WebSocket connections held by the registry",
    )
    .expect("failed to create helpdesk_ws_connections");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register helpdesk_ws_connections");
    gauge
});

pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "helpdesk_ws_messages_sent_total",
            "Frames handed to WebSocket sessions, by frame type",
        ),
        &["type"],
    )
    .expect("failed to create helpdesk_ws_messages_sent_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register helpdesk_ws_messages_sent_total");
    counter
});

pub static NOTIFICATIONS_CREATED: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "helpdesk_notifications_created_total",
            "Notifications persisted, by notification type",
        ),
        &["type"],
    )
    .expect("failed to create helpdesk_notifications_created_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register helpdesk_notifications_created_total");
    counter
});

pub async fn serve_metrics() -> HttpResponse {
    // Touch the statics so they appear before the first event.
    Lazy::force(&WS_CONNECTIONS);
    Lazy::force(&WS_MESSAGES_SENT);
    Lazy::force(&NOTIFICATIONS_CREATED);

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
