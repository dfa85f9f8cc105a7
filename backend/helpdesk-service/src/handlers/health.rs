use crate::metrics;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::json;
use std::time::Duration;

const DB_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// GET /
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Help Desk System API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

/// GET /api/health
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let probe = sqlx::query("SELECT 1").execute(&state.db);
    let database_ok = matches!(
        tokio::time::timeout(DB_CHECK_TIMEOUT, probe).await,
        Ok(Ok(_))
    );

    if !database_ok {
        tracing::warn!("health check: database unreachable");
    }

    HttpResponse::Ok().json(json!({
        "status": if database_ok { "healthy" } else { "degraded" },
        "database": if database_ok { "connected" } else { "disconnected" },
        "timestamp": Utc::now(),
    }))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(root))
        .route("/api/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics::serve_metrics));
}
