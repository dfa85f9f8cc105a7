/// WebSocket upgrade and connection stats
use crate::db;
use crate::models::User;
use crate::state::AppState;
use crate::websocket::{Rejection, WsSession};
use actix_middleware::jwt_auth::bearer_token;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use sqlx::PgPool;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// The query token wins over an `Authorization: Bearer` header.
fn extract_token(params: &WsParams, req: &HttpRequest) -> Option<String> {
    params
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .or_else(|| {
            req.headers()
                .get(actix_web::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(bearer_token)
        })
        .map(str::to_string)
}

/// Resolve the socket's user. Failures are reported over the socket itself.
async fn authenticate(pool: &PgPool, token: Option<String>) -> Result<User, Rejection> {
    let invalid = || Rejection::new("Invalid token", 401);

    let token = token.ok_or_else(invalid)?;
    let user_id = crypto_core::jwt::get_user_id_from_token(&token).map_err(|e| {
        tracing::debug!(error = %e, "websocket token rejected");
        invalid()
    })?;

    let user = match db::users::find_by_id(pool, user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(Rejection::new("User not found", 404)),
        Err(e) => {
            tracing::error!(error = %e, "websocket user lookup failed");
            return Err(Rejection::new("Authentication failed", 500));
        }
    };
    if !user.is_active() {
        return Err(Rejection::new("User account is not active", 403));
    }
    Ok(user)
}

/// GET /ws/connect
///
/// The upgrade always completes; a rejected client gets an error frame and a
/// policy-violation close.
pub async fn connect(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let token = extract_token(&query, &req);
    let auth = authenticate(&state.db, token).await;
    match &auth {
        Ok(user) => tracing::info!(user_id = %user.id, role = %user.role, "websocket connecting"),
        Err(rejection) => tracing::info!(reason = %rejection.message, "websocket rejected"),
    }

    let session = WsSession::new(
        auth,
        state.connections.clone(),
        state.db.clone(),
        Duration::from_secs(state.config.ws_heartbeat_interval_secs),
        Duration::from_secs(state.config.ws_client_timeout_secs),
    );
    ws::start(session, &req, stream)
}

/// GET /ws/stats
pub async fn stats(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.connections.stats().await)
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/ws")
            .route("/connect", web::get().to(connect))
            .route("/stats", web::get().to(stats)),
    );
}
