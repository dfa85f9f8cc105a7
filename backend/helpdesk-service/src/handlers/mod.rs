//! HTTP handlers, one module per API area
//!
//! Each module exposes `register_routes`; `configure` wires all of them
//! together with the extractor configs so every error shares one body shape.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod health;
pub mod notifications;
pub mod tickets;
pub mod users;
pub mod websocket;

use crate::error::AppError;
use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{web, HttpRequest};

const JSON_LIMIT: usize = 1024 * 1024;

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    match err {
        JsonPayloadError::Deserialize(e) => AppError::Validation(e.to_string()).into(),
        JsonPayloadError::ContentType => {
            AppError::BadRequest("Content-Type must be application/json".into()).into()
        }
        other => AppError::BadRequest(other.to_string()).into(),
    }
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(err.to_string()).into()
}

fn path_error(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(error = %err, "rejected path parameter");
    AppError::BadRequest("Invalid ID format".into()).into()
}

/// Register every route plus the JSON, query and path extractor configs.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_LIMIT)
            .error_handler(json_error),
    )
    .app_data(web::QueryConfig::default().error_handler(query_error))
    .app_data(web::PathConfig::default().error_handler(path_error));

    health::register_routes(cfg);
    auth::register_routes(cfg);
    users::register_routes(cfg);
    tickets::register_routes(cfg);
    chat::register_routes(cfg);
    notifications::register_routes(cfg);
    admin::register_routes(cfg);
    websocket::register_routes(cfg);
}
