use actix_cors::Cors;
use actix_middleware::{CorrelationIdMiddleware, Logging, MetricsMiddleware};
use actix_web::{web, App, HttpServer};
use helpdesk_service::{db, handlers, logging, AppState, Config};
use std::io;
use std::sync::Arc;

fn build_cors(origins: &[String]) -> Cors {
    let mut cors = Cors::default();
    let mut any_origin = false;
    for origin in origins.iter().map(|o| o.trim()).filter(|o| !o.is_empty()) {
        if origin == "*" {
            any_origin = true;
            cors = cors.allow_any_origin();
        } else {
            cors = cors.allowed_origin(origin);
        }
    }

    cors = cors.allow_any_method().allow_any_header().max_age(3600);
    // Browsers refuse credentialed requests against a wildcard origin.
    if !any_origin {
        cors = cors.supports_credentials();
    }
    cors
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    logging::init_tracing();

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return Err(io::Error::new(io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting help desk service");

    crypto_core::jwt::initialize_jwt_secret(&config.jwt_secret).map_err(|e| {
        tracing::error!(error = %e, "failed to initialize JWT keys");
        io::Error::new(io::ErrorKind::Other, e.to_string())
    })?;

    let pool = db::init_pool(&config).await.map_err(|e| {
        tracing::error!(error = %e, "database unavailable");
        io::Error::new(io::ErrorKind::Other, "Database connection failed")
    })?;
    tracing::info!("Database connected and migrations applied");

    let state = AppState::new(pool, config.clone());
    let addr = config.bind_address();
    tracing::info!("Starting HTTP server on {}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(build_cors(&state.config.cors_origins))
            .wrap(Logging)
            .wrap(MetricsMiddleware)
            .wrap(CorrelationIdMiddleware)
            .configure(handlers::configure)
    })
    .bind(&addr)?
    .run()
    .await
}
