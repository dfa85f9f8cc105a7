//! # Actix Middleware Library
//!
//! Shared middleware components for the help desk Actix services
//!
//! ## Modules
//! - `jwt_auth`: JWT authentication middleware and `UserId` extractor
//! - `metrics`: Prometheus HTTP metrics middleware
//! - `logging`: request/response logging
//! - `correlation_id`: `x-correlation-id` propagation

pub mod correlation_id;
pub mod jwt_auth;
pub mod logging;
pub mod metrics;

pub use correlation_id::{get_correlation_id, CorrelationId, CorrelationIdMiddleware};
pub use jwt_auth::{JwtAuthMiddleware, UserId};
pub use logging::Logging;
pub use metrics::MetricsMiddleware;
