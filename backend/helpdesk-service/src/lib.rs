//! Help desk service
//!
//! Ticketing API for customers, agents and admins with threaded ticket
//! conversations, persisted notifications and real-time WebSocket delivery.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod security;
pub mod services;
pub mod state;
pub mod websocket;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use services::NotificationService;
pub use state::AppState;
pub use websocket::ConnectionManager;
