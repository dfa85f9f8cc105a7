use crate::config::Config;
use crate::services::NotificationService;
use crate::websocket::ConnectionManager;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared handles passed to every handler as `web::Data<AppState>`
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub connections: ConnectionManager,
    pub notifications: NotificationService,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Arc<Config>) -> Self {
        let connections = ConnectionManager::new();
        let notifications = NotificationService::new(db.clone(), connections.clone());
        Self {
            db,
            connections,
            notifications,
            config,
        }
    }
}
