use crate::error::AppError;
use db_pool::env_utils::{parse_env_list, parse_env_with_default};
use db_pool::DbConfig;
use std::env;

pub const SERVICE_NAME: &str = "helpdesk-service";

const DEFAULT_CORS_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:8000",
    "http://127.0.0.1:8000",
];

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: DbConfig,
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub cors_origins: Vec<String>,
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub ws_heartbeat_interval_secs: u64,
    pub ws_client_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let database = DbConfig::from_env(SERVICE_NAME).map_err(AppError::Config)?;

        let jwt_secret = env::var("JWT_SECRET")
            .or_else(|_| env::var("SECRET_KEY"))
            .map_err(|_| AppError::Config("JWT_SECRET must be set".into()))?;
        if jwt_secret.trim().is_empty() {
            return Err(AppError::Config("JWT_SECRET must not be empty".into()));
        }
        if jwt_secret.len() < 32 {
            tracing::warn!("JWT_SECRET is shorter than 32 bytes");
        }

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_env_with_default("PORT", 8000),
            database,
            jwt_secret,
            access_token_expire_minutes: parse_env_with_default("ACCESS_TOKEN_EXPIRE_MINUTES", 30),
            cors_origins: parse_env_list("CORS_ORIGINS").unwrap_or_else(|| {
                DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect()
            }),
            default_page_size: parse_env_with_default("DEFAULT_PAGE_SIZE", 20),
            max_page_size: parse_env_with_default("MAX_PAGE_SIZE", 100),
            ws_heartbeat_interval_secs: parse_env_with_default("WS_HEARTBEAT_INTERVAL_SECS", 5),
            ws_client_timeout_secs: parse_env_with_default("WS_CLIENT_TIMEOUT_SECS", 30),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.access_token_expire_minutes <= 0 {
            return Err(AppError::Config(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be positive".into(),
            ));
        }
        if self.default_page_size < 1 || self.default_page_size > self.max_page_size {
            return Err(AppError::Config(
                "DEFAULT_PAGE_SIZE must be between 1 and MAX_PAGE_SIZE".into(),
            ));
        }
        if self.ws_heartbeat_interval_secs == 0
            || self.ws_client_timeout_secs <= self.ws_heartbeat_interval_secs
        {
            return Err(AppError::Config(
                "WS_CLIENT_TIMEOUT_SECS must exceed WS_HEARTBEAT_INTERVAL_SECS".into(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Seconds a freshly issued access token stays valid
    pub fn token_ttl_secs(&self) -> i64 {
        self.access_token_expire_minutes * 60
    }

    /// Configuration for tests and tools that do not read the environment.
    pub fn for_database(database_url: &str, jwt_secret: &str) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            database: DbConfig {
                service_name: SERVICE_NAME.into(),
                database_url: database_url.into(),
                ..DbConfig::default()
            },
            jwt_secret: jwt_secret.into(),
            access_token_expire_minutes: 30,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            default_page_size: 20,
            max_page_size: 100,
            ws_heartbeat_interval_secs: 5,
            ws_client_timeout_secs: 30,
        }
    }
}
