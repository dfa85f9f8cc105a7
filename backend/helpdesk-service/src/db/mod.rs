//! PostgreSQL access: pool setup, migrations and per-table queries.

pub mod messages;
pub mod notifications;
pub mod tickets;
pub mod users;

use crate::config::Config;
use db_pool::create_pool;
use sqlx::migrate::Migrator;
use sqlx::PgPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn init_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    config.database.log_config();
    let pool = create_pool(config.database.clone()).await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

/// Count rows grouped by a text column, e.g. tickets per category.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct GroupCount {
    pub key: String,
    pub count: i64,
}

pub(crate) fn into_map(rows: Vec<GroupCount>) -> std::collections::HashMap<String, i64> {
    rows.into_iter().map(|r| (r.key, r.count)).collect()
}
