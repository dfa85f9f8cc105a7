//! Bootstrap an administrator account
//! Run with: cargo run --bin create-admin

use db_pool::{create_pool, DbConfig};
use helpdesk_service::config::SERVICE_NAME;
use helpdesk_service::db::{self, users};
use helpdesk_service::handlers::auth::create_account;
use helpdesk_service::models::{ProfileUpdate, UserCreate, UserResponse, UserRole, UserStatus};
use helpdesk_service::security::hash_password;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let email = std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@helpdesk.com".to_string());
    let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let full_name =
        std::env::var("ADMIN_FULL_NAME").unwrap_or_else(|_| "Administrator".to_string());
    let password = std::env::var("ADMIN_PASSWORD")
        .map_err(|_| anyhow::anyhow!("ADMIN_PASSWORD must be set"))?;

    let mut config = DbConfig::from_env(SERVICE_NAME).map_err(anyhow::Error::msg)?;
    config.max_connections = 1;
    config.min_connections = 1;

    println!("Connecting to database...");
    let pool = create_pool(config).await?;
    db::MIGRATOR.run(&pool).await?;
    println!("Migrations applied");

    let email = email.trim().to_lowercase();
    let admin: UserResponse = match users::find_by_email(&pool, &email).await? {
        Some(existing) => {
            println!("Promoting existing account {}...", existing.id);
            let password_hash = hash_password(&password).await?;
            users::update_password(&pool, existing.id, &password_hash).await?;
            users::update(
                &pool,
                existing.id,
                &ProfileUpdate::default(),
                Some(UserRole::Admin),
                Some(UserStatus::Active),
            )
            .await?
            .ok_or_else(|| anyhow::anyhow!("user {} disappeared during update", existing.id))?
            .into()
        }
        None => {
            println!("Creating new admin...");
            create_account(
                &pool,
                UserCreate {
                    username,
                    email,
                    full_name,
                    password,
                    phone: None,
                    department: Some("IT".to_string()),
                    avatar_url: None,
                },
                UserRole::Admin,
            )
            .await?
        }
    };

    println!("\n========================================");
    println!("Admin Account Ready!");
    println!("========================================");
    println!("Id:       {}", admin.id);
    println!("Email:    {}", admin.email);
    println!("Username: {}", admin.username);
    println!("Role:     {}", admin.role);
    println!("Status:   {}", admin.status);

    Ok(())
}
