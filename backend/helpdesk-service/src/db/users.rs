/// User database operations
use crate::models::{Page, ProfileUpdate, User, UserProfile, UserRole, UserStatus};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

const PROFILE_COLUMNS: &str = "id, username, full_name, role, department, avatar_url";

/// Values for a new row; callers normalise and hash beforehand.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCounts {
    pub total: i64,
    pub active: i64,
    pub customers: i64,
    pub agents: i64,
    pub admins: i64,
    pub new_24h: i64,
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// True if another account already uses `email`.
pub async fn email_taken(
    pool: &PgPool,
    email: &str,
    exclude: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(email)
    .bind(exclude)
    .fetch_one(pool)
    .await
}

/// True if another account already uses `username`.
pub async fn username_taken(
    pool: &PgPool,
    username: &str,
    exclude: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(username)
    .bind(exclude)
    .fetch_one(pool)
    .await
}

pub async fn create(pool: &PgPool, new_user: NewUser) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, email, full_name, role, status, phone, department,
                           avatar_url, password_hash)
        VALUES ($1, $2, $3, $4, $5, 'active', $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&new_user.username)
    .bind(&new_user.email)
    .bind(&new_user.full_name)
    .bind(new_user.role.as_str())
    .bind(&new_user.phone)
    .bind(&new_user.department)
    .bind(&new_user.avatar_url)
    .bind(&new_user.password_hash)
    .fetch_one(pool)
    .await
}

/// Apply the non-empty fields of `update`; role and status only when given.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    update: &ProfileUpdate,
    role: Option<UserRole>,
    status: Option<UserStatus>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            username = COALESCE($2, username),
            email = COALESCE($3, email),
            full_name = COALESCE($4, full_name),
            phone = COALESCE($5, phone),
            department = COALESCE($6, department),
            avatar_url = COALESCE($7, avatar_url),
            role = COALESCE($8, role),
            status = COALESCE($9, status),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&update.username)
    .bind(&update.email)
    .bind(&update.full_name)
    .bind(&update.phone)
    .bind(&update.department)
    .bind(&update.avatar_url)
    .bind(role.map(|r| r.as_str()))
    .bind(status.map(|s| s.as_str()))
    .fetch_optional(pool)
    .await
}

pub async fn update_password(
    pool: &PgPool,
    id: Uuid,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn record_login(pool: &PgPool, id: Uuid) -> Result<DateTime<Utc>, sqlx::Error> {
    sqlx::query_scalar::<_, DateTime<Utc>>(
        "UPDATE users SET last_login = NOW() WHERE id = $1 RETURNING last_login",
    )
    .bind(id)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn find_profile(pool: &PgPool, id: Uuid) -> Result<Option<UserProfile>, sqlx::Error> {
    sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Profiles for a set of ids, keyed by id. Unknown ids are skipped.
pub async fn profiles_by_ids(
    pool: &PgPool,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, UserProfile>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let profiles = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(profiles.into_iter().map(|p| (p.id, p)).collect())
}

/// Active agents and admins, for assignment pickers
pub async fn list_staff(pool: &PgPool) -> Result<Vec<UserProfile>, sqlx::Error> {
    sqlx::query_as::<_, UserProfile>(&format!(
        r#"
        SELECT {PROFILE_COLUMNS} FROM users
        WHERE role IN ('agent', 'admin') AND status = 'active'
        ORDER BY full_name
        "#
    ))
    .fetch_all(pool)
    .await
}

/// Ids of active users holding any of `roles`
pub async fn active_ids_with_roles(
    pool: &PgPool,
    roles: &[UserRole],
) -> Result<Vec<Uuid>, sqlx::Error> {
    let roles: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
    sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM users WHERE role = ANY($1) AND status = 'active' ORDER BY created_at",
    )
    .bind(&roles)
    .fetch_all(pool)
    .await
}

pub async fn list(
    pool: &PgPool,
    filter: &UserFilter,
    page: Page,
) -> Result<Vec<User>, sqlx::Error> {
    let pattern = filter.search.as_ref().map(|s| format!("%{}%", s.trim()));
    sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE ($1::varchar IS NULL OR role = $1)
          AND ($2::varchar IS NULL OR status = $2)
          AND ($3::varchar IS NULL
               OR full_name ILIKE $3 OR email ILIKE $3 OR username ILIKE $3)
        ORDER BY created_at DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(filter.role.map(|r| r.as_str()))
    .bind(filter.status.map(|s| s.as_str()))
    .bind(pattern)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
}

pub async fn counts(pool: &PgPool) -> Result<UserCounts, sqlx::Error> {
    sqlx::query_as::<_, UserCounts>(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE status = 'active') AS active,
            COUNT(*) FILTER (WHERE role = 'customer') AS customers,
            COUNT(*) FILTER (WHERE role = 'agent') AS agents,
            COUNT(*) FILTER (WHERE role = 'admin') AS admins,
            COUNT(*) FILTER (WHERE created_at >= NOW() - INTERVAL '24 hours') AS new_24h
        FROM users
        "#,
    )
    .fetch_one(pool)
    .await
}
