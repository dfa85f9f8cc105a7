/// Registration, login and self-service account handlers
use crate::db;
use crate::db::users::NewUser;
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::{
    PasswordChange, ProfileUpdate, TokenResponse, UserCreate, UserLogin, UserResponse, UserRole,
};
use crate::security::validators::{
    normalize_email, normalize_username, validate_password_strength, validate_phone,
};
use crate::security::{hash_password, verify_password};
use crate::state::AppState;
use actix_middleware::JwtAuthMiddleware;
use actix_web::{web, HttpResponse};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Validate and normalise a profile change, rejecting a username or email
/// that belongs to another account.
pub(crate) async fn prepare_profile_update(
    pool: &PgPool,
    user_id: Uuid,
    mut update: ProfileUpdate,
) -> AppResult<ProfileUpdate> {
    update.validate()?;

    if let Some(username) = update.username.as_deref() {
        let username = normalize_username(username)?;
        if db::users::username_taken(pool, &username, Some(user_id)).await? {
            return Err(AppError::BadRequest("Username already taken".into()));
        }
        update.username = Some(username);
    }
    if let Some(email) = update.email.as_deref() {
        let email = normalize_email(email);
        if db::users::email_taken(pool, &email, Some(user_id)).await? {
            return Err(AppError::BadRequest("Email already registered".into()));
        }
        update.email = Some(email);
    }
    if let Some(phone) = update.phone.as_deref() {
        validate_phone(phone)?;
    }
    Ok(update)
}

/// Create an account from validated input. Used by sign-up and tooling.
pub async fn create_account(pool: &PgPool, input: UserCreate, role: UserRole) -> AppResult<UserResponse> {
    let input = UserCreate {
        full_name: input.full_name.trim().to_string(),
        ..input
    };
    input.validate()?;
    validate_password_strength(&input.password)?;
    if let Some(phone) = input.phone.as_deref() {
        validate_phone(phone)?;
    }

    let username = normalize_username(&input.username)?;
    let email = normalize_email(&input.email);

    if db::users::email_taken(pool, &email, None).await? {
        return Err(AppError::BadRequest("Email already registered".into()));
    }
    if db::users::username_taken(pool, &username, None).await? {
        return Err(AppError::BadRequest("Username already taken".into()));
    }

    let password_hash = hash_password(&input.password).await?;
    let user = db::users::create(
        pool,
        NewUser {
            username,
            email,
            full_name: input.full_name,
            password_hash,
            role,
            phone: input.phone,
            department: input.department,
            avatar_url: input.avatar_url,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "user registered");
    Ok(user.into())
}

/// POST /api/auth/register
///
/// Public sign-up always creates customers.
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<UserCreate>,
) -> AppResult<HttpResponse> {
    let user = create_account(&state.db, body.into_inner(), UserRole::Customer).await?;
    Ok(HttpResponse::Created().json(user))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<UserLogin>,
) -> AppResult<HttpResponse> {
    let credentials = body.into_inner();
    credentials.validate()?;

    let invalid = || AppError::Unauthorized("Incorrect email or password".into());

    let mut user = db::users::find_by_email(&state.db, &normalize_email(&credentials.email))
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&credentials.password, &user.password_hash).await? {
        tracing::info!(user_id = %user.id, "login rejected: bad password");
        return Err(invalid());
    }
    if !user.is_active() {
        return Err(AppError::Forbidden("Account is not active".into()));
    }

    let minutes = state.config.access_token_expire_minutes;
    let access_token = crypto_core::jwt::generate_access_token(user.id, &user.email, minutes)?;
    user.last_login = Some(db::users::record_login(&state.db, user.id).await?);

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(HttpResponse::Ok().json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: state.config.token_ttl_secs(),
        user: user.into(),
    }))
}

/// GET /api/auth/me
pub async fn me(current: CurrentUser) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(UserResponse::from(current.into_inner())))
}

/// PUT /api/auth/me
pub async fn update_me(
    state: web::Data<AppState>,
    current: CurrentUser,
    body: web::Json<ProfileUpdate>,
) -> AppResult<HttpResponse> {
    let user = current.into_inner();
    let update = prepare_profile_update(&state.db, user.id, body.into_inner()).await?;

    let updated = db::users::update(&state.db, user.id, &update, None, None)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}

/// POST /api/auth/change-password
pub async fn change_password(
    state: web::Data<AppState>,
    current: CurrentUser,
    body: web::Json<PasswordChange>,
) -> AppResult<HttpResponse> {
    let change = body.into_inner();
    change.validate()?;
    validate_password_strength(&change.new_password)?;

    let user = current.into_inner();
    if !verify_password(&change.current_password, &user.password_hash).await? {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }

    let password_hash = hash_password(&change.new_password).await?;
    db::users::update_password(&state.db, user.id, &password_hash).await?;

    tracing::info!(user_id = %user.id, "password changed");
    Ok(HttpResponse::Ok().json(json!({ "message": "Password changed successfully" })))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .service(
                web::resource("/me")
                    .wrap(JwtAuthMiddleware)
                    .route(web::get().to(me))
                    .route(web::put().to(update_me)),
            )
            .service(
                web::resource("/change-password")
                    .wrap(JwtAuthMiddleware)
                    .route(web::post().to(change_password)),
            ),
    );
}
