use crate::db;
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::state::AppState;
use actix_middleware::JwtAuthMiddleware;
use actix_web::{web, HttpResponse};
use uuid::Uuid;

/// GET /api/users/agents
///
/// Active agents and admins, for assignment pickers.
pub async fn list_agents(state: web::Data<AppState>, _current: CurrentUser) -> AppResult<HttpResponse> {
    let staff = db::users::list_staff(&state.db).await?;
    Ok(HttpResponse::Ok().json(staff))
}

/// GET /api/users/{user_id}
pub async fn get_user(
    state: web::Data<AppState>,
    _current: CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let profile = db::users::find_profile(&state.db, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(HttpResponse::Ok().json(profile))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users")
            .wrap(JwtAuthMiddleware)
            .route("/agents", web::get().to(list_agents))
            .route("/{user_id}", web::get().to(get_user)),
    );
}
