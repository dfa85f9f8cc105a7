/// Administration handlers, admins only
use super::auth::prepare_profile_update;
use super::tickets::{new_ticket, ticket_response, ticket_responses};
use crate::db;
use crate::db::users::UserFilter;
use crate::error::{AppError, AppResult};
use crate::middleware::AdminUser;
use crate::models::{
    AdminUserUpdate, NotificationCreate, NotificationType, Page, PaginatedTickets, ProfileUpdate,
    TicketCreate, TicketFilter, TicketListQuery, UserResponse, UserRole, UserStatus,
};
use crate::state::AppState;
use actix_middleware::JwtAuthMiddleware;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleQuery {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: UserStatus,
}

#[derive(Debug, Deserialize)]
pub struct TargetUserQuery {
    pub user_id: Uuid,
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".into())
}

/// GET /api/admin/users
pub async fn list_users(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<UserListQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let page = Page::resolve(query.page, query.per_page, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)?;
    let filter = UserFilter {
        role: query.role,
        status: query.status,
        search: query.search.filter(|s| !s.trim().is_empty()),
    };

    let users = db::users::list(&state.db, &filter, page).await?;
    let users: Vec<UserResponse> = users.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(users))
}

/// GET /api/admin/users/{user_id}
pub async fn get_user(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let user = db::users::find_by_id(&state.db, path.into_inner())
        .await?
        .ok_or_else(user_not_found)?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// PUT /api/admin/users/{user_id}
pub async fn update_user(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<AdminUserUpdate>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    if db::users::find_by_id(&state.db, user_id).await?.is_none() {
        return Err(user_not_found());
    }

    let AdminUserUpdate {
        profile,
        role,
        status,
    } = body.into_inner();
    let profile = prepare_profile_update(&state.db, user_id, profile).await?;

    let updated = db::users::update(&state.db, user_id, &profile, role, status)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}

/// PUT /api/admin/users/{user_id}/role?role=
pub async fn update_user_role(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<Uuid>,
    query: web::Query<RoleQuery>,
) -> AppResult<HttpResponse> {
    let role = query.role;
    let user = db::users::update(
        &state.db,
        path.into_inner(),
        &ProfileUpdate::default(),
        Some(role),
        None,
    )
    .await?
    .ok_or_else(user_not_found)?;

    tracing::info!(user_id = %user.id, %role, by = %admin.0.id, "user role changed");
    Ok(HttpResponse::Ok().json(json!({ "message": format!("User role updated to {role}") })))
}

/// PUT /api/admin/users/{user_id}/status?status=
pub async fn update_user_status(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<Uuid>,
    query: web::Query<StatusQuery>,
) -> AppResult<HttpResponse> {
    let status = query.status;
    let user = db::users::update(
        &state.db,
        path.into_inner(),
        &ProfileUpdate::default(),
        None,
        Some(status),
    )
    .await?
    .ok_or_else(user_not_found)?;

    tracing::info!(user_id = %user.id, %status, by = %admin.0.id, "user status changed");
    Ok(HttpResponse::Ok().json(json!({ "message": format!("User status updated to {status}") })))
}

/// DELETE /api/admin/users/{user_id}
pub async fn delete_user(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    if user_id == admin.0.id {
        return Err(AppError::BadRequest("Cannot delete your own account".into()));
    }
    if !db::users::delete(&state.db, user_id).await? {
        return Err(user_not_found());
    }

    tracing::info!(user_id = %user_id, by = %admin.0.id, "user deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/admin/stats/system
pub async fn system_stats(state: web::Data<AppState>, _admin: AdminUser) -> AppResult<HttpResponse> {
    let users = db::users::counts(&state.db).await?;
    let tickets = db::tickets::counts(&state.db).await?;
    let messages = db::messages::counts(&state.db).await?;

    Ok(HttpResponse::Ok().json(json!({
        "users": {
            "total": users.total,
            "active": users.active,
            "customers": users.customers,
            "agents": users.agents,
            "admins": users.admins,
        },
        "tickets": {
            "total": tickets.total,
            "open": tickets.open,
            "resolved": tickets.resolved,
        },
        "messages": {
            "total": messages.total,
        },
        "recent_activity": {
            "new_users_24h": users.new_24h,
            "new_tickets_24h": tickets.new_24h,
            "new_messages_24h": messages.new_24h,
        },
    })))
}

/// GET /api/admin/tickets/all
pub async fn all_tickets(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<TicketListQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let page = Page::resolve(query.page, query.per_page, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)?;
    let filter = TicketFilter {
        created_by: None,
        status: query.status,
        priority: query.priority,
        category: query.category,
        search: query.search,
    };

    let total = db::tickets::count(&state.db, &filter).await?;
    let tickets = db::tickets::list(&state.db, &filter, page).await?;

    Ok(HttpResponse::Ok().json(PaginatedTickets {
        tickets: ticket_responses(&state.db, tickets).await?,
        meta: page.meta(total),
    }))
}

/// POST /api/admin/tickets?user_id=
///
/// Opens a ticket on behalf of a user and tells them about it.
pub async fn create_ticket_for_user(
    state: web::Data<AppState>,
    admin: AdminUser,
    query: web::Query<TargetUserQuery>,
    body: web::Json<TicketCreate>,
) -> AppResult<HttpResponse> {
    let AdminUser(admin) = admin;
    let ticket = new_ticket(body.into_inner(), query.user_id, Some(admin.id))?;

    let target = db::users::find_by_id(&state.db, query.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Target user not found".into()))?;

    let ticket = db::tickets::create(&state.db, ticket).await?;
    tracing::info!(ticket_id = %ticket.id, user_id = %target.id, by = %admin.id, "ticket created on behalf of user");

    state.notifications.notify_new_ticket(&ticket, Some(&target)).await;

    let notice = NotificationCreate {
        user_id: target.id,
        title: "New Ticket Created".to_string(),
        message: format!(
            "A support ticket '{}' has been created for you by {}",
            ticket.title, admin.full_name
        ),
        notification_type: NotificationType::TicketCreated,
        priority: Default::default(),
        ticket_id: Some(ticket.id),
        metadata: Some(json!({
            "ticket_id": ticket.id,
            "created_by_admin": {
                "id": admin.id,
                "name": admin.full_name,
                "username": admin.username,
            }
        })),
    };
    if let Err(e) = state.notifications.create_and_broadcast(notice).await {
        tracing::error!(error = %e, ticket_id = %ticket.id, "failed to notify ticket owner");
    }

    Ok(HttpResponse::Created().json(ticket_response(&state.db, ticket).await?))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin")
            .wrap(JwtAuthMiddleware)
            .route("/users", web::get().to(list_users))
            .route("/users/{user_id}/role", web::put().to(update_user_role))
            .route("/users/{user_id}/status", web::put().to(update_user_status))
            .service(
                web::resource("/users/{user_id}")
                    .route(web::get().to(get_user))
                    .route(web::put().to(update_user))
                    .route(web::delete().to(delete_user)),
            )
            .route("/stats/system", web::get().to(system_stats))
            .route("/tickets/all", web::get().to(all_tickets))
            .route("/tickets", web::post().to(create_ticket_for_user)),
    );
}
