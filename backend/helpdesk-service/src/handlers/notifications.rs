/// Notification inbox and staff notification tooling
use super::tickets::load_ticket;
use crate::db;
use crate::error::{AppError, AppResult};
use crate::middleware::{AgentOrAdmin, CurrentUser};
use crate::models::{
    AdminNotificationQuery, BulkNotificationUpdate, CleanupQuery, CleanupResult,
    NotificationCreate, NotificationFilter, NotificationListQuery, NotificationPriority,
    NotificationResponse, NotificationType, Page, PaginatedNotifications, SystemAlertResult,
    SystemNotificationCreate, UserRole,
};
use crate::state::AppState;
use actix_middleware::JwtAuthMiddleware;
use actix_web::{web, HttpResponse};
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

const ADMIN_DEFAULT_PAGE_SIZE: i64 = 50;
const ADMIN_MAX_PAGE_SIZE: i64 = 200;
const ALERT_SAMPLE_SIZE: usize = 5;

fn not_found() -> AppError {
    AppError::NotFound("Notification not found".into())
}

fn marked_read() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Notification marked as read" }))
}

/// GET /api/notifications
pub async fn list_notifications(
    state: web::Data<AppState>,
    current: CurrentUser,
    query: web::Query<NotificationListQuery>,
) -> AppResult<HttpResponse> {
    let page = Page::resolve(
        query.page,
        query.per_page,
        state.config.default_page_size,
        state.config.max_page_size,
    )?;
    let user_id = current.0.id;

    let total = db::notifications::count_for_user(&state.db, user_id, query.unread_only).await?;
    let unread_count = db::notifications::count_for_user(&state.db, user_id, true).await?;
    let notifications =
        db::notifications::list_for_user(&state.db, user_id, query.unread_only, page).await?;

    Ok(HttpResponse::Ok().json(PaginatedNotifications {
        notifications: notifications.into_iter().map(Into::into).collect(),
        unread_count,
        meta: page.meta(total),
    }))
}

/// GET /api/notifications/stats/overview
pub async fn notification_stats(
    state: web::Data<AppState>,
    current: CurrentUser,
) -> AppResult<HttpResponse> {
    let stats = db::notifications::stats_for_user(&state.db, current.0.id).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// GET /api/notifications/{notification_id}
pub async fn get_notification(
    state: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let notification = db::notifications::find_for_user(&state.db, path.into_inner(), current.0.id)
        .await?
        .ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(NotificationResponse::from(notification)))
}

/// PUT /api/notifications/{notification_id}/read
pub async fn mark_read(
    state: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    db::notifications::mark_read(&state.db, path.into_inner(), Some(current.0.id))
        .await?
        .ok_or_else(not_found)?;
    Ok(marked_read())
}

/// PUT /api/notifications/admin/{notification_id}/read
///
/// Staff may clear any user's notification.
pub async fn mark_read_as_staff(
    state: web::Data<AppState>,
    _staff: AgentOrAdmin,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    db::notifications::mark_read(&state.db, path.into_inner(), None)
        .await?
        .ok_or_else(not_found)?;
    Ok(marked_read())
}

/// POST /api/notifications/mark-all-read
pub async fn mark_all_read(
    state: web::Data<AppState>,
    current: CurrentUser,
) -> AppResult<HttpResponse> {
    let updated = db::notifications::mark_all_read(&state.db, current.0.id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Marked {updated} notifications as read")
    })))
}

/// POST /api/notifications/bulk-update
pub async fn bulk_update(
    state: web::Data<AppState>,
    current: CurrentUser,
    body: web::Json<BulkNotificationUpdate>,
) -> AppResult<HttpResponse> {
    let BulkNotificationUpdate {
        notification_ids,
        is_read,
    } = body.into_inner();

    let updated =
        db::notifications::set_read_state(&state.db, current.0.id, &notification_ids, is_read)
            .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": format!("Updated {updated} notifications") })))
}

/// DELETE /api/notifications/{notification_id}
pub async fn delete_notification(
    state: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    if !db::notifications::delete_for_user(&state.db, path.into_inner(), current.0.id).await? {
        return Err(not_found());
    }
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/notifications/create
pub async fn create_notification(
    state: web::Data<AppState>,
    staff: AgentOrAdmin,
    body: web::Json<NotificationCreate>,
) -> AppResult<HttpResponse> {
    let create = body.into_inner();
    create.validate()?;

    if db::users::find_by_id(&state.db, create.user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }
    if let Some(ticket_id) = create.ticket_id {
        load_ticket(&state.db, ticket_id).await?;
    }

    let notification = state.notifications.create_and_broadcast(create).await?;
    tracing::info!(
        notification_id = %notification.id,
        recipient = %notification.user_id,
        by = %staff.0.id,
        "notification created"
    );
    Ok(HttpResponse::Created().json(NotificationResponse::from(notification)))
}

/// Parsed target roles, duplicates dropped, in first-seen order.
fn alert_roles(requested: &[String]) -> Vec<UserRole> {
    let mut roles: Vec<UserRole> = Vec::new();
    for role in requested.iter().filter_map(|r| r.parse::<UserRole>().ok()) {
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    roles
}

/// GET /api/notifications/admin/all
pub async fn list_all_notifications(
    state: web::Data<AppState>,
    _staff: AgentOrAdmin,
    query: web::Query<AdminNotificationQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let page = Page::resolve(
        query.page,
        query.per_page,
        ADMIN_DEFAULT_PAGE_SIZE,
        ADMIN_MAX_PAGE_SIZE,
    )?;

    let since = match query.days_back {
        Some(days) if !(1..=365).contains(&days) => {
            return Err(AppError::Validation(
                "days_back must be between 1 and 365".into(),
            ))
        }
        Some(days) => Some(Utc::now() - Duration::days(days)),
        None => None,
    };

    let filter = NotificationFilter {
        user_id: query.user_id,
        notification_type: query.notification_type,
        priority: query.priority,
        unread_only: query.unread_only,
        since,
    };

    let total = db::notifications::count_all(&state.db, &filter).await?;
    let unread_count = db::notifications::count_all(
        &state.db,
        &NotificationFilter {
            unread_only: true,
            ..filter.clone()
        },
    )
    .await?;
    let rows = db::notifications::list_all(&state.db, &filter, page).await?;

    Ok(HttpResponse::Ok().json(PaginatedNotifications {
        notifications: rows.into_iter().map(Into::into).collect(),
        unread_count,
        meta: page.meta(total),
    }))
}

/// POST /api/notifications/admin/system-alert
pub async fn system_alert(
    state: web::Data<AppState>,
    staff: AgentOrAdmin,
    body: web::Json<SystemNotificationCreate>,
) -> AppResult<HttpResponse> {
    let alert = body.into_inner();
    alert.validate()?;
    let AgentOrAdmin(sender) = staff;

    let priority: NotificationPriority = alert.priority.parse().map_err(|_| {
        AppError::BadRequest("Priority must be one of: low, medium, high, urgent".into())
    })?;

    let invalid: Vec<&str> = alert
        .target_roles
        .iter()
        .filter(|r| r.parse::<UserRole>().is_err())
        .map(String::as_str)
        .collect();
    if !invalid.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Invalid roles: {}. Valid roles are: customer, agent, admin",
            invalid.join(", ")
        )));
    }
    let roles = alert_roles(&alert.target_roles);

    let recipients = db::users::active_ids_with_roles(&state.db, &roles).await?;
    if recipients.is_empty() {
        return Err(AppError::NotFound(
            "No active users found with specified roles".into(),
        ));
    }

    let metadata = json!({
        "system_alert": true,
        "created_by": {
            "id": sender.id,
            "username": sender.username,
            "full_name": sender.full_name,
        }
    });

    let mut created = Vec::with_capacity(recipients.len());
    for user_id in recipients {
        let notification = state
            .notifications
            .create_and_broadcast(NotificationCreate {
                user_id,
                title: alert.title.clone(),
                message: alert.message.clone(),
                notification_type: NotificationType::SystemAlert,
                priority,
                ticket_id: None,
                metadata: Some(metadata.clone()),
            })
            .await?;
        created.push(notification.id);
    }

    tracing::info!(count = created.len(), by = %sender.id, "system alert sent");
    Ok(HttpResponse::Ok().json(SystemAlertResult {
        message: format!("System notification sent to {} users", created.len()),
        target_count: created.len(),
        target_roles: roles,
        notification_id_sample: created.into_iter().take(ALERT_SAMPLE_SIZE).collect(),
    }))
}

/// GET /api/notifications/admin/stats/system
pub async fn system_stats(
    state: web::Data<AppState>,
    _staff: AgentOrAdmin,
) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(db::notifications::system_stats(&state.db).await?))
}

/// DELETE /api/notifications/admin/cleanup
///
/// Removes read notifications older than `days_old`. Dry run by default.
pub async fn cleanup(
    state: web::Data<AppState>,
    staff: AgentOrAdmin,
    query: web::Query<CleanupQuery>,
) -> AppResult<HttpResponse> {
    if staff.0.role != UserRole::Admin {
        return Err(AppError::Forbidden(
            "Only admins can perform notification cleanup".into(),
        ));
    }

    let CleanupQuery { days_old, dry_run } = query.into_inner();
    if !(7..=365).contains(&days_old) {
        return Err(AppError::Validation(
            "days_old must be between 7 and 365".into(),
        ));
    }

    let cutoff_date = Utc::now() - Duration::days(days_old);
    let result = if dry_run {
        let count = db::notifications::count_read_before(&state.db, cutoff_date).await?;
        CleanupResult {
            dry_run,
            notifications_to_delete: Some(count.max(0) as u64),
            notifications_deleted: None,
            cutoff_date,
            days_old,
            message: format!(
                "Would delete {count} read notifications older than {days_old} days"
            ),
        }
    } else {
        let deleted = db::notifications::delete_read_before(&state.db, cutoff_date).await?;
        tracing::info!(deleted, days_old, by = %staff.0.id, "notification cleanup");
        CleanupResult {
            dry_run,
            notifications_to_delete: None,
            notifications_deleted: Some(deleted),
            cutoff_date,
            days_old,
            message: format!("Successfully deleted {deleted} old notifications"),
        }
    };

    Ok(HttpResponse::Ok().json(result))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/notifications")
            .wrap(JwtAuthMiddleware)
            .route("", web::get().to(list_notifications))
            .route("/", web::get().to(list_notifications))
            .route("/stats/overview", web::get().to(notification_stats))
            .route("/mark-all-read", web::post().to(mark_all_read))
            .route("/bulk-update", web::post().to(bulk_update))
            .route("/create", web::post().to(create_notification))
            .route("/admin/all", web::get().to(list_all_notifications))
            .route("/admin/system-alert", web::post().to(system_alert))
            .route("/admin/stats/system", web::get().to(system_stats))
            .route("/admin/cleanup", web::delete().to(cleanup))
            .route("/admin/{notification_id}/read", web::put().to(mark_read_as_staff))
            .route("/{notification_id}/read", web::put().to(mark_read))
            .service(
                web::resource("/{notification_id}")
                    .route(web::get().to(get_notification))
                    .route(web::delete().to(delete_notification)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_roles_drop_non_adjacent_duplicates() {
        let requested: Vec<String> = ["admin", "agent", "admin", "agent"]
            .iter()
            .map(|r| r.to_string())
            .collect();
        assert_eq!(alert_roles(&requested), vec![UserRole::Admin, UserRole::Agent]);
    }
}
