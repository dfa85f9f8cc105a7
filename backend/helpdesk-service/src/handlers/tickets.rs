/// Ticket handlers
use crate::db;
use crate::db::tickets::NewTicket;
use crate::error::{AppError, AppResult};
use crate::middleware::{ensure_ticket_access, AgentOrAdmin, CurrentUser};
use crate::models::{
    PaginatedTickets, Page, Ticket, TicketAssign, TicketCreate, TicketFilter, TicketListQuery,
    TicketResponse, TicketStatus, TicketUpdate, User, UserRole,
};
use crate::state::AppState;
use actix_middleware::JwtAuthMiddleware;
use actix_web::{web, HttpResponse};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Embed creator and assignee profiles in each ticket.
pub(crate) async fn ticket_responses(
    pool: &PgPool,
    tickets: Vec<Ticket>,
) -> AppResult<Vec<TicketResponse>> {
    let mut ids: Vec<Uuid> = tickets
        .iter()
        .flat_map(|t| [t.created_by, t.assigned_to])
        .flatten()
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let profiles = db::users::profiles_by_ids(pool, &ids).await?;
    Ok(tickets
        .into_iter()
        .map(|t| TicketResponse::from_ticket(t, &profiles))
        .collect())
}

pub(crate) async fn ticket_response(pool: &PgPool, ticket: Ticket) -> AppResult<TicketResponse> {
    let mut responses = ticket_responses(pool, vec![ticket]).await?;
    responses
        .pop()
        .ok_or_else(|| AppError::Internal("ticket response lost".into()))
}

pub(crate) async fn load_ticket(pool: &PgPool, id: Uuid) -> AppResult<Ticket> {
    db::tickets::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".into()))
}

/// A ticket may only be handed to an existing agent or admin.
async fn ensure_assignable(pool: &PgPool, assignee: Uuid) -> AppResult<User> {
    match db::users::find_by_id(pool, assignee).await? {
        Some(user) if user.role.is_staff() => Ok(user),
        _ => Err(AppError::BadRequest("Invalid user assignment".into())),
    }
}

/// Trim the caller's input, then validate what will actually be stored.
pub(crate) fn new_ticket(
    input: TicketCreate,
    created_by: Uuid,
    created_by_admin: Option<Uuid>,
) -> AppResult<NewTicket> {
    let input = TicketCreate {
        title: input.title.trim().to_string(),
        description: input.description.trim().to_string(),
        tags: input
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        ..input
    };
    input.validate()?;

    Ok(NewTicket {
        title: input.title,
        description: input.description,
        category: input.category,
        priority: input.priority,
        created_by,
        created_by_admin,
        tags: input.tags,
        attachments: input.attachments,
    })
}

/// POST /api/tickets
pub async fn create_ticket(
    state: web::Data<AppState>,
    current: CurrentUser,
    body: web::Json<TicketCreate>,
) -> AppResult<HttpResponse> {
    let user = current.into_inner();
    let ticket = new_ticket(body.into_inner(), user.id, None)?;
    let ticket = db::tickets::create(&state.db, ticket).await?;
    tracing::info!(ticket_id = %ticket.id, user_id = %user.id, "ticket created");

    state.notifications.notify_new_ticket(&ticket, Some(&user)).await;

    let response = ticket_response(&state.db, ticket).await?;
    Ok(HttpResponse::Created().json(response))
}

/// GET /api/tickets
///
/// Customers only ever see their own tickets.
pub async fn list_tickets(
    state: web::Data<AppState>,
    current: CurrentUser,
    query: web::Query<TicketListQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let page = Page::resolve(
        query.page,
        query.per_page,
        state.config.default_page_size,
        state.config.max_page_size,
    )?;

    let user = current.into_inner();
    let filter = TicketFilter {
        created_by: (user.role == UserRole::Customer).then_some(user.id),
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

/// GET /api/tickets/{ticket_id}
pub async fn get_ticket(
    state: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let ticket = load_ticket(&state.db, path.into_inner()).await?;
    ensure_ticket_access(&ticket, &current.0, "Not authorized to access this ticket")?;
    Ok(HttpResponse::Ok().json(ticket_response(&state.db, ticket).await?))
}

/// PUT /api/tickets/{ticket_id}
pub async fn update_ticket(
    state: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<Uuid>,
    body: web::Json<TicketUpdate>,
) -> AppResult<HttpResponse> {
    let user = current.into_inner();
    let original = load_ticket(&state.db, path.into_inner()).await?;
    ensure_ticket_access(&original, &user, "Not authorized to update this ticket")?;

    let update = body.into_inner();
    update.validate()?;
    if update.is_empty() {
        return Ok(HttpResponse::Ok().json(ticket_response(&state.db, original).await?));
    }
    if let Some(assignee) = update.assigned_to {
        ensure_assignable(&state.db, assignee).await?;
    }

    let updated = db::tickets::update(&state.db, original.id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".into()))?;

    match update.status {
        Some(TicketStatus::Resolved) if original.status != TicketStatus::Resolved => {
            state
                .notifications
                .notify_ticket_resolved(&updated, &user, updated.resolution_note.as_deref())
                .await;
        }
        Some(new_status) if new_status != original.status => {
            state
                .notifications
                .notify_ticket_status_change(&updated, original.status, new_status, &user)
                .await;
        }
        _ => {}
    }

    Ok(HttpResponse::Ok().json(ticket_response(&state.db, updated).await?))
}

/// POST /api/tickets/{ticket_id}/assign
pub async fn assign_ticket(
    state: web::Data<AppState>,
    staff: AgentOrAdmin,
    path: web::Path<Uuid>,
    body: web::Json<TicketAssign>,
) -> AppResult<HttpResponse> {
    let AgentOrAdmin(user) = staff;
    let original = load_ticket(&state.db, path.into_inner()).await?;
    let assignee = ensure_assignable(&state.db, body.assigned_to).await?;

    let updated = db::tickets::assign(&state.db, original.id, assignee.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".into()))?;
    tracing::info!(ticket_id = %updated.id, assignee = %assignee.id, by = %user.id, "ticket assigned");

    state
        .notifications
        .notify_ticket_assignment(&updated, assignee.id, &user)
        .await;
    if original.status == TicketStatus::Open {
        state
            .notifications
            .notify_ticket_status_change(&updated, TicketStatus::Open, TicketStatus::InProgress, &user)
            .await;
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Ticket assigned successfully" })))
}

/// DELETE /api/tickets/{ticket_id}
pub async fn delete_ticket(
    state: web::Data<AppState>,
    staff: AgentOrAdmin,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let ticket_id = path.into_inner();
    if !db::tickets::delete(&state.db, ticket_id).await? {
        return Err(AppError::NotFound("Ticket not found".into()));
    }
    tracing::info!(ticket_id = %ticket_id, by = %staff.0.id, "ticket deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/tickets/stats/overview
pub async fn ticket_stats(state: web::Data<AppState>, _staff: AgentOrAdmin) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(db::tickets::stats(&state.db).await?))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/tickets")
            .wrap(JwtAuthMiddleware)
            .service(
                web::resource(["", "/"])
                    .route(web::post().to(create_ticket))
                    .route(web::get().to(list_tickets)),
            )
            .route("/stats/overview", web::get().to(ticket_stats))
            .route("/{ticket_id}/assign", web::post().to(assign_ticket))
            .service(
                web::resource("/{ticket_id}")
                    .route(web::get().to(get_ticket))
                    .route(web::put().to(update_ticket))
                    .route(web::delete().to(delete_ticket)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TicketCategory, TicketPriority};

    fn input(title: &str, description: &str) -> TicketCreate {
        TicketCreate {
            title: title.to_string(),
            description: description.to_string(),
            category: TicketCategory::default(),
            priority: TicketPriority::default(),
            tags: vec![" vpn ".to_string(), "   ".to_string()],
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_new_ticket_trims_fields_and_tags() {
        let ticket = new_ticket(
            input("  VPN is down  ", "  Cannot reach the office network  "),
            Uuid::new_v4(),
            None,
        )
        .unwrap();
        assert_eq!(ticket.title, "VPN is down");
        assert_eq!(ticket.description, "Cannot reach the office network");
        assert_eq!(ticket.tags, vec!["vpn".to_string()]);
    }

    #[test]
    fn test_padding_does_not_satisfy_length_rules() {
        let err = new_ticket(input("   Help   ", "Cannot reach the office network"), Uuid::new_v4(), None)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("title")), "{err:?}");

        let err = new_ticket(input("VPN is down", "   short    "), Uuid::new_v4(), None).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("description")), "{err:?}");
    }
}
