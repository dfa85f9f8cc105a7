/// Ticket conversation handlers
use super::tickets::load_ticket;
use crate::db;
use crate::db::messages::NewMessage;
use crate::error::{AppError, AppResult};
use crate::middleware::{ensure_ticket_access, CurrentUser};
use crate::models::{
    ConversationResponse, Message, MessageCreate, MessageListQuery, MessageResponse,
    MessageUpdate, Page, PaginatedMessages, UserProfile,
};
use crate::state::AppState;
use actix_middleware::JwtAuthMiddleware;
use actix_web::{web, HttpResponse};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

async fn sender_profiles(
    pool: &PgPool,
    messages: &[Message],
) -> AppResult<HashMap<Uuid, UserProfile>> {
    let mut ids: Vec<Uuid> = messages.iter().map(|m| m.sender_id).collect();
    ids.sort_unstable();
    ids.dedup();
    Ok(db::users::profiles_by_ids(pool, &ids).await?)
}

async fn message_response(pool: &PgPool, message: Message) -> AppResult<MessageResponse> {
    let profiles = sender_profiles(pool, std::slice::from_ref(&message)).await?;
    Ok(MessageResponse::from_message(message, &profiles))
}

/// Load a message that only its sender may change.
async fn load_own_message(pool: &PgPool, id: Uuid, user_id: Uuid, denied: &str) -> AppResult<Message> {
    let message = db::messages::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found".into()))?;
    if message.sender_id != user_id {
        return Err(AppError::Forbidden(denied.to_string()));
    }
    Ok(message)
}

/// POST /api/chat/messages
pub async fn send_message(
    state: web::Data<AppState>,
    current: CurrentUser,
    body: web::Json<MessageCreate>,
) -> AppResult<HttpResponse> {
    let input = body.into_inner();
    input.validate()?;

    let user = current.into_inner();
    let ticket = load_ticket(&state.db, input.ticket_id).await?;
    ensure_ticket_access(&ticket, &user, "Not authorized to send messages to this ticket")?;

    let content = input.content.trim().to_string();
    if content.is_empty() {
        return Err(AppError::Validation("content: must not be blank".into()));
    }
    if let Some(reply_to) = input.reply_to {
        match db::messages::find_by_id(&state.db, reply_to).await? {
            Some(parent) if parent.ticket_id == ticket.id => {}
            _ => return Err(AppError::NotFound("Reply target not found".into())),
        }
    }

    let message = db::messages::create(
        &state.db,
        NewMessage {
            ticket_id: ticket.id,
            sender_id: user.id,
            content,
            message_type: input.message_type,
            reply_to: input.reply_to,
            attachments: input.attachments,
        },
    )
    .await?;
    tracing::debug!(message_id = %message.id, ticket_id = %ticket.id, "message posted");

    state.notifications.notify_new_message(&ticket, &user).await;

    Ok(HttpResponse::Created().json(message_response(&state.db, message).await?))
}

/// GET /api/chat/tickets/{ticket_id}/messages
pub async fn list_messages(
    state: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<Uuid>,
    query: web::Query<MessageListQuery>,
) -> AppResult<HttpResponse> {
    let ticket = load_ticket(&state.db, path.into_inner()).await?;
    ensure_ticket_access(&ticket, &current.0, "Not authorized to access this ticket")?;

    let page = Page::resolve(
        query.page,
        query.per_page,
        state.config.default_page_size,
        state.config.max_page_size,
    )?;
    let total = db::messages::count_for_ticket(&state.db, ticket.id).await?;
    let messages = db::messages::list_for_ticket(&state.db, ticket.id, page).await?;
    let profiles = sender_profiles(&state.db, &messages).await?;

    Ok(HttpResponse::Ok().json(PaginatedMessages {
        messages: messages
            .into_iter()
            .map(|m| MessageResponse::from_message(m, &profiles))
            .collect(),
        meta: page.meta(total),
    }))
}

/// GET /api/chat/tickets/{ticket_id}/conversation
pub async fn conversation(
    state: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let ticket = load_ticket(&state.db, path.into_inner()).await?;
    ensure_ticket_access(&ticket, &current.0, "Not authorized to access this ticket")?;

    let messages = db::messages::all_for_ticket(&state.db, ticket.id).await?;
    let profiles = sender_profiles(&state.db, &messages).await?;

    Ok(HttpResponse::Ok().json(ConversationResponse::build(
        ticket.id,
        ticket.updated_at,
        messages,
        &profiles,
    )))
}

/// PUT /api/chat/messages/{message_id}
pub async fn update_message(
    state: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<Uuid>,
    body: web::Json<MessageUpdate>,
) -> AppResult<HttpResponse> {
    let update = body.into_inner();
    update.validate()?;

    let message = load_own_message(
        &state.db,
        path.into_inner(),
        current.0.id,
        "Not authorized to edit this message",
    )
    .await?;

    let content = update.content.as_deref().map(str::trim);
    if content == Some("") {
        return Err(AppError::Validation("content: must not be blank".into()));
    }
    if content.is_none() && update.status.is_none() {
        return Ok(HttpResponse::Ok().json(message_response(&state.db, message).await?));
    }

    let updated = db::messages::update(&state.db, message.id, content, update.status)
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found".into()))?;

    Ok(HttpResponse::Ok().json(message_response(&state.db, updated).await?))
}

/// DELETE /api/chat/messages/{message_id}
pub async fn delete_message(
    state: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let message = load_own_message(
        &state.db,
        path.into_inner(),
        current.0.id,
        "Not authorized to delete this message",
    )
    .await?;

    if !db::messages::delete(&state.db, &message).await? {
        return Err(AppError::NotFound("Message not found".into()));
    }
    Ok(HttpResponse::NoContent().finish())
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/chat")
            .wrap(JwtAuthMiddleware)
            .route("/messages", web::post().to(send_message))
            .service(
                web::resource("/messages/{message_id}")
                    .route(web::put().to(update_message))
                    .route(web::delete().to(delete_message)),
            )
            .route("/tickets/{ticket_id}/messages", web::get().to(list_messages))
            .route("/tickets/{ticket_id}/conversation", web::get().to(conversation)),
    );
}
