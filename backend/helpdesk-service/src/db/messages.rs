/// Ticket message database operations
///
/// Inserts and deletes adjust `tickets.message_count` in the same transaction.
use crate::models::{Attachment, Message, MessageStatus, MessageType, Page};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub ticket_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub message_type: MessageType,
    pub reply_to: Option<Uuid>,
    pub attachments: Vec<Attachment>,
}

pub async fn create(pool: &PgPool, message: NewMessage) -> Result<Message, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let created = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (id, ticket_id, sender_id, content, message_type, status,
                              reply_to, attachments)
        VALUES ($1, $2, $3, $4, $5, 'sent', $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(message.ticket_id)
    .bind(message.sender_id)
    .bind(&message.content)
    .bind(message.message_type.as_str())
    .bind(message.reply_to)
    .bind(Json(&message.attachments))
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE tickets SET message_count = message_count + 1, updated_at = NOW() WHERE id = $1",
    )
    .bind(message.ticket_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(created)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Message>, sqlx::Error> {
    sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Oldest first
pub async fn list_for_ticket(
    pool: &PgPool,
    ticket_id: Uuid,
    page: Page,
) -> Result<Vec<Message>, sqlx::Error> {
    sqlx::query_as::<_, Message>(
        r#"
        SELECT * FROM messages
        WHERE ticket_id = $1
        ORDER BY created_at ASC, id ASC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(ticket_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
}

pub async fn all_for_ticket(pool: &PgPool, ticket_id: Uuid) -> Result<Vec<Message>, sqlx::Error> {
    sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE ticket_id = $1 ORDER BY created_at ASC, id ASC",
    )
    .bind(ticket_id)
    .fetch_all(pool)
    .await
}

pub async fn count_for_ticket(pool: &PgPool, ticket_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages WHERE ticket_id = $1")
        .bind(ticket_id)
        .fetch_one(pool)
        .await
}

/// Content changes mark the message edited; status-only changes do not.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    content: Option<&str>,
    status: Option<MessageStatus>,
) -> Result<Option<Message>, sqlx::Error> {
    sqlx::query_as::<_, Message>(
        r#"
        UPDATE messages SET
            content = COALESCE($2, content),
            status = COALESCE($3, status),
            is_edited = is_edited OR $2 IS NOT NULL,
            edited_at = CASE WHEN $2 IS NOT NULL THEN NOW() ELSE edited_at END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(content)
    .bind(status.map(|s| s.as_str()))
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, message: &Message) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("DELETE FROM messages WHERE id = $1")
        .bind(message.id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() > 0 {
        sqlx::query(
            r#"
            UPDATE tickets
            SET message_count = GREATEST(message_count - 1, 0), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(message.ticket_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageCounts {
    pub total: i64,
    pub new_24h: i64,
}

pub async fn counts(pool: &PgPool) -> Result<MessageCounts, sqlx::Error> {
    sqlx::query_as::<_, MessageCounts>(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE created_at >= NOW() - INTERVAL '24 hours') AS new_24h
        FROM messages
        "#,
    )
    .fetch_one(pool)
    .await
}
