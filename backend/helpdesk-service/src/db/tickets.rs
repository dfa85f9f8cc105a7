/// Ticket database operations
use super::{into_map, GroupCount};
use crate::models::{
    Attachment, Page, Ticket, TicketActivity, TicketCategory, TicketFilter, TicketPriority,
    TicketStats, TicketUpdate,
};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub created_by: Uuid,
    pub created_by_admin: Option<Uuid>,
    pub tags: Vec<String>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TicketCounts {
    pub total: i64,
    pub open: i64,
    pub in_progress: i64,
    pub resolved: i64,
    pub closed: i64,
    pub high_priority: i64,
    pub urgent: i64,
    pub new_24h: i64,
    pub avg_resolution_hours: Option<f64>,
}

pub async fn create(pool: &PgPool, ticket: NewTicket) -> Result<Ticket, sqlx::Error> {
    sqlx::query_as::<_, Ticket>(
        r#"
        INSERT INTO tickets (id, title, description, category, priority, status,
                             created_by, created_by_admin, tags, attachments)
        VALUES ($1, $2, $3, $4, $5, 'open', $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&ticket.title)
    .bind(&ticket.description)
    .bind(ticket.category.as_str())
    .bind(ticket.priority.as_str())
    .bind(ticket.created_by)
    .bind(ticket.created_by_admin)
    .bind(&ticket.tags)
    .bind(Json(&ticket.attachments))
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

const FILTER_CLAUSE: &str = r#"
    WHERE ($1::uuid IS NULL OR created_by = $1)
      AND ($2::varchar IS NULL OR status = $2)
      AND ($3::varchar IS NULL OR priority = $3)
      AND ($4::varchar IS NULL OR category = $4)
      AND ($5::varchar IS NULL OR title ILIKE $5 OR description ILIKE $5)
"#;

fn search_pattern(filter: &TicketFilter) -> Option<String> {
    filter
        .search
        .as_ref()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"))
}

/// Newest first
pub async fn list(
    pool: &PgPool,
    filter: &TicketFilter,
    page: Page,
) -> Result<Vec<Ticket>, sqlx::Error> {
    sqlx::query_as::<_, Ticket>(&format!(
        "SELECT * FROM tickets {FILTER_CLAUSE} ORDER BY created_at DESC LIMIT $6 OFFSET $7"
    ))
    .bind(filter.created_by)
    .bind(filter.status.map(|s| s.as_str()))
    .bind(filter.priority.map(|p| p.as_str()))
    .bind(filter.category.map(|c| c.as_str()))
    .bind(search_pattern(filter))
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
}

pub async fn count(pool: &PgPool, filter: &TicketFilter) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM tickets {FILTER_CLAUSE}"))
        .bind(filter.created_by)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.priority.map(|p| p.as_str()))
        .bind(filter.category.map(|c| c.as_str()))
        .bind(search_pattern(filter))
        .fetch_one(pool)
        .await
}

/// Partial update. Moving to `resolved` stamps `resolved_at`.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    update: &TicketUpdate,
) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as::<_, Ticket>(
        r#"
        UPDATE tickets SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            category = COALESCE($4, category),
            priority = COALESCE($5, priority),
            status = COALESCE($6, status),
            assigned_to = COALESCE($7, assigned_to),
            resolution_note = COALESCE($8, resolution_note),
            tags = COALESCE($9, tags),
            resolved_at = CASE WHEN $6 = 'resolved' THEN NOW() ELSE resolved_at END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&update.title)
    .bind(&update.description)
    .bind(update.category.map(|c| c.as_str()))
    .bind(update.priority.map(|p| p.as_str()))
    .bind(update.status.map(|s| s.as_str()))
    .bind(update.assigned_to)
    .bind(&update.resolution_note)
    .bind(&update.tags)
    .fetch_optional(pool)
    .await
}

/// Hand the ticket to `assignee` and move it to `in_progress`.
pub async fn assign(
    pool: &PgPool,
    id: Uuid,
    assignee: Uuid,
) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as::<_, Ticket>(
        r#"
        UPDATE tickets
        SET assigned_to = $2, status = 'in_progress', updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(assignee)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn counts(pool: &PgPool) -> Result<TicketCounts, sqlx::Error> {
    sqlx::query_as::<_, TicketCounts>(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE status = 'open') AS open,
            COUNT(*) FILTER (WHERE status = 'in_progress') AS in_progress,
            COUNT(*) FILTER (WHERE status = 'resolved') AS resolved,
            COUNT(*) FILTER (WHERE status = 'closed') AS closed,
            COUNT(*) FILTER (WHERE priority = 'high') AS high_priority,
            COUNT(*) FILTER (WHERE priority = 'urgent') AS urgent,
            COUNT(*) FILTER (WHERE created_at >= NOW() - INTERVAL '24 hours') AS new_24h,
            (AVG(EXTRACT(EPOCH FROM (resolved_at - created_at)))
                FILTER (WHERE resolved_at IS NOT NULL) / 3600.0)::float8 AS avg_resolution_hours
        FROM tickets
        "#,
    )
    .fetch_one(pool)
    .await
}

pub async fn stats(pool: &PgPool) -> Result<TicketStats, sqlx::Error> {
    let counts = counts(pool).await?;

    let by_category = sqlx::query_as::<_, GroupCount>(
        "SELECT category AS key, COUNT(*) AS count FROM tickets GROUP BY category",
    )
    .fetch_all(pool)
    .await?;

    let by_agent = sqlx::query_as::<_, GroupCount>(
        r#"
        SELECT u.full_name AS key, COUNT(*) AS count
        FROM tickets t
        JOIN users u ON u.id = t.assigned_to
        GROUP BY u.full_name
        "#,
    )
    .fetch_all(pool)
    .await?;

    let recent_activity = sqlx::query_as::<_, TicketActivity>(
        "SELECT id, title, status, updated_at FROM tickets ORDER BY updated_at DESC LIMIT 5",
    )
    .fetch_all(pool)
    .await?;

    Ok(TicketStats {
        total_tickets: counts.total,
        open_tickets: counts.open,
        in_progress_tickets: counts.in_progress,
        resolved_tickets: counts.resolved,
        closed_tickets: counts.closed,
        high_priority_tickets: counts.high_priority,
        urgent_tickets: counts.urgent,
        avg_resolution_time_hours: counts.avg_resolution_hours,
        tickets_by_category: into_map(by_category),
        tickets_by_agent: into_map(by_agent),
        recent_activity,
    })
}
