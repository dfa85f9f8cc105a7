/// Notification database operations
use super::{into_map, GroupCount};
use crate::models::{
    Notification, NotificationCreate, NotificationFilter, NotificationStats,
    NotificationType, NotificationWithRecipient, Page, RecipientCount, SystemNotificationStats,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create(
    pool: &PgPool,
    notification: &NotificationCreate,
) -> Result<Notification, sqlx::Error> {
    let metadata = notification
        .metadata
        .clone()
        .unwrap_or_else(|| serde_json::json!({}));

    sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (id, user_id, title, message, notification_type, priority,
                                   ticket_id, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(notification.user_id)
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(notification.notification_type.as_str())
    .bind(notification.priority.as_str())
    .bind(notification.ticket_id)
    .bind(Json(metadata))
    .fetch_one(pool)
    .await
}

pub async fn find_for_user(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Newest first
pub async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
    unread_only: bool,
    page: Page,
) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user_id)
    .bind(unread_only)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
}

pub async fn count_for_user(
    pool: &PgPool,
    user_id: Uuid,
    unread_only: bool,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)",
    )
    .bind(user_id)
    .bind(unread_only)
    .fetch_one(pool)
    .await
}

/// Mark one notification read. `owner` restricts the update to that recipient.
pub async fn mark_read(
    pool: &PgPool,
    id: Uuid,
    owner: Option<Uuid>,
) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        UPDATE notifications
        SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
        WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(owner)
    .fetch_optional(pool)
    .await
}

pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE notifications SET is_read = TRUE, read_at = NOW()
        WHERE user_id = $1 AND is_read = FALSE
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Set the read flag on the caller's own notifications among `ids`.
pub async fn set_read_state(
    pool: &PgPool,
    user_id: Uuid,
    ids: &[Uuid],
    is_read: bool,
) -> Result<u64, sqlx::Error> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"
        UPDATE notifications
        SET is_read = $3,
            read_at = CASE WHEN $3 THEN COALESCE(read_at, NOW()) ELSE NULL END
        WHERE user_id = $1 AND id = ANY($2)
        "#,
    )
    .bind(user_id)
    .bind(ids)
    .bind(is_read)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete_for_user(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn stats_for_user(pool: &PgPool, user_id: Uuid) -> Result<NotificationStats, sqlx::Error> {
    let (total, unread_count): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE is_read = FALSE)
        FROM notifications WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let by_type = sqlx::query_as::<_, GroupCount>(
        r#"
        SELECT notification_type AS key, COUNT(*) AS count
        FROM notifications WHERE user_id = $1
        GROUP BY notification_type
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let by_priority = sqlx::query_as::<_, GroupCount>(
        r#"
        SELECT priority AS key, COUNT(*) AS count
        FROM notifications WHERE user_id = $1
        GROUP BY priority
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(NotificationStats {
        total,
        unread_count,
        read_count: total - unread_count,
        by_type: into_type_map(by_type),
        by_priority: into_map(by_priority),
    })
}

/// Fold legacy and unknown stored types into the type they read as.
fn into_type_map(rows: Vec<GroupCount>) -> HashMap<String, i64> {
    let mut map = HashMap::new();
    for row in rows {
        let key = NotificationType::from_stored(&row.key).as_str().to_string();
        *map.entry(key).or_insert(0) += row.count;
    }
    map
}

const ADMIN_FILTER_CLAUSE: &str = r#"
    WHERE ($1::uuid IS NULL OR n.user_id = $1)
      AND ($2::varchar IS NULL OR n.notification_type = $2
           OR ($2 = 'ticket_assigned' AND n.notification_type = 'assignment'))
      AND ($3::varchar IS NULL OR n.priority = $3)
      AND (NOT $4 OR n.is_read = FALSE)
      AND ($5::timestamptz IS NULL OR n.created_at >= $5)
"#;

/// All users' notifications with recipient details, newest first
pub async fn list_all(
    pool: &PgPool,
    filter: &NotificationFilter,
    page: Page,
) -> Result<Vec<NotificationWithRecipient>, sqlx::Error> {
    sqlx::query_as::<_, NotificationWithRecipient>(&format!(
        r#"
        SELECT n.*,
               u.full_name AS recipient_full_name,
               u.email AS recipient_email,
               u.role AS recipient_role
        FROM notifications n
        LEFT JOIN users u ON u.id = n.user_id
        {ADMIN_FILTER_CLAUSE}
        ORDER BY n.created_at DESC
        LIMIT $6 OFFSET $7
        "#
    ))
    .bind(filter.user_id)
    .bind(filter.notification_type.map(|t| t.as_str()))
    .bind(filter.priority.map(|p| p.as_str()))
    .bind(filter.unread_only)
    .bind(filter.since)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
}

pub async fn count_all(pool: &PgPool, filter: &NotificationFilter) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM notifications n {ADMIN_FILTER_CLAUSE}"
    ))
    .bind(filter.user_id)
    .bind(filter.notification_type.map(|t| t.as_str()))
    .bind(filter.priority.map(|p| p.as_str()))
    .bind(filter.unread_only)
    .bind(filter.since)
    .fetch_one(pool)
    .await
}

pub async fn system_stats(pool: &PgPool) -> Result<SystemNotificationStats, sqlx::Error> {
    let (total, total_unread, recent_24h): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE is_read = FALSE),
            COUNT(*) FILTER (WHERE created_at >= NOW() - INTERVAL '24 hours')
        FROM notifications
        "#,
    )
    .fetch_one(pool)
    .await?;

    let by_priority = sqlx::query_as::<_, GroupCount>(
        r#"
        SELECT priority AS key, COUNT(*) AS count FROM notifications
        WHERE created_at >= NOW() - INTERVAL '7 days'
        GROUP BY priority
        "#,
    )
    .fetch_all(pool)
    .await?;

    let by_type = sqlx::query_as::<_, GroupCount>(
        r#"
        SELECT notification_type AS key, COUNT(*) AS count FROM notifications
        WHERE created_at >= NOW() - INTERVAL '7 days'
        GROUP BY notification_type
        "#,
    )
    .fetch_all(pool)
    .await?;

    let top_recipients = sqlx::query_as::<_, RecipientCount>(
        r#"
        SELECT n.user_id, u.full_name, u.email, COUNT(*) AS count
        FROM notifications n
        LEFT JOIN users u ON u.id = n.user_id
        WHERE n.created_at >= NOW() - INTERVAL '7 days'
        GROUP BY n.user_id, u.full_name, u.email
        ORDER BY count DESC
        LIMIT 10
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(SystemNotificationStats {
        total_notifications: total,
        total_unread,
        recent_24h,
        by_priority_7d: into_map(by_priority),
        by_type_7d: into_type_map(by_type),
        top_recipients_7d: top_recipients,
        stats_generated_at: Utc::now(),
    })
}

pub async fn count_read_before(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE is_read = TRUE AND created_at < $1",
    )
    .bind(cutoff)
    .fetch_one(pool)
    .await
}

pub async fn delete_read_before(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM notifications WHERE is_read = TRUE AND created_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, count: i64) -> GroupCount {
        GroupCount {
            key: key.to_string(),
            count,
        }
    }

    #[test]
    fn test_legacy_types_fold_into_current_names() {
        let map = into_type_map(vec![
            row("ticket_assigned", 3),
            row("assignment", 2),
            row("new_message", 1),
            row("carrier_pigeon", 4),
            row("system_alert", 1),
        ]);
        assert_eq!(map.get("ticket_assigned"), Some(&5));
        assert_eq!(map.get("new_message"), Some(&1));
        assert_eq!(map.get("system_alert"), Some(&5));
        assert!(!map.contains_key("assignment"));
        assert_eq!(map.len(), 3);
    }
}
