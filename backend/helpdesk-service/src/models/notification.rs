use super::{text_enum, PageMeta, UserRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TicketCreated,
    TicketAssigned,
    TicketStatusChanged,
    NewMessage,
    TicketResolved,
    SystemAlert,
    Reminder,
}

impl NotificationType {
    pub const ALL: &'static [NotificationType] = &[
        NotificationType::TicketCreated,
        NotificationType::TicketAssigned,
        NotificationType::TicketStatusChanged,
        NotificationType::NewMessage,
        NotificationType::TicketResolved,
        NotificationType::SystemAlert,
        NotificationType::Reminder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::TicketCreated => "ticket_created",
            NotificationType::TicketAssigned => "ticket_assigned",
            NotificationType::TicketStatusChanged => "ticket_status_changed",
            NotificationType::NewMessage => "new_message",
            NotificationType::TicketResolved => "ticket_resolved",
            NotificationType::SystemAlert => "system_alert",
            NotificationType::Reminder => "reminder",
        }
    }

    /// Read a stored value. `assignment` predates `ticket_assigned`;
    /// anything unrecognised is surfaced as a system alert.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "assignment" => NotificationType::TicketAssigned,
            other => NotificationType::ALL
                .iter()
                .copied()
                .find(|t| t.as_str() == other)
                .unwrap_or(NotificationType::SystemAlert),
        }
    }

    /// Category name the web client switches on
    pub fn client_type(&self) -> &'static str {
        match self {
            NotificationType::TicketCreated => "new_ticket",
            NotificationType::TicketAssigned => "assignment",
            NotificationType::TicketStatusChanged => "ticket_update",
            NotificationType::NewMessage => "message",
            NotificationType::TicketResolved => "ticket_resolved",
            NotificationType::SystemAlert => "urgent",
            NotificationType::Reminder => "reminder",
        }
    }
}

impl From<String> for NotificationType {
    fn from(value: String) -> Self {
        NotificationType::from_stored(&value)
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

text_enum! {
    #[derive(Default)]
    pub enum NotificationPriority {
        Low => "low",
        #[default]
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

/// Row in `notifications`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    #[sqlx(try_from = "String")]
    pub notification_type: NotificationType,
    #[sqlx(try_from = "String")]
    pub priority: NotificationPriority,
    pub ticket_id: Option<Uuid>,
    pub metadata: Json<serde_json::Value>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload used by the notification service and the create endpoint
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NotificationCreate {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 1000, message = "must be 1-1000 characters"))]
    pub message: String,
    pub notification_type: NotificationType,
    #[serde(default)]
    pub priority: NotificationPriority,
    pub ticket_id: Option<Uuid>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Recipient details attached to admin listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecipient {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    /// Client-facing category, see `NotificationType::client_type`
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: NotificationPriority,
    pub ticket_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<NotificationRecipient>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            user_id: n.user_id,
            title: n.title,
            message: n.message,
            kind: n.notification_type.client_type().to_string(),
            notification_type: n.notification_type,
            priority: n.priority,
            ticket_id: n.ticket_id,
            metadata: n.metadata.0,
            is_read: n.is_read,
            read_at: n.read_at,
            created_at: n.created_at,
            user: None,
        }
    }
}

/// Notification joined with its recipient, used by admin listings
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationWithRecipient {
    #[sqlx(flatten)]
    pub notification: Notification,
    pub recipient_full_name: Option<String>,
    pub recipient_email: Option<String>,
    pub recipient_role: Option<String>,
}

impl From<NotificationWithRecipient> for NotificationResponse {
    fn from(row: NotificationWithRecipient) -> Self {
        let user_id = row.notification.user_id;
        let user = match (row.recipient_full_name, row.recipient_email, row.recipient_role) {
            (Some(full_name), Some(email), Some(role)) => Some(NotificationRecipient {
                id: user_id,
                full_name,
                email,
                role: role.parse().unwrap_or_default(),
            }),
            _ => None,
        };
        let mut response = NotificationResponse::from(row.notification);
        response.user = user;
        response
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminNotificationQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub user_id: Option<Uuid>,
    pub notification_type: Option<NotificationType>,
    pub priority: Option<NotificationPriority>,
    #[serde(default)]
    pub unread_only: bool,
    pub days_back: Option<i64>,
}

/// Filters for the admin listing after validation
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub user_id: Option<Uuid>,
    pub notification_type: Option<NotificationType>,
    pub priority: Option<NotificationPriority>,
    pub unread_only: bool,
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedNotifications {
    pub notifications: Vec<NotificationResponse>,
    pub unread_count: i64,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total: i64,
    pub unread_count: i64,
    pub read_count: i64,
    pub by_type: HashMap<String, i64>,
    pub by_priority: HashMap<String, i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkNotificationUpdate {
    pub notification_ids: Vec<Uuid>,
    #[serde(default = "default_true")]
    pub is_read: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SystemNotificationCreate {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 1000, message = "must be 1-1000 characters"))]
    pub message: String,
    #[serde(default = "default_alert_priority")]
    pub priority: String,
    #[serde(default = "default_alert_roles")]
    pub target_roles: Vec<String>,
}

fn default_alert_priority() -> String {
    NotificationPriority::High.as_str().to_string()
}

fn default_alert_roles() -> Vec<String> {
    vec![UserRole::Admin.as_str().to_string(), UserRole::Agent.as_str().to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemAlertResult {
    pub message: String,
    pub target_count: usize,
    pub target_roles: Vec<UserRole>,
    pub notification_id_sample: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipientCount {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemNotificationStats {
    pub total_notifications: i64,
    pub total_unread: i64,
    pub recent_24h: i64,
    pub by_priority_7d: HashMap<String, i64>,
    pub by_type_7d: HashMap<String, i64>,
    pub top_recipients_7d: Vec<RecipientCount>,
    pub stats_generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanupQuery {
    #[serde(default = "default_cleanup_days")]
    pub days_old: i64,
    #[serde(default = "default_true")]
    pub dry_run: bool,
}

fn default_cleanup_days() -> i64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupResult {
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications_to_delete: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications_deleted: Option<u64>,
    pub cutoff_date: DateTime<Utc>,
    pub days_old: i64,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_type_mapping() {
        let expected = [
            (NotificationType::TicketCreated, "new_ticket"),
            (NotificationType::TicketAssigned, "assignment"),
            (NotificationType::TicketStatusChanged, "ticket_update"),
            (NotificationType::NewMessage, "message"),
            (NotificationType::TicketResolved, "ticket_resolved"),
            (NotificationType::SystemAlert, "urgent"),
            (NotificationType::Reminder, "reminder"),
        ];
        for (kind, client) in expected {
            assert_eq!(kind.client_type(), client);
        }
    }

    #[test]
    fn test_stored_type_normalisation() {
        assert_eq!(
            NotificationType::from_stored("assignment"),
            NotificationType::TicketAssigned
        );
        assert_eq!(
            NotificationType::from_stored("ticket_resolved"),
            NotificationType::TicketResolved
        );
        assert_eq!(
            NotificationType::from_stored("something_else"),
            NotificationType::SystemAlert
        );
    }

    #[test]
    fn test_response_serialises_client_type() {
        let n = Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "New Ticket Assignment".into(),
            message: "You have been assigned".into(),
            notification_type: NotificationType::TicketAssigned,
            priority: NotificationPriority::Medium,
            ticket_id: None,
            metadata: Json(serde_json::json!({})),
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(NotificationResponse::from(n)).unwrap();
        assert_eq!(value["type"], "assignment");
        assert_eq!(value["notification_type"], "ticket_assigned");
        assert!(value.get("user").is_none());
    }

    #[test]
    fn test_system_alert_defaults() {
        let alert: SystemNotificationCreate = serde_json::from_value(serde_json::json!({
            "title": "Maintenance",
            "message": "Down at midnight"
        }))
        .unwrap();
        assert_eq!(alert.priority, "high");
        assert_eq!(alert.target_roles, vec!["admin", "agent"]);
    }

    #[test]
    fn test_cleanup_result_shape() {
        let dry = CleanupResult {
            dry_run: true,
            notifications_to_delete: Some(4),
            notifications_deleted: None,
            cutoff_date: Utc::now(),
            days_old: 30,
            message: "Would delete 4 read notifications older than 30 days".into(),
        };
        let value = serde_json::to_value(dry).unwrap();
        assert_eq!(value["notifications_to_delete"], 4);
        assert!(value.get("notifications_deleted").is_none());
    }
}
