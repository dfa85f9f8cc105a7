use super::{text_enum, PageMeta, UserProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

text_enum! {
    #[derive(Default)]
    pub enum TicketPriority {
        Low => "low",
        #[default]
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

text_enum! {
    #[derive(Default)]
    pub enum TicketStatus {
        #[default]
        Open => "open",
        InProgress => "in_progress",
        Pending => "pending",
        Resolved => "resolved",
        Closed => "closed",
        Cancelled => "cancelled",
    }
}

text_enum! {
    #[derive(Default)]
    pub enum TicketCategory {
        Technical => "technical",
        Billing => "billing",
        #[default]
        General => "general",
        FeatureRequest => "feature_request",
        BugReport => "bug_report",
        Account => "account",
    }
}

/// File reference attached to a ticket or message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Attachment {
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    #[validate(length(min = 1, max = 2048))]
    pub url: String,
    pub content_type: Option<String>,
    #[validate(range(min = 0))]
    pub size: i64,
}

/// Row in `tickets`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub category: TicketCategory,
    #[sqlx(try_from = "String")]
    pub priority: TicketPriority,
    #[sqlx(try_from = "String")]
    pub status: TicketStatus,
    pub created_by: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub created_by_admin: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_note: Option<String>,
    pub message_count: i32,
    pub tags: Vec<String>,
    pub attachments: Json<Vec<Attachment>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Staff see every ticket; customers only the ones they opened.
    pub fn is_visible_to(&self, user_id: Uuid, role: super::UserRole) -> bool {
        role.is_staff() || self.created_by == Some(user_id)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TicketCreate {
    #[validate(length(min = 5, max = 200, message = "must be 5-200 characters"))]
    pub title: String,
    #[validate(length(min = 10, max = 5000, message = "must be 10-5000 characters"))]
    pub description: String,
    #[serde(default)]
    pub category: TicketCategory,
    #[serde(default)]
    pub priority: TicketPriority,
    #[serde(default)]
    #[validate(length(max = 20, message = "at most 20 tags"))]
    pub tags: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TicketUpdate {
    #[validate(length(min = 5, max = 200, message = "must be 5-200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 10, max = 5000, message = "must be 10-5000 characters"))]
    pub description: Option<String>,
    pub category: Option<TicketCategory>,
    pub priority: Option<TicketPriority>,
    pub status: Option<TicketStatus>,
    pub assigned_to: Option<Uuid>,
    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub resolution_note: Option<String>,
    #[validate(length(max = 20, message = "at most 20 tags"))]
    pub tags: Option<Vec<String>>,
}

impl TicketUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.assigned_to.is_none()
            && self.resolution_note.is_none()
            && self.tags.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketAssign {
    pub assigned_to: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub created_by: Option<UserProfile>,
    pub assigned_to: Option<UserProfile>,
    pub created_by_admin: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_note: Option<String>,
    pub message_count: i32,
    pub tags: Vec<String>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketResponse {
    pub fn from_ticket(
        ticket: Ticket,
        profiles: &HashMap<Uuid, UserProfile>,
    ) -> Self {
        let lookup = |id: Option<Uuid>| id.and_then(|id| profiles.get(&id).cloned());
        Self {
            id: ticket.id,
            title: ticket.title,
            description: ticket.description,
            category: ticket.category,
            priority: ticket.priority,
            status: ticket.status,
            created_by: lookup(ticket.created_by),
            assigned_to: lookup(ticket.assigned_to),
            created_by_admin: ticket.created_by_admin,
            resolved_at: ticket.resolved_at,
            resolution_note: ticket.resolution_note,
            message_count: ticket.message_count,
            tags: ticket.tags,
            attachments: ticket.attachments.0,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category: Option<TicketCategory>,
    pub search: Option<String>,
}

/// Filters after the caller's role has been applied
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub created_by: Option<Uuid>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category: Option<TicketCategory>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedTickets {
    pub tickets: Vec<TicketResponse>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketActivity {
    pub id: Uuid,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub status: TicketStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketStats {
    pub total_tickets: i64,
    pub open_tickets: i64,
    pub in_progress_tickets: i64,
    pub resolved_tickets: i64,
    pub closed_tickets: i64,
    pub high_priority_tickets: i64,
    pub urgent_tickets: i64,
    pub avg_resolution_time_hours: Option<f64>,
    pub tickets_by_category: HashMap<String, i64>,
    pub tickets_by_agent: HashMap<String, i64>,
    pub recent_activity: Vec<TicketActivity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;

    fn ticket(created_by: Option<Uuid>) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            title: "Printer broken".into(),
            description: "It does not print anything".into(),
            category: TicketCategory::Technical,
            priority: TicketPriority::High,
            status: TicketStatus::Open,
            created_by,
            assigned_to: None,
            created_by_admin: None,
            resolved_at: None,
            resolution_note: None,
            message_count: 0,
            tags: vec![],
            attachments: Json(vec![]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_visibility() {
        let owner = Uuid::new_v4();
        let t = ticket(Some(owner));
        assert!(t.is_visible_to(owner, UserRole::Customer));
        assert!(!t.is_visible_to(Uuid::new_v4(), UserRole::Customer));
        assert!(t.is_visible_to(Uuid::new_v4(), UserRole::Agent));
        assert!(!ticket(None).is_visible_to(owner, UserRole::Customer));
    }

    #[test]
    fn test_create_defaults() {
        let create: TicketCreate = serde_json::from_value(serde_json::json!({
            "title": "Cannot log in",
            "description": "The login page keeps spinning"
        }))
        .unwrap();
        assert_eq!(create.category, TicketCategory::General);
        assert_eq!(create.priority, TicketPriority::Medium);
        assert!(create.validate().is_ok());
    }

    #[test]
    fn test_create_length_rules() {
        let create: TicketCreate = serde_json::from_value(serde_json::json!({
            "title": "Hi",
            "description": "short"
        }))
        .unwrap();
        let errors = create.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
        assert!(errors.field_errors().contains_key("description"));
    }

    #[test]
    fn test_update_is_empty() {
        assert!(TicketUpdate::default().is_empty());
        let update = TicketUpdate {
            status: Some(TicketStatus::Resolved),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_response_embeds_profiles() {
        let owner = Uuid::new_v4();
        let profile = UserProfile {
            id: owner,
            username: "alice".into(),
            full_name: "Alice Customer".into(),
            role: UserRole::Customer,
            department: None,
            avatar_url: None,
        };
        let profiles = HashMap::from([(owner, profile.clone())]);

        let response = TicketResponse::from_ticket(ticket(Some(owner)), &profiles);
        assert_eq!(response.created_by, Some(profile));
        assert!(response.assigned_to.is_none());
    }
}
