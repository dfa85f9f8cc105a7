/// Notification Service
///
/// Persists notifications and pushes them to connected users:
/// 1. Every notification is stored first, then offered to the registry
/// 2. Ticket events fan out to staff, the assignee or the creator
/// 3. Failures inside `notify_*` are logged and never fail the caller's request
use crate::db;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{
    title_case, Notification, NotificationCreate, NotificationPriority, NotificationResponse,
    NotificationType, Ticket, TicketStatus, User, UserRole,
};
use crate::websocket::messages::{NewTicketAlert, TicketCreator, TicketUpdatePayload};
use crate::websocket::{ConnectionManager, WebSocketMessage};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use tracing::{debug, error, info};
use uuid::Uuid;

const TITLE_MAX: usize = 200;
const MESSAGE_MAX: usize = 1000;

#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
    connections: ConnectionManager,
}

impl NotificationService {
    pub fn new(db: PgPool, connections: ConnectionManager) -> Self {
        Self { db, connections }
    }

    /// Store a notification and push it to the recipient if connected.
    pub async fn create_and_broadcast(&self, create: NotificationCreate) -> AppResult<Notification> {
        let notification = db::notifications::create(&self.db, &create).await?;
        metrics::NOTIFICATIONS_CREATED
            .with_label_values(&[notification.notification_type.as_str()])
            .inc();

        let delivered = self
            .connections
            .send_to_user(
                notification.user_id,
                WebSocketMessage::Notification {
                    data: NotificationResponse::from(notification.clone()),
                },
            )
            .await;

        if delivered {
            debug!(user_id = %notification.user_id, notification_id = %notification.id, "notification pushed");
        } else {
            debug!(user_id = %notification.user_id, "user not connected, notification stored only");
        }
        Ok(notification)
    }

    /// Notify staff and/or a target user about `ticket`, then push a `ticket_update`.
    ///
    /// With neither staff nor a target the ticket creator is notified.
    /// Returns the users that were notified.
    pub async fn create_ticket_notification(
        &self,
        ticket: &Ticket,
        notification_type: NotificationType,
        title: &str,
        message: &str,
        target_user: Option<Uuid>,
        notify_all_staff: bool,
    ) -> AppResult<Vec<Uuid>> {
        let staff = if notify_all_staff {
            db::users::active_ids_with_roles(&self.db, &[UserRole::Admin, UserRole::Agent]).await?
        } else {
            Vec::new()
        };
        let recipients = ticket_recipients(staff, target_user, ticket.created_by);

        let metadata = json!({
            "ticket_id": ticket.id,
            "ticket_title": ticket.title,
            "ticket_status": ticket.status,
            "ticket_priority": ticket.priority,
        });

        for user_id in &recipients {
            let create = NotificationCreate {
                user_id: *user_id,
                title: clip(title, TITLE_MAX),
                message: clip(message, MESSAGE_MAX),
                notification_type,
                priority: NotificationPriority::Medium,
                ticket_id: Some(ticket.id),
                metadata: Some(metadata.clone()),
            };
            if let Err(e) = self.create_and_broadcast(create).await {
                error!(user_id = %user_id, ticket_id = %ticket.id, error = %e, "failed to create ticket notification");
            }
        }

        let update = WebSocketMessage::TicketUpdate {
            data: TicketUpdatePayload {
                id: ticket.id,
                subject: ticket.title.clone(),
                status: ticket.status,
                priority: ticket.priority,
                updated_at: Utc::now(),
                update_type: notification_type.as_str().to_string(),
            },
        };
        self.connections.send_to_users(&recipients, &update).await;

        Ok(recipients)
    }

    /// Tell all staff about a new ticket and alert connected admins.
    pub async fn notify_new_ticket(&self, ticket: &Ticket, creator: Option<&User>) {
        let result = async {
            let creator_name = creator.map(|u| u.full_name.as_str()).unwrap_or("Unknown User");
            let title = format!("New {} Priority Ticket", title_case(ticket.priority.as_str()));
            let message = format!("New ticket '{}' submitted by {}", ticket.title, creator_name);

            self.create_ticket_notification(
                ticket,
                NotificationType::TicketCreated,
                &title,
                &message,
                None,
                true,
            )
            .await?;

            let alert = WebSocketMessage::NewTicket {
                data: NewTicketAlert {
                    id: ticket.id,
                    title: ticket.title.clone(),
                    priority: ticket.priority,
                    status: ticket.status,
                    created_by: TicketCreator {
                        id: creator.map(|u| u.id),
                        name: creator_name.to_string(),
                        email: creator.map(|u| u.email.clone()),
                    },
                    created_at: ticket.created_at,
                },
            };
            let staff = self.connections.broadcast_to_staff(&alert).await;
            info!(ticket_id = %ticket.id, staff, "new ticket alert sent");
            Ok::<(), AppError>(())
        }
        .await;

        log_failure(result, "new ticket", ticket.id);
    }

    pub async fn notify_ticket_assignment(&self, ticket: &Ticket, assignee: Uuid, assigned_by: &User) {
        let create = NotificationCreate {
            user_id: assignee,
            title: "New Ticket Assignment".to_string(),
            message: clip(
                &format!(
                    "You have been assigned ticket '{}' by {}",
                    ticket.title, assigned_by.full_name
                ),
                MESSAGE_MAX,
            ),
            notification_type: NotificationType::TicketAssigned,
            priority: NotificationPriority::Medium,
            ticket_id: Some(ticket.id),
            metadata: Some(json!({
                "ticket_id": ticket.id,
                "ticket_title": ticket.title,
                "ticket_status": ticket.status,
                "ticket_priority": ticket.priority,
                "assigned_by": actor_json(assigned_by),
            })),
        };

        log_failure(
            self.create_and_broadcast(create).await.map(|_| ()),
            "ticket assignment",
            ticket.id,
        );
    }

    /// Tell the creator, and the assignee when different, about a status change.
    pub async fn notify_ticket_status_change(
        &self,
        ticket: &Ticket,
        old_status: TicketStatus,
        new_status: TicketStatus,
        updated_by: &User,
    ) {
        let title = format!("Ticket Status Updated: {}", title_case(new_status.as_str()));
        let message = clip(
            &format!(
                "Ticket '{}' status changed from {} to {}",
                ticket.title, old_status, new_status
            ),
            MESSAGE_MAX,
        );
        let metadata = json!({
            "ticket_id": ticket.id,
            "ticket_title": ticket.title,
            "old_status": old_status,
            "new_status": new_status,
            "updated_by": actor_json(updated_by),
        });

        let mut recipients: Vec<Uuid> = ticket.created_by.into_iter().collect();
        if let Some(assignee) = ticket.assigned_to {
            if !recipients.contains(&assignee) {
                recipients.push(assignee);
            }
        }

        for user_id in recipients {
            let create = NotificationCreate {
                user_id,
                title: title.clone(),
                message: message.clone(),
                notification_type: NotificationType::TicketStatusChanged,
                priority: NotificationPriority::Medium,
                ticket_id: Some(ticket.id),
                metadata: Some(metadata.clone()),
            };
            log_failure(
                self.create_and_broadcast(create).await.map(|_| ()),
                "ticket status change",
                ticket.id,
            );
        }
    }

    pub async fn notify_ticket_resolved(
        &self,
        ticket: &Ticket,
        resolved_by: &User,
        resolution_note: Option<&str>,
    ) {
        let Some(creator) = ticket.created_by else {
            debug!(ticket_id = %ticket.id, "resolved ticket has no creator to notify");
            return;
        };

        let mut message = format!(
            "Your ticket '{}' has been resolved by {}",
            ticket.title, resolved_by.full_name
        );
        if let Some(note) = resolution_note.filter(|n| !n.is_empty()) {
            message.push_str(&format!(". Resolution: {note}"));
        }

        let create = NotificationCreate {
            user_id: creator,
            title: "Ticket Resolved".to_string(),
            message: clip(&message, MESSAGE_MAX),
            notification_type: NotificationType::TicketResolved,
            priority: NotificationPriority::High,
            ticket_id: Some(ticket.id),
            metadata: Some(json!({
                "ticket_id": ticket.id,
                "ticket_title": ticket.title,
                "ticket_status": ticket.status,
                "ticket_priority": ticket.priority,
                "resolution_note": resolution_note,
                "resolved_by": actor_json(resolved_by),
            })),
        };

        log_failure(
            self.create_and_broadcast(create).await.map(|_| ()),
            "ticket resolution",
            ticket.id,
        );
    }

    /// Tell the other side of the conversation about a new message.
    pub async fn notify_new_message(&self, ticket: &Ticket, sender: &User) {
        let Some(recipient) = message_recipient(ticket, sender.id) else {
            return;
        };

        let create = NotificationCreate {
            user_id: recipient,
            title: clip(&format!("New Message on '{}'", ticket.title), TITLE_MAX),
            message: clip(
                &format!("{} replied to ticket '{}'", sender.full_name, ticket.title),
                MESSAGE_MAX,
            ),
            notification_type: NotificationType::NewMessage,
            priority: NotificationPriority::Medium,
            ticket_id: Some(ticket.id),
            metadata: Some(json!({
                "ticket_id": ticket.id,
                "ticket_title": ticket.title,
                "sender": actor_json(sender),
            })),
        };

        log_failure(
            self.create_and_broadcast(create).await.map(|_| ()),
            "new message",
            ticket.id,
        );
    }
}

fn log_failure(result: AppResult<()>, event: &str, ticket_id: Uuid) {
    if let Err(e) = result {
        error!(ticket_id = %ticket_id, event, error = %e, "notification delivery failed");
    }
}

fn actor_json(user: &User) -> serde_json::Value {
    json!({
        "id": user.id,
        "name": user.full_name,
        "username": user.username,
    })
}

/// Staff first, then the target; duplicates removed. Falls back to the creator.
fn ticket_recipients(
    staff: Vec<Uuid>,
    target_user: Option<Uuid>,
    created_by: Option<Uuid>,
) -> Vec<Uuid> {
    let mut recipients: Vec<Uuid> = Vec::with_capacity(staff.len() + 1);
    for id in staff.into_iter().chain(target_user) {
        if !recipients.contains(&id) {
            recipients.push(id);
        }
    }
    if recipients.is_empty() {
        recipients.extend(created_by);
    }
    recipients
}

/// Creator messages go to the assignee; everyone else's go to the creator.
fn message_recipient(ticket: &Ticket, sender_id: Uuid) -> Option<Uuid> {
    let recipient = if ticket.created_by == Some(sender_id) {
        ticket.assigned_to
    } else {
        ticket.created_by
    };
    recipient.filter(|id| *id != sender_id)
}

fn clip(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}
