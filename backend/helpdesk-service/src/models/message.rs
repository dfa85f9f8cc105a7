use super::{text_enum, Attachment, PageMeta, UserProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

text_enum! {
    #[derive(Default)]
    pub enum MessageType {
        #[default]
        Text => "text",
        File => "file",
        Image => "image",
        System => "system",
    }
}

text_enum! {
    #[derive(Default)]
    pub enum MessageStatus {
        #[default]
        Sent => "sent",
        Delivered => "delivered",
        Read => "read",
        Failed => "failed",
    }
}

/// Row in `messages`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub message_type: MessageType,
    #[sqlx(try_from = "String")]
    pub status: MessageStatus,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub reply_to: Option<Uuid>,
    pub attachments: Json<Vec<Attachment>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MessageCreate {
    pub ticket_id: Uuid,
    #[validate(length(min = 1, max = 5000, message = "must be 1-5000 characters"))]
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    pub reply_to: Option<Uuid>,
    #[serde(default)]
    #[validate(nested)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MessageUpdate {
    #[validate(length(min = 1, max = 5000, message = "must be 1-5000 characters"))]
    pub content: Option<String>,
    pub status: Option<MessageStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub sender: Option<UserProfile>,
    pub content: String,
    pub message_type: MessageType,
    pub status: MessageStatus,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub reply_to: Option<Uuid>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageResponse {
    pub fn from_message(message: Message, profiles: &HashMap<Uuid, UserProfile>) -> Self {
        Self {
            id: message.id,
            ticket_id: message.ticket_id,
            sender: profiles.get(&message.sender_id).cloned(),
            content: message.content,
            message_type: message.message_type,
            status: message.status,
            is_edited: message.is_edited,
            edited_at: message.edited_at,
            reply_to: message.reply_to,
            attachments: message.attachments.0,
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedMessages {
    pub messages: Vec<MessageResponse>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub ticket_id: Uuid,
    pub messages: Vec<MessageResponse>,
    pub total_messages: usize,
    pub participants: Vec<UserProfile>,
    pub last_activity: DateTime<Utc>,
}

impl ConversationResponse {
    /// Participants are listed in order of first appearance.
    pub fn build(
        ticket_id: Uuid,
        ticket_updated_at: DateTime<Utc>,
        messages: Vec<Message>,
        profiles: &HashMap<Uuid, UserProfile>,
    ) -> Self {
        let mut participants: Vec<UserProfile> = Vec::new();
        for message in &messages {
            if participants.iter().any(|p| p.id == message.sender_id) {
                continue;
            }
            if let Some(profile) = profiles.get(&message.sender_id) {
                participants.push(profile.clone());
            }
        }

        let last_activity = messages
            .iter()
            .map(|m| m.created_at)
            .max()
            .unwrap_or(ticket_updated_at);

        let messages: Vec<MessageResponse> = messages
            .into_iter()
            .map(|m| MessageResponse::from_message(m, profiles))
            .collect();

        Self {
            ticket_id,
            total_messages: messages.len(),
            messages,
            participants,
            last_activity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use chrono::Duration;

    fn message(ticket_id: Uuid, sender_id: Uuid, minutes_ago: i64) -> Message {
        let at = Utc::now() - Duration::minutes(minutes_ago);
        Message {
            id: Uuid::new_v4(),
            ticket_id,
            sender_id,
            content: "hello".into(),
            message_type: MessageType::Text,
            status: MessageStatus::Sent,
            is_edited: false,
            edited_at: None,
            reply_to: None,
            attachments: Json(vec![]),
            created_at: at,
            updated_at: at,
        }
    }

    fn profile(id: Uuid, name: &str) -> UserProfile {
        UserProfile {
            id,
            username: name.to_lowercase(),
            full_name: name.into(),
            role: UserRole::Customer,
            department: None,
            avatar_url: None,
        }
    }

    #[test]
    fn test_conversation_participants_and_last_activity() {
        let ticket_id = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let profiles = HashMap::from([(a, profile(a, "Alice")), (b, profile(b, "Bob"))]);
        let messages = vec![message(ticket_id, a, 10), message(ticket_id, b, 5), message(ticket_id, a, 1)];
        let newest = messages[2].created_at;

        let conversation = ConversationResponse::build(ticket_id, Utc::now() - Duration::days(1), messages, &profiles);
        assert_eq!(conversation.total_messages, 3);
        assert_eq!(conversation.participants.len(), 2);
        assert_eq!(conversation.participants[0].id, a);
        assert_eq!(conversation.last_activity, newest);
    }

    #[test]
    fn test_empty_conversation_uses_ticket_timestamp() {
        let updated = Utc::now() - Duration::hours(3);
        let conversation = ConversationResponse::build(Uuid::new_v4(), updated, vec![], &HashMap::new());
        assert_eq!(conversation.total_messages, 0);
        assert_eq!(conversation.last_activity, updated);
    }

    #[test]
    fn test_message_create_rules() {
        let create: MessageCreate = serde_json::from_value(serde_json::json!({
            "ticket_id": Uuid::new_v4(),
            "content": ""
        }))
        .unwrap();
        assert_eq!(create.message_type, MessageType::Text);
        assert!(create.validate().is_err());
    }
}
