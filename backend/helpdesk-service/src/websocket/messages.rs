/// JSON envelopes exchanged over `/ws/connect`
///
/// Every frame carries a `type` tag. Server frames put their payload under
/// `data`, except `pong` which echoes the client's `timestamp` at the top level.
use crate::models::{
    NotificationResponse, TicketPriority, TicketStatus, UserRole,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Frames sent from the server to a client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WebSocketMessage {
    ConnectionEstablished { data: ConnectionEstablished },
    Notification { data: NotificationResponse },
    TicketUpdate { data: TicketUpdatePayload },
    NewTicket { data: NewTicketAlert },
    NotificationReadConfirmed { data: ReadConfirmation },
    Pong {
        #[serde(default)]
        timestamp: Option<serde_json::Value>,
    },
    Error { data: ErrorPayload },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEstablished {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketUpdatePayload {
    pub id: Uuid,
    pub subject: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub updated_at: DateTime<Utc>,
    pub update_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketCreator {
    pub id: Option<Uuid>,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTicketAlert {
    pub id: Uuid,
    pub title: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub created_by: TicketCreator,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadConfirmation {
    pub notification_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    pub code: u16,
}

impl WebSocketMessage {
    pub fn connection_established(user_id: Uuid, username: &str, role: UserRole) -> Self {
        WebSocketMessage::ConnectionEstablished {
            data: ConnectionEstablished {
                user_id,
                username: username.to_string(),
                role,
                message: "WebSocket connection established successfully".to_string(),
            },
        }
    }

    pub fn pong(timestamp: Option<serde_json::Value>) -> Self {
        WebSocketMessage::Pong { timestamp }
    }

    pub fn error(message: impl Into<String>, code: u16) -> Self {
        WebSocketMessage::Error {
            data: ErrorPayload {
                message: message.into(),
                code,
            },
        }
    }

    pub fn read_confirmed(notification_id: Uuid) -> Self {
        WebSocketMessage::NotificationReadConfirmed {
            data: ReadConfirmation { notification_id },
        }
    }

    /// Value of the `type` tag, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            WebSocketMessage::ConnectionEstablished { .. } => "connection_established",
            WebSocketMessage::Notification { .. } => "notification",
            WebSocketMessage::TicketUpdate { .. } => "ticket_update",
            WebSocketMessage::NewTicket { .. } => "new_ticket",
            WebSocketMessage::NotificationReadConfirmed { .. } => "notification_read_confirmed",
            WebSocketMessage::Pong { .. } => "pong",
            WebSocketMessage::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Frames a client may send
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping {
        #[serde(default)]
        timestamp: Option<serde_json::Value>,
    },
    MarkNotificationRead { notification_id: Uuid },
}

/// Outcome of parsing an inbound text frame
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message(ClientMessage),
    /// Valid JSON with a `type` this server does not handle
    Ignored(Option<String>),
    /// Known `type` whose payload is unusable; answered without closing
    Invalid(String),
    /// Not a JSON object
    Malformed(String),
}

impl Inbound {
    pub fn parse(text: &str) -> Self {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => return Inbound::Malformed(e.to_string()),
        };

        let kind = match value.get("type").and_then(|t| t.as_str()) {
            Some(kind) => kind.to_string(),
            None if value.is_object() => return Inbound::Ignored(None),
            None => return Inbound::Malformed("expected a JSON object".to_string()),
        };

        match kind.as_str() {
            "ping" => match serde_json::from_value(value) {
                Ok(msg) => Inbound::Message(msg),
                Err(e) => Inbound::Malformed(e.to_string()),
            },
            "mark_notification_read" => match serde_json::from_value(value) {
                Ok(msg) => Inbound::Message(msg),
                Err(_) => Inbound::Invalid("Invalid notification id".to_string()),
            },
            _ => Inbound::Ignored(Some(kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pong_echoes_timestamp_at_top_level() {
        let value = serde_json::to_value(WebSocketMessage::pong(Some(json!(1700000000123u64)))).unwrap();
        assert_eq!(value, json!({"type": "pong", "timestamp": 1700000000123u64}));
    }

    #[test]
    fn test_error_frame_shape() {
        let value = serde_json::to_value(WebSocketMessage::error("Invalid token", 401)).unwrap();
        assert_eq!(
            value,
            json!({"type": "error", "data": {"message": "Invalid token", "code": 401}})
        );
    }

    #[test]
    fn test_connection_established_shape() {
        let user_id = Uuid::new_v4();
        let value = serde_json::to_value(WebSocketMessage::connection_established(
            user_id,
            "jane",
            UserRole::Agent,
        ))
        .unwrap();
        assert_eq!(value["type"], "connection_established");
        assert_eq!(value["data"]["user_id"], json!(user_id));
        assert_eq!(value["data"]["role"], "agent");
    }

    #[test]
    fn test_ticket_update_shape() {
        let msg = WebSocketMessage::TicketUpdate {
            data: TicketUpdatePayload {
                id: Uuid::new_v4(),
                subject: "VPN down".into(),
                status: TicketStatus::InProgress,
                priority: TicketPriority::Urgent,
                updated_at: Utc::now(),
                update_type: "ticket_created".into(),
            },
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "ticket_update");
        assert_eq!(value["data"]["status"], "in_progress");
        assert_eq!(msg.kind(), "ticket_update");
    }

    #[test]
    fn test_parse_client_frames() {
        assert_eq!(
            Inbound::parse(r#"{"type":"ping","timestamp":42}"#),
            Inbound::Message(ClientMessage::Ping {
                timestamp: Some(json!(42))
            })
        );
        assert_eq!(
            Inbound::parse(r#"{"type":"ping"}"#),
            Inbound::Message(ClientMessage::Ping { timestamp: None })
        );

        let id = Uuid::new_v4();
        assert_eq!(
            Inbound::parse(&format!(
                r#"{{"type":"mark_notification_read","notification_id":"{id}"}}"#
            )),
            Inbound::Message(ClientMessage::MarkNotificationRead { notification_id: id })
        );
    }

    #[test]
    fn test_parse_unknown_and_malformed() {
        assert_eq!(
            Inbound::parse(r#"{"type":"typing"}"#),
            Inbound::Ignored(Some("typing".into()))
        );
        assert!(matches!(Inbound::parse("not json"), Inbound::Malformed(_)));
        assert!(matches!(Inbound::parse("[1,2]"), Inbound::Malformed(_)));
    }

    #[test]
    fn test_bad_notification_id_is_invalid_not_malformed() {
        let expected = Inbound::Invalid("Invalid notification id".into());
        assert_eq!(
            Inbound::parse(r#"{"type":"mark_notification_read","notification_id":"nope"}"#),
            expected
        );
        assert_eq!(Inbound::parse(r#"{"type":"mark_notification_read"}"#), expected);
    }
}
