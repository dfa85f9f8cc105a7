/// WebSocket Connection Manager
///
/// Holds at most one live connection per user. Registering a second
/// connection for the same user replaces the first and tells it to close.
/// Delivery is fire-and-forget: a send to a user without a connection is a
/// no-op, and a send to a dead channel drops that entry.
use super::WebSocketMessage;
use crate::metrics;
use crate::models::UserRole;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Close reason sent to a connection that has been superseded
pub const REPLACED_REASON: &str = "New connection established";

/// Instruction delivered to a session actor
#[derive(Debug, Clone)]
pub enum Outbound {
    Message(WebSocketMessage),
    /// Close the socket with a normal (1000) close frame
    Close { reason: String },
}

pub type WebSocketSender = mpsc::UnboundedSender<Outbound>;

#[derive(Debug)]
struct Connection {
    id: Uuid,
    role: UserRole,
    sender: WebSocketSender,
}

/// Snapshot served by `/ws/stats`. Agents count as staff alongside admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStats {
    pub connected_users: Vec<Uuid>,
    pub connected_admins: Vec<Uuid>,
    pub total_connections: usize,
}

#[derive(Clone, Default)]
pub struct ConnectionManager {
    connections: Arc<RwLock<HashMap<Uuid, Connection>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sender` as the user's connection and return its connection id.
    ///
    /// A previous connection for the same user is asked to close.
    pub async fn register(&self, user_id: Uuid, role: UserRole, sender: WebSocketSender) -> Uuid {
        let connection_id = Uuid::new_v4();
        let previous = {
            let mut connections = self.connections.write().await;
            connections.insert(
                user_id,
                Connection {
                    id: connection_id,
                    role,
                    sender,
                },
            )
        };

        if let Some(old) = previous {
            tracing::info!(user_id = %user_id, "replacing existing websocket connection");
            let _ = old.sender.send(Outbound::Close {
                reason: REPLACED_REASON.to_string(),
            });
        } else {
            metrics::WS_CONNECTIONS.inc();
        }

        tracing::info!(user_id = %user_id, role = %role, "websocket connection registered");
        connection_id
    }

    /// Remove the user's entry if it still belongs to `connection_id`.
    ///
    /// A session that was replaced must not evict its successor.
    pub async fn unregister(&self, user_id: Uuid, connection_id: Uuid) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get(&user_id) {
            Some(conn) if conn.id == connection_id => {
                connections.remove(&user_id);
                metrics::WS_CONNECTIONS.dec();
                tracing::info!(user_id = %user_id, "websocket connection unregistered");
                true
            }
            _ => false,
        }
    }

    /// Deliver to one user. Returns whether the message was handed to a live connection.
    pub async fn send_to_user(&self, user_id: Uuid, message: WebSocketMessage) -> bool {
        let kind = message.kind();
        let delivered = {
            let connections = self.connections.read().await;
            match connections.get(&user_id) {
                Some(conn) => conn.sender.send(Outbound::Message(message)).is_ok(),
                None => return false,
            }
        };

        if delivered {
            metrics::WS_MESSAGES_SENT.with_label_values(&[kind]).inc();
        } else {
            tracing::warn!(user_id = %user_id, "dropping dead websocket connection");
            self.drop_dead(&[user_id]).await;
        }
        delivered
    }

    /// Deliver to each of `user_ids`; returns how many were delivered.
    pub async fn send_to_users(&self, user_ids: &[Uuid], message: &WebSocketMessage) -> usize {
        self.fan_out(message, |user_id, _| user_ids.contains(user_id))
            .await
    }

    /// Deliver to every connected agent and admin
    pub async fn broadcast_to_staff(&self, message: &WebSocketMessage) -> usize {
        self.fan_out(message, |_, role| role.is_staff()).await
    }

    async fn fan_out<F>(&self, message: &WebSocketMessage, include: F) -> usize
    where
        F: Fn(&Uuid, UserRole) -> bool,
    {
        let mut dead = Vec::new();
        let mut delivered = 0;
        {
            let connections = self.connections.read().await;
            for (user_id, conn) in connections.iter() {
                if !include(user_id, conn.role) {
                    continue;
                }
                if conn.sender.send(Outbound::Message(message.clone())).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(*user_id);
                }
            }
        }

        if delivered > 0 {
            metrics::WS_MESSAGES_SENT
                .with_label_values(&[message.kind()])
                .inc_by(delivered as u64);
        }
        if !dead.is_empty() {
            self.drop_dead(&dead).await;
        }
        delivered
    }

    async fn drop_dead(&self, user_ids: &[Uuid]) {
        let mut connections = self.connections.write().await;
        for user_id in user_ids {
            if matches!(connections.get(user_id), Some(conn) if conn.sender.is_closed()) {
                connections.remove(user_id);
                metrics::WS_CONNECTIONS.dec();
            }
        }
    }

    pub async fn is_connected(&self, user_id: Uuid) -> bool {
        self.connections.read().await.contains_key(&user_id)
    }

    pub async fn stats(&self) -> ConnectionStats {
        let connections = self.connections.read().await;
        ConnectionStats {
            connected_users: connections.keys().copied().collect(),
            connected_admins: connections
                .iter()
                .filter(|(_, c)| c.role.is_staff())
                .map(|(id, _)| *id)
                .collect(),
            total_connections: connections.len(),
        }
    }
}
