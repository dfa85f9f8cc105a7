use super::messages::{ClientMessage, Inbound};
use super::{ConnectionManager, Outbound, WebSocketMessage};
use crate::db;
use crate::models::User;
use actix::{
    Actor, ActorContext, ActorFutureExt, AsyncContext, StreamHandler, WrapFuture,
};
use actix_web_actors::ws::{self, CloseCode, CloseReason};
use sqlx::PgPool;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

/// Why the socket is refused after the upgrade completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub message: String,
    pub code: u16,
}

impl Rejection {
    pub fn new(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

/// Actor owning one client socket
pub struct WsSession {
    auth: Result<User, Rejection>,
    manager: ConnectionManager,
    db: PgPool,
    connection_id: Option<Uuid>,
    hb: Instant,
    heartbeat_interval: Duration,
    client_timeout: Duration,
}

impl WsSession {
    pub fn new(
        auth: Result<User, Rejection>,
        manager: ConnectionManager,
        db: PgPool,
        heartbeat_interval: Duration,
        client_timeout: Duration,
    ) -> Self {
        Self {
            auth,
            manager,
            db,
            connection_id: None,
            hb: Instant::now(),
            heartbeat_interval,
            client_timeout,
        }
    }

    fn send(ctx: &mut ws::WebsocketContext<Self>, message: &WebSocketMessage) {
        match message.to_json() {
            Ok(text) => ctx.text(text),
            Err(e) => tracing::error!(error = %e, kind = message.kind(), "failed to encode frame"),
        }
    }

    fn close(ctx: &mut ws::WebsocketContext<Self>, code: CloseCode, description: &str) {
        ctx.close(Some(CloseReason {
            code,
            description: Some(description.to_string()),
        }));
        ctx.stop();
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.hb) > act.client_timeout {
                tracing::warn!("WebSocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn mark_read(&self, notification_id: Uuid, ctx: &mut ws::WebsocketContext<Self>) {
        let Ok(user) = &self.auth else { return };
        let user_id = user.id;
        let pool = self.db.clone();

        let fut = async move { db::notifications::mark_read(&pool, notification_id, Some(user_id)).await };
        ctx.spawn(fut.into_actor(self).map(move |result, _act, ctx| match result {
            Ok(Some(_)) => Self::send(ctx, &WebSocketMessage::read_confirmed(notification_id)),
            Ok(None) => Self::send(ctx, &WebSocketMessage::error("Notification not found", 404)),
            Err(e) => {
                tracing::error!(error = %e, notification_id = %notification_id, "failed to mark notification read");
                Self::send(
                    ctx,
                    &WebSocketMessage::error("Failed to mark notification as read", 500),
                );
            }
        }));
    }

    fn handle_text(&mut self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        match Inbound::parse(text) {
            Inbound::Message(ClientMessage::Ping { timestamp }) => {
                Self::send(ctx, &WebSocketMessage::pong(timestamp));
            }
            Inbound::Message(ClientMessage::MarkNotificationRead { notification_id }) => {
                self.mark_read(notification_id, ctx);
            }
            Inbound::Invalid(reason) => {
                tracing::warn!(reason = %reason, "rejected client frame");
                Self::send(ctx, &WebSocketMessage::error(reason, 400));
            }
            Inbound::Ignored(kind) => {
                tracing::debug!(kind = ?kind, "ignoring client frame");
            }
            Inbound::Malformed(reason) => {
                tracing::warn!(reason = %reason, "malformed client frame, closing");
                Self::send(ctx, &WebSocketMessage::error("Invalid message format", 400));
                Self::close(ctx, CloseCode::Error, "Invalid message format");
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let user = match &self.auth {
            Ok(user) => user.clone(),
            Err(rejection) => {
                tracing::info!(reason = %rejection.message, "WebSocket connection rejected");
                Self::send(
                    ctx,
                    &WebSocketMessage::error(rejection.message.clone(), rejection.code),
                );
                Self::close(ctx, CloseCode::Policy, &rejection.message);
                return;
            }
        };

        let (tx, rx) = mpsc::unbounded_channel::<Outbound>();
        let manager = self.manager.clone();
        let (user_id, role) = (user.id, user.role);

        // Nothing else is processed until the registry knows this socket.
        let register = async move { manager.register(user_id, role, tx).await };
        ctx.wait(register.into_actor(self).map(move |connection_id, act, ctx| {
            act.connection_id = Some(connection_id);
            Self::send(
                ctx,
                &WebSocketMessage::connection_established(user.id, &user.username, user.role),
            );
        }));

        ctx.add_stream(UnboundedReceiverStream::new(rx));
        self.hb(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        let (Ok(user), Some(connection_id)) = (&self.auth, self.connection_id) else {
            return;
        };

        let manager = self.manager.clone();
        let user_id = user.id;
        actix::spawn(async move {
            manager.unregister(user_id, connection_id).await;
        });
    }
}

impl StreamHandler<Outbound> for WsSession {
    fn handle(&mut self, item: Outbound, ctx: &mut Self::Context) {
        match item {
            Outbound::Message(message) => Self::send(ctx, &message),
            Outbound::Close { reason } => {
                if let Ok(user) = &self.auth {
                    tracing::info!(user_id = %user.id, reason = %reason, "closing superseded WebSocket");
                }
                Self::close(ctx, CloseCode::Normal, &reason);
            }
        }
    }

    // The registry dropping our sender is not a reason to close the socket.
    fn finished(&mut self, _ctx: &mut Self::Context) {}
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                self.handle_text(&text, ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("Binary WebSocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("WebSocket close message received: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "WebSocket protocol error");
                ctx.stop();
            }
        }
    }
}
