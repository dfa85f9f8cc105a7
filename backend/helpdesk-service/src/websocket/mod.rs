//! WebSocket real-time delivery
//!
//! Provides:
//! - A per-process registry keyed by user id (one live socket per user)
//! - The actor that owns each socket
//! - JSON frame types exchanged with clients

pub mod manager;
pub mod messages;
pub mod session;

pub use manager::{ConnectionManager, ConnectionStats, Outbound, WebSocketSender};
pub use messages::WebSocketMessage;
pub use session::{Rejection, WsSession};
