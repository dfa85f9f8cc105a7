pub mod guards;

pub use guards::{ensure_ticket_access, AdminUser, AgentOrAdmin, CurrentUser};
