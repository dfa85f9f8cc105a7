//! Authorization guards that enforce role checks at the type level
//!
//! Handlers name the guard they need in their signature; a handler that takes
//! `AdminUser` cannot run for anyone else.

use crate::db;
use crate::error::AppError;
use crate::models::{Ticket, User, UserRole};
use crate::state::AppState;
use actix_middleware::UserId;
use actix_web::{dev::Payload, web, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;

/// The authenticated, active user behind the request's bearer token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn into_inner(self) -> User {
        self.0
    }
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req.extensions().get::<UserId>().map(|u| u.0);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let user_id =
                user_id.ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;
            let state = state
                .ok_or_else(|| AppError::Internal("application state is not configured".into()))?;

            let user = db::users::find_by_id(&state.db, user_id)
                .await?
                .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

            if !user.is_active() {
                return Err(AppError::Forbidden("User account is not active".into()));
            }
            Ok(CurrentUser(user))
        })
    }
}

fn require_role(user: &User, allowed: &[UserRole]) -> Result<(), AppError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Insufficient permissions".into()))
    }
}

/// An agent or admin
#[derive(Debug, Clone)]
pub struct AgentOrAdmin(pub User);

impl FromRequest for AgentOrAdmin {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let current = CurrentUser::from_request(req, payload);
        Box::pin(async move {
            let CurrentUser(user) = current.await?;
            require_role(&user, &[UserRole::Agent, UserRole::Admin])?;
            Ok(AgentOrAdmin(user))
        })
    }
}

/// An admin
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let current = CurrentUser::from_request(req, payload);
        Box::pin(async move {
            let CurrentUser(user) = current.await?;
            require_role(&user, &[UserRole::Admin])?;
            Ok(AdminUser(user))
        })
    }
}

/// Staff may touch any ticket; customers only their own.
pub fn ensure_ticket_access(ticket: &Ticket, user: &User, denied: &str) -> Result<(), AppError> {
    if ticket.is_visible_to(user.id, user.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(denied.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            username: "sam".into(),
            email: "sam@example.com".into(),
            full_name: "Sam Support".into(),
            role,
            status: UserStatus::Active,
            phone: None,
            department: None,
            avatar_url: None,
            password_hash: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&user(UserRole::Admin), &[UserRole::Admin]).is_ok());
        assert!(require_role(&user(UserRole::Agent), &[UserRole::Agent, UserRole::Admin]).is_ok());

        let err = require_role(&user(UserRole::Customer), &[UserRole::Agent, UserRole::Admin])
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ref m) if m == "Insufficient permissions"));
    }

    #[actix_web::test]
    async fn test_current_user_without_token_is_unauthorized() {
        let req = actix_web::test::TestRequest::default().to_http_request();
        let err = CurrentUser::extract(&req).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Not authenticated"));
    }
}
