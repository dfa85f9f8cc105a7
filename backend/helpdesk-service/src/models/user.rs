use super::text_enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

text_enum! {
    #[derive(Default)]
    pub enum UserRole {
        #[default]
        Customer => "customer",
        Agent => "agent",
        Admin => "admin",
    }
}

impl UserRole {
    /// Agents and admins work tickets; customers only raise them.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Agent | UserRole::Admin)
    }
}

text_enum! {
    #[derive(Default)]
    pub enum UserStatus {
        #[default]
        Active => "active",
        Inactive => "inactive",
        Suspended => "suspended",
    }
}

/// Row in `users`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[sqlx(try_from = "String")]
    pub role: UserRole,
    #[sqlx(try_from = "String")]
    pub status: UserStatus,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub avatar_url: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
            department: self.department.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            status: user.status,
            phone: user.phone,
            department: user.department,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
            updated_at: user.updated_at,
            last_login: user.last_login,
        }
    }
}

/// Public projection embedded in tickets, messages and user lookups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    #[sqlx(try_from = "String")]
    pub role: UserRole,
    pub department: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserCreate {
    #[validate(length(min = 3, max = 50, message = "must be 3-50 characters"))]
    pub username: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 2, max = 100, message = "must be 2-100 characters"))]
    pub full_name: String,
    #[validate(length(min = 8, max = 128, message = "must be 8-128 characters"))]
    pub password: String,
    pub phone: Option<String>,
    #[validate(length(max = 50, message = "must be at most 50 characters"))]
    pub department: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserLogin {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

/// Self-service profile changes. Role and status are admin-only.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 3, max = 50, message = "must be 3-50 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 2, max = 100, message = "must be 2-100 characters"))]
    pub full_name: Option<String>,
    pub phone: Option<String>,
    #[validate(length(max = 50, message = "must be at most 50 characters"))]
    pub department: Option<String>,
    pub avatar_url: Option<String>,
}

/// Profile fields are validated through `profile.validate()`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminUserUpdate {
    #[serde(flatten)]
    pub profile: ProfileUpdate,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PasswordChange {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128, message = "must be 8-128 characters"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_helpers() {
        assert!(UserRole::Agent.is_staff());
        assert!(UserRole::Admin.is_staff());
        assert!(!UserRole::Customer.is_staff());
        assert_eq!(UserRole::default(), UserRole::Customer);
        assert_eq!(UserStatus::default(), UserStatus::Active);
    }

    #[test]
    fn test_admin_update_accepts_flat_json() {
        let update: AdminUserUpdate = serde_json::from_value(serde_json::json!({
            "full_name": "Jane Agent",
            "role": "agent",
            "status": "suspended"
        }))
        .unwrap();

        assert_eq!(update.profile.full_name.as_deref(), Some("Jane Agent"));
        assert_eq!(update.role, Some(UserRole::Agent));
        assert_eq!(update.status, Some(UserStatus::Suspended));
    }

    #[test]
    fn test_user_create_length_rules() {
        let create = UserCreate {
            username: "ab".into(),
            email: "not-an-email".into(),
            full_name: "J".into(),
            password: "short".into(),
            phone: None,
            department: None,
            avatar_url: None,
        };
        let errors = create.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("full_name"));
        assert!(fields.contains_key("password"));
    }
}
