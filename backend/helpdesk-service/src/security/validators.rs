//! Field rules the `validator` derive cannot express.

use crate::error::{AppError, AppResult};
use once_cell::sync::Lazy;
use regex::Regex;

static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+$").expect("hardcoded username regex is invalid")
});

static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+?[\d\s\-\(\)]{10,15}$").expect("hardcoded phone regex is invalid")
});

/// Letters, digits, `_` and `-` only. Returns the lowercased form.
pub fn normalize_username(username: &str) -> AppResult<String> {
    let trimmed = username.trim();
    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(AppError::Validation(
            "username: may only contain letters, numbers, underscores and hyphens".into(),
        ));
    }
    Ok(trimmed.to_lowercase())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// At least one uppercase letter, one lowercase letter and one digit.
pub fn validate_password_strength(password: &str) -> AppResult<()> {
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(AppError::Validation(
            "password: must contain at least one uppercase letter".into(),
        ));
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(AppError::Validation(
            "password: must contain at least one lowercase letter".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "password: must contain at least one digit".into(),
        ));
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> AppResult<()> {
    if PHONE_REGEX.is_match(phone) {
        Ok(())
    } else {
        Err(AppError::Validation("phone: invalid phone number format".into()))
    }
}
