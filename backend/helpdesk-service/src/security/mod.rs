pub mod password;
pub mod validators;

pub use password::{hash_password, verify_password};
