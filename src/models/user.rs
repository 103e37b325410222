// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique login email.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub first_name: String,

    pub last_name: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub password: String,
    #[validate(length(min = 1, max = 50), custom(function = validate_not_blank))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50), custom(function = validate_not_blank))]
    pub last_name: String,
}

/// Names are stored trimmed, so whitespace alone counts as empty.
fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("must_not_be_blank"));
    }
    Ok(())
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(first_name: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: "ada@example.com".to_string(),
            password: "password123".to_string(),
            first_name: first_name.to_string(),
            last_name: "Lovelace".to_string(),
        }
    }

    #[test]
    fn whitespace_only_name_is_rejected() {
        assert!(request("   ").validate().is_err());
        assert!(request(" Ada ").validate().is_ok());
    }
}
