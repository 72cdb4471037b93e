use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::AppError;

const MAX_USERNAME_LEN: usize = 150;
const MAX_PHONE_LEN: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub bio: Option<String>,
    pub is_verified: bool,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sign-up payload. Verification and staff flags are never accepted from callers.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone_number: Option<String>,
    pub bio: Option<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_email(&self.email)?;
        validate_username(&self.username)?;
        validate_phone(self.phone_number.as_deref())
    }
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub bio: Option<String>,
}

impl ProfileChanges {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        validate_phone(self.phone_number.as_deref())
    }

    pub fn apply(self, user: &mut User, now: DateTime<Utc>) {
        if let Some(email) = self.email {
            user.email = email.trim().to_string();
        }
        if let Some(username) = self.username {
            user.username = username.trim().to_string();
        }
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if self.phone_number.is_some() {
            user.phone_number = self.phone_number;
        }
        if self.bio.is_some() {
            user.bio = self.bio;
        }
        user.updated_at = now;
    }
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let trimmed = email.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::ValidationError(format!(
            "'{}' is not a valid email address",
            email
        ))),
    }
}

fn validate_username(username: &str) -> Result<(), AppError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError(
            "Username must not be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::ValidationError(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    Ok(())
}

fn validate_phone(phone: Option<&str>) -> Result<(), AppError> {
    match phone {
        Some(number) if number.chars().count() > MAX_PHONE_LEN => {
            Err(AppError::ValidationError(format!(
                "Phone number must be at most {} characters",
                MAX_PHONE_LEN
            )))
        }
        _ => Ok(()),
    }
}
