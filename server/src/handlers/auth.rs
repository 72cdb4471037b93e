//! Caller identity.
//!
//! Authentication happens upstream: the gateway forwards the verified user id
//! in `x-user-id`. Handlers that take [`CurrentUser`] reject requests without
//! a known user.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::domain::Actor;
use crate::models::User;
use crate::state::AppState;
use crate::utils::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        Actor::from(&self.0)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                AppError::AuthError("Authentication credentials were not provided".to_string())
            })?;

        let user_id = Uuid::parse_str(raw.trim())
            .map_err(|_| AppError::AuthError("Malformed user id".to_string()))?;

        let user = state
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::AuthError("Unknown user".to_string()))?;

        Ok(Self(user))
    }
}
