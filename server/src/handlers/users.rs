use axum::extract::State;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::handlers::auth::CurrentUser;
use crate::models::{NewUser, ProfileChanges, User};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{Json, Path};
use crate::utils::response::{created, success};

/// Sign-up. Open to anonymous callers.
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> Result<Response, AppError> {
    payload.validate()?;

    let now = state.clock.utc();
    let user = User {
        id: Uuid::new_v4(),
        email: payload.email.trim().to_string(),
        username: payload.username.trim().to_string(),
        first_name: payload.first_name,
        last_name: payload.last_name,
        phone_number: payload.phone_number,
        bio: payload.bio,
        is_verified: false,
        is_staff: false,
        created_at: now,
        updated_at: now,
    };
    let user = state.users.create(user).await?;

    tracing::info!(user_id = %user.id, "User created");
    Ok(created(user, "User created successfully").into_response())
}

pub async fn list_users(
    State(state): State<AppState>,
    _caller: CurrentUser,
) -> Result<Response, AppError> {
    let users = state.users.list().await?;
    Ok(success(users, "Users retrieved successfully").into_response())
}

pub async fn get_user(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id '{}' was not found", user_id)))?;
    Ok(success(user, "User retrieved successfully").into_response())
}

pub async fn me(CurrentUser(user): CurrentUser) -> Response {
    success(user, "Profile retrieved successfully").into_response()
}

/// Partial update of the caller's own profile.
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(mut user): CurrentUser,
    Json(changes): Json<ProfileChanges>,
) -> Result<Response, AppError> {
    changes.validate()?;
    changes.apply(&mut user, state.clock.utc());

    let user_id = user.id;
    let saved = state
        .users
        .save(user)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id '{}' was not found", user_id)))?;
    Ok(success(saved, "Profile updated successfully").into_response())
}
