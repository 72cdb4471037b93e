use axum::extract::State;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::handlers::auth::CurrentUser;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::Path;
use crate::utils::response::{empty_success, success};

/// The caller's own registrations.
pub async fn list_registrations(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Response, AppError> {
    let registrations = state.registrations.list_for_actor(&caller.actor()).await?;
    Ok(success(registrations, "Registrations retrieved successfully").into_response())
}

pub async fn get_registration(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(registration_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let registration = state
        .registrations
        .find(registration_id, &caller.actor())
        .await?;
    Ok(success(registration, "Registration retrieved successfully").into_response())
}

pub async fn cancel_registration(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(registration_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let registration = state
        .registrations
        .cancel(registration_id, &caller.actor())
        .await?;
    Ok(success(registration, "Registration cancelled successfully").into_response())
}

pub async fn delete_registration(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(registration_id): Path<Uuid>,
) -> Result<Response, AppError> {
    state
        .registrations
        .remove(registration_id, &caller.actor())
        .await?;
    Ok(empty_success("Registration deleted successfully").into_response())
}
