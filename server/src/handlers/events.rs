use axum::extract::State;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::domain::permissions::is_event_organizer;
use crate::domain::{enforce, Access, Policy};
use crate::handlers::auth::CurrentUser;
use crate::models::{Event, EventChanges, EventFilter, EventRecord, EventView, NewEvent};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{Json, Path, Query};
use crate::utils::response::{created, empty_success, success};

fn event_not_found(event_id: Uuid) -> AppError {
    AppError::NotFound(format!("Event with id '{}' was not found", event_id))
}

pub async fn create_event(
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(payload): Json<NewEvent>,
) -> Result<Response, AppError> {
    let now = state.clock.utc();
    payload.validate(now)?;

    let event = state
        .events
        .create(payload.into_event(caller.0.id, now))
        .await?;
    tracing::info!(
        event_id = %event.id,
        organizer_id = %event.organizer_id,
        "Event created"
    );

    let view = EventView::new(
        EventRecord {
            event,
            occupied_seats: 0,
        },
        now,
    );
    Ok(created(view, "Event created successfully").into_response())
}

pub async fn list_events(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Query(filter): Query<EventFilter>,
) -> Result<Response, AppError> {
    let now = state.clock.utc();
    let views: Vec<EventView> = state
        .events
        .list(filter, now)
        .await?
        .into_iter()
        .map(|record| EventView::new(record, now))
        .collect();
    Ok(success(views, "Events retrieved successfully").into_response())
}

pub async fn get_event(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let record = state
        .events
        .find_by_id(event_id)
        .await?
        .ok_or_else(|| event_not_found(event_id))?;
    let view = EventView::new(record, state.clock.utc());
    Ok(success(view, "Event retrieved successfully").into_response())
}

/// Full replacement of the writable fields.
pub async fn replace_event(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<NewEvent>,
) -> Result<Response, AppError> {
    payload.validate(state.clock.utc())?;
    write_event(&state, &caller, event_id, payload.into()).await
}

pub async fn update_event(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(event_id): Path<Uuid>,
    Json(changes): Json<EventChanges>,
) -> Result<Response, AppError> {
    changes.validate(state.clock.utc())?;
    write_event(&state, &caller, event_id, changes).await
}

/// Soft delete: the event stays stored but is no longer active.
pub async fn delete_event(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    write_event(&state, &caller, event_id, EventChanges::deactivate()).await?;
    Ok(empty_success("Event deleted successfully").into_response())
}

async fn write_event(
    state: &AppState,
    caller: &CurrentUser,
    event_id: Uuid,
    changes: EventChanges,
) -> Result<Response, AppError> {
    let record = state
        .events
        .find_by_id(event_id)
        .await?
        .ok_or_else(|| event_not_found(event_id))?;

    let policies: [Policy<Event>; 1] = [is_event_organizer];
    enforce(&policies, &caller.actor(), Access::Write, &record.event)?;

    let occupied_seats = record.occupied_seats;
    let now = state.clock.utc();
    let mut event = record.event;
    changes.apply(&mut event, now);

    let event = state
        .events
        .save(event)
        .await?
        .ok_or_else(|| event_not_found(event_id))?;
    tracing::info!(event_id = %event_id, actor_id = %caller.0.id, "Event updated");

    let view = EventView::new(
        EventRecord {
            event,
            occupied_seats,
        },
        now,
    );
    Ok(success(view, "Event updated successfully").into_response())
}

pub async fn register_for_event(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let registration = state
        .registrations
        .register(event_id, &caller.actor())
        .await?;
    Ok(created(registration, "Successfully registered for event").into_response())
}

pub async fn event_registrations(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let registrations = state.registrations.list_for_event(event_id).await?;
    Ok(success(registrations, "Registrations retrieved successfully").into_response())
}
