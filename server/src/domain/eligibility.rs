//! Admission and cancellation rules for event registrations.
//!
//! Both checks are pure: callers supply the current time so the decision is
//! reproducible.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Event, Registration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EligibilityError {
    #[error("Event registration is closed")]
    RegistrationClosed,

    #[error("No available seats")]
    NoAvailableSeats,

    #[error("You are already registered for this event")]
    AlreadyRegistered,
}

impl EligibilityError {
    pub fn code(&self) -> &'static str {
        match self {
            EligibilityError::RegistrationClosed => "REGISTRATION_CLOSED",
            EligibilityError::NoAvailableSeats => "NO_AVAILABLE_SEATS",
            EligibilityError::AlreadyRegistered => "ALREADY_REGISTERED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CancellationError {
    #[error("Registration is already cancelled")]
    AlreadyCancelled,

    #[error("Cannot cancel registration for past events")]
    EventAlreadyOccurred,
}

impl CancellationError {
    pub fn code(&self) -> &'static str {
        match self {
            CancellationError::AlreadyCancelled => "ALREADY_CANCELLED",
            CancellationError::EventAlreadyOccurred => "EVENT_ALREADY_OCCURRED",
        }
    }
}

/// Decides whether `user_id` may register for `event`.
///
/// `registrations` must hold every registration of the event, cancelled ones
/// included: they do not take a seat but still claim the (event, user) pair.
/// The first failing check wins, in the order window, capacity, duplicate.
pub fn check_eligibility(
    event: &Event,
    user_id: Uuid,
    registrations: &[Registration],
    now: DateTime<Utc>,
) -> Result<(), EligibilityError> {
    if !event.is_registration_open(now) {
        return Err(EligibilityError::RegistrationClosed);
    }

    let occupied = registrations
        .iter()
        .filter(|registration| registration.event_id == event.id && registration.holds_seat())
        .count();
    let occupied = i64::try_from(occupied).unwrap_or(i64::MAX);
    if event.available_seats(occupied) <= 0 {
        return Err(EligibilityError::NoAvailableSeats);
    }

    let duplicate = registrations
        .iter()
        .any(|registration| registration.event_id == event.id && registration.user_id == user_id);
    if duplicate {
        return Err(EligibilityError::AlreadyRegistered);
    }

    Ok(())
}

/// Decides whether `registration` may move to cancelled.
pub fn check_cancellation(
    registration: &Registration,
    event: &Event,
    now: DateTime<Utc>,
) -> Result<(), CancellationError> {
    if registration.is_cancelled() {
        return Err(CancellationError::AlreadyCancelled);
    }
    if event.start_time < now {
        return Err(CancellationError::EventAlreadyOccurred);
    }
    Ok(())
}
