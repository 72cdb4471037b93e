//! Registration lifecycle: admission, cancellation and administrative removal.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::permissions::{is_owner_or_staff, is_staff};
use crate::domain::{
    check_cancellation, check_eligibility, enforce, Access, Actor, CancellationError,
    EligibilityError, PermissionDenied, Policy, SharedClock,
};
use crate::models::Registration;
use crate::notifications::{NotificationDispatcher, RegistrationNotice};
use crate::repository::{AdmissionError, EventRepository, RegistrationRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Event with id '{0}' was not found")]
    EventNotFound(Uuid),

    #[error("Registration with id '{0}' was not found")]
    RegistrationNotFound(Uuid),

    #[error(transparent)]
    Ineligible(#[from] EligibilityError),

    #[error(transparent)]
    NotCancellable(#[from] CancellationError),

    #[error(transparent)]
    Forbidden(#[from] PermissionDenied),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Clone)]
pub struct RegistrationManager {
    events: Arc<dyn EventRepository>,
    registrations: Arc<dyn RegistrationRepository>,
    notifier: Arc<dyn NotificationDispatcher>,
    clock: SharedClock,
}

impl RegistrationManager {
    pub fn new(
        events: Arc<dyn EventRepository>,
        registrations: Arc<dyn RegistrationRepository>,
        notifier: Arc<dyn NotificationDispatcher>,
        clock: SharedClock,
    ) -> Self {
        Self {
            events,
            registrations,
            notifier,
            clock,
        }
    }

    /// Registers `actor` for the event.
    ///
    /// The eligibility check runs against a snapshot and only screens out
    /// obvious rejections; the storage admission decides under its own lock.
    /// The confirmation notice is queued after the registration is stored and
    /// a queueing failure does not undo it.
    pub async fn register(
        &self,
        event_id: Uuid,
        actor: &Actor,
    ) -> Result<Registration, RegistrationError> {
        let record = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(RegistrationError::EventNotFound(event_id))?;
        let existing = self.registrations.list_for_event(event_id).await?;
        let now = self.clock.utc();

        check_eligibility(&record.event, actor.id, &existing, now)?;

        let registration = self
            .registrations
            .admit(Registration::pending(event_id, actor.id, now))
            .await
            .map_err(|err| match err {
                AdmissionError::EventMissing => RegistrationError::EventNotFound(event_id),
                AdmissionError::CapacityExhausted => EligibilityError::NoAvailableSeats.into(),
                AdmissionError::Duplicate
                | AdmissionError::Repository(RepositoryError::Conflict(_)) => {
                    EligibilityError::AlreadyRegistered.into()
                }
                AdmissionError::Repository(err) => err.into(),
            })?;

        info!(
            registration_id = %registration.id,
            event_id = %event_id,
            user_id = %actor.id,
            "Registration created"
        );

        let notice = RegistrationNotice {
            user_id: actor.id,
            event_id,
            registration_id: registration.id,
        };
        if let Err(err) = self.notifier.dispatch(notice) {
            warn!(
                error = %err,
                registration_id = %registration.id,
                "Could not queue registration confirmation"
            );
        }

        Ok(registration)
    }

    pub async fn cancel(
        &self,
        registration_id: Uuid,
        actor: &Actor,
    ) -> Result<Registration, RegistrationError> {
        let registration = self.find(registration_id, actor).await?;
        let record = self
            .events
            .find_by_id(registration.event_id)
            .await?
            .ok_or(RegistrationError::EventNotFound(registration.event_id))?;

        check_cancellation(&registration, &record.event, self.clock.utc())?;

        // The update only matches non-cancelled rows; losing a race against
        // another cancel looks like an already-cancelled registration.
        let cancelled = self
            .registrations
            .cancel(registration_id)
            .await?
            .ok_or(CancellationError::AlreadyCancelled)?;

        info!(
            registration_id = %registration_id,
            actor_id = %actor.id,
            "Registration cancelled"
        );
        Ok(cancelled)
    }

    /// Hard delete, reserved for staff.
    pub async fn remove(
        &self,
        registration_id: Uuid,
        actor: &Actor,
    ) -> Result<(), RegistrationError> {
        let policies: [Policy<Uuid>; 1] = [is_staff];
        enforce(&policies, actor, Access::Write, &registration_id)?;

        if !self.registrations.delete(registration_id).await? {
            return Err(RegistrationError::RegistrationNotFound(registration_id));
        }
        warn!(
            registration_id = %registration_id,
            actor_id = %actor.id,
            "Registration deleted by staff"
        );
        Ok(())
    }

    /// Loads a registration visible to `actor`: their own, or any for staff.
    pub async fn find(
        &self,
        registration_id: Uuid,
        actor: &Actor,
    ) -> Result<Registration, RegistrationError> {
        let registration = self
            .registrations
            .find_by_id(registration_id)
            .await?
            .ok_or(RegistrationError::RegistrationNotFound(registration_id))?;
        let policies: [Policy<Registration>; 1] = [is_owner_or_staff];
        enforce(&policies, actor, Access::Read, &registration)?;
        Ok(registration)
    }

    pub async fn list_for_actor(
        &self,
        actor: &Actor,
    ) -> Result<Vec<Registration>, RegistrationError> {
        Ok(self.registrations.list_for_user(actor.id).await?)
    }

    /// All registrations of an event, cancelled ones included.
    pub async fn list_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<Registration>, RegistrationError> {
        if self.events.find_by_id(event_id).await?.is_none() {
            return Err(RegistrationError::EventNotFound(event_id));
        }
        Ok(self.registrations.list_for_event(event_id).await?)
    }
}

#[cfg(test)]
#[path = "registrations_tests.rs"]
mod tests;
