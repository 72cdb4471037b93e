//! Storage ports and their adapters.
//!
//! Services depend on the traits below; `postgres` backs them with sqlx and
//! `memory` keeps everything in process for local runs and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Event, EventFilter, EventRecord, Registration, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgEventRepository, PgRegistrationRepository, PgUserRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Unique constraint violated: {0}")]
    Conflict(String),
}

/// Reasons the storage layer refuses to admit a registration.
///
/// These are checked under the same lock as the insert, so they hold even
/// when the advisory eligibility check raced with another request.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("Event does not exist")]
    EventMissing,

    #[error("Event is at capacity")]
    CapacityExhausted,

    #[error("Registration already exists for this event and user")]
    Duplicate,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for AdmissionError {
    fn from(err: sqlx::Error) -> Self {
        AdmissionError::Repository(RepositoryError::Database(err))
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: Event) -> Result<Event, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventRecord>, RepositoryError>;

    /// Events matching `filter`, newest start time first.
    async fn list(
        &self,
        filter: EventFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>, RepositoryError>;

    /// Overwrites the mutable fields of an existing event.
    async fn save(&self, event: Event) -> Result<Option<Event>, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Registration>, RepositoryError>;

    /// Every registration of the event, cancelled ones included.
    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Registration>, RepositoryError>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Registration>, RepositoryError>;

    /// Inserts `registration` only if the event still has a free seat and the
    /// (event, user) pair is unclaimed, atomically with respect to other admissions.
    async fn admit(&self, registration: Registration) -> Result<Registration, AdmissionError>;

    /// Moves a non-cancelled registration to cancelled. Returns `None` when the
    /// registration is missing or was already cancelled.
    async fn cancel(&self, id: Uuid) -> Result<Option<Registration>, RepositoryError>;

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    async fn list(&self) -> Result<Vec<User>, RepositoryError>;

    async fn save(&self, user: User) -> Result<Option<User>, RepositoryError>;
}
