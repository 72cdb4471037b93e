use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    AdmissionError, EventRepository, RegistrationRepository, RepositoryError, UserRepository,
};
use crate::models::{Event, EventFilter, EventRecord, Registration, RegistrationStatus, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    events: HashMap<Uuid, Event>,
    registrations: HashMap<Uuid, Registration>,
}

impl Tables {
    fn occupied_seats(&self, event_id: Uuid) -> i64 {
        let count = self
            .registrations
            .values()
            .filter(|registration| registration.event_id == event_id && registration.holds_seat())
            .count();
        i64::try_from(count).unwrap_or(i64::MAX)
    }

    fn record(&self, event: &Event) -> EventRecord {
        EventRecord {
            event: event.clone(),
            occupied_seats: self.occupied_seats(event.id),
        }
    }

    fn email_or_username_taken(&self, user: &User) -> Option<&'static str> {
        self.users
            .values()
            .filter(|existing| existing.id != user.id)
            .find_map(|existing| {
                if existing.email == user.email {
                    Some("users_email_key")
                } else if existing.username == user.username {
                    Some("users_username_key")
                } else {
                    None
                }
            })
    }
}

/// In-process storage backing every repository port.
///
/// A single mutex guards all tables, which gives admissions the same
/// all-or-nothing behaviour as the row lock used by the PostgreSQL adapter.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn create(&self, event: Event) -> Result<Event, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.events.contains_key(&event.id) {
            return Err(RepositoryError::Conflict("events_pkey".to_string()));
        }
        tables.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventRecord>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.events.get(&id).map(|event| tables.record(event)))
    }

    async fn list(
        &self,
        filter: EventFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut records: Vec<EventRecord> = tables
            .events
            .values()
            .map(|event| tables.record(event))
            .filter(|record| filter.matches(record, now))
            .collect();
        newest_first(&mut records, |record| record.event.start_time);
        Ok(records)
    }

    async fn save(&self, event: Event) -> Result<Option<Event>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let Some(stored) = tables.events.get_mut(&event.id) else {
            return Ok(None);
        };
        // Organizer and creation time are fixed once the event exists.
        let organizer_id = stored.organizer_id;
        let created_at = stored.created_at;
        *stored = Event {
            organizer_id,
            created_at,
            ..event
        };
        Ok(Some(stored.clone()))
    }
}

#[async_trait]
impl RegistrationRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Registration>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.registrations.get(&id).cloned())
    }

    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Registration>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut registrations: Vec<Registration> = tables
            .registrations
            .values()
            .filter(|registration| registration.event_id == event_id)
            .cloned()
            .collect();
        newest_first(&mut registrations, |registration| registration.registered_at);
        Ok(registrations)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Registration>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut registrations: Vec<Registration> = tables
            .registrations
            .values()
            .filter(|registration| registration.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut registrations, |registration| registration.registered_at);
        Ok(registrations)
    }

    async fn admit(&self, registration: Registration) -> Result<Registration, AdmissionError> {
        let mut tables = self.tables.lock().await;

        let Some(event) = tables.events.get(&registration.event_id) else {
            return Err(AdmissionError::EventMissing);
        };
        if tables.occupied_seats(event.id) >= i64::from(event.capacity) {
            return Err(AdmissionError::CapacityExhausted);
        }
        let duplicate = tables.registrations.values().any(|existing| {
            existing.event_id == registration.event_id && existing.user_id == registration.user_id
        });
        if duplicate {
            return Err(AdmissionError::Duplicate);
        }

        tables
            .registrations
            .insert(registration.id, registration.clone());
        Ok(registration)
    }

    async fn cancel(&self, id: Uuid) -> Result<Option<Registration>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        match tables.registrations.get_mut(&id) {
            Some(registration) if !registration.is_cancelled() => {
                registration.status = RegistrationStatus::Cancelled;
                Ok(Some(registration.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.registrations.remove(&id).is_some())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if let Some(constraint) = tables.email_or_username_taken(&user) {
            return Err(RepositoryError::Conflict(constraint.to_string()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by_key(|user| user.created_at);
        Ok(users)
    }

    async fn save(&self, user: User) -> Result<Option<User>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if let Some(constraint) = tables.email_or_username_taken(&user) {
            return Err(RepositoryError::Conflict(constraint.to_string()));
        }
        let Some(stored) = tables.users.get_mut(&user.id) else {
            return Ok(None);
        };
        // Verification, staff flag and creation time are not writable here.
        let User {
            is_verified,
            is_staff,
            created_at,
            ..
        } = *stored;
        *stored = User {
            is_verified,
            is_staff,
            created_at,
            ..user
        };
        Ok(Some(stored.clone()))
    }
}
