use std::sync::Arc;

use crate::domain::SharedClock;
use crate::notifications::NotificationDispatcher;
use crate::repository::{EventRepository, RegistrationRepository, UserRepository};
use crate::services::RegistrationManager;

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub events: Arc<dyn EventRepository>,
    pub registrations: RegistrationManager,
    pub clock: SharedClock,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserRepository>,
        events: Arc<dyn EventRepository>,
        registrations: Arc<dyn RegistrationRepository>,
        notifier: Arc<dyn NotificationDispatcher>,
        clock: SharedClock,
    ) -> Self {
        let manager =
            RegistrationManager::new(events.clone(), registrations, notifier, clock.clone());
        Self {
            users,
            events,
            registrations: manager,
            clock,
        }
    }
}
