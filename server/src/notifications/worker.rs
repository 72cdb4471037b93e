use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use super::RegistrationNotice;
use crate::models::{Event, Registration, User};
use crate::repository::{EventRepository, RegistrationRepository, RepositoryError, UserRepository};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
#[error("Mail delivery failed: {0}")]
pub struct MailError(pub String);

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Writes outgoing mail to the log instead of a transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "Outgoing email\n{}",
            message.body
        );
        Ok(())
    }
}

#[derive(Debug, Error)]
enum DeliveryError {
    #[error("User {0} no longer exists")]
    MissingUser(Uuid),

    #[error("Event {0} no longer exists")]
    MissingEvent(Uuid),

    #[error("Registration {0} no longer exists")]
    MissingRegistration(Uuid),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Mail(#[from] MailError),
}

pub struct NotificationWorker {
    users: Arc<dyn UserRepository>,
    events: Arc<dyn EventRepository>,
    registrations: Arc<dyn RegistrationRepository>,
    mailer: Arc<dyn Mailer>,
    from_email: String,
}

impl NotificationWorker {
    pub fn new(
        users: Arc<dyn UserRepository>,
        events: Arc<dyn EventRepository>,
        registrations: Arc<dyn RegistrationRepository>,
        mailer: Arc<dyn Mailer>,
        from_email: impl Into<String>,
    ) -> Self {
        Self {
            users,
            events,
            registrations,
            mailer,
            from_email: from_email.into(),
        }
    }

    pub fn spawn(self, receiver: mpsc::Receiver<RegistrationNotice>) -> JoinHandle<()> {
        tokio::spawn(self.run(receiver))
    }

    /// Drains the queue until every dispatcher is dropped. Failures are logged
    /// per notice and never stop the loop.
    pub async fn run(self, mut receiver: mpsc::Receiver<RegistrationNotice>) {
        info!("Notification worker started");
        while let Some(notice) = receiver.recv().await {
            if let Err(err) = self.deliver(notice).await {
                error!(
                    error = %err,
                    registration_id = %notice.registration_id,
                    "Error sending registration email"
                );
            }
        }
        info!("Notification worker stopped");
    }

    async fn deliver(&self, notice: RegistrationNotice) -> Result<(), DeliveryError> {
        let user = self
            .users
            .find_by_id(notice.user_id)
            .await?
            .ok_or(DeliveryError::MissingUser(notice.user_id))?;
        let event = self
            .events
            .find_by_id(notice.event_id)
            .await?
            .ok_or(DeliveryError::MissingEvent(notice.event_id))?
            .event;
        let registration = self
            .registrations
            .find_by_id(notice.registration_id)
            .await?
            .ok_or(DeliveryError::MissingRegistration(notice.registration_id))?;

        let message = render_confirmation(&self.from_email, &user, &event, &registration);
        self.mailer.send(message).await?;
        info!(
            registration_id = %registration.id,
            to = %user.email,
            "Registration confirmation sent"
        );
        Ok(())
    }
}

fn render_confirmation(
    from: &str,
    user: &User,
    event: &Event,
    registration: &Registration,
) -> EmailMessage {
    let greeting = if user.first_name.is_empty() {
        user.username.as_str()
    } else {
        user.first_name.as_str()
    };
    let body = format!(
        "Hello {greeting},\n\n\
         You are registered for {title}.\n\
         When: {when}\n\
         Where: {location}\n\
         Price: {price}\n\
         Registration: {id} ({status:?}, payment {payment:?})\n",
        title = event.title,
        when = event.start_time.format("%Y-%m-%d %H:%M UTC"),
        location = event.location,
        price = event.price,
        id = registration.id,
        status = registration.status,
        payment = registration.payment_status,
    );

    EmailMessage {
        from: from.to_string(),
        to: user.email.clone(),
        subject: format!("Event Registration Confirmation: {}", event.title),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
            self.sent.lock().await.push(message);
            Ok(())
        }
    }

    async fn seed(store: &MemoryStore) -> RegistrationNotice {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "grace@example.com".to_string(),
            username: "grace".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            phone_number: None,
            bio: None,
            is_verified: true,
            is_staff: false,
            created_at: now,
            updated_at: now,
        };
        let event = Event {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            title: "COBOL Revival".to_string(),
            description: String::new(),
            location: "Arlington".to_string(),
            start_time: now + Duration::days(7),
            capacity: 10,
            price: Decimal::new(1500, 2),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        UserRepository::create(store, user.clone()).await.unwrap();
        EventRepository::create(store, event.clone()).await.unwrap();
        let registration = store
            .admit(Registration::pending(event.id, user.id, now))
            .await
            .unwrap();

        RegistrationNotice {
            user_id: user.id,
            event_id: event.id,
            registration_id: registration.id,
        }
    }

    fn worker(store: &MemoryStore, mailer: Arc<RecordingMailer>) -> NotificationWorker {
        let store = Arc::new(store.clone());
        NotificationWorker::new(
            store.clone(),
            store.clone(),
            store,
            mailer,
            "noreply@example.com",
        )
    }

    #[tokio::test]
    async fn test_worker_sends_confirmation() {
        let store = MemoryStore::new();
        let notice = seed(&store).await;
        let mailer = Arc::new(RecordingMailer::default());
        let (sender, receiver) = mpsc::channel(4);

        let handle = worker(&store, mailer.clone()).spawn(receiver);
        sender.send(notice).await.unwrap();
        drop(sender);
        handle.await.unwrap();

        let sent = mailer.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "grace@example.com");
        assert_eq!(sent[0].from, "noreply@example.com");
        assert_eq!(
            sent[0].subject,
            "Event Registration Confirmation: COBOL Revival"
        );
        assert!(sent[0].body.contains("Hello Grace"));
        assert!(sent[0].body.contains("Arlington"));
    }

    #[tokio::test]
    async fn test_worker_skips_missing_records_and_keeps_running() {
        let store = MemoryStore::new();
        let notice = seed(&store).await;
        let mailer = Arc::new(RecordingMailer::default());
        let (sender, receiver) = mpsc::channel(4);

        let handle = worker(&store, mailer.clone()).spawn(receiver);
        sender
            .send(RegistrationNotice {
                user_id: Uuid::new_v4(),
                ..notice
            })
            .await
            .unwrap();
        sender.send(notice).await.unwrap();
        drop(sender);
        handle.await.unwrap();

        assert_eq!(mailer.sent.lock().await.len(), 1);
    }
}
