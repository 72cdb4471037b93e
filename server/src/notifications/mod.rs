//! Hand-off of registration confirmations to a background worker.
//!
//! Dispatching never blocks the caller: notices go into a bounded channel and
//! the worker in [`worker`] renders and sends them on its own schedule.

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

pub mod worker;

pub use worker::{EmailMessage, LogMailer, MailError, Mailer, NotificationWorker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationNotice {
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub registration_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Notification queue is full")]
    QueueFull,

    #[error("Notification worker is not running")]
    Closed,
}

#[cfg_attr(test, mockall::automock)]
pub trait NotificationDispatcher: Send + Sync {
    /// Queues `notice` for delivery without waiting for it to be sent.
    fn dispatch(&self, notice: RegistrationNotice) -> Result<(), DispatchError>;
}

#[derive(Clone)]
pub struct ChannelDispatcher {
    sender: mpsc::Sender<RegistrationNotice>,
}

impl ChannelDispatcher {
    /// Creates a dispatcher and the receiving end its worker drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<RegistrationNotice>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl NotificationDispatcher for ChannelDispatcher {
    fn dispatch(&self, notice: RegistrationNotice) -> Result<(), DispatchError> {
        self.sender.try_send(notice).map_err(|err| match err {
            TrySendError::Full(_) => DispatchError::QueueFull,
            TrySendError::Closed(_) => DispatchError::Closed,
        })
    }
}
