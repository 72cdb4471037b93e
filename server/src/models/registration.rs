use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "registration_status", rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Registration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub registered_at: DateTime<Utc>,
    pub status: RegistrationStatus,
    pub payment_status: PaymentStatus,
}

impl Registration {
    /// A fresh registration awaiting confirmation and payment.
    pub fn pending(event_id: Uuid, user_id: Uuid, registered_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            registered_at,
            status: RegistrationStatus::Pending,
            payment_status: PaymentStatus::Pending,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == RegistrationStatus::Cancelled
    }

    /// Cancelled registrations release their seat.
    pub fn holds_seat(&self) -> bool {
        !self.is_cancelled()
    }
}
