use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::AppError;

const MAX_TEXT_LEN: usize = 200;
const PRICE_SCALE: u32 = 2;
/// Integer digits left by a `NUMERIC(10, 2)` price column.
const PRICE_INTEGER_DIGITS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub capacity: i32,
    pub price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Registration is open while the event is active and has not started yet.
    pub fn is_registration_open(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_time > now
    }

    /// Seats left once `occupied` non-cancelled registrations are accounted for.
    /// Negative when an organizer shrinks capacity below current attendance.
    pub fn available_seats(&self, occupied: i64) -> i64 {
        i64::from(self.capacity) - occupied
    }
}

/// An event together with the number of seats held by non-cancelled registrations.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct EventRecord {
    #[sqlx(flatten)]
    pub event: Event,
    pub occupied_seats: i64,
}

impl EventRecord {
    pub fn available_seats(&self) -> i64 {
        self.event.available_seats(self.occupied_seats)
    }
}

/// Outbound representation with the derived seat and window values.
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: Event,
    pub available_seats: i64,
    pub is_registration_open: bool,
}

impl EventView {
    pub fn new(record: EventRecord, now: DateTime<Utc>) -> Self {
        let available_seats = record.available_seats();
        let is_registration_open = record.event.is_registration_open(now);
        Self {
            event: record.event,
            available_seats,
            is_registration_open,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Full event payload used on creation and on PUT.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub location: String,
    pub capacity: i32,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewEvent {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        validate_text("Title", &self.title)?;
        validate_text("Location", &self.location)?;
        validate_start_time(self.start_time, now)?;
        validate_capacity(self.capacity)?;
        validate_price(self.price)
    }

    pub fn into_event(self, organizer_id: Uuid, now: DateTime<Utc>) -> Event {
        Event {
            id: Uuid::new_v4(),
            organizer_id,
            title: self.title,
            description: self.description,
            location: self.location,
            start_time: self.start_time,
            capacity: self.capacity,
            price: self.price,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial event update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    pub price: Option<Decimal>,
    pub is_active: Option<bool>,
}

impl EventChanges {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            validate_text("Title", title)?;
        }
        if let Some(location) = &self.location {
            validate_text("Location", location)?;
        }
        if let Some(start_time) = self.start_time {
            validate_start_time(start_time, now)?;
        }
        if let Some(capacity) = self.capacity {
            validate_capacity(capacity)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }

    pub fn apply(self, event: &mut Event, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            event.title = title;
        }
        if let Some(description) = self.description {
            event.description = description;
        }
        if let Some(start_time) = self.start_time {
            event.start_time = start_time;
        }
        if let Some(location) = self.location {
            event.location = location;
        }
        if let Some(capacity) = self.capacity {
            event.capacity = capacity;
        }
        if let Some(price) = self.price {
            event.price = price;
        }
        if let Some(is_active) = self.is_active {
            event.is_active = is_active;
        }
        event.updated_at = now;
    }

    /// Deactivation is expressed as a change so it flows through the same write path.
    pub fn deactivate() -> Self {
        Self {
            is_active: Some(false),
            ..Self::default()
        }
    }
}

impl From<NewEvent> for EventChanges {
    fn from(value: NewEvent) -> Self {
        Self {
            title: Some(value.title),
            description: Some(value.description),
            start_time: Some(value.start_time),
            location: Some(value.location),
            capacity: Some(value.capacity),
            price: Some(value.price),
            is_active: Some(value.is_active),
        }
    }
}

fn validate_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError(format!(
            "{} must not be empty",
            field
        )));
    }
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(AppError::ValidationError(format!(
            "{} must be at most {} characters",
            field, MAX_TEXT_LEN
        )));
    }
    Ok(())
}

fn validate_start_time(start_time: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), AppError> {
    if start_time <= now {
        return Err(AppError::ValidationError(
            "Event date cannot be in the past".to_string(),
        ));
    }
    Ok(())
}

fn validate_capacity(capacity: i32) -> Result<(), AppError> {
    if capacity < 0 {
        return Err(AppError::ValidationError(
            "Capacity must not be negative".to_string(),
        ));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), AppError> {
    if price < Decimal::ZERO {
        return Err(AppError::ValidationError(
            "Price must not be negative".to_string(),
        ));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(AppError::ValidationError(format!(
            "Price must have at most {} decimal places",
            PRICE_SCALE
        )));
    }
    let limit = Decimal::from(10_i64.pow(PRICE_INTEGER_DIGITS));
    if price >= limit {
        return Err(AppError::ValidationError(format!(
            "Price must be less than {}",
            limit
        )));
    }
    Ok(())
}
