use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::event::EventRecord;

/// Query-string filters accepted by the event listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EventFilter {
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    /// Case-insensitive substring of the location.
    pub location: Option<String>,
    pub min_date: Option<DateTime<Utc>>,
    pub max_date: Option<DateTime<Utc>>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub is_active: Option<bool>,
    /// `true` keeps events with a free seat; `false` applies no restriction.
    pub has_available_seats: Option<bool>,
    /// `true` keeps future events, `false` keeps events that already started.
    pub upcoming: Option<bool>,
}

impl EventFilter {
    /// In-process evaluation, used by storage backends without a query engine.
    pub fn matches(&self, record: &EventRecord, now: DateTime<Utc>) -> bool {
        let event = &record.event;

        if let Some(title) = &self.title {
            if !contains_ignore_case(&event.title, title) {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if !contains_ignore_case(&event.location, location) {
                return false;
            }
        }
        if self.min_date.is_some_and(|min| event.start_time < min) {
            return false;
        }
        if self.max_date.is_some_and(|max| event.start_time > max) {
            return false;
        }
        if self.min_price.is_some_and(|min| event.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| event.price > max) {
            return false;
        }
        if self.is_active.is_some_and(|active| event.is_active != active) {
            return false;
        }
        if self.has_available_seats == Some(true) && record.available_seats() <= 0 {
            return false;
        }
        match self.upcoming {
            Some(true) => event.start_time > now,
            Some(false) => event.start_time <= now,
            None => true,
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::Event;
    use chrono::Duration;
    use uuid::Uuid;

    fn record(now: DateTime<Utc>, occupied: i64) -> EventRecord {
        EventRecord {
            event: Event {
                id: Uuid::new_v4(),
                organizer_id: Uuid::new_v4(),
                title: "Rust Meetup".to_string(),
                description: String::new(),
                location: "Berlin".to_string(),
                start_time: now + Duration::days(2),
                capacity: 2,
                price: Decimal::new(1000, 2),
                is_active: true,
                created_at: now,
                updated_at: now,
            },
            occupied_seats: occupied,
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let now = Utc::now();
        assert!(EventFilter::default().matches(&record(now, 0), now));
    }

    #[test]
    fn test_text_filters_are_case_insensitive() {
        let now = Utc::now();
        let filter = EventFilter {
            title: Some("meetup".to_string()),
            location: Some("BERL".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&record(now, 0), now));

        let filter = EventFilter {
            title: Some("conf".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&record(now, 0), now));
    }

    #[test]
    fn test_price_and_date_bounds_are_inclusive() {
        let now = Utc::now();
        let rec = record(now, 0);
        let filter = EventFilter {
            min_price: Some(Decimal::new(1000, 2)),
            max_price: Some(Decimal::new(1000, 2)),
            min_date: Some(rec.event.start_time),
            max_date: Some(rec.event.start_time),
            ..Default::default()
        };
        assert!(filter.matches(&rec, now));

        let filter = EventFilter {
            max_price: Some(Decimal::new(999, 2)),
            ..Default::default()
        };
        assert!(!filter.matches(&rec, now));
    }

    #[test]
    fn test_available_seats_filter() {
        let now = Utc::now();
        let wants_seats = EventFilter {
            has_available_seats: Some(true),
            ..Default::default()
        };
        assert!(wants_seats.matches(&record(now, 1), now));
        assert!(!wants_seats.matches(&record(now, 2), now));

        let no_restriction = EventFilter {
            has_available_seats: Some(false),
            ..Default::default()
        };
        assert!(no_restriction.matches(&record(now, 2), now));
    }

    #[test]
    fn test_upcoming_filter_splits_on_now() {
        let now = Utc::now();
        let future = record(now, 0);
        let mut past = record(now, 0);
        past.event.start_time = now - Duration::hours(1);

        let upcoming = EventFilter {
            upcoming: Some(true),
            ..Default::default()
        };
        assert!(upcoming.matches(&future, now));
        assert!(!upcoming.matches(&past, now));

        let finished = EventFilter {
            upcoming: Some(false),
            ..Default::default()
        };
        assert!(!finished.matches(&future, now));
        assert!(finished.matches(&past, now));
    }
}
