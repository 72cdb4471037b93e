use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    AdmissionError, EventRepository, RegistrationRepository, RepositoryError, UserRepository,
};
use crate::models::{Event, EventFilter, EventRecord, Registration, RegistrationStatus, User};

const EVENT_COLUMNS: &str = "e.id, e.organizer_id, e.title, e.description, e.location, \
     e.start_time, e.capacity, e.price, e.is_active, e.created_at, e.updated_at";

const OCCUPIED_SEATS: &str = "COUNT(r.id) FILTER (WHERE r.status <> 'cancelled')";

const REGISTRATION_COLUMNS: &str = "id, event_id, user_id, registered_at, status, payment_status";

const USER_COLUMNS: &str = "id, email, username, first_name, last_name, phone_number, bio, \
     is_verified, is_staff, created_at, updated_at";

const UNIQUE_VIOLATION: &str = "23505";

/// Turns unique-constraint failures into `Conflict`, keeping everything else opaque.
fn map_write_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let constraint = db_err.constraint().unwrap_or("unique").to_string();
            return RepositoryError::Conflict(constraint);
        }
    }
    RepositoryError::Database(err)
}

fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn select_events() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!(
        "SELECT {EVENT_COLUMNS}, {OCCUPIED_SEATS} AS occupied_seats \
         FROM events e LEFT JOIN registrations r ON r.event_id = e.id"
    ))
}

#[derive(Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn create(&self, event: Event) -> Result<Event, RepositoryError> {
        sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events
                (id, organizer_id, title, description, location, start_time,
                 capacity, price, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, organizer_id, title, description, location, start_time,
                      capacity, price, is_active, created_at, updated_at
            "#,
        )
        .bind(event.id)
        .bind(event.organizer_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.start_time)
        .bind(event.capacity)
        .bind(event.price)
        .bind(event.is_active)
        .bind(event.created_at)
        .bind(event.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventRecord>, RepositoryError> {
        let mut query = select_events();
        query.push(" WHERE e.id = ").push_bind(id).push(" GROUP BY e.id");

        let record = query
            .build_query_as::<EventRecord>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn list(
        &self,
        filter: EventFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>, RepositoryError> {
        let mut query = select_events();
        query.push(" WHERE TRUE");

        if let Some(title) = &filter.title {
            query.push(" AND e.title ILIKE ").push_bind(like_pattern(title));
        }
        if let Some(location) = &filter.location {
            query
                .push(" AND e.location ILIKE ")
                .push_bind(like_pattern(location));
        }
        if let Some(min_date) = filter.min_date {
            query.push(" AND e.start_time >= ").push_bind(min_date);
        }
        if let Some(max_date) = filter.max_date {
            query.push(" AND e.start_time <= ").push_bind(max_date);
        }
        if let Some(min_price) = filter.min_price {
            query.push(" AND e.price >= ").push_bind(min_price);
        }
        if let Some(max_price) = filter.max_price {
            query.push(" AND e.price <= ").push_bind(max_price);
        }
        if let Some(is_active) = filter.is_active {
            query.push(" AND e.is_active = ").push_bind(is_active);
        }
        match filter.upcoming {
            Some(true) => {
                query.push(" AND e.start_time > ").push_bind(now);
            }
            Some(false) => {
                query.push(" AND e.start_time <= ").push_bind(now);
            }
            None => {}
        }

        query.push(" GROUP BY e.id");
        if filter.has_available_seats == Some(true) {
            query.push(format!(" HAVING {OCCUPIED_SEATS} < e.capacity"));
        }
        query.push(" ORDER BY e.start_time DESC");

        let records = query
            .build_query_as::<EventRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn save(&self, event: Event) -> Result<Option<Event>, RepositoryError> {
        sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET title = $2, description = $3, location = $4, start_time = $5,
                capacity = $6, price = $7, is_active = $8, updated_at = $9
            WHERE id = $1
            RETURNING id, organizer_id, title, description, location, start_time,
                      capacity, price, is_active, created_at, updated_at
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.start_time)
        .bind(event.capacity)
        .bind(event.price)
        .bind(event.is_active)
        .bind(event.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)
    }
}

#[derive(Clone)]
pub struct PgRegistrationRepository {
    pool: PgPool,
}

impl PgRegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrationRepository for PgRegistrationRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Registration>, RepositoryError> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(registration)
    }

    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Registration>, RepositoryError> {
        let registrations = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations \
             WHERE event_id = $1 ORDER BY registered_at DESC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(registrations)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Registration>, RepositoryError> {
        let registrations = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations \
             WHERE user_id = $1 ORDER BY registered_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(registrations)
    }

    async fn admit(&self, registration: Registration) -> Result<Registration, AdmissionError> {
        let mut tx = self.pool.begin().await?;

        // Locking the event row serializes admissions for the same event,
        // so the count below cannot go stale before the insert commits.
        let capacity: Option<i32> =
            sqlx::query_scalar("SELECT capacity FROM events WHERE id = $1 FOR UPDATE")
                .bind(registration.event_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(capacity) = capacity else {
            return Err(AdmissionError::EventMissing);
        };

        let occupied: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status <> 'cancelled'",
        )
        .bind(registration.event_id)
        .fetch_one(&mut *tx)
        .await?;
        if occupied >= i64::from(capacity) {
            return Err(AdmissionError::CapacityExhausted);
        }

        let inserted = sqlx::query_as::<_, Registration>(&format!(
            "INSERT INTO registrations ({REGISTRATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (event_id, user_id) DO NOTHING \
             RETURNING {REGISTRATION_COLUMNS}"
        ))
        .bind(registration.id)
        .bind(registration.event_id)
        .bind(registration.user_id)
        .bind(registration.registered_at)
        .bind(registration.status)
        .bind(registration.payment_status)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_write_error)?;

        let Some(inserted) = inserted else {
            return Err(AdmissionError::Duplicate);
        };

        tx.commit().await?;
        Ok(inserted)
    }

    async fn cancel(&self, id: Uuid) -> Result<Option<Registration>, RepositoryError> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            "UPDATE registrations SET status = $2 \
             WHERE id = $1 AND status <> $2 \
             RETURNING {REGISTRATION_COLUMNS}"
        ))
        .bind(id)
        .bind(RegistrationStatus::Cancelled)
        .fetch_optional(&self.pool)
        .await?;
        Ok(registration)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM registrations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone_number)
        .bind(&user.bio)
        .bind(user.is_verified)
        .bind(user.is_staff)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn save(&self, user: User) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET email = $2, username = $3, first_name = $4, last_name = $5, \
                 phone_number = $6, bio = $7, updated_at = $8 \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone_number)
        .bind(&user.bio)
        .bind(user.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)
    }
}
