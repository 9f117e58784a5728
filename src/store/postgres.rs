//! `PostgreSQL` driver.
//!
//! Member RSVP/attended lists and event attendee lists are derived from the
//! `registrations` table on read. Registration changes lock the member row with
//! `FOR UPDATE` so the point total and the registration move together.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgPool, PgPoolOptions, PgRow},
    types::Json,
    Postgres, Row, Transaction,
};
use std::{collections::BTreeMap, time::Duration};
use uuid::Uuid;

use super::{
    next_registration, Credentials, NewEvent, NewUser, ProfileUpdate, RegistrationChange, Store,
    StoreError, StoreResult, TokenRecord,
};
use crate::roster::{
    models::{Event, EventFields, Question, Registration, Responses, User},
    registration::apply_points,
};

const USER_COLUMNS: &str = "id, email, first_name, last_name, major, year, member_id, bio, \
     points, is_admin, email_verified, created_at";

const EVENT_COLUMNS: &str = "id, name, starts_at, ends_at, location, committee, description, \
     points, sign_in_opens_hours_before, rsvp_enabled, questions, attendance_code, photo_url, \
     created_by, created_at";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// # Errors
    /// Returns an error if the pool cannot be created.
    pub async fn connect(dsn: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    /// Returns an error if a migration fails to apply.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn hydrate_user(&self, row: &PgRow) -> StoreResult<User> {
        let mut user = user_from_row(row)?;
        let registrations = sqlx::query(
            r"
            SELECT event_id, rsvped_at, attended_at
            FROM registrations
            WHERE user_id = $1
            ORDER BY COALESCE(attended_at, rsvped_at)
            ",
        )
        .bind(user.id)
        .fetch_all(&self.pool)
        .await?;

        for registration in &registrations {
            let event_id: Uuid = registration.try_get("event_id")?;
            let rsvped_at: Option<DateTime<Utc>> = registration.try_get("rsvped_at")?;
            let attended_at: Option<DateTime<Utc>> = registration.try_get("attended_at")?;
            if attended_at.is_some() {
                user.attended_events.push(event_id);
            } else if rsvped_at.is_some() {
                user.rsvp_events.push(event_id);
            }
        }
        Ok(user)
    }

    async fn hydrate_event(&self, row: &PgRow) -> StoreResult<Event> {
        let mut event = event_from_row(row)?;
        let registrations = sqlx::query(
            r"
            SELECT user_id, rsvped_at, attended_at, responses
            FROM registrations
            WHERE event_id = $1
            ORDER BY COALESCE(rsvped_at, attended_at)
            ",
        )
        .bind(event.id)
        .fetch_all(&self.pool)
        .await?;

        for registration in &registrations {
            let user_id: Uuid = registration.try_get("user_id")?;
            let rsvped_at: Option<DateTime<Utc>> = registration.try_get("rsvped_at")?;
            let attended_at: Option<DateTime<Utc>> = registration.try_get("attended_at")?;
            let Json(responses): Json<Responses> = registration.try_get("responses")?;
            if attended_at.is_some() {
                event.attendees.push(user_id);
            }
            if rsvped_at.is_some() {
                event.rsvp_attendees.push(user_id);
            }
            event.responses.insert(user_id, responses);
        }
        Ok(event)
    }

    async fn load_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.hydrate_user(&row).await?)),
            None => Ok(None),
        }
    }

    async fn load_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.hydrate_event(&row).await?)),
            None => Ok(None),
        }
    }
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        major: row.try_get("major")?,
        year: row.try_get("year")?,
        member_id: row.try_get("member_id")?,
        bio: row.try_get("bio")?,
        points: row.try_get("points")?,
        is_admin: row.try_get("is_admin")?,
        email_verified: row.try_get("email_verified")?,
        rsvp_events: Vec::new(),
        attended_events: Vec::new(),
        created_at: row.try_get("created_at")?,
    })
}

fn event_from_row(row: &PgRow) -> StoreResult<Event> {
    let hours: i32 = row.try_get("sign_in_opens_hours_before")?;
    let sign_in_opens_hours_before = u32::try_from(hours)
        .map_err(|_| StoreError::Corrupt(format!("negative sign-in offset: {hours}")))?;
    let Json(questions): Json<Vec<Question>> = row.try_get("questions")?;
    Ok(Event {
        id: row.try_get("id")?,
        fields: EventFields {
            name: row.try_get("name")?,
            starts_at: row.try_get("starts_at")?,
            ends_at: row.try_get("ends_at")?,
            location: row.try_get("location")?,
            committee: row.try_get("committee")?,
            description: row.try_get("description")?,
            points: row.try_get("points")?,
            sign_in_opens_hours_before,
            rsvp_enabled: row.try_get("rsvp_enabled")?,
            questions,
        },
        attendance_code: row.try_get("attendance_code")?,
        photo_url: row.try_get("photo_url")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        attendees: Vec::new(),
        rsvp_attendees: Vec::new(),
        responses: BTreeMap::new(),
    })
}

fn offset_hours(fields: &EventFields) -> StoreResult<i32> {
    i32::try_from(fields.sign_in_opens_hours_before)
        .map_err(|_| StoreError::Corrupt("sign-in offset out of range".to_string()))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

async fn lock_registration(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    user_id: Uuid,
) -> StoreResult<Option<Registration>> {
    let row = sqlx::query(
        r"
        SELECT rsvped_at, attended_at, responses
        FROM registrations
        WHERE event_id = $1 AND user_id = $2
        FOR UPDATE
        ",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(|row| -> StoreResult<Registration> {
        let Json(responses): Json<Responses> = row.try_get("responses")?;
        Ok(Registration {
            event_id,
            user_id,
            rsvped_at: row.try_get("rsvped_at")?,
            attended_at: row.try_get("attended_at")?,
            responses,
        })
    })
    .transpose()
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let query = format!(
            r"
            INSERT INTO users
                (id, email, password_hash, first_name, last_name, major, year, member_id, is_admin)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "
        );
        let row = sqlx::query(&query)
            .bind(Uuid::now_v7())
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(&new.first_name)
            .bind(&new.last_name)
            .bind(&new.major)
            .bind(&new.year)
            .bind(&new.member_id)
            .bind(new.is_admin)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::Duplicate
                } else {
                    StoreError::Database(err)
                }
            })?;
        user_from_row(&row)
    }

    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.load_user(id).await
    }

    async fn users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        let mut users = Vec::with_capacity(rows.len());
        for row in &rows {
            users.push(self.hydrate_user(row).await?);
        }
        Ok(users)
    }

    async fn all_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        let mut users = Vec::with_capacity(rows.len());
        for row in &rows {
            users.push(self.hydrate_user(row).await?);
        }
        Ok(users)
    }

    async fn credentials(&self, email: &str) -> StoreResult<Option<Credentials>> {
        let row = sqlx::query(
            "SELECT id, password_hash, email_verified FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| -> StoreResult<Credentials> {
            Ok(Credentials {
                user_id: row.try_get("id")?,
                password_hash: row.try_get("password_hash")?,
                email_verified: row.try_get("email_verified")?,
            })
        })
        .transpose()
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<Option<User>> {
        let result = sqlx::query(
            r"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                major = COALESCE($4, major),
                year = COALESCE($5, year),
                member_id = COALESCE($6, member_id),
                bio = COALESCE($7, bio)
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.major)
        .bind(update.year)
        .bind(update.member_id)
        .bind(update.bio)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.load_user(id).await
    }

    async fn set_admin(&self, id: Uuid, is_admin: bool) -> StoreResult<Option<User>> {
        let result = sqlx::query("UPDATE users SET is_admin = $2 WHERE id = $1")
            .bind(id)
            .bind(is_admin)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.load_user(id).await
    }

    async fn mark_email_verified(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET email_verified = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn insert_verification_token(&self, token: TokenRecord) -> StoreResult<()> {
        sqlx::query(
            r"
            INSERT INTO verification_tokens (token_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(&token.token_hash)
        .bind(token.user_id)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_verification_token(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Uuid>> {
        let row = sqlx::query(
            r"
            DELETE FROM verification_tokens
            WHERE token_hash = $1
            RETURNING user_id, expires_at
            ",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let expires_at: DateTime<Utc> = row.try_get("expires_at")?;
        if expires_at <= now {
            return Ok(None);
        }
        Ok(Some(row.try_get("user_id")?))
    }

    async fn insert_session(&self, session: TokenRecord) -> StoreResult<()> {
        sqlx::query(
            r"
            INSERT INTO sessions (token_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(&session.token_hash)
        .bind(session.user_id)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn session_user(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Uuid>> {
        let row = sqlx::query(
            "SELECT user_id FROM sessions WHERE token_hash = $1 AND expires_at > $2",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| row.try_get("user_id").map_err(StoreError::from))
            .transpose()
    }

    async fn delete_session(&self, token_hash: &[u8]) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_event(&self, new: NewEvent) -> StoreResult<Event> {
        let query = format!(
            r"
            INSERT INTO events
                (id, name, starts_at, ends_at, location, committee, description, points,
                 sign_in_opens_hours_before, rsvp_enabled, questions, attendance_code, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {EVENT_COLUMNS}
            "
        );
        let fields = &new.fields;
        let row = sqlx::query(&query)
            .bind(Uuid::now_v7())
            .bind(&fields.name)
            .bind(fields.starts_at)
            .bind(fields.ends_at)
            .bind(&fields.location)
            .bind(&fields.committee)
            .bind(&fields.description)
            .bind(fields.points)
            .bind(offset_hours(fields)?)
            .bind(fields.rsvp_enabled)
            .bind(Json(&fields.questions))
            .bind(&new.attendance_code)
            .bind(new.created_by)
            .fetch_one(&self.pool)
            .await?;
        event_from_row(&row)
    }

    async fn event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        self.load_event(id).await
    }

    async fn events(&self) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY starts_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        let mut events = Vec::with_capacity(rows.len());
        for row in &rows {
            events.push(self.hydrate_event(row).await?);
        }
        Ok(events)
    }

    async fn update_event(&self, id: Uuid, fields: EventFields) -> StoreResult<Option<Event>> {
        let result = sqlx::query(
            r"
            UPDATE events SET
                name = $2, starts_at = $3, ends_at = $4, location = $5, committee = $6,
                description = $7, points = $8, sign_in_opens_hours_before = $9,
                rsvp_enabled = $10, questions = $11
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&fields.name)
        .bind(fields.starts_at)
        .bind(fields.ends_at)
        .bind(&fields.location)
        .bind(&fields.committee)
        .bind(&fields.description)
        .bind(fields.points)
        .bind(offset_hours(&fields)?)
        .bind(fields.rsvp_enabled)
        .bind(Json(&fields.questions))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.load_event(id).await
    }

    async fn set_event_code(&self, id: Uuid, code: &str) -> StoreResult<Option<Event>> {
        let result = sqlx::query("UPDATE events SET attendance_code = $2 WHERE id = $1")
            .bind(id)
            .bind(code)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.load_event(id).await
    }

    async fn set_event_photo(&self, id: Uuid, url: &str) -> StoreResult<Option<Event>> {
        let result = sqlx::query("UPDATE events SET photo_url = $2 WHERE id = $1")
            .bind(id)
            .bind(url)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.load_event(id).await
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<bool> {
        // registrations go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn registration(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Registration>> {
        let row = sqlx::query(
            r"
            SELECT rsvped_at, attended_at, responses
            FROM registrations
            WHERE event_id = $1 AND user_id = $2
            ",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| -> StoreResult<Registration> {
            let Json(responses): Json<Responses> = row.try_get("responses")?;
            Ok(Registration {
                event_id,
                user_id,
                rsvped_at: row.try_get("rsvped_at")?,
                attended_at: row.try_get("attended_at")?,
                responses,
            })
        })
        .transpose()
    }

    async fn apply_registration(&self, change: RegistrationChange) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;

        let points: Option<i64> =
            sqlx::query_scalar("SELECT points FROM users WHERE id = $1 FOR UPDATE")
                .bind(change.user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let points = points.ok_or(StoreError::NotFound)?;

        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM events WHERE id = $1")
            .bind(change.event_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound);
        }

        let current = lock_registration(&mut tx, change.event_id, change.user_id).await?;
        match next_registration(current, &change)? {
            Some(row) => {
                sqlx::query(
                    r"
                    INSERT INTO registrations (event_id, user_id, rsvped_at, attended_at, responses)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (event_id, user_id) DO UPDATE SET
                        rsvped_at = EXCLUDED.rsvped_at,
                        attended_at = EXCLUDED.attended_at,
                        responses = EXCLUDED.responses
                    ",
                )
                .bind(row.event_id)
                .bind(row.user_id)
                .bind(row.rsvped_at)
                .bind(row.attended_at)
                .bind(Json(&row.responses))
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM registrations WHERE event_id = $1 AND user_id = $2")
                    .bind(change.event_id)
                    .bind(change.user_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let points = apply_points(points, change.transition.points_delta);
        sqlx::query("UPDATE users SET points = $2 WHERE id = $1")
            .bind(change.user_id)
            .bind(points)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.load_user(change.user_id)
            .await?
            .ok_or(StoreError::NotFound)
    }
}
