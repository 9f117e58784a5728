//! Storage seam for members, events, registrations and sessions.
//!
//! Handlers hold an `Arc<dyn Store>`. Two drivers exist: [`postgres::PgStore`]
//! for deployments and [`memory::MemoryStore`] for tests and local runs.
//! Registration changes go through [`Store::apply_registration`], which checks
//! the member's current state and adjusts the point total in one step.

pub mod memory;
pub mod postgres;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::roster::{
    models::{Event, EventFields, Registration, Responses, User},
    registration::{Action, RegistrationStatus, Transition},
};

pub const MEMORY_DSN_PREFIX: &str = "memory://";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Duplicate,
    #[error("record not found")]
    NotFound,
    #[error("registration changed concurrently")]
    StaleRegistration,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("stored data is invalid: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub major: String,
    pub year: String,
    pub member_id: String,
    pub is_admin: bool,
}

/// Login lookup result.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: Uuid,
    pub password_hash: String,
    pub email_verified: bool,
}

/// Profile fields a member may change; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub major: Option<String>,
    pub year: Option<String>,
    pub member_id: Option<String>,
    pub bio: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.major.is_none()
            && self.year.is_none()
            && self.member_id.is_none()
            && self.bio.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub fields: EventFields,
    pub attendance_code: String,
    pub created_by: Uuid,
}

/// Hashed token with owner and expiry, used for sessions and email verification.
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub token_hash: Vec<u8>,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RegistrationChange {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub transition: Transition,
    pub at: DateTime<Utc>,
    /// Replacement answers; `None` keeps what was stored.
    pub responses: Option<Responses>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    // users
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;
    async fn all_users(&self) -> StoreResult<Vec<User>>;
    async fn credentials(&self, email: &str) -> StoreResult<Option<Credentials>>;
    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<Option<User>>;
    async fn set_admin(&self, id: Uuid, is_admin: bool) -> StoreResult<Option<User>>;
    async fn mark_email_verified(&self, id: Uuid) -> StoreResult<()>;

    // tokens
    async fn insert_verification_token(&self, token: TokenRecord) -> StoreResult<()>;
    /// Delete a live verification token and return its owner.
    async fn consume_verification_token(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Uuid>>;
    async fn insert_session(&self, session: TokenRecord) -> StoreResult<()>;
    async fn session_user(&self, token_hash: &[u8], now: DateTime<Utc>)
        -> StoreResult<Option<Uuid>>;
    async fn delete_session(&self, token_hash: &[u8]) -> StoreResult<()>;

    // events
    async fn create_event(&self, event: NewEvent) -> StoreResult<Event>;
    async fn event(&self, id: Uuid) -> StoreResult<Option<Event>>;
    async fn events(&self) -> StoreResult<Vec<Event>>;
    async fn update_event(&self, id: Uuid, fields: EventFields) -> StoreResult<Option<Event>>;
    async fn set_event_code(&self, id: Uuid, code: &str) -> StoreResult<Option<Event>>;
    async fn set_event_photo(&self, id: Uuid, url: &str) -> StoreResult<Option<Event>>;
    /// Delete the event and every registration for it.
    async fn delete_event(&self, id: Uuid) -> StoreResult<bool>;

    // registrations
    async fn registration(&self, event_id: Uuid, user_id: Uuid)
        -> StoreResult<Option<Registration>>;
    /// Apply a planned transition and the point change; returns the updated member.
    ///
    /// Fails with [`StoreError::StaleRegistration`] when the stored state no
    /// longer matches `transition.from`.
    async fn apply_registration(&self, change: RegistrationChange) -> StoreResult<User>;
}

/// Registration row after `change`, or `None` when it should be removed.
///
/// # Errors
/// Returns [`StoreError::StaleRegistration`] when `current` is not in `transition.from`.
pub(crate) fn next_registration(
    current: Option<Registration>,
    change: &RegistrationChange,
) -> StoreResult<Option<Registration>> {
    let status = current
        .as_ref()
        .map_or(RegistrationStatus::Unregistered, Registration::status);
    if status != change.transition.from {
        return Err(StoreError::StaleRegistration);
    }

    let mut row = current.unwrap_or_else(|| Registration {
        event_id: change.event_id,
        user_id: change.user_id,
        rsvped_at: None,
        attended_at: None,
        responses: Vec::new(),
    });
    match change.transition.action {
        Action::Cancel => return Ok(None),
        Action::Rsvp => row.rsvped_at = Some(change.at),
        Action::SignIn => row.attended_at = Some(change.at),
    }
    if let Some(responses) = &change.responses {
        row.responses.clone_from(responses);
    }
    Ok(Some(row))
}

/// Open the store named by `dsn`.
///
/// # Errors
/// Returns an error if the database is unreachable or migrations fail.
pub async fn connect(dsn: &str) -> Result<Arc<dyn Store>> {
    if dsn.starts_with(MEMORY_DSN_PREFIX) {
        info!("Using in-memory store");
        return Ok(Arc::new(memory::MemoryStore::default()));
    }
    let store = postgres::PgStore::connect(dsn)
        .await
        .context("Failed to connect to database")?;
    store
        .migrate()
        .await
        .context("Failed to apply database migrations")?;
    Ok(Arc::new(store))
}
