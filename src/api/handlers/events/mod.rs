//! Event endpoints.
//!
//! Every member may browse events; creating, editing and managing the
//! attendance code or photo requires the admin flag. Only the member who
//! created an event may delete it.

pub mod crud;
pub mod photo;
pub mod types;

use uuid::Uuid;

use crate::{
    api::{error::ApiError, state::AppState},
    roster::models::Event,
};

/// Load an event or return `404`.
pub(crate) async fn load_event(state: &AppState, id: Uuid) -> Result<Event, ApiError> {
    state
        .store()
        .event(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event"))
}
