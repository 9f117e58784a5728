//! In-process store selected with a `memory://` DSN.
//!
//! All state sits behind one `RwLock`, so every write (including registration
//! plus point changes) is atomic with respect to other requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    next_registration, Credentials, NewEvent, NewUser, ProfileUpdate, RegistrationChange, Store,
    StoreError, StoreResult, TokenRecord,
};
use crate::roster::{
    models::{Event, EventFields, Registration, User},
    registration::apply_points,
};

#[derive(Debug, Clone)]
struct UserRow {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, UserRow>,
    events: HashMap<Uuid, Event>,
    registrations: BTreeMap<(Uuid, Uuid), Registration>,
    sessions: HashMap<Vec<u8>, (Uuid, DateTime<Utc>)>,
    verification_tokens: HashMap<Vec<u8>, (Uuid, DateTime<Utc>)>,
}

impl State {
    /// User with RSVP/attended lists filled in from registrations.
    fn hydrate_user(&self, row: &UserRow) -> User {
        let mut user = row.user.clone();
        user.rsvp_events.clear();
        user.attended_events.clear();
        for registration in self.registrations.values() {
            if registration.user_id != user.id {
                continue;
            }
            if registration.attended_at.is_some() {
                user.attended_events.push(registration.event_id);
            } else if registration.rsvped_at.is_some() {
                user.rsvp_events.push(registration.event_id);
            }
        }
        user
    }

    fn hydrate_event(&self, event: &Event) -> Event {
        let mut event = event.clone();
        event.attendees.clear();
        event.rsvp_attendees.clear();
        event.responses.clear();
        for registration in self
            .registrations
            .range((event.id, Uuid::nil())..=(event.id, Uuid::from_u128(u128::MAX)))
            .map(|(_, registration)| registration)
        {
            if registration.attended_at.is_some() {
                event.attendees.push(registration.user_id);
            }
            if registration.rsvped_at.is_some() {
                event.rsvp_attendees.push(registration.user_id);
            }
            event
                .responses
                .insert(registration.user_id, registration.responses.clone());
        }
        event
    }

    fn user(&self, id: Uuid) -> Option<User> {
        self.users.get(&id).map(|row| self.hydrate_user(row))
    }

    fn event(&self, id: Uuid) -> Option<Event> {
        self.events.get(&id).map(|event| self.hydrate_event(event))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|row| row.user.email == new.email) {
            return Err(StoreError::Duplicate);
        }
        let user = User {
            id: Uuid::now_v7(),
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            major: new.major,
            year: new.year,
            member_id: new.member_id,
            bio: String::new(),
            points: 0,
            is_admin: new.is_admin,
            email_verified: false,
            rsvp_events: Vec::new(),
            attended_events: Vec::new(),
            created_at: Utc::now(),
        };
        state.users.insert(
            user.id,
            UserRow {
                user: user.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(user)
    }

    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.user(id))
    }

    async fn users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.user(*id)).collect())
    }

    async fn all_users(&self) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .map(|row| state.hydrate_user(row))
            .collect();
        users.sort_by_key(|user| user.created_at);
        Ok(users)
    }

    async fn credentials(&self, email: &str) -> StoreResult<Option<Credentials>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|row| row.user.email == email)
            .map(|row| Credentials {
                user_id: row.user.id,
                password_hash: row.password_hash.clone(),
                email_verified: row.user.email_verified,
            }))
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<Option<User>> {
        let mut state = self.state.write().await;
        let Some(row) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        let user = &mut row.user;
        let fields = [
            (&mut user.first_name, update.first_name),
            (&mut user.last_name, update.last_name),
            (&mut user.major, update.major),
            (&mut user.year, update.year),
            (&mut user.member_id, update.member_id),
            (&mut user.bio, update.bio),
        ];
        for (slot, value) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
        Ok(state.user(id))
    }

    async fn set_admin(&self, id: Uuid, is_admin: bool) -> StoreResult<Option<User>> {
        let mut state = self.state.write().await;
        let Some(row) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        row.user.is_admin = is_admin;
        Ok(state.user(id))
    }

    async fn mark_email_verified(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let row = state.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        row.user.email_verified = true;
        Ok(())
    }

    async fn insert_verification_token(&self, token: TokenRecord) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state
            .verification_tokens
            .insert(token.token_hash, (token.user_id, token.expires_at));
        Ok(())
    }

    async fn consume_verification_token(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Uuid>> {
        let mut state = self.state.write().await;
        Ok(state
            .verification_tokens
            .remove(token_hash)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(user_id, _)| user_id))
    }

    async fn insert_session(&self, session: TokenRecord) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state
            .sessions
            .insert(session.token_hash, (session.user_id, session.expires_at));
        Ok(())
    }

    async fn session_user(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Uuid>> {
        let state = self.state.read().await;
        Ok(state
            .sessions
            .get(token_hash)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(user_id, _)| *user_id))
    }

    async fn delete_session(&self, token_hash: &[u8]) -> StoreResult<()> {
        self.state.write().await.sessions.remove(token_hash);
        Ok(())
    }

    async fn create_event(&self, new: NewEvent) -> StoreResult<Event> {
        let event = Event {
            id: Uuid::now_v7(),
            fields: new.fields,
            attendance_code: new.attendance_code,
            photo_url: None,
            created_by: new.created_by,
            created_at: Utc::now(),
            attendees: Vec::new(),
            rsvp_attendees: Vec::new(),
            responses: BTreeMap::new(),
        };
        self.state
            .write()
            .await
            .events
            .insert(event.id, event.clone());
        Ok(event)
    }

    async fn event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.state.read().await.event(id))
    }

    async fn events(&self) -> StoreResult<Vec<Event>> {
        let state = self.state.read().await;
        Ok(state
            .events
            .values()
            .map(|event| state.hydrate_event(event))
            .collect())
    }

    async fn update_event(&self, id: Uuid, fields: EventFields) -> StoreResult<Option<Event>> {
        let mut state = self.state.write().await;
        let Some(event) = state.events.get_mut(&id) else {
            return Ok(None);
        };
        event.fields = fields;
        Ok(state.event(id))
    }

    async fn set_event_code(&self, id: Uuid, code: &str) -> StoreResult<Option<Event>> {
        let mut state = self.state.write().await;
        let Some(event) = state.events.get_mut(&id) else {
            return Ok(None);
        };
        event.attendance_code = code.to_string();
        Ok(state.event(id))
    }

    async fn set_event_photo(&self, id: Uuid, url: &str) -> StoreResult<Option<Event>> {
        let mut state = self.state.write().await;
        let Some(event) = state.events.get_mut(&id) else {
            return Ok(None);
        };
        event.photo_url = Some(url.to_string());
        Ok(state.event(id))
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if state.events.remove(&id).is_none() {
            return Ok(false);
        }
        state.registrations.retain(|(event_id, _), _| *event_id != id);
        Ok(true)
    }

    async fn registration(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Registration>> {
        let state = self.state.read().await;
        Ok(state.registrations.get(&(event_id, user_id)).cloned())
    }

    async fn apply_registration(&self, change: RegistrationChange) -> StoreResult<User> {
        let mut state = self.state.write().await;
        if !state.events.contains_key(&change.event_id) {
            return Err(StoreError::NotFound);
        }
        if !state.users.contains_key(&change.user_id) {
            return Err(StoreError::NotFound);
        }

        let key = (change.event_id, change.user_id);
        let current = state.registrations.get(&key).cloned();
        match next_registration(current, &change)? {
            Some(row) => {
                state.registrations.insert(key, row);
            }
            None => {
                state.registrations.remove(&key);
            }
        }

        let row = state
            .users
            .get_mut(&change.user_id)
            .ok_or(StoreError::NotFound)?;
        row.user.points = apply_points(row.user.points, change.transition.points_delta);
        state.user(change.user_id).ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::models::fixtures::{at, fields};
    use crate::roster::registration::{
        plan_cancel, plan_rsvp, plan_sign_in, RegistrationStatus, Transition,
    };
    use crate::roster::window::WindowState;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            major: "Math".to_string(),
            year: "Senior".to_string(),
            member_id: "M-1".to_string(),
            is_admin: false,
        }
    }

    async fn seeded() -> StoreResult<(MemoryStore, User, Event)> {
        let store = MemoryStore::default();
        let user = store.create_user(new_user("ada@example.com")).await?;
        let event = store
            .create_event(NewEvent {
                fields: fields(),
                attendance_code: "ABCDEF".to_string(),
                created_by: user.id,
            })
            .await?;
        Ok((store, user, event))
    }

    fn change(event: &Event, user: &User, transition: Transition) -> RegistrationChange {
        RegistrationChange {
            event_id: event.id,
            user_id: user.id,
            transition,
            at: at(17, 30),
            responses: None,
        }
    }

    #[tokio::test]
    async fn duplicate_email_rejected() -> StoreResult<()> {
        let store = MemoryStore::default();
        store.create_user(new_user("ada@example.com")).await?;
        let second = store.create_user(new_user("ada@example.com")).await;
        assert!(matches!(second, Err(StoreError::Duplicate)));
        Ok(())
    }

    #[tokio::test]
    async fn rsvp_then_sign_in_moves_lists_and_credits_once() -> StoreResult<()> {
        let (store, user, event) = seeded().await?;

        let rsvp = plan_rsvp(RegistrationStatus::Unregistered, WindowState::RsvpOpen)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let after_rsvp = store.apply_registration(change(&event, &user, rsvp)).await?;
        assert_eq!(after_rsvp.rsvp_events, vec![event.id]);
        assert_eq!(after_rsvp.points, 0);

        let sign_in = plan_sign_in(RegistrationStatus::Rsvped, WindowState::SignInOpen, &event, "abcdef")
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let after_sign_in = store
            .apply_registration(change(&event, &user, sign_in))
            .await?;
        assert!(after_sign_in.rsvp_events.is_empty());
        assert_eq!(after_sign_in.attended_events, vec![event.id]);
        assert_eq!(after_sign_in.points, 5);

        // Replaying the same planned transition is stale, not a second credit.
        let replay = store.apply_registration(change(&event, &user, sign_in)).await;
        assert!(matches!(replay, Err(StoreError::StaleRegistration)));
        assert_eq!(store.user(user.id).await?.map(|u| u.points), Some(5));

        let hydrated = store.event(event.id).await?;
        assert_eq!(hydrated.as_ref().map(|e| e.attendees.clone()), Some(vec![user.id]));
        assert_eq!(hydrated.map(|e| e.rsvp_attendees), Some(vec![user.id]));
        Ok(())
    }

    #[tokio::test]
    async fn cancel_after_sign_in_floors_points() -> StoreResult<()> {
        let (store, user, event) = seeded().await?;
        let sign_in = plan_sign_in(RegistrationStatus::Unregistered, WindowState::SignInOpen, &event, "ABCDEF")
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        store.apply_registration(change(&event, &user, sign_in)).await?;

        // An admin edit after the credit raises the event's value.
        let mut bigger = event.clone();
        bigger.fields.points = 50;
        let cancel = plan_cancel(RegistrationStatus::SignedIn, &bigger)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let after = store.apply_registration(change(&event, &user, cancel)).await?;
        assert_eq!(after.points, 0);
        assert!(after.attended_events.is_empty());
        assert!(store.registration(event.id, user.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn deleting_event_clears_member_lists() -> StoreResult<()> {
        let (store, user, event) = seeded().await?;
        let rsvp = plan_rsvp(RegistrationStatus::Unregistered, WindowState::RsvpOpen)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        store.apply_registration(change(&event, &user, rsvp)).await?;

        assert!(store.delete_event(event.id).await?);
        assert!(!store.delete_event(event.id).await?);
        let user = store.user(user.id).await?;
        assert_eq!(user.map(|u| u.rsvp_events.len()), Some(0));
        Ok(())
    }

    #[tokio::test]
    async fn expired_tokens_are_ignored() -> StoreResult<()> {
        let (store, user, _) = seeded().await?;
        store
            .insert_session(TokenRecord {
                token_hash: vec![1, 2, 3],
                user_id: user.id,
                expires_at: at(12, 0),
            })
            .await?;
        assert_eq!(store.session_user(&[1, 2, 3], at(11, 0)).await?, Some(user.id));
        assert_eq!(store.session_user(&[1, 2, 3], at(12, 0)).await?, None);

        store
            .insert_verification_token(TokenRecord {
                token_hash: vec![9],
                user_id: user.id,
                expires_at: at(12, 0),
            })
            .await?;
        assert_eq!(store.consume_verification_token(&[9], at(11, 0)).await?, Some(user.id));
        assert_eq!(store.consume_verification_token(&[9], at(11, 0)).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn profile_update_keeps_unset_fields() -> StoreResult<()> {
        let (store, user, _) = seeded().await?;
        let updated = store
            .update_profile(
                user.id,
                ProfileUpdate {
                    bio: Some("Hello".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await?;
        let updated = updated.ok_or(StoreError::NotFound)?;
        assert_eq!(updated.bio, "Hello");
        assert_eq!(updated.first_name, "Ada");
        Ok(())
    }
}
