// @zen-component: SESSION-TokenStore
//
//! Token store: access token, refresh token, expiry and user for one session.
//!
//! The access token and expiry live in memory only. The refresh token and the
//! user are mirrored into a [`KeyValueStore`] so a restarted process can
//! recover the session with a refresh instead of a new login.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::config::DEFAULT_AUTH_SAFETY_MARGIN;
use crate::models::User;
use crate::storage::KeyValueStore;

/// Persistence key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Persistence key for the serialized user.
pub const USER_KEY: &str = "user";

#[derive(Debug, Default, Clone)]
struct TokenState {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
    refresh_token: String,
    user: Option<User>,
}

impl TokenState {
    fn is_authenticated_at(&self, now: DateTime<Utc>, margin: TimeDelta) -> bool {
        !self.access_token.is_empty()
            && self.user.is_some()
            && self.expires_at.is_some_and(|exp| exp > now + margin)
    }
}

/// Holds the credentials of one session.
///
/// All mutations are synchronous and take a single write lock, so readers
/// never observe a half-applied login or refresh.
pub struct TokenStore {
    state: RwLock<TokenState>,
    persistence: Arc<dyn KeyValueStore>,
    safety_margin: TimeDelta,
}

impl TokenStore {
    /// Create a store hydrated from `persistence` with the default 5s margin.
    pub fn new(persistence: Arc<dyn KeyValueStore>) -> Self {
        Self::with_safety_margin(persistence, DEFAULT_AUTH_SAFETY_MARGIN)
    }

    pub fn with_safety_margin(persistence: Arc<dyn KeyValueStore>, margin: Duration) -> Self {
        let refresh_token = persistence.get(REFRESH_TOKEN_KEY).unwrap_or_default();
        let user = persistence
            .get(USER_KEY)
            .and_then(|raw| match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "discarding unreadable persisted user");
                    None
                }
            });
        debug!(
            recoverable = !refresh_token.is_empty(),
            has_user = user.is_some(),
            "hydrated token store"
        );
        Self {
            state: RwLock::new(TokenState {
                refresh_token,
                user,
                ..TokenState::default()
            }),
            persistence,
            safety_margin: to_delta(margin),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, TokenState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TokenState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Set the in-memory access token together with its expiry.
    pub fn set_access(&self, token: impl Into<String>, expires_at: DateTime<Utc>) {
        let mut state = self.write();
        state.access_token = token.into();
        state.expires_at = Some(expires_at);
    }

    /// Set and persist the refresh token. An empty token removes it.
    pub fn set_refresh(&self, token: impl Into<String>) {
        let mut state = self.write();
        state.refresh_token = token.into();
        self.persist_refresh(&state.refresh_token);
    }

    /// Set and persist the user.
    pub fn set_user(&self, user: User) {
        let mut state = self.write();
        self.persist_user(Some(&user));
        state.user = Some(user);
    }

    /// Populate every field at once (login).
    pub fn set_session(
        &self,
        access_token: impl Into<String>,
        expires_at: DateTime<Utc>,
        refresh_token: impl Into<String>,
        user: User,
    ) {
        let mut state = self.write();
        state.access_token = access_token.into();
        state.expires_at = Some(expires_at);
        state.refresh_token = refresh_token.into();
        self.persist_refresh(&state.refresh_token);
        self.persist_user(Some(&user));
        state.user = Some(user);
    }

    /// Apply a refresh outcome, but only if `used_refresh_token` is still the
    /// held refresh token. Returns `false` (and changes nothing) when the
    /// session was replaced or cleared while the refresh was in flight.
    pub fn apply_refresh_if_current(
        &self,
        used_refresh_token: &str,
        access_token: impl Into<String>,
        expires_at: DateTime<Utc>,
        rotated_refresh_token: Option<String>,
    ) -> bool {
        let mut state = self.write();
        if state.refresh_token != used_refresh_token {
            return false;
        }
        state.access_token = access_token.into();
        state.expires_at = Some(expires_at);
        if let Some(rotated) = rotated_refresh_token.filter(|t| !t.is_empty()) {
            state.refresh_token = rotated;
            self.persist_refresh(&state.refresh_token);
        }
        true
    }

    /// Clear everything, in memory and persisted.
    pub fn clear_all(&self) {
        let mut state = self.write();
        self.clear_locked(&mut state);
    }

    /// Clear everything if `used_refresh_token` is still the held refresh
    /// token. Returns whether the session was cleared.
    pub fn clear_if_refresh_token(&self, used_refresh_token: &str) -> bool {
        let mut state = self.write();
        if state.refresh_token != used_refresh_token {
            return false;
        }
        self.clear_locked(&mut state);
        true
    }

    fn clear_locked(&self, state: &mut TokenState) {
        *state = TokenState::default();
        self.persist_refresh("");
        self.persist_user(None);
    }

    fn persist_refresh(&self, token: &str) {
        let result = if token.is_empty() {
            self.persistence.remove(REFRESH_TOKEN_KEY)
        } else {
            self.persistence.set(REFRESH_TOKEN_KEY, token)
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to persist refresh token");
        }
    }

    fn persist_user(&self, user: Option<&User>) {
        let result = match user {
            Some(user) => match serde_json::to_string(user) {
                Ok(json) => self.persistence.set(USER_KEY, &json),
                Err(e) => {
                    warn!(error = %e, "failed to encode user");
                    return;
                }
            },
            None => self.persistence.remove(USER_KEY),
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to persist user");
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Access token held, user known, and expiry beyond the safety margin.
    ///
    /// Computed on every call: a session stops being authenticated by clock
    /// alone, without any transition.
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(Utc::now())
    }

    pub fn is_authenticated_at(&self, now: DateTime<Utc>) -> bool {
        self.read().is_authenticated_at(now, self.safety_margin)
    }

    /// A refresh token is held, whatever the state of the access token.
    pub fn can_attempt_refresh(&self) -> bool {
        !self.read().refresh_token.is_empty()
    }

    /// `Authorization: Bearer <token>`, or an empty map when no access token
    /// is held (send unauthenticated).
    pub fn auth_header(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let state = self.read();
        if state.access_token.is_empty() {
            return headers;
        }
        match HeaderValue::from_str(&format!("Bearer {}", state.access_token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => warn!("access token is not a valid header value; sending unauthenticated"),
        }
        headers
    }

    /// Time left before the access token expires (negative once expired).
    pub fn time_to_expiry(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.read().expires_at.map(|exp| exp - now)
    }

    pub fn access_token(&self) -> Option<String> {
        Some(self.read().access_token.clone()).filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        Some(self.read().refresh_token.clone()).filter(|t| !t.is_empty())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.read().expires_at
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("TokenStore")
            .field("has_access_token", &!state.access_token.is_empty())
            .field("expires_at", &state.expires_at)
            .field("has_refresh_token", &!state.refresh_token.is_empty())
            .field("user", &state.user)
            .finish()
    }
}

/// Convert unix seconds from the wire into an instant.
pub fn expiry_from_epoch(exp: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(exp, 0)
}

pub(crate) fn to_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}
