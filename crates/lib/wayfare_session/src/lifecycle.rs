// @zen-component: SESSION-Lifecycle
//
//! Session lifecycle: login, logout, and the computed session state.
//!
//! ```text
//! LoggedOut --login--> Authenticated --refresh ok--> Authenticated
//!     ^                      |
//!     +--- logout / refresh failure / clock expiry (computed) ---+
//! ```
//!
//! This is the only place that populates or wipes a session.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::auth_api::AuthApi;
use crate::error::{SessionError, SessionResult};
use crate::models::{Credentials, User};
use crate::tokens::{TokenStore, expiry_from_epoch};

/// Capacity of the session event channel.
const EVENT_CAPACITY: usize = 32;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    UserInitiated,
    RefreshFailed,
}

/// Notifications for the view layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { user_id: String },
    Refreshed,
    LoggedOut { reason: LogoutReason },
    /// An unrecoverable auth failure: show the login surface.
    LoginRequired,
}

/// Session state, derived from the token store on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    /// No usable access token, but a refresh token to try.
    Recoverable,
    Authenticated,
}

/// Drives login and logout over a shared [`TokenStore`].
pub struct SessionLifecycle {
    store: Arc<TokenStore>,
    auth: AuthApi,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionLifecycle {
    pub fn new(store: Arc<TokenStore>, auth: AuthApi) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            auth,
            events,
        }
    }

    /// Log in; `false` on any failure. Nothing is written unless the whole
    /// response is valid.
    pub async fn login(&self, credentials: &Credentials) -> bool {
        match self.try_login(credentials).await {
            Ok(_) => true,
            Err(e) => {
                warn!(email = %credentials.email, error = %e, "login failed");
                false
            }
        }
    }

    /// Log in, returning the authenticated user or the reason it failed.
    pub async fn try_login(&self, credentials: &Credentials) -> SessionResult<User> {
        let resp = self.auth.login(credentials).await?;
        let expires_at = expiry_from_epoch(resp.exp).ok_or_else(|| {
            SessionError::MalformedResponse(format!("login expiry out of range: {}", resp.exp))
        })?;

        self.store
            .set_session(resp.access_token, expires_at, resp.refresh_token, resp.user.clone());
        info!(user_id = %resp.user.id, role = ?resp.user.role, %expires_at, "logged in");
        self.notify(SessionEvent::LoggedIn {
            user_id: resp.user.id.clone(),
        });
        Ok(resp.user)
    }

    /// Clear the session. Idempotent.
    pub fn logout(&self) {
        self.end_session(LogoutReason::UserInitiated);
    }

    pub(crate) fn end_session(&self, reason: LogoutReason) {
        let had_session = self.store.can_attempt_refresh() || self.store.access_token().is_some();
        self.store.clear_all();
        if had_session {
            info!(?reason, "session ended");
            self.notify(SessionEvent::LoggedOut { reason });
        }
    }

    /// End the session only if it still holds `used_refresh_token`; a newer
    /// login that happened meanwhile is left alone.
    pub(crate) fn end_session_if_current(&self, used_refresh_token: &str, reason: LogoutReason) {
        if self.store.clear_if_refresh_token(used_refresh_token) {
            info!(?reason, "session ended");
            self.notify(SessionEvent::LoggedOut { reason });
        }
    }

    pub(crate) fn notify(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        if self.store.is_authenticated() {
            SessionState::Authenticated
        } else if self.store.can_attempt_refresh() {
            SessionState::Recoverable
        } else {
            SessionState::LoggedOut
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn can_attempt_refresh(&self) -> bool {
        self.store.can_attempt_refresh()
    }

    pub fn user(&self) -> Option<User> {
        self.store.user()
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }
}
