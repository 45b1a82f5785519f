// @zen-component: SESSION-RefreshCoordinator
//
//! Single-flight token refresh.
//!
//! The proactive (near-expiry) and reactive (401) paths can both decide to
//! refresh for the same expired token at nearly the same moment. Refresh
//! tokens may be single-use, so a second exchange with the same token would
//! fail and log the user out. Every caller that arrives while an attempt is
//! running therefore awaits that attempt instead of starting its own.
//!
//! The attempt runs on its own task, so it finishes and updates the store
//! exactly once even if every waiting caller is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, info, warn};

use crate::auth_api::AuthApi;
use crate::lifecycle::{LogoutReason, SessionEvent, SessionLifecycle};
use crate::tokens::expiry_from_epoch;

type SharedAttempt = Shared<BoxFuture<'static, bool>>;

struct InFlight {
    generation: u64,
    attempt: SharedAttempt,
}

/// Deduplicates concurrent refresh requests into one network exchange.
pub struct RefreshCoordinator {
    lifecycle: Arc<SessionLifecycle>,
    auth: AuthApi,
    in_flight: Mutex<Option<InFlight>>,
    generations: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(lifecycle: Arc<SessionLifecycle>, auth: AuthApi) -> Self {
        Self {
            lifecycle,
            auth,
            in_flight: Mutex::new(None),
            generations: AtomicU64::new(0),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refresh the access token, joining an attempt already in flight.
    ///
    /// Returns `true` if the store now holds a fresh access token. Fails
    /// closed: any network, rejection or decoding failure ends the session
    /// and returns `false`.
    pub async fn refresh(self: &Arc<Self>) -> bool {
        let attempt = {
            let mut slot = self.slot();
            match slot.as_ref() {
                Some(in_flight) => {
                    debug!(generation = in_flight.generation, "joining in-flight refresh");
                    in_flight.attempt.clone()
                }
                None => {
                    let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
                    let attempt = self.start_attempt(generation);
                    *slot = Some(InFlight {
                        generation,
                        attempt: attempt.clone(),
                    });
                    attempt
                }
            }
        };
        attempt.await
    }

    /// Whether an attempt is currently outstanding.
    pub fn is_refreshing(&self) -> bool {
        self.slot().is_some()
    }

    fn start_attempt(self: &Arc<Self>, generation: u64) -> SharedAttempt {
        let coordinator = Arc::clone(self);
        let task = tokio::spawn(async move {
            let _clear = ClearOnSettle {
                coordinator: Arc::clone(&coordinator),
                generation,
            };
            coordinator.exchange(generation).await
        });

        async move {
            task.await.unwrap_or_else(|e| {
                warn!(error = %e, "refresh task failed");
                false
            })
        }
        .boxed()
        .shared()
    }

    async fn exchange(&self, generation: u64) -> bool {
        let store = self.lifecycle.store();
        let Some(refresh_token) = store.refresh_token() else {
            debug!(generation, "no refresh token held; nothing to refresh");
            return false;
        };

        debug!(generation, "refreshing access token");
        let resp = match self.auth.refresh(&refresh_token).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(generation, error = %e, "token refresh failed");
                self.lifecycle
                    .end_session_if_current(&refresh_token, LogoutReason::RefreshFailed);
                return false;
            }
        };

        let Some(expires_at) = expiry_from_epoch(resp.exp) else {
            warn!(generation, exp = resp.exp, "refresh expiry out of range");
            self.lifecycle
                .end_session_if_current(&refresh_token, LogoutReason::RefreshFailed);
            return false;
        };

        let rotated = resp.refresh_token.is_some();
        if !store.apply_refresh_if_current(
            &refresh_token,
            resp.access_token,
            expires_at,
            resp.refresh_token,
        ) {
            // The session was replaced or cleared while we were waiting.
            debug!(generation, "discarding refresh for a superseded session");
            return store.is_authenticated();
        }

        info!(generation, rotated, %expires_at, "access token refreshed");
        self.lifecycle.notify(SessionEvent::Refreshed);
        true
    }
}

/// Clears the in-flight slot when the attempt settles, however it settles.
struct ClearOnSettle {
    coordinator: Arc<RefreshCoordinator>,
    generation: u64,
}

impl Drop for ClearOnSettle {
    fn drop(&mut self) {
        let mut slot = self.coordinator.slot();
        if slot
            .as_ref()
            .is_some_and(|in_flight| in_flight.generation == self.generation)
        {
            *slot = None;
        }
    }
}
