// @zen-component: SESSION-CancellableQuery
//
//! Debounced, cancellable query execution.
//!
//! Each [`trigger`](CancellableQuery::trigger) supersedes the previous one:
//! its debounce timer is stopped and, if it already fired, its in-flight call
//! is cancelled. Only the latest trigger may publish a result.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::DEFAULT_SEARCH_DEBOUNCE;
use crate::error::{SessionError, SessionResult};

/// Latest published outcome; `None` until a query completes.
pub type QueryOutcome<T> = Option<SessionResult<T>>;

#[derive(Default)]
struct QueryState {
    generation: u64,
    pending: Option<CancellationToken>,
}

struct Inner<T> {
    state: Mutex<QueryState>,
    results: watch::Sender<QueryOutcome<T>>,
}

impl<T> Inner<T> {
    fn state(&self) -> MutexGuard<'_, QueryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish `outcome` if `generation` is still the latest live trigger.
    fn publish(&self, generation: u64, cancel: &CancellationToken, outcome: SessionResult<T>) {
        let mut state = self.state();
        if state.generation != generation || cancel.is_cancelled() {
            debug!(generation, latest = state.generation, "dropping superseded result");
            return;
        }
        state.pending = None;
        match outcome {
            Err(SessionError::Cancelled) => {}
            Err(e) => {
                warn!(generation, error = %e, "query failed");
                self.results.send_replace(Some(Err(e)));
            }
            ok => {
                self.results.send_replace(Some(ok));
            }
        }
    }
}

/// Runs at most one query at a time, after a quiet period.
pub struct CancellableQuery<T> {
    inner: Arc<Inner<T>>,
    delay: Duration,
}

impl<T: Send + Sync + 'static> CancellableQuery<T> {
    pub fn new(delay: Duration) -> Self {
        let (results, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueryState::default()),
                results,
            }),
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `query` to run once the debounce delay passes without another
    /// trigger. The token handed to `query` fires if it is superseded.
    pub fn trigger<F, Fut>(&self, query: F)
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = SessionResult<T>> + Send + 'static,
    {
        let (generation, cancel) = {
            let mut state = self.inner.state();
            if let Some(previous) = state.pending.take() {
                previous.cancel();
            }
            state.generation += 1;
            let cancel = CancellationToken::new();
            state.pending = Some(cancel.clone());
            (state.generation, cancel)
        };

        let inner = Arc::clone(&self.inner);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            debug!(generation, "debounce elapsed; running query");

            let outcome = tokio::select! {
                _ = cancel.cancelled() => return,
                outcome = query(cancel.clone()) => outcome,
            };
            inner.publish(generation, &cancel, outcome);
        });
    }

    /// Stop the pending timer or in-flight call. Nothing pending is fine.
    pub fn cancel(&self) {
        if let Some(pending) = self.inner.state().pending.take() {
            pending.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner.state().pending.is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryOutcome<T>> {
        self.inner.results.subscribe()
    }
}

impl<T: Clone> CancellableQuery<T> {
    pub fn latest(&self) -> QueryOutcome<T> {
        self.inner.results.borrow().clone()
    }
}

impl<T: Send + Sync + 'static> Default for CancellableQuery<T> {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEBOUNCE)
    }
}

impl<T> Drop for CancellableQuery<T> {
    fn drop(&mut self) {
        if let Some(pending) = self.inner.state().pending.take() {
            pending.cancel();
        }
    }
}
