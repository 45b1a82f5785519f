//! Test helpers: a scripted transport and canned API bodies.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;

use crate::error::SessionResult;
use crate::models::{Role, User};
use crate::storage::MemoryStore;
use crate::tokens::TokenStore;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};

type Handler = Box<dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync>;
type Latency = Box<dyn Fn(&ApiRequest) -> Duration + Send + Sync>;

/// Transport that answers from a closure and records every request.
pub struct ScriptedTransport {
    handler: Handler,
    latency: Latency,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new(handler: impl Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static) -> Arc<Self> {
        Self::with_latency(Duration::ZERO, handler)
    }

    /// Like [`new`](Self::new), but every call sleeps first.
    pub fn with_latency(
        latency: Duration,
        handler: impl Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static,
    ) -> Arc<Self> {
        Self::with_latency_by(move |_| latency, handler)
    }

    /// Per-request latency, chosen by `latency`.
    pub fn with_latency_by(
        latency: impl Fn(&ApiRequest) -> Duration + Send + Sync + 'static,
        handler: impl Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            latency: Box::new(latency),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: &ApiRequest) -> SessionResult<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let latency = (self.latency)(request);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        Ok((self.handler)(request))
    }
}

pub fn json_response(status: StatusCode, body: serde_json::Value) -> ApiResponse {
    ApiResponse::new(status, body.to_string())
}

pub fn login_body(access_token: &str, refresh_token: &str, exp: i64) -> serde_json::Value {
    serde_json::json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "user": {"id": "1", "email": "user@example.com", "role": "user"},
        "exp": exp,
    })
}

/// Bearer token attached to a recorded request, if any.
pub fn bearer(request: &ApiRequest) -> Option<String> {
    request
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

pub fn test_user() -> User {
    User {
        id: "1".into(),
        email: "user@example.com".into(),
        role: Role::User,
    }
}

/// Token store holding an access token expiring in `expires_in_secs` (may be
/// negative) and, optionally, a refresh token.
pub fn store_expiring_in(expires_in_secs: i64, refresh_token: Option<&str>) -> Arc<TokenStore> {
    let store = Arc::new(TokenStore::new(Arc::new(MemoryStore::new())));
    store.set_session(
        "at-old",
        Utc::now() + TimeDelta::seconds(expires_in_secs),
        refresh_token.unwrap_or_default(),
        test_user(),
    );
    store
}

/// Counter for closures that need to count invocations.
#[derive(Debug, Default, Clone)]
pub struct Counter(Arc<AtomicU64>);

impl Counter {
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}
