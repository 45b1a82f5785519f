// @zen-component: SESSION-RequestPipeline
//
//! Request pipeline: every API call goes through here.
//!
//! One linear sequence per request:
//!
//! 1. proactive refresh when the token expires within the horizon
//! 2. attach the auth header (possibly none)
//! 3. send
//! 4. on 401, refresh once and resend the original request once
//!
//! Auth endpoints skip steps 1, 2 and 4.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use reqwest::header::AUTHORIZATION;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::DEFAULT_REFRESH_HORIZON;
use crate::error::{SessionError, SessionResult};
use crate::lifecycle::{SessionEvent, SessionLifecycle};
use crate::refresh::RefreshCoordinator;
use crate::tokens::{TokenStore, to_delta};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};

/// Wraps an [`HttpTransport`] with token refresh and retry handling.
pub struct RequestPipeline {
    store: Arc<TokenStore>,
    lifecycle: Arc<SessionLifecycle>,
    coordinator: Arc<RefreshCoordinator>,
    transport: Arc<dyn HttpTransport>,
    refresh_horizon: TimeDelta,
}

impl RequestPipeline {
    pub fn new(
        lifecycle: Arc<SessionLifecycle>,
        coordinator: Arc<RefreshCoordinator>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            store: Arc::clone(lifecycle.store()),
            lifecycle,
            coordinator,
            transport,
            refresh_horizon: to_delta(DEFAULT_REFRESH_HORIZON),
        }
    }

    pub fn with_refresh_horizon(mut self, horizon: Duration) -> Self {
        self.refresh_horizon = to_delta(horizon);
        self
    }

    /// Send a request. Non-2xx responses become errors.
    pub async fn send(&self, request: ApiRequest) -> SessionResult<ApiResponse> {
        self.run(request).await
    }

    /// Like [`send`](Self::send), but gives up with
    /// [`SessionError::Cancelled`] as soon as `cancel` fires. A refresh the
    /// request started keeps running.
    pub async fn send_cancellable(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> SessionResult<ApiResponse> {
        if cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(path = %request.path, "request cancelled");
                Err(SessionError::Cancelled)
            }
            result = self.run(request.clone()) => result,
        }
    }

    async fn run(&self, request: ApiRequest) -> SessionResult<ApiResponse> {
        if request.is_auth_endpoint() {
            let resp = self.transport.execute(&request).await?;
            return resp.error_for_status(&request.path);
        }

        self.refresh_proactively(&request).await?;

        let (authorized, sent_token) = self.authorize(&request);
        let resp = self.transport.execute(&authorized).await?;
        if !resp.is_unauthorized() {
            return resp.error_for_status(&request.path);
        }

        self.retry_after_refresh(&request, sent_token.as_deref(), resp)
            .await
    }

    async fn refresh_proactively(&self, request: &ApiRequest) -> SessionResult<()> {
        let now = Utc::now();
        if !self.store.is_authenticated_at(now) || !self.store.can_attempt_refresh() {
            return Ok(());
        }
        let Some(remaining) = self.store.time_to_expiry(now) else {
            return Ok(());
        };
        // An already-expired token is left to the 401 path.
        if remaining <= TimeDelta::zero() || remaining >= self.refresh_horizon {
            return Ok(());
        }

        debug!(
            path = %request.path,
            remaining_secs = remaining.num_seconds(),
            "access token near expiry; refreshing before send"
        );
        if self.coordinator.refresh().await {
            return Ok(());
        }
        self.lifecycle.notify(SessionEvent::LoginRequired);
        Err(SessionError::LoginRequired {
            reason: "session refresh failed before sending".into(),
            status: None,
        })
    }

    /// Recover from a 401 for a request that carried `sent_token`.
    async fn retry_after_refresh(
        &self,
        request: &ApiRequest,
        sent_token: Option<&str>,
        unauthorized: ApiResponse,
    ) -> SessionResult<ApiResponse> {
        let login_required = || SessionError::LoginRequired {
            reason: unauthorized.error_message(),
            status: Some(unauthorized.status.as_u16()),
        };

        // Another request already replaced the token this one was rejected for.
        let replaced = self.store.access_token().as_deref() != sent_token
            && self.store.is_authenticated();
        if replaced {
            debug!(path = %request.path, "401 for a superseded token; resending");
        } else if !self.store.can_attempt_refresh() {
            debug!(path = %request.path, "401 with no refresh token");
            self.lifecycle.notify(SessionEvent::LoginRequired);
            return Err(login_required());
        } else {
            debug!(path = %request.path, "401 received; refreshing and retrying once");
            if !self.coordinator.refresh().await {
                self.lifecycle.notify(SessionEvent::LoginRequired);
                return Err(login_required());
            }
        }

        let (authorized, _) = self.authorize(request);
        let retried = self.transport.execute(&authorized).await?;
        if retried.is_unauthorized() {
            warn!(path = %request.path, "still unauthorized after refresh");
            return Err(SessionError::Unauthorized(retried.error_message()));
        }
        retried.error_for_status(&request.path)
    }

    /// Copy of `request` carrying the current auth header, plus the access
    /// token that header holds.
    fn authorize(&self, request: &ApiRequest) -> (ApiRequest, Option<String>) {
        let mut authorized = request.clone();
        authorized.headers.extend(self.store.auth_header());
        let token = authorized
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        (authorized, token)
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth_api::{AuthApi, REFRESH_PATH};
    use crate::testutil::{Counter, ScriptedTransport, bearer, json_response, store_expiring_in};
    use reqwest::StatusCode;

    /// Resource server that accepts only `valid_token`, and a refresh endpoint
    /// that issues `at-new` (or rejects when `refresh_ok` is false).
    fn api(valid_token: &'static str, refresh_ok: bool) -> Arc<ScriptedTransport> {
        ScriptedTransport::new(move |req| {
            if req.path == REFRESH_PATH {
                return if refresh_ok {
                    json_response(
                        StatusCode::OK,
                        serde_json::json!({
                            "access_token": "at-new",
                            "exp": Utc::now().timestamp() + 300,
                        }),
                    )
                } else {
                    json_response(
                        StatusCode::UNAUTHORIZED,
                        serde_json::json!({"error": "invalid refresh"}),
                    )
                };
            }
            if bearer(req).as_deref() == Some(valid_token) {
                json_response(StatusCode::OK, serde_json::json!({"id": 1}))
            } else {
                json_response(
                    StatusCode::UNAUTHORIZED,
                    serde_json::json!({"error": "invalid token"}),
                )
            }
        })
    }

    fn pipeline(store: Arc<TokenStore>, transport: Arc<ScriptedTransport>) -> RequestPipeline {
        let auth = AuthApi::new(transport.clone());
        let lifecycle = Arc::new(SessionLifecycle::new(store, auth.clone()));
        let coordinator = Arc::new(RefreshCoordinator::new(Arc::clone(&lifecycle), auth));
        RequestPipeline::new(lifecycle, coordinator, transport)
    }

    #[tokio::test]
    async fn attaches_bearer_header() {
        let transport = api("at-old", true);
        let pipeline = pipeline(store_expiring_in(300, Some("rt-1")), transport.clone());

        let resp = pipeline.send(ApiRequest::get("/experiences/1")).await.unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(bearer(&transport.requests()[0]).as_deref(), Some("at-old"));
    }

    #[tokio::test]
    async fn refreshes_proactively_inside_horizon() {
        let transport = api("at-new", true);
        let pipeline = pipeline(store_expiring_in(20, Some("rt-1")), transport.clone());

        pipeline.send(ApiRequest::get("/experiences/1")).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path, REFRESH_PATH);
        assert_eq!(bearer(&requests[1]).as_deref(), Some("at-new"));
    }

    #[tokio::test]
    async fn no_proactive_refresh_outside_horizon() {
        let transport = api("at-old", true);
        let pipeline = pipeline(store_expiring_in(40, Some("rt-1")), transport.clone());

        pipeline.send(ApiRequest::get("/experiences/1")).await.unwrap();
        assert_eq!(transport.calls_to(REFRESH_PATH), 0);
    }

    #[tokio::test]
    async fn custom_horizon_is_respected() {
        let transport = api("at-new", true);
        let pipeline = pipeline(store_expiring_in(40, Some("rt-1")), transport.clone())
            .with_refresh_horizon(Duration::from_secs(60));

        pipeline.send(ApiRequest::get("/experiences/1")).await.unwrap();
        assert_eq!(transport.calls_to(REFRESH_PATH), 1);
    }

    #[tokio::test]
    async fn failed_proactive_refresh_does_not_send() {
        let transport = api("at-old", false);
        let store = store_expiring_in(20, Some("rt-1"));
        let pipeline = pipeline(store.clone(), transport.clone());
        let mut events = pipeline.lifecycle.subscribe();

        let err = pipeline
            .send(ApiRequest::get("/experiences/1"))
            .await
            .unwrap_err();
        assert!(err.requires_login());
        assert_eq!(err.status(), None);
        assert_eq!(transport.calls_to("/experiences/1"), 0);
        assert!(!store.is_authenticated());

        let mut saw_login_required = false;
        while let Ok(event) = events.try_recv() {
            saw_login_required |= event == SessionEvent::LoginRequired;
        }
        assert!(saw_login_required);
    }

    #[tokio::test]
    async fn expired_token_uses_reactive_path() {
        let transport = api("at-new", true);
        let pipeline = pipeline(store_expiring_in(-10, Some("rt-1")), transport.clone());

        let resp = pipeline.send(ApiRequest::get("/experiences/1")).await.unwrap();
        assert_eq!(resp.status, StatusCode::OK);

        let paths: Vec<_> = transport.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, ["/experiences/1", REFRESH_PATH, "/experiences/1"]);
    }

    #[tokio::test]
    async fn single_401_refreshes_once_and_retries_once() {
        let transport = api("at-new", true);
        let pipeline = pipeline(store_expiring_in(300, Some("rt-1")), transport.clone());

        let resp = pipeline.send(ApiRequest::get("/experiences/1")).await.unwrap();
        assert_eq!(resp.json::<serde_json::Value>().unwrap()["id"], 1);
        assert_eq!(transport.calls_to(REFRESH_PATH), 1);
        assert_eq!(transport.calls_to("/experiences/1"), 2);
    }

    #[tokio::test]
    async fn second_401_is_final() {
        // Nothing is ever accepted, even after refresh
        let transport = api("never-valid", true);
        let pipeline = pipeline(store_expiring_in(300, Some("rt-1")), transport.clone());

        let err = pipeline
            .send(ApiRequest::get("/experiences/1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Unauthorized(_)));
        assert_eq!(transport.calls_to(REFRESH_PATH), 1);
        assert_eq!(transport.calls_to("/experiences/1"), 2);
    }

    #[tokio::test]
    async fn no_refresh_token_requires_login_without_network_refresh() {
        let transport = api("at-new", true);
        let pipeline = pipeline(store_expiring_in(-10, None), transport.clone());

        let err = pipeline
            .send(ApiRequest::get("/experiences/1"))
            .await
            .unwrap_err();
        assert!(err.requires_login());
        assert_eq!(transport.calls_to(REFRESH_PATH), 0);
    }

    #[tokio::test]
    async fn failed_reactive_refresh_requires_login() {
        let transport = api("at-new", false);
        let store = store_expiring_in(-10, Some("rt-1"));
        let pipeline = pipeline(store.clone(), transport.clone());

        let err = pipeline
            .send(ApiRequest::get("/experiences/1"))
            .await
            .unwrap_err();
        assert!(err.requires_login());
        // The 401 that started the recovery is kept
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("invalid token"));
        assert!(!store.can_attempt_refresh());
        assert_eq!(transport.calls_to("/experiences/1"), 1);
    }

    #[tokio::test]
    async fn rate_limit_propagates_untouched() {
        let transport = ScriptedTransport::new(|_| {
            json_response(StatusCode::TOO_MANY_REQUESTS, serde_json::json!({"error": "rate"}))
        });
        let store = store_expiring_in(300, Some("rt-1"));
        let pipeline = pipeline(store.clone(), transport.clone());

        let err = pipeline.send(ApiRequest::get("/experiences")).await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert_eq!(transport.requests().len(), 1);
        assert!(store.is_authenticated());
    }

    #[tokio::test]
    async fn auth_endpoint_401_is_never_refreshed() {
        let transport = ScriptedTransport::new(|_| {
            json_response(StatusCode::UNAUTHORIZED, serde_json::json!({"error": "invalid"}))
        });
        let pipeline = pipeline(store_expiring_in(20, Some("rt-1")), transport.clone());

        let request =
            ApiRequest::post("/auth/login", &serde_json::json!({"email": "x", "password": "y"}))
                .unwrap();
        let err = pipeline.send(request).await.unwrap_err();
        assert_eq!(err.status(), Some(401));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert!(bearer(&requests[0]).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn proactive_and_reactive_paths_share_one_refresh() {
        let refreshes = Counter::default();
        let transport = ScriptedTransport::with_latency(Duration::from_millis(20), {
            let refreshes = refreshes.clone();
            move |req| {
                if req.path == REFRESH_PATH {
                    refreshes.bump();
                    return json_response(
                        StatusCode::OK,
                        serde_json::json!({
                            "access_token": "at-new",
                            "exp": Utc::now().timestamp() + 300,
                        }),
                    );
                }
                if bearer(req).as_deref() == Some("at-new") {
                    json_response(StatusCode::OK, serde_json::json!({}))
                } else {
                    json_response(StatusCode::UNAUTHORIZED, serde_json::json!({"error": "expired"}))
                }
            }
        });
        // Inside the horizon: the first request refreshes proactively while a
        // second request, already answered 401, recovers at the same moment.
        let store = store_expiring_in(20, Some("rt-1"));
        let pipeline = pipeline(store, transport);

        let second = ApiRequest::get("/experiences/2");
        let proactive = pipeline.send(ApiRequest::get("/experiences/1"));
        let reactive = pipeline.retry_after_refresh(
            &second,
            Some("at-old"),
            json_response(StatusCode::UNAUTHORIZED, serde_json::json!({"error": "expired"})),
        );
        let (a, b) = tokio::join!(proactive, reactive);

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(refreshes.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn late_401_for_replaced_token_resends_without_refreshing() {
        let refreshes = Counter::default();
        let transport = ScriptedTransport::with_latency_by(
            |req| {
                // The second request's 401 lands long after the first recovered
                if req.path == "/experiences/2" && bearer(req).as_deref() == Some("at-old") {
                    Duration::from_millis(100)
                } else {
                    Duration::from_millis(10)
                }
            },
            {
                let refreshes = refreshes.clone();
                move |req| {
                    if req.path == REFRESH_PATH {
                        refreshes.bump();
                        // Single-use refresh tokens: a second exchange would fail
                        if req.body.as_ref().unwrap()["refresh_token"] != "rt-1" {
                            return json_response(
                                StatusCode::UNAUTHORIZED,
                                serde_json::json!({"error": "invalid refresh"}),
                            );
                        }
                        return json_response(
                            StatusCode::OK,
                            serde_json::json!({
                                "access_token": "at-new",
                                "refresh_token": "rt-2",
                                "exp": Utc::now().timestamp() + 300,
                            }),
                        );
                    }
                    if bearer(req).as_deref() == Some("at-new") {
                        json_response(StatusCode::OK, serde_json::json!({}))
                    } else {
                        json_response(StatusCode::UNAUTHORIZED, serde_json::json!({"error": "expired"}))
                    }
                }
            },
        );
        let store = store_expiring_in(-10, Some("rt-1"));
        let pipeline = pipeline(store.clone(), transport.clone());

        let (a, b) = tokio::join!(
            pipeline.send(ApiRequest::get("/experiences/1")),
            pipeline.send(ApiRequest::get("/experiences/2")),
        );

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(refreshes.get(), 1);
        assert_eq!(transport.calls_to("/experiences/2"), 2);
        assert_eq!(store.refresh_token().as_deref(), Some("rt-2"));
    }

    #[tokio::test]
    async fn late_401_after_logout_requires_login() {
        let transport = api("at-new", true);
        let store = store_expiring_in(300, Some("rt-1"));
        let pipeline = pipeline(store.clone(), transport.clone());
        store.clear_all();

        let err = pipeline
            .retry_after_refresh(
                &ApiRequest::get("/experiences/1"),
                Some("at-old"),
                json_response(StatusCode::UNAUTHORIZED, serde_json::json!({"error": "expired"})),
            )
            .await
            .unwrap_err();
        assert!(err.requires_login());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_discards_response() {
        let transport = ScriptedTransport::with_latency(Duration::from_millis(100), |_| {
            json_response(StatusCode::OK, serde_json::json!({"data": []}))
        });
        let pipeline = pipeline(store_expiring_in(300, Some("rt-1")), transport);
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                cancel.cancel();
            }
        };
        let (result, ()) = tokio::join!(
            pipeline.send_cancellable(ApiRequest::get("/experiences"), &cancel),
            canceller
        );
        assert!(matches!(result, Err(SessionError::Cancelled)));
    }

    #[tokio::test]
    async fn already_cancelled_request_is_not_sent() {
        let transport = api("at-old", true);
        let pipeline = pipeline(store_expiring_in(300, Some("rt-1")), transport.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = pipeline
            .send_cancellable(ApiRequest::get("/experiences"), &cancel)
            .await;
        assert!(result.unwrap_err().is_cancelled());
        assert!(transport.requests().is_empty());
    }
}
