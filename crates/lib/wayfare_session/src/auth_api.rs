//! Typed calls to the authentication endpoints.
//!
//! These go straight to the transport: auth endpoints never pass through the
//! request pipeline's header injection or refresh handling.

use std::sync::Arc;

use crate::error::{SessionError, SessionResult};
use crate::models::{Credentials, LoginResponse, RefreshRequest, RefreshResponse};
use crate::transport::{ApiRequest, HttpTransport};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Client for `/auth/login` and `/auth/refresh`.
#[derive(Clone)]
pub struct AuthApi {
    transport: Arc<dyn HttpTransport>,
}

impl AuthApi {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Exchange credentials for a token pair.
    pub async fn login(&self, credentials: &Credentials) -> SessionResult<LoginResponse> {
        let request = ApiRequest::post(LOGIN_PATH, credentials)?;
        let resp = self.transport.execute(&request).await?;

        if resp.is_unauthorized() {
            return Err(SessionError::InvalidCredentials);
        }
        let body: LoginResponse = resp.error_for_status(LOGIN_PATH)?.json()?;
        if body.access_token.is_empty() || body.refresh_token.is_empty() {
            return Err(SessionError::MalformedResponse(
                "login response missing tokens".into(),
            ));
        }
        Ok(body)
    }

    /// Exchange a refresh token for a new access token (and possibly a
    /// rotated refresh token).
    pub async fn refresh(&self, refresh_token: &str) -> SessionResult<RefreshResponse> {
        let request = ApiRequest::post(REFRESH_PATH, &RefreshRequest { refresh_token })?;
        let resp = self.transport.execute(&request).await?;

        if resp.is_unauthorized() {
            return Err(SessionError::RefreshRejected(resp.error_message()));
        }
        let resp = resp.error_for_status(REFRESH_PATH).map_err(|e| match e {
            SessionError::Http { status, message, .. } => {
                SessionError::RefreshRejected(format!("HTTP {status}: {message}"))
            }
            other => other,
        })?;
        let body: RefreshResponse = resp.json()?;
        if body.access_token.is_empty() {
            return Err(SessionError::MalformedResponse(
                "refresh response missing access token".into(),
            ));
        }
        Ok(body)
    }
}
