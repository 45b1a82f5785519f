// @zen-component: MOCK-AuthService
//
//! Login and refresh flows.

use tracing::{debug, info};

use crate::AppState;
use crate::data::{DemoUser, find_user, find_user_by_id};
use crate::error::{ApiError, ApiResult};
use crate::models::{LoginResponse, RefreshResponse, UserView};
use crate::services::tokens::issue_access_token;

/// Access token plus a refresh token that outlives it by the refresh TTL.
fn issue_pair(state: &AppState, user: &DemoUser) -> ApiResult<(String, String, i64)> {
    let (access_token, exp) = issue_access_token(
        user,
        state.config.jwt_secret.as_bytes(),
        state.config.access_ttl_secs,
    )?;
    let refresh_token = state
        .refresh_tokens
        .issue(user, exp + state.config.refresh_ttl_secs);
    Ok((access_token, refresh_token, exp))
}

/// Authenticate with email and password.
pub fn login(state: &AppState, email: &str, password: &str) -> ApiResult<LoginResponse> {
    let user = find_user(email, password).ok_or_else(|| {
        debug!(email, "login rejected");
        ApiError::Unauthorized("invalid".into())
    })?;

    let (access_token, refresh_token, exp) = issue_pair(state, user)?;
    info!(user_id = user.id, exp, "login");
    Ok(LoginResponse {
        access_token,
        refresh_token,
        user: UserView {
            id: user.id.to_string(),
            email: user.email.to_string(),
            role: user.role,
        },
        exp,
    })
}

/// Exchange a refresh token for a new access token, rotating it per policy.
pub fn refresh(state: &AppState, refresh_token: &str) -> ApiResult<RefreshResponse> {
    state.record_refresh_call();

    let record = state
        .refresh_tokens
        .lookup(refresh_token)
        .ok_or_else(|| ApiError::Unauthorized("invalid refresh".into()))?;
    let user = find_user_by_id(&record.user_id)
        .ok_or_else(|| ApiError::Unauthorized("invalid user".into()))?;

    if state.config.rotation.should_rotate() {
        let (access_token, new_refresh_token, exp) = issue_pair(state, user)?;
        state.refresh_tokens.revoke(refresh_token);
        info!(user_id = user.id, exp, rotated = true, "refresh");
        return Ok(RefreshResponse {
            access_token,
            refresh_token: Some(new_refresh_token),
            exp,
        });
    }

    let (access_token, exp) = issue_access_token(
        user,
        state.config.jwt_secret.as_bytes(),
        state.config.access_ttl_secs,
    )?;
    info!(user_id = user.id, exp, rotated = false, "refresh");
    Ok(RefreshResponse {
        access_token,
        refresh_token: None,
        exp,
    })
}
