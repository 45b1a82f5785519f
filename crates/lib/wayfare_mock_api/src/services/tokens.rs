// @zen-component: MOCK-TokenService
//
//! Access token signing and the in-memory refresh token store.

use chrono::{TimeDelta, Utc};
use dashmap::DashMap;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};

use crate::data::DemoUser;
use crate::error::{ApiError, ApiResult};
use crate::models::{AccessClaims, Role};

fn random_token(len: usize) -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Sign an HS256 access token for `user` expiring `ttl_secs` from now.
///
/// Returns the token and its expiry in epoch seconds.
pub fn issue_access_token(user: &DemoUser, secret: &[u8], ttl_secs: i64) -> ApiResult<(String, i64)> {
    let now = Utc::now();
    let exp = (now + TimeDelta::seconds(ttl_secs)).timestamp();
    let claims = AccessClaims {
        sub: user.id.to_string(),
        role: user.role,
        exp,
        iat: now.timestamp(),
        jti: random_token(16),
    };
    let token = encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret))
        .map_err(|e| ApiError::Internal(format!("jwt encode: {e}")))?;
    Ok((token, exp))
}

/// Verify an access token. Expiry is checked with zero leeway.
pub fn verify_access_token(token: &str, secret: &[u8]) -> Option<AccessClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = true;
    decode::<AccessClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .ok()
        .map(|data| data.claims)
}

/// What a refresh token grants.
#[derive(Debug, Clone)]
pub struct RefreshRecord {
    pub user_id: String,
    pub role: Role,
    /// Epoch seconds.
    pub exp: i64,
}

/// Opaque refresh tokens held in memory.
#[derive(Debug, Default)]
pub struct RefreshTokenStore {
    tokens: DashMap<String, RefreshRecord>,
}

impl RefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a random 64-character token for `user`, valid until `exp`.
    ///
    /// Expired tokens are pruned first; tokens abandoned without rotation are
    /// never looked up again.
    pub fn issue(&self, user: &DemoUser, exp: i64) -> String {
        self.prune_expired();
        let token = random_token(64);
        self.tokens.insert(
            token.clone(),
            RefreshRecord {
                user_id: user.id.to_string(),
                role: user.role,
                exp,
            },
        );
        token
    }

    /// The record for `token`, if known and unexpired. Expired tokens are purged.
    pub fn lookup(&self, token: &str) -> Option<RefreshRecord> {
        let record = self.tokens.get(token)?.value().clone();
        if record.exp <= Utc::now().timestamp() {
            self.tokens.remove(token);
            return None;
        }
        Some(record)
    }

    fn prune_expired(&self) {
        let now = Utc::now().timestamp();
        self.tokens.retain(|_, record| record.exp > now);
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
