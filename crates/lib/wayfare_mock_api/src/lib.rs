//! # wayfare_mock_api
//!
//! In-memory stand-in for the Wayfare API: JWT login and refresh with
//! optional refresh-token rotation, plus a searchable experience catalog.
//! Used by the mock server binary and by integration tests.

pub mod config;
pub mod data;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use crate::config::MockApiConfig;
use crate::handlers::{auth, experiences};
use crate::services::catalog::Catalog;
use crate::services::tokens::RefreshTokenStore;

/// Route paths.
pub mod routes {
    pub const POST_AUTH_LOGIN: &str = "/auth/login";
    pub const POST_AUTH_REFRESH: &str = "/auth/refresh";
    pub const GET_EXPERIENCES: &str = "/experiences";
    pub const EXPERIENCES_ID: &str = "/experiences/{id}";
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: MockApiConfig,
    pub refresh_tokens: Arc<RefreshTokenStore>,
    pub catalog: Arc<Catalog>,
    refresh_calls: Arc<AtomicU64>,
}

impl AppState {
    /// Fresh state with the seeded catalog and no issued tokens.
    pub fn new(config: MockApiConfig) -> Self {
        Self {
            config,
            refresh_tokens: Arc::new(RefreshTokenStore::new()),
            catalog: Arc::new(Catalog::seeded()),
            refresh_calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of `/auth/refresh` calls received, valid or not.
    pub fn refresh_calls(&self) -> u64 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn record_refresh_call(&self) {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::GET_EXPERIENCES, get(experiences::search_handler))
        .route(
            routes::EXPERIENCES_ID,
            get(experiences::detail_handler).delete(experiences::delete_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .with_state(state)
}
