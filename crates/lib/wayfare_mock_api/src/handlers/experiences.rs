//! Experience catalog request handlers. All require authentication.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use rand::Rng;
use tracing::{debug, info};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{Experience, ExperiencesPage, Role, SearchParams};

/// `GET /experiences?q=&page=`: title search. Randomly rate limited.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<ExperiencesPage>> {
    let p = state.config.rate_limit_probability;
    if p > 0.0 && rand::rng().random_bool(p.min(1.0)) {
        debug!("rate limiting search");
        return Err(ApiError::RateLimited);
    }

    let page = state.catalog.search(&params.query(), params.page());
    debug!(q = %params.query(), page = page.page, total = page.total, "search");
    Ok(Json(page))
}

/// `GET /experiences/{id}`
pub async fn detail_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Experience>> {
    state
        .catalog
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("not found".into()))
}

/// `DELETE /experiences/{id}`: admins only.
pub async fn delete_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    if user.0.role != Role::Admin {
        return Err(ApiError::Forbidden("forbidden".into()));
    }
    if !state.catalog.remove(id) {
        return Err(ApiError::NotFound("not found".into()));
    }
    info!(id, by = %user.0.sub, "experience deleted");
    Ok(StatusCode::NO_CONTENT)
}
