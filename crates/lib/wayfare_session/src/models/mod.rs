//! Wire models for the Wayfare API.

pub mod auth;
pub mod experiences;

use serde::{Deserialize, Serialize};

pub use auth::{Credentials, LoginResponse, RefreshRequest, RefreshResponse, Role, User};
pub use experiences::{Category, Experience, ExperiencesPage};

/// Error body returned by the API on non-success statuses (`{"error": "..."}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A page of results as returned by paginated endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}
