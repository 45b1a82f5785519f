//! # wayfare_session
//!
//! Client-side session layer for Wayfare: token storage, single-flight token
//! refresh, a request pipeline with proactive and reactive refresh, and
//! debounced cancellable queries.
//!
//! [`SessionContext`] wires everything for one session:
//!
//! ```no_run
//! use wayfare_session::{Credentials, SessionConfig, SessionContext};
//!
//! # async fn run() -> wayfare_session::SessionResult<()> {
//! let ctx = SessionContext::connect(SessionConfig::from_env())?;
//! if !ctx.ensure_authenticated().await {
//!     ctx.login(&Credentials::new("user@example.com", "password")).await?;
//! }
//! let page = ctx
//!     .experiences()
//!     .search("wine", 1, &Default::default())
//!     .await?;
//! println!("{} results", page.total);
//! # Ok(())
//! # }
//! ```

pub mod auth_api;
pub mod bookmarks;
pub mod config;
pub mod context;
pub mod error;
pub mod experiences;
pub mod lifecycle;
pub mod models;
pub mod pagination;
pub mod pipeline;
pub mod query;
pub mod refresh;
pub mod storage;
pub mod tokens;
pub mod transport;

#[cfg(test)]
mod testutil;

pub use bookmarks::BookmarkStore;
pub use config::SessionConfig;
pub use context::SessionContext;
pub use error::{SessionError, SessionResult};
pub use experiences::ExperiencesService;
pub use lifecycle::{LogoutReason, SessionEvent, SessionLifecycle, SessionState};
pub use models::{Credentials, Experience, ExperiencesPage, Page, User};
pub use pagination::Pagination;
pub use pipeline::RequestPipeline;
pub use query::CancellableQuery;
pub use refresh::RefreshCoordinator;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use tokens::TokenStore;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
