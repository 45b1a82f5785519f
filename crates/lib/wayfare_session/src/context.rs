//! Session context: owns one session and wires its components together.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::auth_api::AuthApi;
use crate::bookmarks::BookmarkStore;
use crate::config::SessionConfig;
use crate::error::SessionResult;
use crate::experiences::ExperiencesService;
use crate::lifecycle::{SessionEvent, SessionLifecycle, SessionState};
use crate::models::{Credentials, ExperiencesPage, User};
use crate::pipeline::RequestPipeline;
use crate::query::CancellableQuery;
use crate::refresh::RefreshCoordinator;
use crate::storage::{FileStore, KeyValueStore};
use crate::tokens::TokenStore;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};

/// One client session: token store, lifecycle, refresh coordinator, request
/// pipeline and the services built on them.
pub struct SessionContext {
    config: SessionConfig,
    store: Arc<TokenStore>,
    lifecycle: Arc<SessionLifecycle>,
    coordinator: Arc<RefreshCoordinator>,
    pipeline: Arc<RequestPipeline>,
    experiences: Arc<ExperiencesService>,
    bookmarks: BookmarkStore,
}

impl SessionContext {
    /// Wire a session over the given transport and persistence.
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        let store = Arc::new(TokenStore::with_safety_margin(
            Arc::clone(&storage),
            config.auth_safety_margin,
        ));
        let auth = AuthApi::new(Arc::clone(&transport));
        let lifecycle = Arc::new(SessionLifecycle::new(Arc::clone(&store), auth.clone()));
        let coordinator = Arc::new(RefreshCoordinator::new(Arc::clone(&lifecycle), auth));
        let pipeline = Arc::new(
            RequestPipeline::new(Arc::clone(&lifecycle), Arc::clone(&coordinator), transport)
                .with_refresh_horizon(config.refresh_horizon),
        );
        let experiences = Arc::new(ExperiencesService::new(Arc::clone(&pipeline)));
        let bookmarks = BookmarkStore::hydrate(storage);

        debug!(state = ?lifecycle.state(), "session context ready");
        Self {
            config,
            store,
            lifecycle,
            coordinator,
            pipeline,
            experiences,
            bookmarks,
        }
    }

    /// Connect to `config.api_base_url` over HTTP, persisting to
    /// `config.resolved_storage_path()`.
    pub fn connect(config: SessionConfig) -> SessionResult<Self> {
        let transport = ReqwestTransport::new(&config.api_base_url, config.request_timeout)?;
        let storage = FileStore::open(config.resolved_storage_path())?;
        info!(
            api = %config.api_base_url,
            storage = %storage.path().display(),
            "connecting session"
        );
        Ok(Self::new(config, Arc::new(transport), Arc::new(storage)))
    }

    pub async fn login(&self, credentials: &Credentials) -> SessionResult<User> {
        self.lifecycle.try_login(credentials).await
    }

    /// End the session and drop cached data fetched under it.
    pub fn logout(&self) {
        self.lifecycle.logout();
        self.experiences.clear_cache();
    }

    /// Gate for protected views: authenticated now, or recovered through a
    /// refresh when a refresh token is held.
    pub async fn ensure_authenticated(&self) -> bool {
        match self.lifecycle.state() {
            SessionState::Authenticated => true,
            SessionState::Recoverable => {
                debug!("session recoverable; attempting refresh");
                self.coordinator.refresh().await && self.store.is_authenticated()
            }
            SessionState::LoggedOut => false,
        }
    }

    pub async fn send(&self, request: ApiRequest) -> SessionResult<ApiResponse> {
        self.pipeline.send(request).await
    }

    /// A debounced search query using the configured delay.
    pub fn search_query(&self) -> CancellableQuery<ExperiencesPage> {
        CancellableQuery::new(self.config.search_debounce)
    }

    /// Trigger `query` with a search for `text` on `page`.
    pub fn search(
        &self,
        query: &CancellableQuery<ExperiencesPage>,
        text: impl Into<String>,
        page: u32,
    ) {
        let experiences = Arc::clone(&self.experiences);
        let text = text.into();
        query.trigger(move |cancel| async move { experiences.search(&text, page, &cancel).await });
    }

    pub fn state(&self) -> SessionState {
        self.lifecycle.state()
    }

    pub fn user(&self) -> Option<User> {
        self.lifecycle.user()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.lifecycle.subscribe()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    pub fn lifecycle(&self) -> &Arc<SessionLifecycle> {
        &self.lifecycle
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn pipeline(&self) -> &Arc<RequestPipeline> {
        &self.pipeline
    }

    pub fn experiences(&self) -> &Arc<ExperiencesService> {
        &self.experiences
    }

    pub fn bookmarks(&self) -> &BookmarkStore {
        &self.bookmarks
    }
}
