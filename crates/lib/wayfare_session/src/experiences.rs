//! Experience catalog calls, routed through the request pipeline.

use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::SessionResult;
use crate::models::{Experience, ExperiencesPage};
use crate::pipeline::RequestPipeline;
use crate::transport::ApiRequest;

pub const EXPERIENCES_PATH: &str = "/experiences";

/// Search, detail and delete for experiences. Details are cached by id.
pub struct ExperiencesService {
    pipeline: Arc<RequestPipeline>,
    cache: DashMap<u64, Experience>,
}

impl ExperiencesService {
    pub fn new(pipeline: Arc<RequestPipeline>) -> Self {
        Self {
            pipeline,
            cache: DashMap::new(),
        }
    }

    /// One page of experiences whose title contains `query`. An empty query
    /// matches everything. Pages start at 1.
    pub async fn search(
        &self,
        query: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> SessionResult<ExperiencesPage> {
        let mut request = ApiRequest::get(EXPERIENCES_PATH);
        if !query.is_empty() {
            request = request.with_query("q", query);
        }
        let request = request.with_query("page", page.max(1));

        let resp = self.pipeline.send_cancellable(request, cancel).await?;
        let page: ExperiencesPage = resp.json()?;
        debug!(query, page = page.page, total = page.total, "search complete");
        Ok(page)
    }

    /// A single experience, served from the cache when already fetched.
    pub async fn detail(&self, id: u64) -> SessionResult<Experience> {
        if let Some(hit) = self.cache.get(&id) {
            return Ok(hit.value().clone());
        }

        let resp = self
            .pipeline
            .send(ApiRequest::get(format!("{EXPERIENCES_PATH}/{id}")))
            .await?;
        let experience: Experience = resp.json()?;
        self.cache.insert(id, experience.clone());
        Ok(experience)
    }

    /// Delete an experience (admin only) and forget any cached copy.
    pub async fn delete(&self, id: u64) -> SessionResult<()> {
        self.pipeline
            .send(ApiRequest::delete(format!("{EXPERIENCES_PATH}/{id}")))
            .await?;
        self.cache.remove(&id);
        debug!(id, "experience deleted");
        Ok(())
    }

    pub fn cached(&self, id: u64) -> Option<Experience> {
        self.cache.get(&id).map(|e| e.value().clone())
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth_api::AuthApi;
    use crate::error::SessionError;
    use crate::lifecycle::SessionLifecycle;
    use crate::refresh::RefreshCoordinator;
    use crate::testutil::{ScriptedTransport, json_response, store_expiring_in};
    use reqwest::{Method, StatusCode};

    fn experience_json(id: u64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": "Pasta Making Class",
            "category": "food",
            "price_cents": 16900,
            "duration_min": 150,
            "images": [],
            "short_description": "Handmade Italian pasta.",
        })
    }

    fn service(transport: Arc<ScriptedTransport>) -> ExperiencesService {
        let auth = AuthApi::new(transport.clone());
        let store = store_expiring_in(300, Some("rt-1"));
        let lifecycle = Arc::new(SessionLifecycle::new(store, auth.clone()));
        let coordinator = Arc::new(RefreshCoordinator::new(Arc::clone(&lifecycle), auth));
        ExperiencesService::new(Arc::new(RequestPipeline::new(lifecycle, coordinator, transport)))
    }

    #[tokio::test]
    async fn search_sends_query_and_page() {
        let transport = ScriptedTransport::new(|_| {
            json_response(
                StatusCode::OK,
                serde_json::json!({
                    "data": [experience_json(19)],
                    "page": 2,
                    "pageSize": 6,
                    "total": 7,
                }),
            )
        });
        let service = service(transport.clone());

        let page = service
            .search("pasta", 2, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(page.data[0].id, 19);
        assert_eq!(page.total, 7);

        let sent = &transport.requests()[0];
        assert_eq!(sent.path, EXPERIENCES_PATH);
        assert_eq!(
            sent.query,
            vec![
                ("q".to_string(), "pasta".to_string()),
                ("page".to_string(), "2".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn empty_search_omits_q() {
        let transport = ScriptedTransport::new(|_| {
            json_response(
                StatusCode::OK,
                serde_json::json!({"data": [], "page": 1, "pageSize": 6, "total": 0}),
            )
        });
        let service = service(transport.clone());

        service.search("", 0, &CancellationToken::new()).await.unwrap();
        assert_eq!(
            transport.requests()[0].query,
            vec![("page".to_string(), "1".to_string())]
        );
    }

    #[tokio::test]
    async fn detail_is_cached_after_first_fetch() {
        let transport =
            ScriptedTransport::new(|_| json_response(StatusCode::OK, experience_json(19)));
        let service = service(transport.clone());

        let first = service.detail(19).await.unwrap();
        let second = service.detail(19).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(transport.calls_to("/experiences/19"), 1);
    }

    #[tokio::test]
    async fn missing_detail_is_not_cached() {
        let transport = ScriptedTransport::new(|_| {
            json_response(StatusCode::NOT_FOUND, serde_json::json!({"error": "not found"}))
        });
        let service = service(transport);

        let err = service.detail(99).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(service.cached(99).is_none());
    }

    #[tokio::test]
    async fn delete_evicts_cache() {
        let transport = ScriptedTransport::new(|req| {
            if req.method == Method::DELETE {
                json_response(StatusCode::NO_CONTENT, serde_json::Value::Null)
            } else {
                json_response(StatusCode::OK, experience_json(4))
            }
        });
        let service = service(transport);

        service.detail(4).await.unwrap();
        assert!(service.cached(4).is_some());
        service.delete(4).await.unwrap();
        assert!(service.cached(4).is_none());
    }

    #[tokio::test]
    async fn forbidden_delete_keeps_cache() {
        let transport = ScriptedTransport::new(|req| {
            if req.method == Method::DELETE {
                json_response(StatusCode::FORBIDDEN, serde_json::json!({"error": "forbidden"}))
            } else {
                json_response(StatusCode::OK, experience_json(4))
            }
        });
        let service = service(transport);

        service.detail(4).await.unwrap();
        let err = service.delete(4).await.unwrap_err();
        assert!(matches!(err, SessionError::Http { status: 403, .. }));
        assert!(service.cached(4).is_some());
    }
}
