//! HTTP transport seam.
//!
//! [`HttpTransport`] sends one request and returns whatever status the server
//! answered with; interpreting 401s and retrying is the pipeline's job.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{SessionError, SessionResult};
use crate::models::ErrorBody;

/// Prefix shared by the authentication endpoints.
pub const AUTH_PATH_PREFIX: &str = "/auth/";

/// An outbound API call, relative to the transport's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// POST with a JSON body.
    pub fn post(path: impl Into<String>, body: &impl Serialize) -> SessionResult<Self> {
        let body = serde_json::to_value(body)
            .map_err(|e| SessionError::InvalidRequest(format!("encode body: {e}")))?;
        Ok(Self {
            body: Some(body),
            ..Self::new(Method::POST, path)
        })
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Login and refresh calls. They never get auth headers or refresh handling.
    pub fn is_auth_endpoint(&self) -> bool {
        self.path.starts_with(AUTH_PATH_PREFIX)
    }
}

/// A completed HTTP exchange, success or not.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> SessionResult<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| SessionError::MalformedResponse(format!("decode body: {e}")))
    }

    /// Server-provided error text (`{"error": ...}`), or the status reason.
    pub fn error_message(&self) -> String {
        serde_json::from_str::<ErrorBody>(&self.body)
            .map(|b| b.error)
            .unwrap_or_else(|_| {
                self.status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            })
    }

    /// Pass 2xx through; turn anything else into [`SessionError::Http`].
    pub fn error_for_status(self, path: &str) -> SessionResult<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(SessionError::Http {
            path: path.to_string(),
            status: self.status.as_u16(),
            message: self.error_message(),
        })
    }
}

/// Sends requests to the API.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute one request. Non-2xx statuses are `Ok`; only failures to get a
    /// response at all are errors.
    async fn execute(&self, request: &ApiRequest) -> SessionResult<ApiResponse>;
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> SessionResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SessionError::Network(format!("build HTTP client: {e}")))?;
        Self::with_client(client, base_url)
    }

    /// Use a preconfigured client.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> SessionResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SessionError::InvalidRequest(format!("base URL {base_url}: {e}")))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, path: &str) -> SessionResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| SessionError::InvalidRequest(format!("path {path}: {e}")))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &ApiRequest) -> SessionResult<ApiResponse> {
        let url = self.resolve(&request.path)?;
        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| SessionError::Network(format!("{} {}: {e}", request.method, request.path)))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| SessionError::Network(format!("read body of {}: {e}", request.path)))?;
        Ok(ApiResponse { status, body })
    }
}
