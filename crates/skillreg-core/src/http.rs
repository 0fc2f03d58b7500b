//! Blocking JSON-over-HTTP helper shared by the remote collaborators.
//!
//! The pipeline is synchronous; requests run on an owned Tokio runtime.

use std::sync::Arc;

use anyhow::Context;
use reqwest::{Method, StatusCode};
use serde_json::Value;

const USER_AGENT: &str = concat!("skillreg/", env!("CARGO_PKG_VERSION"));

/// JSON HTTP client that blocks on an internal runtime.
#[derive(Debug, Clone)]
pub struct HttpClient {
    runtime: Arc<tokio::runtime::Runtime>,
    client: reqwest::Client,
}

/// Response body and status of a JSON request.
#[derive(Debug, Clone)]
pub struct JsonResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl JsonResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl HttpClient {
    pub fn new() -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| anyhow::anyhow!("Failed to create tokio runtime: {}", e))?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            runtime: Arc::new(runtime),
            client,
        })
    }

    /// Send a request and return status plus parsed body (null when empty).
    pub fn send(
        &self,
        method: Method,
        url: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> anyhow::Result<JsonResponse> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        self.runtime.block_on(async move {
            let response = request
                .send()
                .await
                .with_context(|| format!("Failed to send {} {}", method, url))?;
            let status = response.status();
            let text = response
                .text()
                .await
                .with_context(|| format!("Failed to read response body from {}", url))?;
            let body = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            };
            Ok(JsonResponse { status, body })
        })
    }

    /// GET returning `None` for 404 and an error for other failures.
    pub fn get_json(&self, url: &str, token: Option<&str>) -> anyhow::Result<Option<Value>> {
        let response = self.send(Method::GET, url, token, None)?;
        if response.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.is_success() {
            anyhow::bail!("HTTP {} from {}: {}", response.status, url, response.body);
        }
        Ok(Some(response.body))
    }

    /// POST a JSON body, failing on non-success status.
    pub fn post_json(&self, url: &str, token: Option<&str>, body: &Value) -> anyhow::Result<Value> {
        let response = self.send(Method::POST, url, token, Some(body))?;
        if !response.is_success() {
            anyhow::bail!("HTTP {} from {}: {}", response.status, url, response.body);
        }
        Ok(response.body)
    }
}
