//! Mock HTTP collaborators.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use dashmap::DashMap;
use serde_json::Value;
use vercre_keys::{HttpFetch, HttpResponse};

/// Serves canned `(status, body)` pairs by URL and records every URL requested. Unknown URLs
/// get a 404 with an empty body. Clones share responses and the request log.
#[derive(Clone, Debug, Default)]
pub struct StaticFetcher {
    responses: Arc<DashMap<String, HttpResponse>>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl StaticFetcher {
    /// Create a fetcher with no responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` as JSON with the given status.
    #[must_use]
    pub fn with_json(self, url: &str, status: u16, body: &Value) -> Self {
        self.serve(url, status, body.to_string().into_bytes());
        self
    }

    /// Serve raw bytes with the given status.
    pub fn serve(&self, url: &str, status: u16, body: impl Into<Vec<u8>>) {
        let response = HttpResponse {
            status,
            body: body.into(),
        };
        self.responses.insert(url.to_string(), response);
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().map(|urls| urls.clone()).unwrap_or_default()
    }
}

impl HttpFetch for StaticFetcher {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(url.to_string());
        }
        let Some(response) = self.responses.get(url) else {
            return Ok(HttpResponse {
                status: 404,
                body: Vec::new(),
            });
        };
        Ok(response.value().clone())
    }
}

/// Fails every request as a transport error would.
#[derive(Clone, Debug)]
pub struct FailingFetcher {
    message: String,
}

impl FailingFetcher {
    /// Fail with the given error message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for FailingFetcher {
    fn default() -> Self {
        Self::new("connection refused")
    }
}

impl HttpFetch for FailingFetcher {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        Err(anyhow!("{url}: {}", self.message))
    }
}
