//! # DID Web
//!
//! Resolution of `did:web` DIDs: the DID maps to an HTTPS URL, the document is fetched through an
//! injected [`HttpFetch`] and verification-method JWKs are imported in document order.
//!
//! See <https://w3c-ccg.github.io/did-method-web>.

mod url;

use std::time::Duration;

pub use self::url::{did_from_url, did_web_url};
use super::{DidDocument, DidResolver};
use crate::error::Err;
use crate::provider::HttpFetch;
use crate::{tracerr, Result};

/// Resolves `did:web` DIDs. Holds no state between resolutions; nothing is cached.
#[derive(Clone, Debug)]
pub struct DidWebResolver<F: HttpFetch> {
    fetcher: F,
    timeout: Option<Duration>,
}

impl<F: HttpFetch> DidWebResolver<F> {
    /// Create a resolver fetching documents through `fetcher`.
    pub const fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            timeout: None,
        }
    }

    /// Bound each resolution, including the fetch, to `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn fetch(&self, url: &str) -> Result<DidDocument> {
        let response = match self.fetcher.get(url).await {
            Ok(response) => response,
            Err(e) => tracerr!(Err::ResolutionFailed, "error fetching {url}: {e}"),
        };
        if !response.is_success() {
            tracing::trace!("error return from DID resolution request: {}", response.status);
            tracerr!(Err::ResolutionFailed, "fetching {url} returned status {}", response.status);
        }
        DidDocument::from_slice(&response.body)
    }
}

impl<F: HttpFetch> DidResolver for DidWebResolver<F> {
    async fn resolve(&self, did: &str) -> Result<DidDocument> {
        let url = did_web_url(did)?;
        tracing::debug!("resolving {did} from {url}");

        let Some(limit) = self.timeout else {
            return self.fetch(&url).await;
        };
        match tokio::time::timeout(limit, self.fetch(&url)).await {
            Ok(res) => res,
            Err(_) => tracerr!(
                Err::ResolutionFailed,
                "resolving {did} timed out after {}ms",
                limit.as_millis()
            ),
        }
    }
}
