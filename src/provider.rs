//! # Provider Traits
//!
//! Collaborators the crate depends on but does not own. Implementers decide on TLS, redirects,
//! retries and connection pooling.

use std::future::Future;

use anyhow::Result;

/// [`HttpFetch`] is used to retrieve documents over HTTP(S).
///
/// A `reqwest::Client` implementation is provided. Tests and embedders may supply their own,
/// for example to serve documents from a cache.
pub trait HttpFetch: Send + Sync {
    /// Issue a GET request and return the response status and body.
    ///
    /// A non-success status is not an error at this level.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be made or the body could not be read.
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// Status and body of an HTTP response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,

    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// True for 2xx status codes.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

impl HttpFetch for reqwest::Client {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let request = reqwest::Client::get(self, url);
        let res = request.header(reqwest::header::ACCEPT, "application/json").send().await?;
        let status = res.status().as_u16();
        let body = res.bytes().await?.to_vec();
        Ok(HttpResponse { status, body })
    }
}
