//! Conversions between `did:web` DIDs and the HTTPS URLs of their documents.

use std::fmt::Write;

use url::Url;

use crate::error::Err;
use crate::{tracerr, Result};

/// Convert a `did:web` DID to the URL of its DID document.
///
/// The method-specific identifier is split on `:`. The first segment is the host, with an
/// optional port introduced by a percent-encoded colon (`%3A`). Remaining segments form the
/// path. Without a path the document lives under `/.well-known`.
///
/// ```
/// use vercre_keys::did::web::did_web_url;
///
/// let url = did_web_url("did:web:example.com%3A3000:user").expect("valid did");
/// assert_eq!(url, "https://example.com:3000/user/did.json");
/// ```
///
/// # Errors
///
/// * `Err::InvalidDidFormat` - the DID is not `did:web:<identifier>`, has an empty segment, or
///   does not map to a valid URL.
pub fn did_web_url(did: &str) -> Result<String> {
    let Some(identifier) = did.strip_prefix("did:web:") else {
        tracerr!(Err::InvalidDidFormat, "not a did:web DID: {did}");
    };
    if identifier.is_empty() || identifier.split(':').any(str::is_empty) {
        tracerr!(Err::InvalidDidFormat, "empty did:web identifier segment in {did}");
    }

    let mut segments = identifier.split(':');
    let domain = segments.next().unwrap_or_default().replace("%3A", ":");
    let path: Vec<&str> = segments.collect();

    let url = if path.is_empty() {
        format!("https://{domain}/.well-known/did.json")
    } else {
        format!("https://{domain}/{}/did.json", path.join("/"))
    };
    if let Err(e) = Url::parse(&url) {
        tracerr!(Err::InvalidDidFormat, "{did} does not map to a valid URL: {e}");
    }
    Ok(url)
}

/// Convert an HTTP(S) URL to the `did:web` DID whose document it serves.
///
/// A port is encoded as `%3A<port>` and path separators become `:`. A trailing slash, a
/// trailing `did.json` and a bare `/.well-known` path are dropped.
///
/// # Errors
///
/// * `Err::InvalidDidFormat` - the URL cannot be parsed or has no host.
pub fn did_from_url(url: &str) -> Result<String> {
    let url = match Url::parse(url) {
        Ok(url) => url,
        Err(e) => tracerr!(Err::InvalidDidFormat, "invalid URL {url}: {e}"),
    };
    let Some(host) = url.host_str() else {
        tracerr!(Err::InvalidDidFormat, "no host in URL {url}");
    };

    let mut did = format!("did:web:{host}");
    if let Some(port) = url.port() {
        let _ = write!(did, "%3A{port}");
    }

    let path = url.path().trim_matches('/');
    let path = path.strip_suffix("did.json").unwrap_or(path).trim_end_matches('/');
    if !path.is_empty() && path != ".well-known" {
        let _ = write!(did, ":{}", path.replace('/', ":"));
    }
    Ok(did)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known() {
        assert_eq!(
            did_web_url("did:web:example.com").expect("should map"),
            "https://example.com/.well-known/did.json"
        );
    }

    #[test]
    fn with_path() {
        assert_eq!(
            did_web_url("did:web:example.com:user:alice").expect("should map"),
            "https://example.com/user/alice/did.json"
        );
    }

    #[test]
    fn with_port() {
        assert_eq!(
            did_web_url("did:web:example.com%3A3000:user").expect("should map"),
            "https://example.com:3000/user/did.json"
        );
        assert_eq!(
            did_web_url("did:web:localhost%3A8080").expect("should map"),
            "https://localhost:8080/.well-known/did.json"
        );
    }

    #[test]
    fn invalid() {
        for did in ["did:web:", "did:key:z6Mk", "web:example.com", "did:web:example.com::x"] {
            let err = did_web_url(did).expect_err("should fail");
            assert!(err.is(Err::InvalidDidFormat), "{did}");
        }
    }

    // Only the upper-case `%3A` port separator is decoded.
    #[test]
    fn lower_case_port_separator() {
        let err = did_web_url("did:web:example.com%3a3000:user").expect_err("should fail");
        assert!(err.is(Err::InvalidDidFormat));
    }

    #[test]
    fn from_url() {
        assert_eq!(did_from_url("https://example.com").unwrap(), "did:web:example.com");
        assert_eq!(
            did_from_url("http://example.com/custom/path/").unwrap(),
            "did:web:example.com:custom:path"
        );
        assert_eq!(did_from_url("https://example.com:8080").unwrap(), "did:web:example.com%3A8080");
        assert_eq!(
            did_from_url("https://example.com/.well-known/did.json").unwrap(),
            "did:web:example.com"
        );

        let err = did_from_url("not a url").expect_err("should fail");
        assert!(err.is(Err::InvalidDidFormat));
    }

    #[test]
    fn round_trip() {
        for did in ["did:web:example.com", "did:web:example.com%3A3000:user:alice"] {
            let url = did_web_url(did).expect("should map");
            assert_eq!(did_from_url(&url).expect("should map back"), did);
        }
    }
}
