//! # Key Errors
//!
//! Error kinds returned by key management, JWS and DID resolution operations. Every fallible
//! entry point in the crate returns [`Error`], which wraps one of the [`Err`] kinds together
//! with context describing the offending field, remote status code or candidate count.

use std::fmt::Display;

use thiserror::Error;

/// Log an error and return early with the given kind and a formatted context message.
///
/// # Example
/// ```
/// use vercre_keys::error::Err;
/// use vercre_keys::{tracerr, Result};
///
/// fn with_msg() -> Result<()> {
///     tracerr!(Err::MalformedKey, "missing member: {}", "x")
/// }
///
/// fn no_msg() -> Result<()> {
///     tracerr!(Err::NoPrivateKey)
/// }
/// ```
#[macro_export]
macro_rules! tracerr {
    // with context
    ($code:expr, $($msg:tt)*) => {
        {
        use $crate::error::Context as _;
        tracing::error!($($msg)*);
        return Err($code).context(format!($($msg)*));
        }
    };
    // no context
    ($code:expr) => {
        {
        tracing::error!("{}", $code);
        return Err($code.into());
        }
    }
}

/// Public error type.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct Error(#[from] anyhow::Error);

impl Error {
    /// Render the error as an `OAuth2`-style JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.0.root_cause().to_string(),
            "error_description": self.to_string(),
        })
    }

    /// Returns true if the error is of the given kind.
    #[must_use]
    pub fn is(&self, err: Err) -> bool {
        self.kind() == Some(err)
    }

    /// The kind of error, if the error originated in this crate.
    #[must_use]
    pub fn kind(&self) -> Option<Err> {
        self.0.downcast_ref::<Err>().copied()
    }
}

/// Error kinds.
#[derive(Clone, Copy, Error, Debug, PartialEq, Eq)]
pub enum Err {
    /// The key type is not supported by the backend asked to produce or use it.
    #[error("unsupported_key_type")]
    UnsupportedKeyType,

    /// Key material is missing required members or is inconsistent with its declared type.
    #[error("malformed_key")]
    MalformedKey,

    /// A serialized key names a backend this crate does not know.
    #[error("unknown_key_backend")]
    UnknownKeyBackend,

    /// Signing was attempted with a key that holds no private capability.
    #[error("no_private_key")]
    NoPrivateKey,

    /// The remote signing service could not be reached, rejected the request or timed out.
    #[error("backend_unavailable")]
    BackendUnavailable,

    /// A compact JWS does not have exactly three segments.
    #[error("malformed_token")]
    MalformedToken,

    /// The `alg` of a JWS header does not belong to the verifying key's family.
    #[error("algorithm_mismatch")]
    AlgorithmMismatch,

    /// Signature verification or token decoding failed.
    #[error("invalid_signature")]
    InvalidSignature,

    /// The identifier is not a `did:web` DID.
    #[error("invalid_did_format")]
    InvalidDidFormat,

    /// Fetching the DID document failed.
    #[error("resolution_failed")]
    ResolutionFailed,

    /// The fetched DID document is not a JSON object.
    #[error("malformed_document")]
    MalformedDocument,

    /// The DID document lists no verification methods.
    #[error("no_verification_method")]
    NoVerificationMethod,

    /// None of the DID document's verification methods could be imported as a key.
    #[error("no_importable_key")]
    NoImportableKey,

    /// Environment configuration could not be resolved.
    #[error("invalid_config")]
    InvalidConfig,

    /// An error occurred trying to serialize data.
    #[error("serialization_error")]
    SerializationError,
}

/// Context is used to decorate errors with useful context information.
pub trait Context<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Adds context to the error.
    ///
    /// # Errors
    ///
    /// * Original error with context appended.
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Display + Send + Sync + 'static;
}

impl<T, E> Context<T, E> for core::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Display + Send + Sync + 'static,
    {
        match self {
            Ok(ok) => Ok(ok),
            Err(e) => Err(Error(anyhow::Error::from(e).context(context))),
        }
    }
}

impl From<Err> for Error {
    fn from(error: Err) -> Self {
        Self(error.into())
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    use super::*;
    use crate::Result;

    #[test]
    fn base_err() {
        let err: Error = Err::InvalidSignature.into();

        assert_eq!(
            err.to_json(),
            json!({"error":"invalid_signature","error_description":"invalid_signature"})
        );
        assert!(err.is(Err::InvalidSignature));
        assert!(!err.is(Err::MalformedToken));
    }

    #[test]
    fn context_err() {
        let res: Result<()> = Err(Err::ResolutionFailed).context("status 404");
        let err = res.expect_err("expected error");

        assert_eq!(err.kind(), Some(Err::ResolutionFailed));
        assert_eq!(
            err.to_json(),
            json!({"error":"resolution_failed","error_description":"status 404"})
        );
    }

    #[test]
    fn foreign_err_has_no_kind() {
        let res: Result<serde_json::Value> =
            serde_json::from_str("{").context("parsing document");
        let err = res.expect_err("expected error");
        assert_eq!(err.kind(), None);
    }

    #[test]
    fn test_macro() {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::ERROR).finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let Err(e) = run_macro() else {
            panic!("expected error");
        };

        assert_eq!(e.to_string(), "missing member x");
        assert!(e.is(Err::MalformedKey));
    }

    fn run_macro() -> Result<()> {
        tracerr!(Err::MalformedKey, "missing member {}", "x")
    }
}
