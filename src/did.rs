//! # DID Documents and Resolution
//!
//! A resolved DID document is kept as the JSON object it was published as. Resolution to a key
//! reads the document's verification methods in order and imports the first `publicKeyJwk` that
//! parses as a supported key.
//!
//! Only `did:web` is implemented here (see [`web`]). Other methods plug in through
//! [`DidResolver`].

pub mod web;

use std::future::Future;

use serde_json::{Map, Value};

use crate::error::Err;
use crate::key::Key;
use crate::{tracerr, Result};

/// A resolved DID document. Unknown members are kept and ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DidDocument(Map<String, Value>);

impl DidDocument {
    /// Parse a document from its JSON bytes.
    ///
    /// # Errors
    ///
    /// * `Err::MalformedDocument` - the bytes are not a JSON object.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => Self::from_value(value),
            Err(e) => tracerr!(Err::MalformedDocument, "document is not JSON: {e}"),
        }
    }

    /// Wrap an already-parsed document.
    ///
    /// # Errors
    ///
    /// * `Err::MalformedDocument` - the value is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(members) => Ok(Self(members)),
            other => tracerr!(Err::MalformedDocument, "document is not a JSON object: {other}"),
        }
    }

    /// The document's `id`, if it has one.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    /// A top-level member.
    #[must_use]
    pub fn get(&self, member: &str) -> Option<&Value> {
        self.0.get(member)
    }

    /// The whole document.
    #[must_use]
    pub const fn as_json(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The `verificationMethod` entries, in document order.
    ///
    /// # Errors
    ///
    /// * `Err::NoVerificationMethod` - the member is absent or the array is empty.
    /// * `Err::MalformedDocument` - the member is not an array.
    pub fn verification_methods(&self) -> Result<&[Value]> {
        match self.0.get("verificationMethod") {
            None | Some(Value::Null) => {
                tracerr!(Err::NoVerificationMethod, "document has no verificationMethod")
            }
            Some(Value::Array(methods)) if methods.is_empty() => {
                tracerr!(Err::NoVerificationMethod, "verificationMethod is empty")
            }
            Some(Value::Array(methods)) => Ok(methods),
            Some(_) => tracerr!(Err::MalformedDocument, "verificationMethod is not an array"),
        }
    }

    /// The `publicKeyJwk` of each verification method that has one, as JWK JSON, in document
    /// order. Entries without one are skipped.
    ///
    /// # Errors
    ///
    /// As for [`DidDocument::verification_methods`].
    pub fn public_key_jwks(&self) -> Result<Vec<String>> {
        let methods = self.verification_methods()?;
        let mut candidates = Vec::with_capacity(methods.len());
        for (index, method) in methods.iter().enumerate() {
            let Some(jwk) = method.get("publicKeyJwk") else {
                tracing::debug!("verification method {index} has no publicKeyJwk, skipping");
                continue;
            };
            match serde_json::to_string(jwk) {
                Ok(json) => candidates.push(json),
                Err(e) => tracing::debug!("verification method {index} skipped: {e}"),
            }
        }
        Ok(candidates)
    }
}

/// Import the first candidate JWK that parses as a supported key, trying them in order.
///
/// Callers that need a key for a particular verification relationship should filter the
/// candidates first: this takes whichever importable key comes first.
///
/// # Errors
///
/// * `Err::NoImportableKey` - no candidate could be imported. The message carries the
///   candidate count.
pub fn import_first_jwk(candidates: &[String]) -> Result<Key> {
    for (index, candidate) in candidates.iter().enumerate() {
        match Key::import_jwk(candidate) {
            Ok(key) => return Ok(key),
            Err(e) => tracing::debug!("candidate JWK {index} rejected: {e}"),
        }
    }
    tracerr!(Err::NoImportableKey, "none of {} candidate JWKs could be imported", candidates.len())
}

/// [`DidResolver`] resolves a DID to its document and, from that, to a verification key.
pub trait DidResolver: Send + Sync {
    /// Fetch and parse the DID document.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidDidFormat` - the DID is not one this resolver handles.
    /// * `Err::ResolutionFailed` - the document could not be fetched.
    /// * `Err::MalformedDocument` - the document is not a JSON object.
    fn resolve(&self, did: &str) -> impl Future<Output = Result<DidDocument>> + Send;

    /// Resolve the DID and import the first usable `publicKeyJwk` of its document.
    ///
    /// # Errors
    ///
    /// As for [`DidResolver::resolve`], plus `Err::NoVerificationMethod` and
    /// `Err::NoImportableKey`.
    fn resolve_to_key(&self, did: &str) -> impl Future<Output = Result<Key>> + Send {
        async move {
            let document = self.resolve(did).await?;
            import_first_jwk(&document.public_key_jwks()?)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::key_type::KeyType;

    const ED25519_X: &str = "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo";

    fn document(methods: Value) -> DidDocument {
        DidDocument::from_value(json!({
            "@context": "https://www.w3.org/ns/did/v1",
            "id": "did:web:example.com",
            "verificationMethod": methods,
            "service": [{"id": "#linked", "type": "LinkedDomains"}],
        }))
        .expect("should wrap")
    }

    #[test]
    fn accessors() {
        let doc = document(json!([]));
        assert_eq!(doc.id(), Some("did:web:example.com"));
        assert!(doc.get("service").is_some());
        assert_eq!(doc.as_json().len(), 4);
    }

    #[test]
    fn not_an_object() {
        let err = DidDocument::from_slice(b"[1, 2]").expect_err("should fail");
        assert!(err.is(Err::MalformedDocument));
        let err = DidDocument::from_slice(b"<html>").expect_err("should fail");
        assert!(err.is(Err::MalformedDocument));
    }

    #[test]
    fn missing_methods() {
        let err = document(json!([])).public_key_jwks().expect_err("should fail");
        assert!(err.is(Err::NoVerificationMethod));

        let doc = DidDocument::from_value(json!({"id": "did:web:example.com"})).unwrap();
        let err = doc.verification_methods().expect_err("should fail");
        assert!(err.is(Err::NoVerificationMethod));

        let err = document(json!({"id": "#key-1"})).verification_methods().expect_err("fail");
        assert!(err.is(Err::MalformedDocument));
    }

    #[test]
    fn first_importable_wins() {
        let doc = document(json!([
            {"id": "#key-0", "type": "Multikey", "publicKeyMultibase": "z6Mk"},
            {
                "id": "#key-1",
                "type": "JsonWebKey2020",
                "publicKeyJwk": {"kty": "EC", "crv": "P-384", "x": "AA", "y": "AA"}
            },
            {
                "id": "#key-2",
                "type": "JsonWebKey2020",
                "publicKeyJwk": {"kty": "OKP", "crv": "Ed25519", "x": ED25519_X}
            },
            {
                "id": "#key-3",
                "type": "JsonWebKey2020",
                "publicKeyJwk": {"kty": "OKP", "crv": "Ed25519", "x": ED25519_X, "kid": "later"}
            },
        ]));
        let candidates = doc.public_key_jwks().expect("should collect");
        assert_eq!(candidates.len(), 3);

        let key = import_first_jwk(&candidates).expect("should import");
        assert_eq!(key.key_type(), KeyType::Ed25519);
        assert!(!key.has_private_key());
        assert_eq!(key.key_id(), "kPrK_qmxVWaYVA9wwBF6Iuo3vVzz7TxHCTwXBygrS4k");
    }

    #[test]
    fn nothing_importable() {
        let candidates = vec![r#"{"kty":"EC","crv":"P-521"}"#.to_string(), "{}".to_string()];
        let err = import_first_jwk(&candidates).expect_err("should fail");
        assert!(err.is(Err::NoImportableKey));
        assert!(err.to_string().contains("none of 2"));

        let err = import_first_jwk(&[]).expect_err("should fail");
        assert!(err.is(Err::NoImportableKey));
    }
}
