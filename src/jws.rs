//! # JSON Web Signature
//!
//! Compact JWS serialization (RFC 7515, section 7.1). The codec works on opaque payload bytes
//! and leaves the cryptography to a signing or verifying closure supplied by the key, so local
//! and remote keys share one envelope format.
//!
//! Output segments are base64url without padding. Input segments are accepted with or without
//! padding.

use std::str::FromStr;
use std::time::Duration;

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Err;
use crate::jwk::decode_b64url;
use crate::key_type::{JwsAlgorithm, KeyType};
use crate::{tracerr, Result};

/// Per-call signing options.
#[derive(Clone, Debug, PartialEq)]
pub struct JwsOptions {
    /// Extra protected-header members. `alg` and `kid` are set by the signing key and are
    /// ignored here.
    pub headers: Map<String, Value>,

    /// Whether to write the signing key's ID to the `kid` header. Defaults to true.
    pub include_kid: bool,

    /// Upper bound on a remote signing call. Local keys ignore it.
    pub timeout: Option<Duration>,
}

impl Default for JwsOptions {
    fn default() -> Self {
        Self {
            headers: Map::new(),
            include_kid: true,
            timeout: None,
        }
    }
}

impl JwsOptions {
    /// Add a protected-header member.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Leave the `kid` header out of signed tokens.
    #[must_use]
    pub const fn without_kid(mut self) -> Self {
        self.include_kid = false;
        self
    }

    /// Bound the duration of a remote signing call.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// JOSE protected header.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Header {
    /// Signature algorithm.
    pub alg: JwsAlgorithm,

    /// Media type of the complete token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    /// ID of the key that produced the signature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Any other header members.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Header {
    /// Build the default header `{"alg", "typ": "JWT", "kid"}` merged with caller-supplied
    /// members. A caller-supplied `typ` replaces the default.
    #[must_use]
    pub fn new(alg: JwsAlgorithm, kid: Option<&str>, extra: &Map<String, Value>) -> Self {
        let mut extra = extra.clone();
        extra.remove("alg");
        extra.remove("kid");
        let typ = match extra.remove("typ") {
            Some(Value::String(typ)) => typ,
            _ => "JWT".to_string(),
        };
        Self {
            alg,
            typ: Some(typ),
            kid: kid.map(ToString::to_string),
            extra,
        }
    }
}

/// A decoded but unverified compact JWS.
#[derive(Clone, Debug)]
pub struct Jws {
    /// Protected header.
    pub header: Header,

    /// Payload bytes.
    pub payload: Vec<u8>,

    /// Raw signature bytes.
    pub signature: Vec<u8>,

    signing_input: String,
}

/// The JWS signing input, `base64url(header) "." base64url(payload)`.
///
/// # Errors
///
/// * `Err::SerializationError` - the header could not be serialized.
pub fn signing_input(header: &Header, payload: &[u8]) -> Result<String> {
    let header = match serde_json::to_vec(header) {
        Ok(json) => json,
        Err(e) => tracerr!(Err::SerializationError, "failed to serialize JWS header: {e}"),
    };
    Ok(format!(
        "{}.{}",
        Base64UrlUnpadded::encode_string(&header),
        Base64UrlUnpadded::encode_string(payload)
    ))
}

/// Append an encoded signature to a signing input, completing the token.
#[must_use]
pub fn seal(signing_input: &str, signature: &[u8]) -> String {
    format!("{signing_input}.{}", Base64UrlUnpadded::encode_string(signature))
}

/// Encode a compact JWS, calling `sign` once over the signing input.
///
/// # Errors
///
/// Any error returned by `sign`, or `Err::SerializationError` if the header cannot be
/// serialized.
pub fn encode<F>(header: &Header, payload: &[u8], sign: F) -> Result<String>
where
    F: FnOnce(&[u8]) -> Result<Vec<u8>>,
{
    let input = signing_input(header, payload)?;
    let signature = sign(input.as_bytes())?;
    Ok(seal(&input, &signature))
}

/// Split and decode a compact JWS without verifying it.
///
/// # Errors
///
/// * `Err::MalformedToken` - the token does not have exactly three segments.
/// * `Err::AlgorithmMismatch` - the header names an algorithm this crate does not know.
/// * `Err::InvalidSignature` - a segment is not valid base64url, or the header is not JSON.
pub fn decode(token: &str) -> Result<Jws> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header, payload, signature] = segments.as_slice() else {
        tracerr!(Err::MalformedToken, "expected 3 segments, found {}", segments.len());
    };

    let Some(header_bytes) = decode_b64url(header) else {
        tracerr!(Err::InvalidSignature, "header segment is not base64url");
    };
    let Some(payload_bytes) = decode_b64url(payload) else {
        tracerr!(Err::InvalidSignature, "payload segment is not base64url");
    };
    let Some(signature_bytes) = decode_b64url(signature) else {
        tracerr!(Err::InvalidSignature, "signature segment is not base64url");
    };

    Ok(Jws {
        header: parse_header(&header_bytes)?,
        payload: payload_bytes,
        signature: signature_bytes,
        signing_input: format!("{header}.{payload}"),
    })
}

// The `alg` member is read by hand so that an unknown algorithm is reported as a mismatch
// rather than as a decoding failure.
fn parse_header(bytes: &[u8]) -> Result<Header> {
    let mut members: Map<String, Value> = match serde_json::from_slice(bytes) {
        Ok(members) => members,
        Err(e) => tracerr!(Err::InvalidSignature, "header is not a JSON object: {e}"),
    };
    let alg = match members.remove("alg") {
        Some(Value::String(alg)) => JwsAlgorithm::from_str(&alg)?,
        _ => tracerr!(Err::InvalidSignature, "header has no alg member"),
    };
    let mut string_member = |name: &str| match members.remove(name) {
        Some(Value::String(value)) => Some(value),
        _ => None,
    };
    let typ = string_member("typ");
    let kid = string_member("kid");
    Ok(Header {
        alg,
        typ,
        kid,
        extra: members,
    })
}

/// Verify a compact JWS against a key of the given type and return the payload bytes.
///
/// The algorithm is taken from the token header and must belong to `key_type`'s family before
/// `verify` is called with it.
///
/// # Errors
///
/// * `Err::MalformedToken` - the token does not have exactly three segments.
/// * `Err::AlgorithmMismatch` - the header's algorithm is not in `key_type`'s family.
/// * `Err::InvalidSignature` - decoding or signature verification failed.
pub fn verify<F>(token: &str, key_type: KeyType, verify: F) -> Result<Vec<u8>>
where
    F: FnOnce(JwsAlgorithm, &[u8], &[u8]) -> Result<()>,
{
    let jws = decode(token)?;
    let alg = jws.header.alg;
    if alg.key_type() != key_type {
        tracerr!(
            Err::AlgorithmMismatch,
            "token algorithm {alg} cannot be verified by a {key_type} key"
        );
    }
    verify(alg, jws.signing_input.as_bytes(), &jws.signature)?;
    Ok(jws.payload)
}

/// Parse a verified payload as JSON.
///
/// # Errors
///
/// * `Err::InvalidSignature` - the payload is not UTF-8 JSON.
pub fn payload_json(payload: &[u8]) -> Result<Value> {
    match serde_json::from_slice(payload) {
        Ok(value) => Ok(value),
        Err(e) => tracerr!(Err::InvalidSignature, "payload is not JSON: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::key::local::LocalKey;

    const RFC8037_PUBLIC: &str =
        r#"{"kty":"OKP","crv":"Ed25519","x":"11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"}"#;
    const RFC8037_TOKEN: &str = "eyJhbGciOiJFZERTQSJ9.RXhhbXBsZSBvZiBFZDI1NTE5IHNpZ25pbmc.hgyY0il_MGCjP0JzlnLWG1PPOt7-09PGcvMg3AIbQR6dWbhijcNR4ki4iylGjg5BhVsPt9g7sVvpAr_MuM0KAg";

    // RFC 8037, appendix A.4 and A.5.
    #[test]
    fn rfc8037_vector() {
        let key = LocalKey::import_jwk(RFC8037_PUBLIC).expect("should import");
        let payload = key.verify_jws_bytes(RFC8037_TOKEN).expect("should verify");
        assert_eq!(payload, b"Example of Ed25519 signing");
    }

    #[test]
    fn default_header() {
        let header = Header::new(JwsAlgorithm::Es256, Some("key-1"), &Map::new());
        let json = serde_json::to_value(&header).expect("should serialize");
        assert_eq!(json, json!({"alg": "ES256", "typ": "JWT", "kid": "key-1"}));
    }

    #[test]
    fn extra_headers() {
        let options = JwsOptions::default()
            .header("typ", "openid4vci-proof+jwt")
            .header("alg", "none")
            .header("nonce", "n-0S6_WzA2Mj");
        let header = Header::new(JwsAlgorithm::EdDsa, None, &options.headers);
        assert_eq!(header.alg, JwsAlgorithm::EdDsa);
        assert_eq!(header.typ.as_deref(), Some("openid4vci-proof+jwt"));
        assert_eq!(header.extra.get("nonce"), Some(&json!("n-0S6_WzA2Mj")));
        assert!(!header.extra.contains_key("alg"));
    }

    #[test]
    fn segment_count() {
        let err = decode("a.b").expect_err("should fail");
        assert!(err.is(Err::MalformedToken));
        let err = decode("a.b.c.d").expect_err("should fail");
        assert!(err.is(Err::MalformedToken));
    }

    #[test]
    fn padded_segments() {
        let key = LocalKey::import_jwk(RFC8037_PUBLIC).expect("should import");
        let mut segments: Vec<String> =
            RFC8037_TOKEN.split('.').map(ToString::to_string).collect();
        segments[2].push_str("==");
        let payload = key.verify_jws_bytes(&segments.join(".")).expect("should verify");
        assert_eq!(payload, b"Example of Ed25519 signing");

        // the header segment is part of the signing input, so padding it invalidates the token
        segments[0].push_str("==");
        let padded = segments.join(".");
        let jws = decode(&padded).expect("should decode");
        assert_eq!(jws.header.alg, JwsAlgorithm::EdDsa);
        assert_eq!(jws.signature.len(), 64);

        let err = key.verify_jws_bytes(&padded).expect_err("should fail");
        assert!(err.is(Err::InvalidSignature));
    }

    #[test]
    fn unknown_algorithm() {
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"HS256"}"#);
        let err = decode(&format!("{header}.e30.c2ln")).expect_err("should fail");
        assert!(err.is(Err::AlgorithmMismatch));
    }

    #[test]
    fn wrong_family() {
        let key = LocalKey::generate(KeyType::Secp256r1).expect("should generate");
        let err = key.verify_jws_bytes(RFC8037_TOKEN).expect_err("should fail");
        assert!(err.is(Err::AlgorithmMismatch));
    }

    #[test]
    fn tampered_signature() {
        for key_type in KeyType::ALL {
            let key = LocalKey::generate(key_type).expect("should generate");
            let token = key.sign_jws(br#"{"sub":"alice"}"#, &JwsOptions::default()).unwrap();

            let (input, signature) = token.rsplit_once('.').expect("three segments");
            let mut sig = decode_b64url(signature).expect("base64url");
            sig[0] ^= 0x01;
            let tampered = seal(input, &sig);

            let err = key.verify_jws_bytes(&tampered).expect_err("should fail");
            assert!(err.is(Err::InvalidSignature), "{key_type}: {err}");
        }
    }

    #[test]
    fn cross_key() {
        for key_type in KeyType::ALL {
            let signer = LocalKey::generate(key_type).expect("should generate");
            let other = LocalKey::generate(key_type).expect("should generate");
            let token = signer.sign_jws(b"{}", &JwsOptions::default()).expect("should sign");

            let err = other.public_key().verify_jws_bytes(&token).expect_err("should fail");
            assert!(err.is(Err::InvalidSignature));
        }
    }

    #[test]
    fn ecdsa_signature_width() {
        let key = LocalKey::generate(KeyType::Secp256k1).expect("should generate");
        let token = key.sign_jws(b"{}", &JwsOptions::default()).expect("should sign");
        let jws = decode(&token).expect("should decode");
        assert_eq!(jws.signature.len(), 64);
        assert!(!token.contains('='));

        let (input, _) = token.rsplit_once('.').expect("three segments");
        let truncated = seal(input, &jws.signature[..63]);
        let err = key.verify_jws_bytes(&truncated).expect_err("should fail");
        assert!(err.is(Err::InvalidSignature));
    }

    #[test]
    fn json_payload() {
        assert_eq!(payload_json(br#"{"a":1}"#).unwrap(), json!({"a": 1}));
        let err = payload_json(b"not json").expect_err("should fail");
        assert!(err.is(Err::InvalidSignature));
    }
}
