//! # Keys
//!
//! [`Key`] is the single signing-key contract. Each variant is a backend: [`LocalKey`] holds its
//! material in process, [`RemoteKey`] delegates signing to a transit engine. JWS signing and
//! verification, key IDs and JWK export work the same way for both.

pub mod local;
pub mod remote;

use std::time::Duration;

use serde_json::Value;

pub use self::local::LocalKey;
pub use self::remote::{RemoteKey, TransitConfig};
use crate::jws;
pub use crate::jws::JwsOptions;
use crate::key_type::KeyType;
use crate::serialization;
use crate::Result;

/// A signing key, local or remote.
#[derive(Clone, Debug)]
pub enum Key {
    /// Key material held in process.
    Local(LocalKey),

    /// Key held by a transit engine.
    Remote(RemoteKey),
}

impl Key {
    /// Generate a new local key.
    ///
    /// # Errors
    ///
    /// * `Err::UnsupportedKeyType` - key generation failed.
    pub fn generate(key_type: KeyType) -> Result<Self> {
        Ok(Self::Local(LocalKey::generate(key_type)?))
    }

    /// Generate a new key in a transit engine.
    ///
    /// # Errors
    ///
    /// * `Err::UnsupportedKeyType` - the engine cannot hold keys of this type.
    /// * `Err::BackendUnavailable` - the engine could not be reached.
    pub async fn generate_remote(key_type: KeyType, config: &TransitConfig) -> Result<Self> {
        Ok(Self::Remote(RemoteKey::generate(key_type, config).await?))
    }

    /// Import a local key from JWK JSON. The key has a private half if the JWK does.
    ///
    /// # Errors
    ///
    /// * `Err::MalformedKey` - required members are absent or inconsistent.
    /// * `Err::UnsupportedKeyType` - the JWK names an unsupported key type.
    pub fn import_jwk(jwk: &str) -> Result<Self> {
        Ok(Self::Local(LocalKey::import_jwk(jwk)?))
    }

    /// The key's algorithm family.
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        match self {
            Self::Local(key) => key.key_type(),
            Self::Remote(key) => key.key_type(),
        }
    }

    /// True if the key can sign.
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        match self {
            Self::Local(key) => key.has_private_key(),
            Self::Remote(key) => key.has_private_key(),
        }
    }

    /// Thumbprint (or explicit) ID for local keys, the engine key name for remote keys.
    #[must_use]
    pub fn key_id(&self) -> &str {
        match self {
            Self::Local(key) => key.key_id(),
            Self::Remote(key) => key.key_id(),
        }
    }

    /// The public-only counterpart. Always a local key.
    #[must_use]
    pub fn public_key(&self) -> Self {
        match self {
            Self::Local(key) => Self::Local(key.public_key()),
            Self::Remote(key) => Self::Local(key.public_key()),
        }
    }

    /// Export as JWK JSON. Local keys include private members when they have them; remote keys
    /// export their public key.
    ///
    /// # Errors
    ///
    /// * `Err::SerializationError` - the JWK could not be serialized.
    pub fn export_jwk(&self) -> Result<String> {
        match self {
            Self::Local(key) => key.export_jwk(),
            Self::Remote(key) => key.export_jwk(),
        }
    }

    /// Export only the public members as JWK JSON.
    ///
    /// # Errors
    ///
    /// * `Err::SerializationError` - the JWK could not be serialized.
    pub fn export_public_jwk(&self) -> Result<String> {
        match self {
            Self::Local(key) => key.export_public_jwk(),
            Self::Remote(key) => key.export_jwk(),
        }
    }

    /// The raw encoding of the public key.
    ///
    /// # Errors
    ///
    /// * `Err::SerializationError` - the key could not be encoded.
    pub fn raw_public_key(&self) -> Result<Vec<u8>> {
        match self {
            Self::Local(key) => key.raw_public_key(),
            Self::Remote(key) => key.raw_public_key(),
        }
    }

    /// Sign a payload as a compact JWS with the default header.
    ///
    /// # Errors
    ///
    /// * `Err::NoPrivateKey` - the key cannot sign.
    /// * `Err::BackendUnavailable` - a remote signing call failed.
    pub async fn sign_jws(&self, payload: &[u8]) -> Result<String> {
        self.sign_jws_with(payload, &JwsOptions::default()).await
    }

    /// Sign a payload as a compact JWS with extra header members or a timeout.
    ///
    /// # Errors
    ///
    /// * `Err::NoPrivateKey` - the key cannot sign.
    /// * `Err::BackendUnavailable` - a remote signing call failed or timed out.
    pub async fn sign_jws_with(&self, payload: &[u8], options: &JwsOptions) -> Result<String> {
        match self {
            Self::Local(key) => key.sign_jws(payload, options),
            Self::Remote(key) => key.sign_jws(payload, options).await,
        }
    }

    /// Verify a compact JWS and return its payload as JSON.
    ///
    /// # Errors
    ///
    /// * `Err::MalformedToken` - the token does not have three segments.
    /// * `Err::AlgorithmMismatch` - the header's `alg` is not in this key's family.
    /// * `Err::InvalidSignature` - decoding or verification failed, or the payload is not JSON.
    pub fn verify_jws(&self, token: &str) -> Result<Value> {
        jws::payload_json(&self.verify_jws_bytes(token)?)
    }

    /// Verify a compact JWS and return its payload bytes.
    ///
    /// # Errors
    ///
    /// As for [`Key::verify_jws`], except that any payload is accepted.
    pub fn verify_jws_bytes(&self, token: &str) -> Result<Vec<u8>> {
        match self {
            Self::Local(key) => key.verify_jws_bytes(token),
            Self::Remote(key) => key.verify_jws_bytes(token),
        }
    }

    /// Sign a message without a JWS envelope.
    ///
    /// # Errors
    ///
    /// * `Err::NoPrivateKey` - the key cannot sign.
    /// * `Err::BackendUnavailable` - a remote signing call failed or timed out.
    pub async fn sign_raw(&self, msg: &[u8], timeout: Option<Duration>) -> Result<Vec<u8>> {
        match self {
            Self::Local(key) => key.sign_raw(msg),
            Self::Remote(key) => key.sign_raw(msg, timeout).await,
        }
    }

    /// Verify a detached signature.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidSignature` - the signature does not verify.
    pub fn verify_raw(&self, signature: &[u8], msg: &[u8]) -> Result<()> {
        match self {
            Self::Local(key) => key.verify_raw(signature, msg),
            Self::Remote(key) => key.verify_raw(signature, msg),
        }
    }

    /// Serialize to the tagged persisted form.
    ///
    /// # Errors
    ///
    /// * `Err::SerializationError` - the key could not be encoded.
    pub fn serialize(&self) -> Result<String> {
        serialization::serialize_key(self)
    }

    /// Rebuild a key from its tagged persisted form without any network access.
    ///
    /// # Errors
    ///
    /// * `Err::UnknownKeyBackend` - the `type` tag names no known backend.
    /// * `Err::MalformedKey` - backend fields are missing or are not valid key material.
    pub fn deserialize(json: &str) -> Result<Self> {
        serialization::deserialize_key(json)
    }
}

impl From<LocalKey> for Key {
    fn from(key: LocalKey) -> Self {
        Self::Local(key)
    }
}

impl From<RemoteKey> for Key {
    fn from(key: RemoteKey) -> Self {
        Self::Remote(key)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::Err;

    #[tokio::test]
    async fn jws_round_trip() {
        for key_type in KeyType::ALL {
            let key = Key::generate(key_type).expect("should generate");
            let token = key.sign_jws(br#"{"sub":"alice","n":1}"#).await.expect("should sign");

            let payload = key.public_key().verify_jws(&token).expect("should verify");
            assert_eq!(payload, json!({"sub": "alice", "n": 1}));

            let jws = jws::decode(&token).expect("should decode");
            assert_eq!(jws.header.kid.as_deref(), Some(key.key_id()));
            assert_eq!(jws.header.typ.as_deref(), Some("JWT"));
        }
    }

    #[tokio::test]
    async fn opaque_payload() {
        let key = Key::generate(KeyType::Ed25519).expect("should generate");
        let token = key.sign_jws(&[0xff, 0x00, 0x7f]).await.expect("should sign");

        assert_eq!(key.verify_jws_bytes(&token).expect("should verify"), vec![0xff, 0x00, 0x7f]);
        let err = key.verify_jws(&token).expect_err("payload is not JSON");
        assert!(err.is(Err::InvalidSignature));
    }

    #[tokio::test]
    async fn options() {
        let key = Key::generate(KeyType::Secp256r1).expect("should generate");
        let options = JwsOptions::default().without_kid().header("typ", "dpop+jwt");
        let token = key.sign_jws_with(b"{}", &options).await.expect("should sign");

        let jws = jws::decode(&token).expect("should decode");
        assert!(jws.header.kid.is_none());
        assert_eq!(jws.header.typ.as_deref(), Some("dpop+jwt"));
    }

    #[tokio::test]
    async fn public_key_idempotent() {
        for key_type in KeyType::ALL {
            let key = Key::generate(key_type).expect("should generate");
            let public = key.public_key();
            let again = public.public_key();

            assert!(!public.has_private_key());
            assert!(!again.has_private_key());
            assert_eq!(public.key_id(), again.key_id());
            assert_eq!(public.export_jwk().unwrap(), again.export_jwk().unwrap());

            let err = public.sign_jws(b"{}").await.expect_err("should fail");
            assert!(err.is(Err::NoPrivateKey));
        }
    }

    #[test]
    fn public_export_has_no_private_members() {
        let key = Key::generate(KeyType::Rsa).expect("should generate");
        let private: Value = serde_json::from_str(&key.export_jwk().unwrap()).unwrap();
        let public: Value = serde_json::from_str(&key.export_public_jwk().unwrap()).unwrap();

        for member in ["d", "p", "q", "dp", "dq", "qi"] {
            assert!(private.get(member).is_some(), "private export lacks {member}");
            assert!(public.get(member).is_none(), "public export has {member}");
        }
    }
}
