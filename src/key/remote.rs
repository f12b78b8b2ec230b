//! # Remote Keys
//!
//! Keys held by a Vault-compatible transit engine. Private material never leaves the engine:
//! signing is a network call, while verification uses a public key read once when the key is
//! created or connected and cached for the life of the value.

mod client;

use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::time::Duration;

use zeroize::Zeroizing;

use self::client::TransitClient;
use crate::error::Err;
use crate::jws::{self, JwsOptions};
use crate::key::local::LocalKey;
use crate::key_type::KeyType;
use crate::{tracerr, Result};

/// Connection settings for a transit engine.
#[derive(Clone)]
pub struct TransitConfig {
    /// URL of the engine mount, e.g. `http://127.0.0.1:8200/v1/transit`.
    pub server: String,

    /// Access token sent with every request.
    pub access_key: Zeroizing<String>,

    /// Default upper bound on each remote call.
    pub timeout: Option<Duration>,
}

impl TransitConfig {
    /// Settings for the given engine and access token, with no timeout.
    #[must_use]
    pub fn new(server: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            access_key: Zeroizing::new(access_key.into()),
            timeout: None,
        }
    }

    /// Bound every remote call made with these settings.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Read settings from the environment.
    ///
    /// | Variable               | Description                                        |
    /// |------------------------|----------------------------------------------------|
    /// | `TRANSIT_SERVER_URL`   | URL of the transit engine mount.                   |
    /// | `TRANSIT_ACCESS_KEY`   | Access token.                                      |
    /// | `TRANSIT_TIMEOUT_SECS` | Optional per-call timeout, in whole seconds.       |
    ///
    /// # Errors
    ///
    /// * `Err::InvalidConfig` - a required variable is unset, or the timeout is not a number.
    pub fn from_env() -> Result<Self> {
        let Ok(server) = std::env::var("TRANSIT_SERVER_URL") else {
            tracerr!(Err::InvalidConfig, "TRANSIT_SERVER_URL environment variable not set")
        };
        let Ok(access_key) = std::env::var("TRANSIT_ACCESS_KEY") else {
            tracerr!(Err::InvalidConfig, "TRANSIT_ACCESS_KEY environment variable not set")
        };
        let mut config = Self::new(server, access_key);

        if let Ok(secs) = std::env::var("TRANSIT_TIMEOUT_SECS") {
            let Ok(secs) = secs.parse::<u64>() else {
                tracerr!(Err::InvalidConfig, "TRANSIT_TIMEOUT_SECS is not a number: {secs}")
            };
            config.timeout = Some(Duration::from_secs(secs));
        }
        Ok(config)
    }

    fn client(&self) -> TransitClient {
        TransitClient::new(&self.server, self.access_key.clone())
    }
}

impl Debug for TransitConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitConfig")
            .field("server", &self.server)
            .field("access_key", &"[redacted]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A key held by a transit engine.
#[derive(Clone)]
pub struct RemoteKey {
    client: TransitClient,
    id: String,
    key_type: KeyType,
    public_key: LocalKey,
    timeout: Option<Duration>,
}

impl RemoteKey {
    /// Create a new key in the engine, named `k-<random>`, and cache its public key.
    ///
    /// # Errors
    ///
    /// * `Err::UnsupportedKeyType` - the engine cannot hold keys of this type (secp256k1).
    /// * `Err::BackendUnavailable` - the engine could not be reached, rejected a request or did
    ///   not answer in time.
    pub async fn generate(key_type: KeyType, config: &TransitConfig) -> Result<Self> {
        client::transit_type(key_type)?;
        let id = format!("k-{}", rand::random::<u32>());
        let client = config.client();

        bounded(config.timeout, client.create_key(&id, key_type)).await?;
        tracing::debug!("created transit key {id}");
        Self::connect_with(client, config.timeout, id).await
    }

    /// Connect to an existing key in the engine, reading its type and public key.
    ///
    /// # Errors
    ///
    /// * `Err::BackendUnavailable` - the engine could not be reached, rejected the request or
    ///   did not answer in time.
    /// * `Err::UnsupportedKeyType` - the engine holds the key as an unsupported type.
    /// * `Err::MalformedKey` - the engine returned an unparseable public key.
    pub async fn connect(config: &TransitConfig, id: impl Into<String>) -> Result<Self> {
        Self::connect_with(config.client(), config.timeout, id.into()).await
    }

    async fn connect_with(
        client: TransitClient, timeout: Option<Duration>, id: String,
    ) -> Result<Self> {
        let transit_key = bounded(timeout, client.read_key(&id)).await?;
        Ok(Self {
            client,
            id,
            key_type: transit_key.key_type,
            public_key: transit_key.public_key.public_key(),
            timeout,
        })
    }

    /// Rebuild a key from persisted parts without contacting the engine.
    ///
    /// # Errors
    ///
    /// * `Err::MalformedKey` - `public_key` is not a valid raw public key of `key_type`.
    pub fn from_parts(
        config: &TransitConfig, id: impl Into<String>, key_type: KeyType, public_key: &[u8],
    ) -> Result<Self> {
        Ok(Self {
            client: config.client(),
            id: id.into(),
            key_type,
            public_key: LocalKey::import_raw_public_key(key_type, public_key)?,
            timeout: config.timeout,
        })
    }

    /// Use the given HTTP client for engine requests. `reqwest::Client` is a pooled handle, so
    /// clones share connections.
    #[must_use]
    pub fn with_client(mut self, http_client: reqwest::Client) -> Self {
        self.client = self.client.with_http_client(http_client);
        self
    }

    /// The engine-assigned key name.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.id
    }

    /// URL of the engine mount.
    #[must_use]
    pub fn server(&self) -> &str {
        self.client.server()
    }

    pub(crate) fn access_key(&self) -> &str {
        self.client.access_key()
    }

    /// The key's algorithm family.
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Always true: the engine holds the signing capability.
    #[must_use]
    pub const fn has_private_key(&self) -> bool {
        true
    }

    /// The cached public key, as a public-only local key.
    #[must_use]
    pub fn public_key(&self) -> LocalKey {
        self.public_key.clone()
    }

    /// Export the cached public key as JWK JSON.
    ///
    /// # Errors
    ///
    /// * `Err::SerializationError` - the JWK could not be serialized.
    pub fn export_jwk(&self) -> Result<String> {
        self.public_key.export_public_jwk()
    }

    /// The raw encoding of the cached public key.
    ///
    /// # Errors
    ///
    /// * `Err::SerializationError` - the key could not be encoded.
    pub fn raw_public_key(&self) -> Result<Vec<u8>> {
        self.public_key.raw_public_key()
    }

    /// Sign a message in the engine without a JWS envelope.
    ///
    /// # Errors
    ///
    /// * `Err::BackendUnavailable` - the engine could not be reached, rejected the request or
    ///   did not answer within `timeout` (or the configured default).
    pub async fn sign_raw(&self, msg: &[u8], timeout: Option<Duration>) -> Result<Vec<u8>> {
        tracing::debug!("signing with transit key {}", self.id);
        bounded(timeout.or(self.timeout), self.client.sign(&self.id, self.key_type, msg)).await
    }

    /// Sign a payload as a compact JWS. The `kid` header, if included, is the engine key name.
    ///
    /// # Errors
    ///
    /// * `Err::BackendUnavailable` - the signing call failed or timed out.
    pub async fn sign_jws(&self, payload: &[u8], options: &JwsOptions) -> Result<String> {
        let kid = options.include_kid.then_some(self.id.as_str());
        let header = jws::Header::new(self.key_type.jws_algorithm(), kid, &options.headers);
        let input = jws::signing_input(&header, payload)?;
        let signature = self.sign_raw(input.as_bytes(), options.timeout).await?;
        Ok(jws::seal(&input, &signature))
    }

    /// Verify a compact JWS against the cached public key. No network call is made.
    ///
    /// # Errors
    ///
    /// * `Err::MalformedToken`, `Err::AlgorithmMismatch` or `Err::InvalidSignature`, as for
    ///   [`LocalKey::verify_jws_bytes`].
    pub fn verify_jws_bytes(&self, token: &str) -> Result<Vec<u8>> {
        self.public_key.verify_jws_bytes(token)
    }

    /// Verify a detached signature against the cached public key.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidSignature` - the signature does not verify.
    pub fn verify_raw(&self, signature: &[u8], msg: &[u8]) -> Result<()> {
        self.public_key.verify_raw(signature, msg)
    }

    /// Delete the key from the engine.
    ///
    /// # Errors
    ///
    /// * `Err::BackendUnavailable` - the engine could not be reached or refused the deletion.
    pub async fn delete(self) -> Result<()> {
        bounded(self.timeout, self.client.delete_key(&self.id)).await?;
        tracing::debug!("deleted transit key {}", self.id);
        Ok(())
    }
}

impl Debug for RemoteKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteKey")
            .field("server", &self.server())
            .field("access_key", &"[redacted]")
            .field("id", &self.id)
            .field("key_type", &self.key_type)
            .finish_non_exhaustive()
    }
}

// Dropping the returned future cancels the call; the timeout only bounds it.
async fn bounded<T>(timeout: Option<Duration>, call: impl Future<Output = Result<T>>) -> Result<T> {
    let Some(limit) = timeout else {
        return call.await;
    };
    match tokio::time::timeout(limit, call).await {
        Ok(res) => res,
        Err(_) => tracerr!(
            Err::BackendUnavailable,
            "transit call timed out after {}ms",
            limit.as_millis()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ED25519_RAW: [u8; 32] = [
        215, 151, 130, 77, 182, 88, 228, 123, 93, 175, 105, 243, 163, 145, 27, 81, 166, 255, 86,
        59, 68, 105, 148, 118, 188, 121, 18, 142, 71, 187, 150, 147,
    ];

    fn offline_key() -> RemoteKey {
        let config = TransitConfig::new("http://127.0.0.1:1/v1/transit", "dev-only-token");
        RemoteKey::from_parts(&config, "k-307668075", KeyType::Ed25519, &ED25519_RAW)
            .expect("should build")
    }

    #[test]
    fn offline_parts() {
        let key = offline_key();
        assert_eq!(key.key_id(), "k-307668075");
        assert_eq!(key.key_type(), KeyType::Ed25519);
        assert!(key.has_private_key());
        assert!(!key.public_key().has_private_key());
        assert_eq!(key.public_key().key_id(), "ZoApcfvtOqFDbQodx-UeMG_xyZl8-1hOf04jy1HL_GY");
    }

    #[test]
    fn redacted_debug() {
        let key = offline_key();
        let debug = format!("{key:?}");
        assert!(debug.contains("k-307668075"));
        assert!(!debug.contains("dev-only-token"));

        let config = TransitConfig::new("http://localhost", "secret-token");
        assert!(!format!("{config:?}").contains("secret-token"));
    }

    #[tokio::test]
    async fn unsupported_type() {
        let config = TransitConfig::new("http://127.0.0.1:1/v1/transit", "t");
        let err = RemoteKey::generate(KeyType::Secp256k1, &config).await.expect_err("should fail");
        assert!(err.is(Err::UnsupportedKeyType));
    }

    #[tokio::test]
    async fn unreachable_backend() {
        let key = offline_key();
        let err = key.sign_jws(b"{}", &JwsOptions::default()).await.expect_err("should fail");
        assert!(err.is(Err::BackendUnavailable));
    }

    #[tokio::test]
    async fn timeout_elapses() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, crate::Error>(())
        };
        let err = bounded(Some(Duration::from_millis(10)), slow).await.expect_err("should fail");
        assert!(err.is(Err::BackendUnavailable));
    }

    #[tokio::test]
    #[ignore]
    async fn live_sign_and_verify() {
        let config = TransitConfig::from_env().expect("transit settings in environment");
        for key_type in [KeyType::Ed25519, KeyType::Secp256r1, KeyType::Rsa] {
            let key = RemoteKey::generate(key_type, &config).await.expect("should generate");
            let token =
                key.sign_jws(br#"{"iss":"remote"}"#, &JwsOptions::default()).await.unwrap();
            let payload = key.public_key().verify_jws_bytes(&token).expect("should verify");
            assert_eq!(payload, br#"{"iss":"remote"}"#);

            let connected = RemoteKey::connect(&config, key.key_id()).await.expect("connect");
            assert_eq!(connected.public_key().key_id(), key.public_key().key_id());
            key.delete().await.expect("should delete");
        }
    }
}
