//! HTTP client for a Vault-compatible transit signing engine.

use std::collections::HashMap;

use base64ct::{Base64, Encoding};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::Err;
use crate::jwk::decode_b64url;
use crate::key::local::LocalKey;
use crate::key_type::KeyType;
use crate::{tracerr, Result};

/// Header carrying the access credential on every request.
const TOKEN_HEADER: &str = "X-Vault-Token";

/// Transit engine client.
#[derive(Clone)]
pub(crate) struct TransitClient {
    /// URL of the transit engine mount, e.g. `http://127.0.0.1:8200/v1/transit`.
    server: String,
    /// Access credential.
    access_key: Zeroizing<String>,
    /// Reusable HTTP client.
    http_client: reqwest::Client,
}

/// A key as read back from the engine.
pub(crate) struct TransitKey {
    pub key_type: KeyType,
    pub public_key: LocalKey,
}

// Struct used internally for key creation requests.
#[derive(Debug, Serialize)]
struct CreateKeyRequest {
    #[serde(rename = "type")]
    key_type: &'static str,
}

// Struct used internally for key configuration requests.
#[derive(Debug, Serialize)]
struct ConfigRequest {
    deletion_allowed: bool,
}

// Sign request body. Optional members are only sent for the key types that need them.
#[derive(Debug, Serialize)]
struct SignRequest {
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    marshaling_algorithm: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature_algorithm: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash_algorithm: Option<&'static str>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct KeyData {
    #[serde(rename = "type")]
    key_type: String,
    latest_version: u64,
    keys: HashMap<String, KeyVersion>,
}

#[derive(Deserialize)]
struct KeyVersion {
    #[serde(default)]
    public_key: String,
}

#[derive(Deserialize)]
struct SignData {
    signature: String,
}

#[derive(Default, Deserialize)]
struct ApiErrors {
    #[serde(default)]
    errors: Vec<String>,
}

/// The engine's name for a key type.
///
/// # Errors
///
/// * `Err::UnsupportedKeyType` - the engine cannot hold keys of this type.
pub(crate) fn transit_type(key_type: KeyType) -> Result<&'static str> {
    match key_type {
        KeyType::Ed25519 => Ok("ed25519"),
        KeyType::Secp256r1 => Ok("ecdsa-p256"),
        KeyType::Rsa => Ok("rsa-2048"),
        KeyType::Secp256k1 => {
            tracerr!(Err::UnsupportedKeyType, "transit engine does not support {key_type} keys")
        }
    }
}

fn key_type_of(transit_type: &str) -> Result<KeyType> {
    match transit_type {
        "ed25519" => Ok(KeyType::Ed25519),
        "ecdsa-p256" => Ok(KeyType::Secp256r1),
        "rsa-2048" | "rsa-3072" | "rsa-4096" => Ok(KeyType::Rsa),
        other => tracerr!(Err::UnsupportedKeyType, "unsupported transit key type: {other}"),
    }
}

impl TransitClient {
    /// Constructor.
    pub(crate) fn new(server: &str, access_key: Zeroizing<String>) -> Self {
        Self {
            server: server.trim_end_matches('/').to_string(),
            access_key,
            http_client: reqwest::Client::new(),
        }
    }

    /// Replace the HTTP transport.
    pub(crate) fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    pub(crate) fn server(&self) -> &str {
        &self.server
    }

    pub(crate) fn access_key(&self) -> &str {
        self.access_key.as_str()
    }

    /// Create a new named key.
    ///
    /// # Errors
    ///
    /// * `Err::UnsupportedKeyType` if the engine cannot hold keys of this type.
    /// * `Err::BackendUnavailable` if the request fails or is rejected.
    pub(crate) async fn create_key(&self, name: &str, key_type: KeyType) -> Result<()> {
        let body = CreateKeyRequest {
            key_type: transit_type(key_type)?,
        };
        let request = self.request(Method::POST, &format!("keys/{name}"))?.json(&body);
        self.send(request).await?;
        Ok(())
    }

    /// Read a key's type and the public half of its latest version.
    ///
    /// # Errors
    ///
    /// * `Err::BackendUnavailable` if the request fails, is rejected or returns an unexpected
    /// body.
    /// * `Err::UnsupportedKeyType` if the engine holds the key as a type this crate does not
    /// support.
    /// * `Err::MalformedKey` if the returned public key cannot be parsed.
    pub(crate) async fn read_key(&self, name: &str) -> Result<TransitKey> {
        let request = self.request(Method::GET, &format!("keys/{name}"))?;
        let response = self.send(request).await?;
        let Envelope { data } = unpack_response::<Envelope<KeyData>>(response).await?;
        transit_key(name, &data)
    }

    /// Sign a message with a named key, returning the raw signature. ECDSA signatures are
    /// fixed-width `r||s`.
    ///
    /// # Errors
    ///
    /// * `Err::BackendUnavailable` if the request fails, is rejected or returns an unexpected
    /// body.
    pub(crate) async fn sign(&self, name: &str, key_type: KeyType, msg: &[u8]) -> Result<Vec<u8>> {
        let mut body = SignRequest {
            input: Base64::encode_string(msg),
            marshaling_algorithm: None,
            signature_algorithm: None,
            hash_algorithm: None,
        };
        match key_type {
            KeyType::Secp256k1 | KeyType::Secp256r1 => body.marshaling_algorithm = Some("jws"),
            KeyType::Rsa => {
                body.signature_algorithm = Some("pkcs1v15");
                body.hash_algorithm = Some("sha2-256");
            }
            KeyType::Ed25519 => {}
        }

        let request = self.request(Method::POST, &format!("sign/{name}"))?.json(&body);
        let response = self.send(request).await?;
        let Envelope { data } = unpack_response::<Envelope<SignData>>(response).await?;

        decode_signature(&data.signature, body.marshaling_algorithm.is_some())
    }

    /// Allow deletion of a named key, then delete it.
    ///
    /// # Errors
    ///
    /// * `Err::BackendUnavailable` if either request fails or is rejected.
    pub(crate) async fn delete_key(&self, name: &str) -> Result<()> {
        let config = ConfigRequest {
            deletion_allowed: true,
        };
        let request = self.request(Method::POST, &format!("keys/{name}/config"))?.json(&config);
        self.send(request).await?;

        let request = self.request(Method::DELETE, &format!("keys/{name}"))?;
        self.send(request).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = match Url::parse(&format!("{}/{path}", self.server)) {
            Ok(url) => url,
            Err(e) => {
                tracerr!(Err::InvalidConfig, "invalid transit server URL {}: {e}", self.server)
            }
        };
        Ok(self.http_client.request(method, url).header(TOKEN_HEADER, self.access_key.as_str()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = match request.send().await {
            Ok(res) => res,
            Err(e) => tracerr!(Err::BackendUnavailable, "unable to make request: {e}"),
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        tracing::trace!("error return from transit request: {status}");
        let api_errors = response.json::<ApiErrors>().await.unwrap_or_default();
        tracerr!(
            Err::BackendUnavailable,
            "transit returned status {}: {}",
            status.as_u16(),
            api_errors.errors.join("; ")
        )
    }
}

/// The key type and latest public key of a key read from the engine. Ed25519 public keys are
/// standard base64 raw bytes, EC and RSA public keys are PEM.
fn transit_key(name: &str, data: &KeyData) -> Result<TransitKey> {
    let key_type = key_type_of(&data.key_type)?;
    let Some(latest) = data.keys.get(&data.latest_version.to_string()) else {
        tracerr!(
            Err::BackendUnavailable,
            "transit key {name} has no version {}",
            data.latest_version
        );
    };

    let public_key = if key_type == KeyType::Ed25519 {
        let Ok(raw) = Base64::decode_vec(latest.public_key.trim()) else {
            tracerr!(Err::MalformedKey, "transit key {name} has an invalid Ed25519 public key");
        };
        LocalKey::import_raw_public_key(key_type, &raw)?
    } else {
        LocalKey::import_pem(latest.public_key.trim())?
    };
    if public_key.key_type() != key_type {
        tracerr!(
            Err::MalformedKey,
            "transit key {name} is {key_type} but its public key is {}",
            public_key.key_type()
        );
    }

    Ok(TransitKey {
        key_type,
        public_key,
    })
}

/// Decode a `vault:v<n>:<signature>` string. `jws` marshaling encodes the signature as
/// base64url, everything else as standard base64.
fn decode_signature(signature: &str, jws: bool) -> Result<Vec<u8>> {
    let encoded = signature
        .strip_prefix("vault:v")
        .and_then(|rest| rest.split_once(':'))
        .filter(|(version, _)| !version.is_empty() && version.bytes().all(|b| b.is_ascii_digit()))
        .map(|(_, encoded)| encoded)
        .filter(|encoded| !encoded.is_empty());
    let Some(encoded) = encoded else {
        tracerr!(Err::BackendUnavailable, "transit returned an unrecognised signature format");
    };

    let decoded = if jws { decode_b64url(encoded) } else { Base64::decode_vec(encoded).ok() };
    match decoded {
        Some(signature) => Ok(signature),
        None => tracerr!(Err::BackendUnavailable, "transit returned an undecodable signature"),
    }
}

// Helper to unpack a successful response body.
async fn unpack_response<T>(res: Response) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    match res.json::<T>().await {
        Ok(obj) => Ok(obj),
        Err(err) => tracerr!(Err::BackendUnavailable, "unable to deserialize response: {err}"),
    }
}
