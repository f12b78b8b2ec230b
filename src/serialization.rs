//! # Key Serialization
//!
//! The tagged JSON form keys are persisted and exchanged in. The `type` member names the
//! backend and is always written first:
//!
//! ```json
//! {"type":"jwk","kty":"OKP","crv":"Ed25519","x":"...","_keyType":"Ed25519","_publicKey":[...]}
//! {"type":"tse","server":"...","accessKey":"...","id":"k-1","_publicKey":[...],"_keyType":"Ed25519"}
//! ```
//!
//! `_publicKey` caches the raw public key as an array of signed bytes. Reading accepts signed or
//! unsigned bytes, and also the older `{"type":"local","jwk":"<JWK JSON>"}` form.
//!
//! Deserialization never touches the network.

use std::fmt::{Debug, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroizing;

use crate::error::Err;
use crate::jwk::Jwk;
use crate::key::{Key, LocalKey, RemoteKey, TransitConfig};
use crate::key_type::KeyType;
use crate::{tracerr, Result};

/// Backend tags this crate can read.
const KNOWN_TYPES: [&str; 3] = ["jwk", "tse", "local"];

/// Persisted form of a [`Key`].
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum SerializedKey {
    /// A local key: the JWK members, flattened.
    #[serde(rename = "jwk")]
    Jwk {
        /// The key, with private members when it has them.
        #[serde(flatten)]
        jwk: Jwk,

        /// Key type.
        #[serde(rename = "_keyType")]
        key_type: KeyType,

        /// Cached raw public key.
        #[serde(rename = "_publicKey", default, with = "signed_bytes")]
        #[serde(skip_serializing_if = "Option::is_none")]
        public_key: Option<Vec<u8>>,
    },

    /// A key held by a transit engine.
    #[serde(rename = "tse")]
    Tse {
        /// URL of the engine mount.
        server: String,

        /// Access token.
        #[serde(rename = "accessKey")]
        access_key: Zeroizing<String>,

        /// Engine key name.
        id: String,

        /// Cached raw public key.
        #[serde(rename = "_publicKey", default, with = "signed_bytes")]
        #[serde(skip_serializing_if = "Option::is_none")]
        public_key: Option<Vec<u8>>,

        /// Key type.
        #[serde(rename = "_keyType", default, skip_serializing_if = "Option::is_none")]
        key_type: Option<KeyType>,
    },

    /// Older local form holding the JWK as a JSON string. Read only.
    #[serde(rename = "local")]
    Local {
        /// JWK JSON.
        jwk: String,
    },
}

impl SerializedKey {
    /// Capture a key's persisted form.
    ///
    /// # Errors
    ///
    /// * `Err::SerializationError` - the raw public key could not be encoded.
    pub fn from_key(key: &Key) -> Result<Self> {
        match key {
            Key::Local(local) => Ok(Self::Jwk {
                jwk: local.jwk(),
                key_type: local.key_type(),
                public_key: Some(local.raw_public_key()?),
            }),
            Key::Remote(remote) => Ok(Self::Tse {
                server: remote.server().to_string(),
                access_key: Zeroizing::new(remote.access_key().to_string()),
                id: remote.key_id().to_string(),
                public_key: Some(remote.raw_public_key()?),
                key_type: Some(remote.key_type()),
            }),
        }
    }

    /// Rebuild the key without network access.
    ///
    /// # Errors
    ///
    /// * `Err::MalformedKey` - the key material is invalid, disagrees with `_keyType` or
    ///   `_publicKey`, or a `tse` entry lacks the cached public key needed to build it offline.
    pub fn into_key(self) -> Result<Key> {
        match self {
            Self::Jwk {
                jwk,
                key_type,
                public_key,
            } => {
                let key = LocalKey::from_jwk(&jwk)?;
                if key.key_type() != key_type {
                    tracerr!(
                        Err::MalformedKey,
                        "_keyType {key_type} does not match JWK key type {}",
                        key.key_type()
                    );
                }
                if let Some(cached) = public_key {
                    if cached != key.raw_public_key()? {
                        tracerr!(Err::MalformedKey, "_publicKey does not match the JWK");
                    }
                }
                Ok(Key::Local(key))
            }
            Self::Tse {
                server,
                access_key,
                id,
                public_key,
                key_type,
            } => {
                let (Some(key_type), Some(public_key)) = (key_type, public_key) else {
                    tracerr!(
                        Err::MalformedKey,
                        "tse key {id} lacks _keyType or _publicKey; use RemoteKey::connect to \
                         read them from the server"
                    );
                };
                let config = TransitConfig {
                    server,
                    access_key,
                    timeout: None,
                };
                Ok(Key::Remote(RemoteKey::from_parts(&config, id, key_type, &public_key)?))
            }
            Self::Local { jwk } => Ok(Key::Local(LocalKey::import_jwk(&jwk)?)),
        }
    }
}

impl Debug for SerializedKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jwk { key_type, .. } => {
                f.debug_struct("Jwk").field("key_type", key_type).finish_non_exhaustive()
            }
            Self::Tse {
                server, id, key_type, ..
            } => f
                .debug_struct("Tse")
                .field("server", server)
                .field("id", id)
                .field("key_type", key_type)
                .finish_non_exhaustive(),
            Self::Local { .. } => f.debug_struct("Local").finish_non_exhaustive(),
        }
    }
}

/// Serialize a key to its tagged JSON form.
///
/// # Errors
///
/// * `Err::SerializationError` - the key could not be encoded.
pub fn serialize_key(key: &Key) -> Result<String> {
    match serde_json::to_string(&SerializedKey::from_key(key)?) {
        Ok(json) => Ok(json),
        Err(e) => tracerr!(Err::SerializationError, "failed to serialize key: {e}"),
    }
}

/// Rebuild a key from its tagged JSON form.
///
/// # Errors
///
/// * `Err::UnknownKeyBackend` - `type` is missing or names no known backend.
/// * `Err::MalformedKey` - backend fields are missing or are not valid key material.
pub fn deserialize_key(json: &str) -> Result<Key> {
    let value: Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(e) => tracerr!(Err::MalformedKey, "serialized key is not JSON: {e}"),
    };
    match value.get("type").and_then(Value::as_str) {
        Some(tag) if KNOWN_TYPES.contains(&tag) => {}
        Some(tag) => tracerr!(Err::UnknownKeyBackend, "unknown key backend: {tag}"),
        None => tracerr!(Err::UnknownKeyBackend, "serialized key has no type"),
    }

    let serialized: SerializedKey = match serde_json::from_value(value) {
        Ok(serialized) => serialized,
        Err(e) => tracerr!(Err::MalformedKey, "invalid serialized key: {e}"),
    };
    serialized.into_key()
}

/// Serde for byte arrays written as signed bytes. Unsigned bytes are accepted on read.
mod signed_bytes {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.collect_seq(bytes.iter().map(|b| i8::from_ne_bytes([*b]))),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(values) = Option::<Vec<i16>>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let mut bytes = Vec::with_capacity(values.len());
        for value in values {
            let byte = match u8::try_from(value) {
                Ok(byte) => byte,
                Err(_) => match i8::try_from(value) {
                    Ok(signed) => signed.to_ne_bytes()[0],
                    Err(_) => return Err(D::Error::custom(format!("{value} is not a byte"))),
                },
            };
            bytes.push(byte);
        }
        Ok(Some(bytes))
    }
}
