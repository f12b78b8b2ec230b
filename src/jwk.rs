//! # JSON Web Key
//!
//! A JWK structure covering the members used by the supported key types, plus the RFC 7638
//! thumbprint used to derive key IDs.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Err;
use crate::key_type::KeyType;
use crate::{tracerr, Result};

/// JSON Web Key (JWK) structure. Unknown members are ignored when parsing.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Jwk {
    /// Key type.
    pub kty: String,

    /// Cryptographic curve type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// RSA modulus.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// X coordinate, or the public key of an OKP key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// Y coordinate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// Private key: the EC/OKP secret or the RSA private exponent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,

    /// RSA first prime factor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,

    /// RSA second prime factor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,

    /// RSA first factor CRT exponent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,

    /// RSA second factor CRT exponent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,

    /// RSA first CRT coefficient.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,

    /// Key ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl Jwk {
    /// Parse a JWK from its JSON form.
    ///
    /// # Errors
    ///
    /// * `Err::MalformedKey` - the input is not a JSON object with a `kty` member.
    pub fn from_json(jwk: &str) -> Result<Self> {
        let parsed: Self = match serde_json::from_str(jwk) {
            Ok(jwk) => jwk,
            Err(e) => tracerr!(Err::MalformedKey, "invalid JWK JSON: {e}"),
        };
        if parsed.kty.is_empty() {
            tracerr!(Err::MalformedKey, "JWK is missing the kty member");
        }
        Ok(parsed)
    }

    /// The key type implied by the `kty` and `crv` members.
    ///
    /// # Errors
    ///
    /// * `Err::MalformedKey` - an `EC` or `OKP` key has no `crv` member.
    /// * `Err::UnsupportedKeyType` - the members name no supported key type.
    pub fn key_type(&self) -> Result<KeyType> {
        KeyType::from_jwk_params(&self.kty, self.crv.as_deref())
    }

    /// True if any private member is present.
    #[must_use]
    pub const fn has_private_members(&self) -> bool {
        self.d.is_some()
    }

    /// A copy of the key with every private member removed.
    #[must_use]
    pub fn to_public(&self) -> Self {
        Self {
            kty: self.kty.clone(),
            crv: self.crv.clone(),
            n: self.n.clone(),
            e: self.e.clone(),
            x: self.x.clone(),
            y: self.y.clone(),
            kid: self.kid.clone(),
            ..Self::default()
        }
    }

    /// RFC 7638 JWK thumbprint: SHA-256 over the required public members in lexicographic
    /// order, base64url encoded.
    ///
    /// # Errors
    ///
    /// * `Err::MalformedKey` - a required member is missing.
    pub fn thumbprint(&self) -> Result<String> {
        let canonical = match self.kty.as_str() {
            "EC" => format!(
                r#"{{"crv":"{}","kty":"EC","x":"{}","y":"{}"}}"#,
                required(self.crv.as_ref(), "crv")?,
                required(self.x.as_ref(), "x")?,
                required(self.y.as_ref(), "y")?
            ),
            "OKP" => format!(
                r#"{{"crv":"{}","kty":"OKP","x":"{}"}}"#,
                required(self.crv.as_ref(), "crv")?,
                required(self.x.as_ref(), "x")?
            ),
            "RSA" => format!(
                r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#,
                required(self.e.as_ref(), "e")?,
                required(self.n.as_ref(), "n")?
            ),
            kty => tracerr!(Err::MalformedKey, "cannot compute thumbprint for kty {kty}"),
        };
        let digest = Sha256::digest(canonical.as_bytes());
        Ok(Base64UrlUnpadded::encode_string(&digest))
    }
}

fn required<'a>(member: Option<&'a String>, name: &str) -> Result<&'a str> {
    match member {
        Some(value) if !value.is_empty() => Ok(value),
        _ => tracerr!(Err::MalformedKey, "JWK is missing the {name} member"),
    }
}

/// Decode a required base64url JWK member.
pub(crate) fn decode_member(member: Option<&String>, name: &str) -> Result<Vec<u8>> {
    let value = required(member, name)?;
    match decode_b64url(value) {
        Some(bytes) => Ok(bytes),
        None => tracerr!(Err::MalformedKey, "JWK member {name} is not valid base64url"),
    }
}

/// Decode a base64url string, with or without padding.
pub(crate) fn decode_b64url(value: &str) -> Option<Vec<u8>> {
    Base64UrlUnpadded::decode_vec(value.trim_end_matches('=')).ok()
}
