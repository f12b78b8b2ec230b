//! # Key Types
//!
//! The closed set of signature algorithm families supported by this crate, and the JOSE
//! identifiers each maps to.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Err;
use crate::{tracerr, Result};

/// Size of generated RSA keys, in bits.
pub const RSA_KEY_BITS: usize = 2048;

/// Signature algorithm family of a key.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// `EdDSA` over Curve25519.
    Ed25519,

    /// ECDSA over the secp256k1 curve.
    #[serde(rename = "secp256k1")]
    Secp256k1,

    /// ECDSA over the NIST P-256 curve.
    #[serde(rename = "secp256r1")]
    Secp256r1,

    /// RSA.
    #[serde(rename = "RSA")]
    Rsa,
}

impl KeyType {
    /// Every supported key type.
    pub const ALL: [Self; 4] = [Self::Ed25519, Self::Secp256k1, Self::Secp256r1, Self::Rsa];

    /// The JWS algorithm used when signing with a key of this type.
    #[must_use]
    pub const fn jws_algorithm(self) -> JwsAlgorithm {
        match self {
            Self::Ed25519 => JwsAlgorithm::EdDsa,
            Self::Secp256k1 => JwsAlgorithm::Es256K,
            Self::Secp256r1 => JwsAlgorithm::Es256,
            Self::Rsa => JwsAlgorithm::Rs256,
        }
    }

    /// JWK `kty` member for this key type.
    #[must_use]
    pub const fn kty(self) -> &'static str {
        match self {
            Self::Ed25519 => "OKP",
            Self::Secp256k1 | Self::Secp256r1 => "EC",
            Self::Rsa => "RSA",
        }
    }

    /// JWK `crv` member for this key type. RSA keys have no curve.
    #[must_use]
    pub const fn curve(self) -> Option<&'static str> {
        match self {
            Self::Ed25519 => Some("Ed25519"),
            Self::Secp256k1 => Some("secp256k1"),
            Self::Secp256r1 => Some("P-256"),
            Self::Rsa => None,
        }
    }

    /// Infer the key type from JWK `kty` and `crv` members.
    ///
    /// # Errors
    ///
    /// * `Err::MalformedKey` - an `EC` or `OKP` key has no `crv` member.
    /// * `Err::UnsupportedKeyType` - the combination names no supported key type.
    pub fn from_jwk_params(kty: &str, crv: Option<&str>) -> Result<Self> {
        match (kty, crv) {
            ("EC" | "OKP", None) => {
                tracerr!(Err::MalformedKey, "{kty} JWK is missing the crv member")
            }
            ("OKP", Some("Ed25519")) => Ok(Self::Ed25519),
            ("EC", Some("secp256k1")) => Ok(Self::Secp256k1),
            ("EC", Some("P-256")) => Ok(Self::Secp256r1),
            ("RSA", _) => Ok(Self::Rsa),
            _ => tracerr!(
                Err::UnsupportedKeyType,
                "unsupported key type and curve combination: {kty}/{}",
                crv.unwrap_or("none")
            ),
        }
    }
}

/// Key type display label, as written to the `_keyType` member of serialized keys.
impl Display for KeyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ed25519 => write!(f, "Ed25519"),
            Self::Secp256k1 => write!(f, "secp256k1"),
            Self::Secp256r1 => write!(f, "secp256r1"),
            Self::Rsa => write!(f, "RSA"),
        }
    }
}

impl FromStr for KeyType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Ed25519" => Ok(Self::Ed25519),
            "secp256k1" => Ok(Self::Secp256k1),
            "secp256r1" => Ok(Self::Secp256r1),
            "RSA" => Ok(Self::Rsa),
            _ => tracerr!(Err::UnsupportedKeyType, "unknown key type: {s}"),
        }
    }
}

/// JWS `alg` header values understood by this crate.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum JwsAlgorithm {
    /// Edwards-curve signature (Ed25519).
    #[serde(rename = "EdDSA")]
    EdDsa,

    /// ECDSA using secp256k1 and SHA-256.
    #[serde(rename = "ES256K")]
    Es256K,

    /// ECDSA using P-256 and SHA-256.
    #[serde(rename = "ES256")]
    Es256,

    /// RSASSA-PKCS1-v1_5 using SHA-256.
    #[serde(rename = "RS256")]
    Rs256,

    /// RSASSA-PSS using SHA-256 and MGF1 with SHA-256.
    #[serde(rename = "PS256")]
    Ps256,
}

impl JwsAlgorithm {
    /// The key type family this algorithm belongs to.
    #[must_use]
    pub const fn key_type(self) -> KeyType {
        match self {
            Self::EdDsa => KeyType::Ed25519,
            Self::Es256K => KeyType::Secp256k1,
            Self::Es256 => KeyType::Secp256r1,
            Self::Rs256 | Self::Ps256 => KeyType::Rsa,
        }
    }
}

impl Display for JwsAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EdDsa => write!(f, "EdDSA"),
            Self::Es256K => write!(f, "ES256K"),
            Self::Es256 => write!(f, "ES256"),
            Self::Rs256 => write!(f, "RS256"),
            Self::Ps256 => write!(f, "PS256"),
        }
    }
}

impl FromStr for JwsAlgorithm {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "EdDSA" => Ok(Self::EdDsa),
            "ES256K" => Ok(Self::Es256K),
            "ES256" => Ok(Self::Es256),
            "RS256" => Ok(Self::Rs256),
            "PS256" => Ok(Self::Ps256),
            _ => tracerr!(Err::AlgorithmMismatch, "unsupported JWS algorithm: {s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_round_trip() {
        for key_type in KeyType::ALL {
            let alg = key_type.jws_algorithm();
            assert_eq!(alg.key_type(), key_type);
            assert_eq!(JwsAlgorithm::from_str(&alg.to_string()).expect("should parse"), alg);
        }
        assert_eq!(JwsAlgorithm::Ps256.key_type(), KeyType::Rsa);
    }

    #[test]
    fn names_match_serde() {
        for key_type in KeyType::ALL {
            let json = serde_json::to_string(&key_type).expect("should serialize");
            assert_eq!(json, format!("\"{key_type}\""));
            assert_eq!(KeyType::from_str(&key_type.to_string()).expect("should parse"), key_type);
        }
    }

    #[test]
    fn jwk_params() {
        assert_eq!(KeyType::from_jwk_params("EC", Some("P-256")).unwrap(), KeyType::Secp256r1);
        assert_eq!(KeyType::from_jwk_params("RSA", None).unwrap(), KeyType::Rsa);
        let err = KeyType::from_jwk_params("EC", Some("P-384")).expect_err("should fail");
        assert!(err.is(Err::UnsupportedKeyType));
        let err = KeyType::from_jwk_params("oct", None).expect_err("should fail");
        assert!(err.is(Err::UnsupportedKeyType));
    }

    #[test]
    fn missing_curve() {
        for kty in ["EC", "OKP"] {
            let err = KeyType::from_jwk_params(kty, None).expect_err("should fail");
            assert!(err.is(Err::MalformedKey), "{kty}");
        }
    }
}
