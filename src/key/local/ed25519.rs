use base64ct::{Base64UrlUnpadded, Encoding};
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use super::{AsymmetricKey, KeyPair as KeyPairBehavior};
use crate::error::Err;
use crate::jwk::{decode_member, Jwk};
use crate::key_type::{JwsAlgorithm, KeyType};
use crate::{tracerr, Result};

/// Key pair for Ed25519.
pub type KeyPair = AsymmetricKey<VerifyingKey, SigningKey>;

/// `KeyPair` implementation for Ed25519.
impl KeyPairBehavior for KeyPair {
    fn key_type() -> KeyType {
        KeyType::Ed25519
    }

    fn generate() -> Result<Self> {
        let signing_key = SigningKey::generate(&mut OsRng);
        Ok(Self {
            verifying_key: signing_key.verifying_key(),
            signing_key: Some(signing_key),
        })
    }

    fn from_jwk(jwk: &Jwk) -> Result<Self> {
        let x = decode_member(jwk.x.as_ref(), "x")?;
        let Self { verifying_key, .. } = Self::from_raw_public(&x)?;
        if jwk.d.is_none() {
            return Ok(Self {
                verifying_key,
                signing_key: None,
            });
        }

        let d = decode_member(jwk.d.as_ref(), "d")?;
        let Ok(secret) = <[u8; 32]>::try_from(d.as_slice()) else {
            tracerr!(Err::MalformedKey, "{} private key must be 32 bytes", Self::key_type());
        };
        let signing_key = SigningKey::from_bytes(&secret);
        if signing_key.verifying_key() != verifying_key {
            tracerr!(Err::MalformedKey, "private key d does not match public key x");
        }
        Ok(Self {
            verifying_key,
            signing_key: Some(signing_key),
        })
    }

    fn from_raw_public(bytes: &[u8]) -> Result<Self> {
        let Ok(raw) = <[u8; 32]>::try_from(bytes) else {
            tracerr!(
                Err::MalformedKey,
                "{} public key must be 32 bytes, got {}",
                Self::key_type(),
                bytes.len()
            );
        };
        match VerifyingKey::from_bytes(&raw) {
            Ok(verifying_key) => Ok(Self {
                verifying_key,
                signing_key: None,
            }),
            Err(e) => tracerr!(Err::MalformedKey, "invalid Ed25519 public key: {e}"),
        }
    }

    fn from_pem(pem: &str) -> Option<Self> {
        if let Ok(verifying_key) = VerifyingKey::from_public_key_pem(pem) {
            return Some(Self {
                verifying_key,
                signing_key: None,
            });
        }
        let signing_key = SigningKey::from_pkcs8_pem(pem).ok()?;
        Some(Self {
            verifying_key: signing_key.verifying_key(),
            signing_key: Some(signing_key),
        })
    }

    fn to_jwk(&self, include_private: bool) -> Jwk {
        let d = if include_private {
            self.signing_key.as_ref().map(|sk| Base64UrlUnpadded::encode_string(&sk.to_bytes()))
        } else {
            None
        };
        Jwk {
            kty: Self::key_type().kty().to_string(),
            crv: Self::key_type().curve().map(ToString::to_string),
            x: Some(Base64UrlUnpadded::encode_string(self.verifying_key.as_bytes())),
            d,
            ..Jwk::default()
        }
    }

    fn raw_public(&self) -> Result<Vec<u8>> {
        Ok(self.verifying_key.to_bytes().to_vec())
    }

    fn has_private_key(&self) -> bool {
        self.signing_key.is_some()
    }

    fn to_public(&self) -> Self {
        self.public()
    }

    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        let Some(sk) = &self.signing_key else {
            tracerr!(Err::NoPrivateKey, "no secret key");
        };
        Ok(sk.sign(msg).to_bytes().to_vec())
    }

    fn verify(&self, _: JwsAlgorithm, msg: &[u8], sig: &[u8]) -> Result<()> {
        let Ok(sig) = Signature::from_slice(sig) else {
            tracerr!(Err::InvalidSignature, "Ed25519 signature must be 64 bytes");
        };
        match self.verifying_key.verify_strict(msg, &sig) {
            Ok(()) => Ok(()),
            Err(e) => tracerr!(Err::InvalidSignature, "error verifying signature: {e}"),
        }
    }
}
