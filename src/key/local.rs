//! # Local Keys
//!
//! Keys whose material is held in process. A local key always carries public material and may
//! carry private material; without it the key can verify but not sign.

mod ec;
mod ed25519;
mod rsa;

use std::fmt::{Debug, Formatter};

use self::ec::{secp256k1, secp256r1};
use crate::error::Err;
use crate::jwk::Jwk;
use crate::jws::{self, JwsOptions};
use crate::key_type::{JwsAlgorithm, KeyType};
use crate::{tracerr, Result};

/// Asymmetric key pair.
#[derive(Clone)]
pub struct AsymmetricKey<V, S> {
    /// Key for verifying.
    pub verifying_key: V,
    /// Secret key for signing.
    pub signing_key: Option<S>,
}

impl<V: Clone, S> AsymmetricKey<V, S> {
    /// The same key without its signing half.
    fn public(&self) -> Self {
        Self {
            verifying_key: self.verifying_key.clone(),
            signing_key: None,
        }
    }
}

/// A supported key type needs to be able to generate a key pair, move between its JWK and raw
/// encodings, and sign and verify messages.
pub(crate) trait KeyPair: Sized {
    /// Declare the key type implemented.
    fn key_type() -> KeyType;

    /// Generate a new key pair from a cryptographically secure source.
    fn generate() -> Result<Self>;

    /// Build a key pair from a JWK. The result holds private material only if the JWK does.
    fn from_jwk(jwk: &Jwk) -> Result<Self>;

    /// Build a public-only key pair from its canonical raw encoding.
    fn from_raw_public(bytes: &[u8]) -> Result<Self>;

    /// Build a key pair from an SPKI public key or PKCS#8 private key PEM document. Returns
    /// `None` if the document does not hold a key of this type.
    fn from_pem(pem: &str) -> Option<Self>;

    /// Express the key as a JWK, including private members only when asked to.
    fn to_jwk(&self, include_private: bool) -> Jwk;

    /// The canonical raw encoding of the public key.
    fn raw_public(&self) -> Result<Vec<u8>>;

    /// True if the key pair holds private material.
    fn has_private_key(&self) -> bool;

    /// The same key pair without private material.
    fn to_public(&self) -> Self;

    /// Sign a message, returning the raw signature.
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>>;

    /// Verify a raw signature over a message. `alg` has already been checked to belong to this
    /// key type's family.
    fn verify(&self, alg: JwsAlgorithm, msg: &[u8], sig: &[u8]) -> Result<()>;
}

#[derive(Clone)]
enum Material {
    Ed25519(ed25519::KeyPair),
    Secp256k1(secp256k1::KeyPair),
    Secp256r1(secp256r1::KeyPair),
    Rsa(rsa::KeyPair),
}

macro_rules! with_material {
    ($material:expr, $kp:ident => $body:expr) => {
        match $material {
            Material::Ed25519($kp) => $body,
            Material::Secp256k1($kp) => $body,
            Material::Secp256r1($kp) => $body,
            Material::Rsa($kp) => $body,
        }
    };
}

/// A key whose material is held in process.
#[derive(Clone)]
pub struct LocalKey {
    material: Material,
    thumbprint: String,
    explicit_kid: Option<String>,
}

impl LocalKey {
    /// Generate a new key of the given type.
    ///
    /// # Errors
    ///
    /// * `Err::UnsupportedKeyType` - key generation failed for the key type.
    pub fn generate(key_type: KeyType) -> Result<Self> {
        let material = match key_type {
            KeyType::Ed25519 => Material::Ed25519(ed25519::KeyPair::generate()?),
            KeyType::Secp256k1 => Material::Secp256k1(secp256k1::KeyPair::generate()?),
            KeyType::Secp256r1 => Material::Secp256r1(secp256r1::KeyPair::generate()?),
            KeyType::Rsa => Material::Rsa(rsa::KeyPair::generate()?),
        };
        Self::from_material(material, None)
    }

    /// Import a key from its JWK JSON form.
    ///
    /// # Errors
    ///
    /// * `Err::MalformedKey` - required members are absent or inconsistent with the key type.
    /// * `Err::UnsupportedKeyType` - the JWK names an unsupported key type.
    pub fn import_jwk(jwk: &str) -> Result<Self> {
        Self::from_jwk(&Jwk::from_json(jwk)?)
    }

    /// Import a key from a parsed JWK.
    ///
    /// # Errors
    ///
    /// * `Err::MalformedKey` - required members are absent or inconsistent with the key type.
    /// * `Err::UnsupportedKeyType` - the JWK names an unsupported key type.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        let material = match jwk.key_type()? {
            KeyType::Ed25519 => Material::Ed25519(ed25519::KeyPair::from_jwk(jwk)?),
            KeyType::Secp256k1 => Material::Secp256k1(secp256k1::KeyPair::from_jwk(jwk)?),
            KeyType::Secp256r1 => Material::Secp256r1(secp256r1::KeyPair::from_jwk(jwk)?),
            KeyType::Rsa => Material::Rsa(rsa::KeyPair::from_jwk(jwk)?),
        };
        Self::from_material(material, jwk.kid.clone())
    }

    /// Import a public key from its raw encoding: 32 bytes for Ed25519, SEC1 for EC keys and
    /// PKCS#1 DER for RSA.
    ///
    /// # Errors
    ///
    /// * `Err::MalformedKey` - the bytes are not a valid key of the given type.
    pub fn import_raw_public_key(key_type: KeyType, bytes: &[u8]) -> Result<Self> {
        let material = match key_type {
            KeyType::Ed25519 => Material::Ed25519(ed25519::KeyPair::from_raw_public(bytes)?),
            KeyType::Secp256k1 => Material::Secp256k1(secp256k1::KeyPair::from_raw_public(bytes)?),
            KeyType::Secp256r1 => Material::Secp256r1(secp256r1::KeyPair::from_raw_public(bytes)?),
            KeyType::Rsa => Material::Rsa(rsa::KeyPair::from_raw_public(bytes)?),
        };
        Self::from_material(material, None)
    }

    /// Import a key from a PEM document holding an SPKI public key or a PKCS#8 private key.
    ///
    /// # Errors
    ///
    /// * `Err::MalformedKey` - the document holds no key of a supported type.
    pub fn import_pem(pem: &str) -> Result<Self> {
        let material = if let Some(kp) = ed25519::KeyPair::from_pem(pem) {
            Material::Ed25519(kp)
        } else if let Some(kp) = secp256r1::KeyPair::from_pem(pem) {
            Material::Secp256r1(kp)
        } else if let Some(kp) = secp256k1::KeyPair::from_pem(pem) {
            Material::Secp256k1(kp)
        } else if let Some(kp) = rsa::KeyPair::from_pem(pem) {
            Material::Rsa(kp)
        } else {
            tracerr!(Err::MalformedKey, "PEM document holds no supported key");
        };
        Self::from_material(material, None)
    }

    fn from_material(material: Material, explicit_kid: Option<String>) -> Result<Self> {
        let thumbprint = with_material!(&material, kp => kp.to_jwk(false)).thumbprint()?;
        Ok(Self {
            material,
            thumbprint,
            explicit_kid,
        })
    }

    /// Override the key ID, which otherwise is the key's JWK thumbprint.
    #[must_use]
    pub fn with_key_id(mut self, kid: impl Into<String>) -> Self {
        self.explicit_kid = Some(kid.into());
        self
    }

    /// The key's algorithm family.
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        match &self.material {
            Material::Ed25519(_) => KeyType::Ed25519,
            Material::Secp256k1(_) => KeyType::Secp256k1,
            Material::Secp256r1(_) => KeyType::Secp256r1,
            Material::Rsa(_) => KeyType::Rsa,
        }
    }

    /// True if the key holds private material.
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        with_material!(&self.material, kp => kp.has_private_key())
    }

    /// The explicit key ID if one was set, otherwise the RFC 7638 thumbprint of the public key.
    #[must_use]
    pub fn key_id(&self) -> &str {
        self.explicit_kid.as_deref().unwrap_or(&self.thumbprint)
    }

    /// The key without its private material.
    #[must_use]
    pub fn public_key(&self) -> Self {
        Self {
            material: with_material!(&self.material, kp => kp.to_public().into()),
            thumbprint: self.thumbprint.clone(),
            explicit_kid: self.explicit_kid.clone(),
        }
    }

    /// The key as a JWK structure, with private members if the key has them.
    #[must_use]
    pub fn jwk(&self) -> Jwk {
        let mut jwk = with_material!(&self.material, kp => kp.to_jwk(true));
        jwk.kid.clone_from(&self.explicit_kid);
        jwk
    }

    /// Export the key as JWK JSON, with private members if the key has them.
    ///
    /// # Errors
    ///
    /// * `Err::SerializationError` - the JWK could not be serialized.
    pub fn export_jwk(&self) -> Result<String> {
        to_json(&self.jwk())
    }

    /// Export the public key as JWK JSON. Never includes private members.
    ///
    /// # Errors
    ///
    /// * `Err::SerializationError` - the JWK could not be serialized.
    pub fn export_public_jwk(&self) -> Result<String> {
        to_json(&self.jwk().to_public())
    }

    /// The canonical raw encoding of the public key.
    ///
    /// # Errors
    ///
    /// * `Err::SerializationError` - the key could not be encoded.
    pub fn raw_public_key(&self) -> Result<Vec<u8>> {
        with_material!(&self.material, kp => kp.raw_public())
    }

    /// Sign a message without a JWS envelope. ECDSA signatures are fixed-width `r||s`.
    ///
    /// # Errors
    ///
    /// * `Err::NoPrivateKey` - the key holds no private material.
    pub fn sign_raw(&self, msg: &[u8]) -> Result<Vec<u8>> {
        with_material!(&self.material, kp => kp.sign(msg))
    }

    /// Verify a detached signature produced by [`LocalKey::sign_raw`].
    ///
    /// # Errors
    ///
    /// * `Err::InvalidSignature` - the signature does not verify.
    pub fn verify_raw(&self, signature: &[u8], msg: &[u8]) -> Result<()> {
        self.verify_with(self.key_type().jws_algorithm(), msg, signature)
    }

    /// Verify a signature using an algorithm already checked against this key's family.
    pub(crate) fn verify_with(&self, alg: JwsAlgorithm, msg: &[u8], sig: &[u8]) -> Result<()> {
        with_material!(&self.material, kp => kp.verify(alg, msg, sig))
    }

    /// Sign a payload as a compact JWS.
    ///
    /// # Errors
    ///
    /// * `Err::NoPrivateKey` - the key holds no private material.
    pub fn sign_jws(&self, payload: &[u8], options: &JwsOptions) -> Result<String> {
        if !self.has_private_key() {
            tracerr!(Err::NoPrivateKey, "key {} has no private key", self.key_id());
        }
        let kid = options.include_kid.then(|| self.key_id());
        let header = jws::Header::new(self.key_type().jws_algorithm(), kid, &options.headers);
        jws::encode(&header, payload, |input| self.sign_raw(input))
    }

    /// Verify a compact JWS and return its payload bytes.
    ///
    /// # Errors
    ///
    /// * `Err::MalformedToken` - the token does not have three segments.
    /// * `Err::AlgorithmMismatch` - the header's `alg` is not in this key's family.
    /// * `Err::InvalidSignature` - decoding or signature verification failed.
    pub fn verify_jws_bytes(&self, token: &str) -> Result<Vec<u8>> {
        jws::verify(token, self.key_type(), |alg, input, sig| self.verify_with(alg, input, sig))
    }
}

impl Debug for LocalKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKey")
            .field("key_type", &self.key_type())
            .field("key_id", &self.key_id())
            .field("has_private_key", &self.has_private_key())
            .finish()
    }
}

impl From<ed25519::KeyPair> for Material {
    fn from(kp: ed25519::KeyPair) -> Self {
        Self::Ed25519(kp)
    }
}

impl From<secp256k1::KeyPair> for Material {
    fn from(kp: secp256k1::KeyPair) -> Self {
        Self::Secp256k1(kp)
    }
}

impl From<secp256r1::KeyPair> for Material {
    fn from(kp: secp256r1::KeyPair) -> Self {
        Self::Secp256r1(kp)
    }
}

impl From<rsa::KeyPair> for Material {
    fn from(kp: rsa::KeyPair) -> Self {
        Self::Rsa(kp)
    }
}

fn to_json(jwk: &Jwk) -> Result<String> {
    match serde_json::to_string(jwk) {
        Ok(json) => Ok(json),
        Err(e) => tracerr!(Err::SerializationError, "failed to serialize JWK: {e}"),
    }
}
