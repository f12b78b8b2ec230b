use base64ct::{Base64UrlUnpadded, Encoding};
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{pkcs1v15, pss, BigUint, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use super::{AsymmetricKey, KeyPair as KeyPairBehavior};
use crate::error::Err;
use crate::jwk::{decode_member, Jwk};
use crate::key_type::{JwsAlgorithm, KeyType, RSA_KEY_BITS};
use crate::{tracerr, Result};

/// Key pair for RSA.
pub type KeyPair = AsymmetricKey<RsaPublicKey, RsaPrivateKey>;

/// `KeyPair` implementation for RSA. Signs with RS256; verifies RS256 and PS256.
impl KeyPairBehavior for KeyPair {
    fn key_type() -> KeyType {
        KeyType::Rsa
    }

    fn generate() -> Result<Self> {
        let signing_key = match RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS) {
            Ok(sk) => sk,
            Err(e) => tracerr!(Err::UnsupportedKeyType, "error generating RSA key: {e}"),
        };
        Ok(Self {
            verifying_key: signing_key.to_public_key(),
            signing_key: Some(signing_key),
        })
    }

    fn from_jwk(jwk: &Jwk) -> Result<Self> {
        let n = BigUint::from_bytes_be(&decode_member(jwk.n.as_ref(), "n")?);
        let e = BigUint::from_bytes_be(&decode_member(jwk.e.as_ref(), "e")?);
        let verifying_key = match RsaPublicKey::new(n.clone(), e.clone()) {
            Ok(pk) => pk,
            Err(e) => tracerr!(Err::MalformedKey, "invalid RSA public key: {e}"),
        };
        if jwk.d.is_none() {
            return Ok(Self {
                verifying_key,
                signing_key: None,
            });
        }

        let d = BigUint::from_bytes_be(&decode_member(jwk.d.as_ref(), "d")?);
        let primes = if jwk.p.is_some() && jwk.q.is_some() {
            vec![
                BigUint::from_bytes_be(&decode_member(jwk.p.as_ref(), "p")?),
                BigUint::from_bytes_be(&decode_member(jwk.q.as_ref(), "q")?),
            ]
        } else {
            Vec::new()
        };
        let mut signing_key = match RsaPrivateKey::from_components(n, e, d, primes) {
            Ok(sk) => sk,
            Err(e) => tracerr!(Err::MalformedKey, "invalid RSA private key: {e}"),
        };
        if let Err(e) = signing_key.validate() {
            tracerr!(Err::MalformedKey, "RSA private key failed validation: {e}");
        }
        if let Err(e) = signing_key.precompute() {
            tracerr!(Err::MalformedKey, "RSA private key failed precomputation: {e}");
        }
        if signing_key.to_public_key() != verifying_key {
            tracerr!(Err::MalformedKey, "private key does not match public key n, e");
        }
        Ok(Self {
            verifying_key,
            signing_key: Some(signing_key),
        })
    }

    fn from_raw_public(bytes: &[u8]) -> Result<Self> {
        match RsaPublicKey::from_pkcs1_der(bytes) {
            Ok(verifying_key) => Ok(Self {
                verifying_key,
                signing_key: None,
            }),
            Err(e) => tracerr!(Err::MalformedKey, "invalid PKCS#1 RSA public key: {e}"),
        }
    }

    fn from_pem(pem: &str) -> Option<Self> {
        if let Ok(verifying_key) = RsaPublicKey::from_public_key_pem(pem) {
            return Some(Self {
                verifying_key,
                signing_key: None,
            });
        }
        let signing_key = RsaPrivateKey::from_pkcs8_pem(pem).ok()?;
        Some(Self {
            verifying_key: signing_key.to_public_key(),
            signing_key: Some(signing_key),
        })
    }

    fn to_jwk(&self, include_private: bool) -> Jwk {
        let mut jwk = Jwk {
            kty: Self::key_type().kty().to_string(),
            n: Some(encode(self.verifying_key.n())),
            e: Some(encode(self.verifying_key.e())),
            ..Jwk::default()
        };
        let Some(sk) = self.signing_key.as_ref().filter(|_| include_private) else {
            return jwk;
        };

        jwk.d = Some(encode(sk.d()));
        if let [p, q] = sk.primes() {
            jwk.p = Some(encode(p));
            jwk.q = Some(encode(q));
            jwk.dp = sk.dp().map(encode);
            jwk.dq = sk.dq().map(encode);
            jwk.qi = sk.crt_coefficient().as_ref().map(encode);
        }
        jwk
    }

    fn raw_public(&self) -> Result<Vec<u8>> {
        match self.verifying_key.to_pkcs1_der() {
            Ok(der) => Ok(der.as_bytes().to_vec()),
            Err(e) => tracerr!(Err::SerializationError, "error encoding RSA public key: {e}"),
        }
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
        let signer = pkcs1v15::SigningKey::<Sha256>::new(sk.clone());
        Ok(signer.sign(msg).to_vec())
    }

    fn verify(&self, alg: JwsAlgorithm, msg: &[u8], sig: &[u8]) -> Result<()> {
        let verified = if alg == JwsAlgorithm::Ps256 {
            let Ok(sig) = pss::Signature::try_from(sig) else {
                tracerr!(Err::InvalidSignature, "malformed PS256 signature");
            };
            pss::VerifyingKey::<Sha256>::new(self.verifying_key.clone()).verify(msg, &sig)
        } else {
            let Ok(sig) = pkcs1v15::Signature::try_from(sig) else {
                tracerr!(Err::InvalidSignature, "malformed RS256 signature");
            };
            pkcs1v15::VerifyingKey::<Sha256>::new(self.verifying_key.clone()).verify(msg, &sig)
        };
        match verified {
            Ok(()) => Ok(()),
            Err(e) => tracerr!(Err::InvalidSignature, "error verifying {alg} signature: {e}"),
        }
    }
}

fn encode(value: &BigUint) -> String {
    Base64UrlUnpadded::encode_string(&value.to_bytes_be())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_jwk_round_trip() {
        let key = KeyPair::generate().expect("should generate");
        let jwk = key.to_jwk(true);
        assert!(jwk.p.is_some() && jwk.qi.is_some());

        let imported = KeyPair::from_jwk(&jwk).expect("should import");
        let sig = imported.sign(b"round trip").expect("should sign");
        key.verify(JwsAlgorithm::Rs256, b"round trip", &sig).expect("should verify");
    }

    #[test]
    fn pss_verify() {
        let key = KeyPair::generate().expect("should generate");
        let Some(sk) = key.signing_key.clone() else {
            panic!("generated key has a private half");
        };
        let signer = pss::BlindedSigningKey::<Sha256>::new(sk);
        let sig = rsa::signature::RandomizedSigner::sign_with_rng(&signer, &mut OsRng, b"pss");

        key.verify(JwsAlgorithm::Ps256, b"pss", &sig.to_vec()).expect("should verify");
        let err = key.verify(JwsAlgorithm::Rs256, b"pss", &sig.to_vec()).expect_err("should fail");
        assert!(err.is(Err::InvalidSignature));
    }
}
