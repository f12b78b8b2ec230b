//! ECDSA key pairs. secp256k1 and P-256 share one implementation, instantiated per curve crate.

/// Implements `KeyPair` for an ECDSA curve crate (`k256`, `p256`) in a module of its own.
macro_rules! ec_key_pair {
    ($module:ident, $curve:ident, $key_type:ident, $name:literal) => {
        pub mod $module {
            use base64ct::{Base64UrlUnpadded, Encoding};
            use ecdsa::signature::{Signer, Verifier};
            use $curve::ecdsa::{Signature, SigningKey, VerifyingKey};
            use $curve::pkcs8::{DecodePrivateKey, DecodePublicKey};
            use $curve::{PublicKey, SecretKey};
            use rand::rngs::OsRng;

            use crate::error::Err;
            use crate::jwk::{decode_member, Jwk};
            use crate::key::local::{AsymmetricKey, KeyPair as KeyPairBehavior};
            use crate::key_type::{JwsAlgorithm, KeyType};
            use crate::{tracerr, Result};

            /// Length of a fixed-width `r||s` signature.
            const SIGNATURE_LEN: usize = 64;

            #[doc = concat!("Key pair for ", $name, ".")]
            pub type KeyPair = AsymmetricKey<VerifyingKey, SigningKey>;

            impl KeyPairBehavior for KeyPair {
                fn key_type() -> KeyType {
                    KeyType::$key_type
                }

                fn generate() -> Result<Self> {
                    let signing_key = SigningKey::random(&mut OsRng);
                    Ok(Self {
                        verifying_key: *signing_key.verifying_key(),
                        signing_key: Some(signing_key),
                    })
                }

                fn from_jwk(jwk: &Jwk) -> Result<Self> {
                    let x = decode_member(jwk.x.as_ref(), "x")?;
                    let y = decode_member(jwk.y.as_ref(), "y")?;
                    if x.len() != 32 || y.len() != 32 {
                        tracerr!(
                            Err::MalformedKey,
                            "invalid coordinate length. Expected 32 bytes, got x: {}, y: {}",
                            x.len(),
                            y.len()
                        );
                    }
                    let sec1 = [&[0x04], x.as_slice(), y.as_slice()].concat();
                    let Self { verifying_key, .. } = Self::from_raw_public(&sec1)?;
                    if jwk.d.is_none() {
                        return Ok(Self {
                            verifying_key,
                            signing_key: None,
                        });
                    }

                    let d = decode_member(jwk.d.as_ref(), "d")?;
                    let signing_key = match SigningKey::from_slice(&d) {
                        Ok(sk) => sk,
                        Err(e) => tracerr!(
                            Err::MalformedKey,
                            "invalid {} private key: {e}",
                            Self::key_type()
                        ),
                    };
                    if *signing_key.verifying_key() != verifying_key {
                        tracerr!(Err::MalformedKey, "private key d does not match public key x, y");
                    }
                    Ok(Self {
                        verifying_key,
                        signing_key: Some(signing_key),
                    })
                }

                fn from_raw_public(bytes: &[u8]) -> Result<Self> {
                    match VerifyingKey::from_sec1_bytes(bytes) {
                        Ok(verifying_key) => Ok(Self {
                            verifying_key,
                            signing_key: None,
                        }),
                        Err(e) => tracerr!(
                            Err::MalformedKey,
                            "error forming verifying key from public key parts: {e}"
                        ),
                    }
                }

                fn from_pem(pem: &str) -> Option<Self> {
                    if let Ok(public_key) = PublicKey::from_public_key_pem(pem) {
                        return Some(Self {
                            verifying_key: public_key.into(),
                            signing_key: None,
                        });
                    }
                    let signing_key = SigningKey::from(SecretKey::from_pkcs8_pem(pem).ok()?);
                    Some(Self {
                        verifying_key: *signing_key.verifying_key(),
                        signing_key: Some(signing_key),
                    })
                }

                fn to_jwk(&self, include_private: bool) -> Jwk {
                    let point = self.verifying_key.to_encoded_point(false);
                    let d = if include_private {
                        self.signing_key
                            .as_ref()
                            .map(|sk| Base64UrlUnpadded::encode_string(&sk.to_bytes()))
                    } else {
                        None
                    };
                    Jwk {
                        kty: Self::key_type().kty().to_string(),
                        crv: Self::key_type().curve().map(ToString::to_string),
                        x: point.x().map(|x| Base64UrlUnpadded::encode_string(x)),
                        y: point.y().map(|y| Base64UrlUnpadded::encode_string(y)),
                        d,
                        ..Jwk::default()
                    }
                }

                fn raw_public(&self) -> Result<Vec<u8>> {
                    Ok(self.verifying_key.to_encoded_point(false).as_bytes().to_vec())
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
                    let sig: Signature = sk.sign(msg);
                    Ok(sig.to_bytes().to_vec())
                }

                fn verify(&self, _: JwsAlgorithm, msg: &[u8], sig: &[u8]) -> Result<()> {
                    if sig.len() != SIGNATURE_LEN {
                        tracerr!(
                            Err::InvalidSignature,
                            "signature must be {SIGNATURE_LEN} bytes, got {}",
                            sig.len()
                        );
                    }
                    let sig = match Signature::from_slice(sig) {
                        Ok(sig) => sig,
                        Err(e) => tracerr!(
                            Err::InvalidSignature,
                            "error forming signature from slice: {e}"
                        ),
                    };
                    match self.verifying_key.verify(msg, &sig) {
                        Ok(()) => Ok(()),
                        Err(e) => tracerr!(Err::InvalidSignature, "error verifying signature: {e}"),
                    }
                }
            }
        }
    };
}

ec_key_pair!(secp256k1, k256, Secp256k1, "secp256k1");
ec_key_pair!(secp256r1, p256, Secp256r1, "NIST P-256 (secp256r1)");

#[cfg(test)]
mod tests {
    use super::{secp256k1, secp256r1};
    use crate::error::Err;
    use crate::jwk::Jwk;
    use crate::key::local::KeyPair;
    use crate::key_type::{JwsAlgorithm, KeyType};

    fn short_coordinate(key_type: KeyType) -> Jwk {
        Jwk {
            kty: "EC".to_string(),
            crv: key_type.curve().map(ToString::to_string),
            x: Some("AAAA".to_string()),
            y: Some("AAAA".to_string()),
            ..Jwk::default()
        }
    }

    #[test]
    fn curves_stay_apart() {
        let k1 = secp256k1::KeyPair::generate().expect("should generate");
        let r1 = secp256r1::KeyPair::generate().expect("should generate");
        assert_eq!(k1.to_jwk(false).crv.as_deref(), Some("secp256k1"));
        assert_eq!(r1.to_jwk(false).crv.as_deref(), Some("P-256"));

        let raw = r1.raw_public().expect("should encode");
        let restored = secp256r1::KeyPair::from_raw_public(&raw).expect("should decode");
        assert_eq!(restored.to_jwk(false), r1.to_jwk(false));

        let sig = k1.sign(b"msg").expect("should sign");
        assert_eq!(sig.len(), 64);
        k1.verify(JwsAlgorithm::Es256K, b"msg", &sig).expect("should verify");
        let err = k1.verify(JwsAlgorithm::Es256K, b"other", &sig).expect_err("should fail");
        assert!(err.is(Err::InvalidSignature));
    }

    #[test]
    fn short_coordinates() {
        let err = secp256k1::KeyPair::from_jwk(&short_coordinate(KeyType::Secp256k1))
            .err()
            .expect("should fail");
        assert!(err.is(Err::MalformedKey));
        let err = secp256r1::KeyPair::from_jwk(&short_coordinate(KeyType::Secp256r1))
            .err()
            .expect("should fail");
        assert!(err.is(Err::MalformedKey));
    }
}
