//! # Vercre Keys
//!
//! Backend-agnostic signing keys. A [`Key`] is either held in process ([`LocalKey`]) or by a
//! transit signing engine ([`RemoteKey`]); both sign and verify compact JWS the same way, export
//! JWKs and persist to one tagged JSON form.
//!
//! `did:web` DIDs resolve to keys through [`did::web::DidWebResolver`], which fetches the DID
//! document with an injected [`HttpFetch`] and imports the first usable verification-method
//! JWK.
//!
//! ```
//! use vercre_keys::{Key, KeyType};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let key = Key::generate(KeyType::Ed25519).expect("should generate");
//! let token = key.sign_jws(br#"{"sub":"alice"}"#).await.expect("should sign");
//!
//! let claims = key.public_key().verify_jws(&token).expect("should verify");
//! assert_eq!(claims["sub"], "alice");
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod did;
pub mod error;
pub mod jwk;
pub mod jws;
pub mod key;
pub mod key_type;
pub mod provider;
pub mod serialization;

pub use did::web::{did_from_url, did_web_url, DidWebResolver};
pub use did::{import_first_jwk, DidDocument, DidResolver};
pub use error::{Err, Error};
pub use jwk::Jwk;
pub use jws::JwsOptions;
pub use key::{Key, LocalKey, RemoteKey, TransitConfig};
pub use key_type::{JwsAlgorithm, KeyType};
pub use provider::{HttpFetch, HttpResponse};
pub use serialization::{deserialize_key, serialize_key, SerializedKey};

/// Result type for key operations.
pub type Result<T, E = error::Error> = core::result::Result<T, E>;
