//! Fixed keys and documents.

use serde_json::{json, Value};

/// RFC 8037 Ed25519 private key (appendix A.1).
pub const ED25519_PRIVATE_JWK: &str = r#"{"kty":"OKP","crv":"Ed25519","d":"nWGxne_9WmC6hEr0kuwsxERJxWl7MmkZcDusAxyuf2A","x":"11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"}"#;

/// RFC 8037 Ed25519 public key (appendix A.2).
pub const ED25519_PUBLIC_JWK: &str =
    r#"{"kty":"OKP","crv":"Ed25519","x":"11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"}"#;

/// RFC 7638 thumbprint of the RFC 8037 key (appendix A.3).
pub const ED25519_THUMBPRINT: &str = "kPrK_qmxVWaYVA9wwBF6Iuo3vVzz7TxHCTwXBygrS4k";

/// RFC 8037 signed token over "Example of Ed25519 signing" (appendix A.4).
pub const ED25519_TOKEN: &str = "eyJhbGciOiJFZERTQSJ9.RXhhbXBsZSBvZiBFZDI1NTE5IHNpZ25pbmc.hgyY0il_MGCjP0JzlnLWG1PPOt7-09PGcvMg3AIbQR6dWbhijcNR4ki4iylGjg5BhVsPt9g7sVvpAr_MuM0KAg";

/// P-256 private key.
pub const P256_PRIVATE_JWK: &str = r#"{"kty":"EC","crv":"P-256","x":"t6zdgizydQxtwHNp6LTzUMgOiqeowWfCvAeLI1gxfvE","y":"AcLDfTdTaN9oS2qSeIbCyglpRUi-UTjPy22QH6px6VQ","d":"4yMHII1HrhuFh3eDhDVHEYqf-cUbo9eMt3174LIwCc4"}"#;

/// Thumbprint of the P-256 key.
pub const P256_THUMBPRINT: &str = "BtOXhBQQF1Y1f7Wut3DOwNH4Mx2oEbMey9L3S9Uk-QA";

/// secp256k1 private key.
pub const SECP256K1_PRIVATE_JWK: &str = r#"{"kty":"EC","crv":"secp256k1","x":"zRVEERWgmXe2VKWVO_rHzDPO59i9R_wr0w0i9zKfiNM","y":"LzBPFXPWHP9jM2HR2TKNvngJGnP77ZiGsPFV1L7_1kA","d":"wMkDt74q3nwDTM-4NtnyHzaHMMdWpmt76NceGkw6pu8"}"#;

/// Thumbprint of the secp256k1 key.
pub const SECP256K1_THUMBPRINT: &str = "l10OVM4CuUkUsiTeRMsXHqheGSBQAOz_LJ5qIwGHnSo";

/// A transit key as persisted by earlier releases, with signed `_publicKey` bytes.
pub const HISTORIC_TSE_KEY: &str = r#"{"type":"tse","server":"http://127.0.0.1:8200/v1/transit","accessKey":"dev-only-token","id":"k-307668075","_publicKey":[-41,-105,-126,77,-74,88,-28,123,93,-81,105,-13,-93,-111,27,81,-90,-1,86,59,68,105,-108,118,-68,121,18,-114,71,-69,-106,-109],"_keyType":"Ed25519"}"#;

/// Thumbprint of the public key cached in [`HISTORIC_TSE_KEY`].
pub const HISTORIC_TSE_THUMBPRINT: &str = "ZoApcfvtOqFDbQodx-UeMG_xyZl8-1hOf04jy1HL_GY";

/// A DID document for `did` with one `JsonWebKey2020` verification method per entry. `None`
/// entries become methods without a `publicKeyJwk`.
///
/// # Panics
///
/// If a JWK is not valid JSON.
#[must_use]
pub fn did_document(did: &str, jwks: &[Option<&str>]) -> Value {
    let methods: Vec<Value> = jwks
        .iter()
        .enumerate()
        .map(|(index, jwk)| {
            let mut method = json!({
                "id": format!("{did}#key-{index}"),
                "type": "JsonWebKey2020",
                "controller": did,
            });
            if let Some(jwk) = jwk {
                let jwk: Value = serde_json::from_str(jwk).expect("fixture JWK is JSON");
                method["publicKeyJwk"] = jwk;
            }
            method
        })
        .collect();

    json!({
        "@context": [
            "https://www.w3.org/ns/did/v1",
            "https://w3id.org/security/suites/jws-2020/v1"
        ],
        "id": did,
        "verificationMethod": methods,
        "assertionMethod": [format!("{did}#key-0")],
    })
}
