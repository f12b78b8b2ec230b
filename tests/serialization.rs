//! Persisted key compatibility.

use serde_json::Value;
use test_utils::fixtures::{
    ED25519_PRIVATE_JWK, HISTORIC_TSE_KEY, HISTORIC_TSE_THUMBPRINT, P256_PRIVATE_JWK,
};
use vercre_keys::{deserialize_key, serialize_key, Err, Key, KeyType, SerializedKey};

// A transit key persisted by an earlier release restores offline with its ID and type.
#[test]
fn historic_transit_key() {
    let key = Key::deserialize(HISTORIC_TSE_KEY).expect("should restore without network");
    assert!(matches!(key, Key::Remote(_)));
    assert_eq!(key.key_id(), "k-307668075");
    assert_eq!(key.key_type(), KeyType::Ed25519);
    assert_eq!(key.public_key().key_id(), HISTORIC_TSE_THUMBPRINT);
    assert!(!format!("{key:?}").contains("dev-only-token"));
}

// A restored key signs tokens the original verifies, and the other way round.
#[tokio::test]
async fn restored_keys_interoperate() {
    for key_type in KeyType::ALL {
        let original = Key::generate(key_type).expect("should generate");
        let restored = deserialize_key(&serialize_key(&original).unwrap()).expect("should restore");

        assert_eq!(restored.key_type(), original.key_type());
        assert_eq!(restored.key_id(), original.key_id());
        assert_eq!(restored.has_private_key(), original.has_private_key());

        let token = restored.sign_jws(br#"{"value1":"123456789"}"#).await.expect("should sign");
        assert_eq!(original.verify_jws(&token).unwrap()["value1"], "123456789");

        let token = original.sign_jws(br#"{"value1":"123456789"}"#).await.expect("should sign");
        assert_eq!(restored.verify_jws(&token).unwrap()["value1"], "123456789");
    }
}

#[test]
fn explicit_kid_survives() {
    let jwk = P256_PRIVATE_JWK.replace(r#""kty""#, r#""kid":"did:web:example.com#key-0","kty""#);
    let key = Key::import_jwk(&jwk).expect("should import");
    assert_eq!(key.key_id(), "did:web:example.com#key-0");

    let restored = Key::deserialize(&key.serialize().unwrap()).expect("should restore");
    assert_eq!(restored.key_id(), "did:web:example.com#key-0");
}

#[test]
fn local_form() {
    let key = Key::import_jwk(ED25519_PRIVATE_JWK).expect("should import");
    let json: Value = serde_json::from_str(&key.serialize().unwrap()).unwrap();

    assert_eq!(json["type"], "jwk");
    assert_eq!(json["_keyType"], "Ed25519");
    assert_eq!(json["d"], "nWGxne_9WmC6hEr0kuwsxERJxWl7MmkZcDusAxyuf2A");
    assert_eq!(json["_publicKey"].as_array().map(Vec::len), Some(32));

    let serialized: SerializedKey = serde_json::from_value(json).expect("typed form");
    assert!(matches!(serialized, SerializedKey::Jwk { key_type: KeyType::Ed25519, .. }));
}

#[test]
fn rejects_unknown_and_malformed() {
    let err = Key::deserialize(r#"{"type":"pkcs11","slot":0}"#).expect_err("should fail");
    assert!(err.is(Err::UnknownKeyBackend));

    let err = Key::deserialize(r#"{"type":"tse","server":"http://localhost"}"#)
        .expect_err("should fail");
    assert!(err.is(Err::MalformedKey));

    let truncated = HISTORIC_TSE_KEY.replace("[-41,-105,", "[");
    let err = Key::deserialize(&truncated).expect_err("should fail");
    assert!(err.is(Err::MalformedKey));
}
