//! Keys and key sets.
//!
//! Keys are `jsonwebtoken` JWKs shared behind `Arc`, so a key set built from
//! configured aliases holds the very same key objects the registry hands out
//! under those aliases.
//!
//! # Invariants
//! - `KeySet` preserves the order its keys were given in.
//! - `KeySet` is immutable once built.

mod composer;

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use rand::RngCore;

use crate::algorithm::{Algorithm, KeyFamily};

pub use composer::{KeyLookup, compose_key_set};

/// An ordered, immutable collection of keys.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: Vec<Arc<Jwk>>,
}

impl KeySet {
    #[must_use]
    pub const fn new(keys: Vec<Arc<Jwk>>) -> Self {
        Self { keys }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arc<Jwk>> {
        self.keys.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Jwk>> {
        self.keys.iter()
    }

    /// The first key whose `kid` equals `kid`.
    #[must_use]
    pub fn find_by_kid(&self, kid: &str) -> Option<&Arc<Jwk>> {
        self.keys
            .iter()
            .find(|key| key.common.key_id.as_deref() == Some(kid))
    }

    /// The first key usable with `algorithm`.
    #[must_use]
    pub fn select_for(&self, algorithm: &dyn Algorithm) -> Option<&Arc<Jwk>> {
        let family = algorithm.family();
        self.keys.iter().find(|key| key_family(key) == family)
    }

    /// A serializable copy of the set.
    #[must_use]
    pub fn to_jwk_set(&self) -> JwkSet {
        JwkSet {
            keys: self.keys.iter().map(|key| Jwk::clone(key)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a KeySet {
    type Item = &'a Arc<Jwk>;
    type IntoIter = std::slice::Iter<'a, Arc<Jwk>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

/// The key family of a JWK, taken from its `kty`.
#[must_use]
pub const fn key_family(jwk: &Jwk) -> KeyFamily {
    match &jwk.algorithm {
        AlgorithmParameters::OctetKey(_) => KeyFamily::Octet,
        AlgorithmParameters::RSA(_) => KeyFamily::Rsa,
        AlgorithmParameters::EllipticCurve(_) => KeyFamily::EllipticCurve,
        AlgorithmParameters::OctetKeyPair(_) => KeyFamily::OctetKeyPair,
    }
}

/// The raw secret of an `oct` key, or `None` for other keys and for a `k`
/// that is not base64url.
#[must_use]
pub fn oct_secret(jwk: &Jwk) -> Option<Vec<u8>> {
    match &jwk.algorithm {
        AlgorithmParameters::OctetKey(params) => URL_SAFE_NO_PAD
            .decode(params.value.trim_end_matches('='))
            .ok(),
        _ => None,
    }
}

/// Build a symmetric `oct` JWK from raw secret bytes.
///
/// # Errors
/// Returns the `serde_json` error if the JWK cannot be built.
pub fn oct_jwk(kid: &str, secret: &[u8]) -> Result<Jwk, serde_json::Error> {
    serde_json::from_value(serde_json::json!({
        "kty": "oct",
        "kid": kid,
        "k": URL_SAFE_NO_PAD.encode(secret),
    }))
}

/// Build an `oct` JWK holding `len` freshly drawn random bytes.
///
/// # Errors
/// Returns the `serde_json` error if the JWK cannot be built.
pub fn generate_oct_jwk(kid: &str, len: usize) -> Result<Jwk, serde_json::Error> {
    let mut secret = vec![0u8; len];
    rand::rng().fill_bytes(&mut secret);
    oct_jwk(kid, &secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::JwsAlgorithm;

    fn rsa_key(kid: &str) -> Jwk {
        serde_json::from_value(serde_json::json!({
            "kty": "RSA",
            "kid": kid,
            "n": "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw",
            "e": "AQAB",
        }))
        .expect("valid rsa jwk")
    }

    #[test]
    fn test_oct_jwk_encodes_secret() {
        let jwk = oct_jwk("k1", b"secret").expect("valid");

        assert_eq!(jwk.common.key_id.as_deref(), Some("k1"));
        match &jwk.algorithm {
            AlgorithmParameters::OctetKey(params) => assert_eq!(params.value, "c2VjcmV0"),
            other => panic!("expected oct key, got {other:?}"),
        }
    }

    #[test]
    fn test_oct_secret_round_trips() {
        let jwk = oct_jwk("k1", b"any length secret").expect("valid");
        assert_eq!(oct_secret(&jwk), Some(b"any length secret".to_vec()));

        let padded: Jwk = serde_json::from_value(serde_json::json!({
            "kty": "oct",
            "k": "c2VjcmV0MQ==",
        }))
        .expect("valid");
        assert_eq!(oct_secret(&padded), Some(b"secret1".to_vec()));
    }

    #[test]
    fn test_generate_oct_jwk_is_random() {
        let a = generate_oct_jwk("a", 32).expect("valid");
        let b = generate_oct_jwk("b", 32).expect("valid");

        match (&a.algorithm, &b.algorithm) {
            (AlgorithmParameters::OctetKey(a), AlgorithmParameters::OctetKey(b)) => {
                // 32 bytes -> 43 base64url characters without padding
                assert_eq!(a.value.len(), 43);
                assert_ne!(a.value, b.value);
            }
            _ => panic!("expected oct keys"),
        }
    }

    #[test]
    fn test_key_set_preserves_order_and_identity() {
        let first = Arc::new(oct_jwk("first", b"one").expect("valid"));
        let second = Arc::new(oct_jwk("second", b"two").expect("valid"));
        let set = KeySet::new(vec![Arc::clone(&first), Arc::clone(&second)]);

        assert_eq!(set.len(), 2);
        assert!(Arc::ptr_eq(set.get(0).expect("first"), &first));
        assert!(Arc::ptr_eq(set.get(1).expect("second"), &second));
        let kids: Vec<_> = set.iter().filter_map(|k| k.common.key_id.clone()).collect();
        assert_eq!(kids, vec!["first", "second"]);
    }

    #[test]
    fn test_find_by_kid() {
        let set = KeySet::new(vec![
            Arc::new(oct_jwk("a", b"one").expect("valid")),
            Arc::new(oct_jwk("b", b"two").expect("valid")),
        ]);

        assert!(set.find_by_kid("b").is_some());
        assert!(set.find_by_kid("c").is_none());
    }

    #[test]
    fn test_select_for_picks_first_compatible_key() {
        let set = KeySet::new(vec![
            Arc::new(rsa_key("rsa")),
            Arc::new(oct_jwk("hmac-1", b"one").expect("valid")),
            Arc::new(oct_jwk("hmac-2", b"two").expect("valid")),
        ]);

        let hs256 = JwsAlgorithm::new(jsonwebtoken::Algorithm::HS256);
        let rs256 = JwsAlgorithm::new(jsonwebtoken::Algorithm::RS256);
        let es256 = JwsAlgorithm::new(jsonwebtoken::Algorithm::ES256);

        let picked = set.select_for(&hs256).expect("oct key");
        assert_eq!(picked.common.key_id.as_deref(), Some("hmac-1"));
        let picked = set.select_for(&rs256).expect("rsa key");
        assert_eq!(picked.common.key_id.as_deref(), Some("rsa"));
        assert!(set.select_for(&es256).is_none());
    }

    #[test]
    fn test_to_jwk_set() {
        let set = KeySet::new(vec![Arc::new(oct_jwk("a", b"one").expect("valid"))]);
        let jwks = set.to_jwk_set();

        assert_eq!(jwks.keys.len(), 1);
        assert!(jwks.find("a").is_some());
    }
}
