//! Token verification over registry-provided components.

use std::sync::Arc;

use serde_json::json;

use crate::checker::{AlgorithmChecker, CheckerError};
use crate::context::ServiceContainer;
use crate::e2e_tests::helpers::*;
use crate::model::{Entry, HeaderProfile, JwtConfig, KeySetEntry};
use crate::registry::Registry;
use crate::time::FixedTimeSource;
use crate::verifier::{TokenVerifier, VerifyError};

/// Two keys in rotation: tokens are signed by "previous" with the test
/// secret, while "current" holds a different one.
fn rotation_config() -> JwtConfig {
    JwtConfig::default()
        .with_key("current", oct_key("current"))
        .with_key("previous", test_secret_key("previous"))
        .with_key_set("default", KeySetEntry::composite(["current", "previous"]))
}

fn verifier(config: JwtConfig) -> TokenVerifier {
    let registry = test_registry(config);
    TokenVerifier::from_registry(&registry).expect("verifier")
}

#[test]
fn test_token_signed_by_any_key_in_the_set() {
    let token = hs256_token(Some("previous"), &json!({"sub": "user-1", "iat": NOW}));

    let claims = verifier(rotation_config()).verify(&token).expect("verified");
    assert_eq!(claims["sub"], "user-1");
}

#[test]
fn test_kid_selects_the_key() {
    let token = hs256_token(Some("current"), &json!({"sub": "user-1"}));

    assert_eq!(
        verifier(rotation_config()).verify(&token),
        Err(VerifyError::InvalidSignature)
    );
}

#[test]
fn test_not_yet_valid_token() {
    let token = hs256_token(Some("previous"), &json!({"nbf": NOW + 600}));

    assert!(matches!(
        verifier(rotation_config()).verify(&token),
        Err(VerifyError::Claims(CheckerError::InvalidClaim { claim, .. })) if claim == "nbf"
    ));
}

#[test]
fn test_leeway_from_the_container() {
    let container = ServiceContainer::with_builtins(Arc::new(FixedTimeSource(NOW)), 30);
    let registry = Registry::new(rotation_config(), Arc::new(container));
    registry.register_all().expect("registered");
    let verifier = TokenVerifier::from_registry(&registry).expect("verifier");

    let token = hs256_token(Some("previous"), &json!({"exp": NOW - 10}));
    assert!(verifier.verify(&token).is_ok());

    let token = hs256_token(Some("previous"), &json!({"exp": NOW - 60}));
    assert!(matches!(verifier.verify(&token), Err(VerifyError::Claims(_))));
}

#[test]
fn test_header_profile_restricts_algorithms() {
    let config = rotation_config()
        .with_header_checker(
            "alg",
            Entry::Instance(Arc::new(AlgorithmChecker::new(["HS512"]))),
        )
        .with_header_profile("default", HeaderProfile::new(["alg"]));

    let token = hs256_token(Some("previous"), &json!({"sub": "user-1"}));
    assert!(matches!(
        verifier(config).verify(&token),
        Err(VerifyError::Header(CheckerError::InvalidHeader { .. }))
    ));
}

#[test]
fn test_verifier_without_key_set_fails_to_assemble() {
    let registry = test_registry(JwtConfig::default());

    assert!(TokenVerifier::from_registry(&registry).is_err());
}
