//! Tokens signed by the issuer verify against the registry's key set.

use serde_json::json;

use crate::e2e_tests::helpers::*;
use crate::issuer::{IssueError, TokenIssuer};
use crate::model::{JwtConfig, KeySetEntry};
use crate::verifier::{TokenVerifier, VerifyError};

fn config() -> JwtConfig {
    JwtConfig::default()
        .with_key("current", test_secret_key("current"))
        .with_key("previous", oct_key("previous"))
        .with_default_key("current")
        .with_key_set("default", KeySetEntry::composite(["previous", "current"]))
}

#[test]
fn test_issued_token_verifies() {
    let registry = test_registry(config());
    let issuer = TokenIssuer::from_registry(&registry).expect("issuer");
    let verifier = TokenVerifier::from_registry(&registry).expect("verifier");

    let token = issuer
        .issue("HS256", &json!({"sub": "user-1", "iat": NOW, "exp": NOW + 60}))
        .expect("issued");

    let claims = verifier.verify(&token).expect("verified");
    assert_eq!(claims["sub"], "user-1");
    // Same key the verifier's set picks up by kid.
    assert_eq!(key_id(issuer.key()), "current");
}

#[test]
fn test_issued_expired_token_is_rejected() {
    let registry = test_registry(config());
    let issuer = TokenIssuer::from_registry(&registry).expect("issuer");
    let verifier = TokenVerifier::from_registry(&registry).expect("verifier");

    let token = issuer.issue("HS256", &json!({"exp": NOW - 1})).expect("issued");

    assert!(matches!(verifier.verify(&token), Err(VerifyError::Claims(_))));
}

#[test]
fn test_issuer_and_verifier_share_the_algorithm_manager() {
    let registry = test_registry(config());
    let issuer = TokenIssuer::from_registry(&registry).expect("issuer");

    assert_eq!(
        issuer.issue("HS384", &json!({})),
        Err(IssueError::AlgorithmNotAllowed("HS384".to_string()))
    );
}
