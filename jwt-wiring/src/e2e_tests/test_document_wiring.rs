//! A JSON configuration document wired through the registry.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::checker::{AlgorithmChecker, CheckerError};
use crate::component::Component;
use crate::e2e_tests::helpers::*;
use crate::model::ConfigDocument;
use crate::registry::Registry;
use crate::verifier::TokenVerifier;

fn document() -> String {
    let primary = serde_json::to_value(test_secret_key("primary")).expect("jwk");
    let backup = serde_json::to_value(oct_key("backup")).expect("jwk");
    json!({
        "algorithms": { "HS256": "HS256", "HS512": "HS512" },
        "keys": {
            "primary": primary,
            "signing": "vault.signing"
        },
        "keysets": { "default": ["primary", backup, "signing"] },
        "checkers": {
            "token_types": ["jws"],
            "header_checkers": { "alg": "checker.alg" },
            "claim_checkers": { "exp": "exp", "iat": "iat" },
            "headers": { "strict": { "headers": ["alg"] } },
            "claims": { "default": { "claims": ["exp", "nbf"] } }
        },
        "default_checker_header": "strict"
    })
    .to_string()
}

fn registry() -> Registry {
    let config = ConfigDocument::from_json(&document())
        .expect("valid document")
        .into_config();
    let mut container = test_container();
    container.insert("vault.signing", Component::key(oct_key("signing")));
    container.insert(
        "checker.alg",
        Component::header_checker(AlgorithmChecker::new(["HS256"])),
    );
    let registry = Registry::new(config, Arc::new(container));
    registry.register_all().expect("registered");
    registry
}

fn header(alg: &str) -> Map<String, Value> {
    let mut header = Map::new();
    header.insert("alg".to_string(), Value::from(alg));
    header
}

#[test]
fn test_document_bindings() {
    assert_eq!(
        registry().bindings().expect("bindings"),
        vec![
            "claim-checker#default",
            "header-checker#strict",
            "key#primary",
            "key#signing",
            "keyset#default",
        ]
    );
}

#[test]
fn test_document_keys_and_key_set() {
    let registry = registry();

    assert_eq!(key_id(&registry.key("signing").expect("service key")), "signing");

    let set = registry.default_key_set().expect("key set");
    let kids: Vec<&str> = set.iter().map(|key| key_id(key)).collect();
    assert_eq!(kids, vec!["primary", "backup", "signing"]);
    assert!(Arc::ptr_eq(
        set.get(0).expect("first member"),
        &registry.key("primary").expect("key")
    ));
}

#[test]
fn test_document_algorithms_replace_defaults() {
    let manager = registry().algorithm_manager().expect("algorithms");
    assert_eq!(manager.names(), vec!["HS256", "HS512"]);
}

#[test]
fn test_document_header_profile() {
    let manager = registry().default_header_checker_manager().expect("manager");

    assert_eq!(manager.checkers().len(), 1);
    assert_eq!(manager.token_types().len(), 1);
    assert!(manager.check(&header("HS256")).is_ok());
    assert!(matches!(
        manager.check(&header("HS512")),
        Err(CheckerError::InvalidHeader { .. })
    ));
}

#[test]
fn test_document_claim_profile_mixes_aliases_and_services() {
    let manager = registry().default_claim_checker_manager().expect("manager");

    let claims: Vec<&str> = manager
        .checkers()
        .iter()
        .map(|checker| checker.supported_claim())
        .collect();
    assert_eq!(claims, vec!["exp", "nbf"]);
}

#[test]
fn test_document_driven_verification() {
    let registry = registry();
    let verifier = TokenVerifier::from_registry(&registry).expect("verifier");

    let token = hs256_token(Some("primary"), &json!({"sub": "user-1", "exp": NOW + 60}));
    let claims = verifier.verify(&token).expect("verified");
    assert_eq!(claims["sub"], "user-1");
}
