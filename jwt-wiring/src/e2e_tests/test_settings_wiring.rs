//! Binary settings reach the components built from the default configuration.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::checker::CheckerError;
use crate::config::WiringSettings;
use crate::context::ServiceContainer;
use crate::e2e_tests::helpers::*;
use crate::issuer::TokenIssuer;
use crate::registry::Registry;
use crate::time::FixedTimeSource;
use crate::verifier::TokenVerifier;

fn registry(settings: &WiringSettings) -> Registry {
    let config = settings.load_config().expect("config");
    let container =
        ServiceContainer::with_builtins(Arc::new(FixedTimeSource(NOW)), settings.leeway_secs);
    let registry = Registry::new(config, Arc::new(container));
    registry.register_all().expect("registered");
    registry
}

fn claims(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected a JSON object"),
    }
}

#[test]
fn test_leeway_reaches_default_claim_checkers() {
    let settings = WiringSettings {
        leeway_secs: 60,
        ..WiringSettings::default()
    };
    let manager = registry(&settings)
        .default_claim_checker_manager()
        .expect("manager");

    let checked = manager
        .check(&claims(json!({"exp": NOW - 10, "nbf": NOW + 30})), &[] as &[&str])
        .expect("within leeway");
    assert_eq!(checked, vec!["nbf", "exp"]);

    assert!(matches!(
        manager.check(&claims(json!({"exp": NOW - 61})), &[] as &[&str]),
        Err(CheckerError::InvalidClaim { claim, .. }) if claim == "exp"
    ));
}

#[test]
fn test_default_claim_checkers_read_the_container_clock() {
    let manager = registry(&WiringSettings::default())
        .default_claim_checker_manager()
        .expect("manager");

    // Valid by the fixed clock, long expired by the system clock.
    assert!(manager.check(&claims(json!({"exp": NOW + 1})), &[] as &[&str]).is_ok());
    assert!(manager.check(&claims(json!({"exp": NOW})), &[] as &[&str]).is_err());
}

#[test]
fn test_secret_round_trip() {
    let settings = WiringSettings {
        hs256_secret: Some("any-length secret!".to_string()),
        ..WiringSettings::default()
    };
    let registry = registry(&settings);

    let issuer = TokenIssuer::from_registry(&registry).expect("issuer");
    let verifier = TokenVerifier::from_registry(&registry).expect("verifier");

    let token = issuer
        .issue("HS256", &json!({"sub": "user-1", "exp": NOW + 60}))
        .expect("issued");
    let verified = verifier.verify(&token).expect("verified");
    assert_eq!(verified["sub"], "user-1");
}
