//! Defaults resolve to the same instances as naming them explicitly.

use std::sync::Arc;

use crate::component::DomainKind;
use crate::e2e_tests::helpers::*;
use crate::error::RegistryError;
use crate::model::{ClaimProfile, HeaderProfile, JwtConfig, KeySetEntry};

#[test]
fn test_default_key_equals_named_key() {
    let config = JwtConfig::default()
        .with_key("signing", oct_key("signing"))
        .with_key("legacy", oct_key("legacy"))
        .with_default_key("signing");
    let registry = test_registry(config);

    let default = registry.default_key().expect("default");
    let named = registry.key("signing").expect("named");
    assert!(Arc::ptr_eq(&default, &named));
    assert_eq!(key_id(&default), "signing");
}

#[test]
fn test_default_key_set_equals_named_key_set() {
    let config = JwtConfig::default()
        .with_key("signing", oct_key("signing"))
        .with_key_set("primary", KeySetEntry::composite(["signing"]))
        .with_default_key_set("primary");
    let registry = test_registry(config);

    let default = registry.default_key_set().expect("default");
    let named = registry.key_set("primary").expect("named");
    assert!(Arc::ptr_eq(&default, &named));
}

#[test]
fn test_default_profiles_equal_named_profiles() {
    let config = JwtConfig::default()
        .with_claim_profile("expiry", ClaimProfile::new(["exp"]))
        .with_default_claim_profile("expiry")
        .with_header_profile("bare", HeaderProfile::default())
        .with_default_header_profile("bare");
    let registry = test_registry(config);

    let default = registry.default_claim_checker_manager().expect("default");
    let named = registry.claim_checker_manager("expiry").expect("named");
    assert!(Arc::ptr_eq(&default, &named));
    assert_eq!(default.checkers().len(), 1);

    let default = registry.default_header_checker_manager().expect("default");
    let named = registry.header_checker_manager("bare").expect("named");
    assert!(Arc::ptr_eq(&default, &named));
}

#[test]
fn test_default_naming_nothing_fails_on_access() {
    let config = JwtConfig::default()
        .with_key("signing", oct_key("signing"))
        .with_default_key("missing");
    let registry = test_registry(config);

    assert_eq!(
        registry.default_key().err(),
        Some(RegistryError::KeyNotFound {
            domain: DomainKind::Key,
            alias: "missing".to_string(),
        })
    );
    // The rest of the wiring is unaffected.
    assert!(registry.key("signing").is_ok());
}
