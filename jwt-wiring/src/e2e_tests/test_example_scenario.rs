//! Two keys, a default key and a composite default key set.

use std::sync::Arc;

use jsonwebtoken::jwk::Jwk;

use crate::e2e_tests::helpers::*;
use crate::model::{Entry, JwtConfig, KeySetEntry};
use crate::registry::Namespace;

fn example_config() -> (Arc<Jwk>, Arc<Jwk>, JwtConfig) {
    let instance_a = Arc::new(oct_key("A"));
    let instance_b = Arc::new(oct_key("B"));
    let config = JwtConfig::default()
        .with_key("k1", Entry::Instance(Arc::clone(&instance_a)))
        .with_key("k2", Entry::Instance(Arc::clone(&instance_b)))
        .with_default_key("k1")
        .with_key_set("default", KeySetEntry::composite(["k1", "k2"]));
    (instance_a, instance_b, config)
}

#[test]
fn test_default_key_is_k1() {
    let (instance_a, _, config) = example_config();
    let registry = test_registry(config);

    let key = registry.default_key().expect("default key");
    assert!(Arc::ptr_eq(&key, &instance_a));
}

#[test]
fn test_named_key_is_k2() {
    let (_, instance_b, config) = example_config();
    let registry = test_registry(config);

    let key = registry.key("k2").expect("k2");
    assert!(Arc::ptr_eq(&key, &instance_b));
    assert_eq!(key_id(&key), "B");
}

#[test]
fn test_key_set_holds_both_keys_in_order() {
    let (instance_a, instance_b, config) = example_config();
    let registry = test_registry(config);

    let set = registry.default_key_set().expect("key set");

    assert_eq!(set.len(), 2);
    assert!(Arc::ptr_eq(set.get(0).expect("first"), &instance_a));
    assert!(Arc::ptr_eq(set.get(1).expect("second"), &instance_b));
}

#[test]
fn test_key_set_members_are_the_registry_keys() {
    let (_, _, config) = example_config();
    let registry = test_registry(config);

    // Key set first, so the keys are materialized through it.
    let set = registry.default_key_set().expect("key set");
    assert!(registry.is_materialized(Namespace::Key, "k1"));
    assert!(registry.is_materialized(Namespace::Key, "k2"));

    assert!(Arc::ptr_eq(set.get(0).expect("first"), &registry.key("k1").expect("k1")));
    assert!(Arc::ptr_eq(set.get(1).expect("second"), &registry.key("k2").expect("k2")));
}

#[test]
fn test_repeated_gets_return_the_same_instances() {
    let (_, _, config) = example_config();
    let registry = test_registry(config);

    let first = registry.default_key_set().expect("key set");
    let second = registry.key_set("default").expect("key set");
    assert!(Arc::ptr_eq(&first, &second));

    let first = registry.default_claim_checker_manager().expect("manager");
    let second = registry.default_claim_checker_manager().expect("manager");
    assert!(Arc::ptr_eq(&first, &second));
}
