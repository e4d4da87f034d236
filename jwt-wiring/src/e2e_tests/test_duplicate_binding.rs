//! Re-registering an alias is rejected and leaves the original intact.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::e2e_tests::helpers::*;
use crate::error::RegistryError;
use crate::model::{JwtConfig, KeySetEntry};
use crate::registry::Namespace;

#[test]
fn test_duplicate_key_binding() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = JwtConfig::empty().with_key("k1", counting_key_factory("k1", &calls));
    let registry = test_registry(config);
    let original = registry.key("k1").expect("key");

    assert_eq!(
        registry.register(Namespace::Key, "k1"),
        Err(RegistryError::DuplicateBinding("key#k1".to_string()))
    );

    let again = registry.key("k1").expect("key");
    assert!(Arc::ptr_eq(&original, &again));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_duplicate_before_materialization() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = JwtConfig::empty().with_key("k1", counting_key_factory("k1", &calls));
    let registry = test_registry(config);

    assert!(registry.register(Namespace::Key, "k1").is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(registry.key("k1").is_ok());
}

#[test]
fn test_same_alias_in_different_namespaces_is_not_a_duplicate() {
    let config = JwtConfig::empty()
        .with_key("default", oct_key("default"))
        .with_key_set("default", KeySetEntry::composite(["default"]));
    let registry = test_registry(config);

    assert_eq!(
        registry.bindings().expect("bindings"),
        vec!["key#default", "keyset#default"]
    );
}

#[test]
fn test_register_all_twice() {
    let registry = test_registry(JwtConfig::default());

    assert_eq!(
        registry.register_all(),
        Err(RegistryError::DuplicateBinding(
            "header-checker#default".to_string()
        ))
    );
}
