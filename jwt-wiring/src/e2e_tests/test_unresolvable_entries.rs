//! Entries matching no resolution strategy fail loudly.

use std::sync::Arc;

use crate::component::{Component, DomainKind};
use crate::e2e_tests::helpers::*;
use crate::error::RegistryError;
use crate::model::{Entry, JwtConfig, KeySetEntry};

#[test]
fn test_unknown_service_key() {
    let registry = test_registry(JwtConfig::empty().with_key("k1", Entry::service("vault.missing")));

    assert_eq!(
        registry.key("k1").err(),
        Some(RegistryError::Unresolvable {
            domain: DomainKind::Key,
            alias: "k1".to_string(),
            member: None,
        })
    );
}

#[test]
fn test_unknown_name_in_key_set_names_the_member() {
    let config = JwtConfig::empty()
        .with_key("k1", oct_key("k1"))
        .with_key_set("default", KeySetEntry::composite(["k1", "k3"]));
    let registry = test_registry(config);

    assert_eq!(
        registry.default_key_set().err(),
        Some(RegistryError::Unresolvable {
            domain: DomainKind::KeySet,
            alias: "default".to_string(),
            member: Some(1),
        })
    );
}

#[test]
fn test_service_of_another_domain_is_a_type_mismatch() {
    // "HS256" is an algorithm in the test container, not a key.
    let registry = test_registry(JwtConfig::empty().with_key("k1", Entry::service("HS256")));

    assert_eq!(
        registry.key("k1").err(),
        Some(RegistryError::TypeMismatch {
            domain: DomainKind::Key,
            alias: "k1".to_string(),
            member: None,
            found: DomainKind::Algorithm,
        })
    );
}

#[test]
fn test_key_set_member_from_the_container() {
    let mut container = test_container();
    container.insert("vault.backup", Component::key(oct_key("backup")));
    let config = JwtConfig::empty()
        .with_key("k1", oct_key("k1"))
        .with_key_set("default", KeySetEntry::composite(["k1", "vault.backup"]));
    let registry = crate::registry::Registry::new(config, Arc::new(container));
    registry.register_all().expect("registered");

    let set = registry.default_key_set().expect("key set");
    let kids: Vec<&str> = set.iter().map(|key| key_id(key)).collect();
    assert_eq!(kids, vec!["k1", "backup"]);
}

#[test]
fn test_unknown_algorithm_service() {
    let config = JwtConfig::default().with_algorithm("XS256", Entry::service("XS256"));
    let registry = test_registry(config);

    assert_eq!(
        registry.algorithm_manager().err(),
        Some(RegistryError::Unresolvable {
            domain: DomainKind::Algorithm,
            alias: "XS256".to_string(),
            member: None,
        })
    );
}
