//! A failed construction reaches every waiter and can be retried.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::context::Factory;
use crate::e2e_tests::helpers::*;
use crate::error::{ContextError, RegistryError};
use crate::model::{JwtConfig, KeySetEntry};
use crate::registry::Namespace;

/// Fails its first invocation, slowly, then succeeds.
fn flaky_factory(calls: &Arc<AtomicUsize>) -> Factory {
    let calls = Arc::clone(calls);
    Factory::new(move |_| {
        let call = calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(100));
        if call == 0 {
            Err(ContextError::Invocation("key service unavailable".to_string()))
        } else {
            Ok(oct_key("flaky"))
        }
    })
}

fn unavailable() -> RegistryError {
    RegistryError::Context(ContextError::Invocation(
        "key service unavailable".to_string(),
    ))
}

#[test]
fn test_failure_reaches_every_concurrent_waiter() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = test_registry(JwtConfig::empty().with_key("flaky", flaky_factory(&calls)));

    let results = run_concurrently(6, || registry.key("flaky"));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in results {
        assert_eq!(result.err(), Some(unavailable()));
    }
    assert!(!registry.is_materialized(Namespace::Key, "flaky"));
}

#[test]
fn test_retry_after_failure_succeeds() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = test_registry(JwtConfig::empty().with_key("flaky", flaky_factory(&calls)));

    assert_eq!(registry.key("flaky").err(), Some(unavailable()));

    let key = registry.key("flaky").expect("retry");
    assert_eq!(key_id(&key), "flaky");
    assert!(Arc::ptr_eq(&key, &registry.key("flaky").expect("cached")));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_key_set_failure_does_not_poison_the_set() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = JwtConfig::empty()
        .with_key("flaky", flaky_factory(&calls))
        .with_key("stable", oct_key("stable"))
        .with_key_set("default", KeySetEntry::composite(["stable", "flaky"]));
    let registry = test_registry(config);

    assert_eq!(registry.default_key_set().err(), Some(unavailable()));
    assert!(!registry.is_materialized(Namespace::KeySet, "default"));
    // The member that did build stays cached.
    assert!(registry.is_materialized(Namespace::Key, "stable"));

    let set = registry.default_key_set().expect("retry");
    let kids: Vec<&str> = set.iter().map(|key| key_id(key)).collect();
    assert_eq!(kids, vec!["stable", "flaky"]);
}
