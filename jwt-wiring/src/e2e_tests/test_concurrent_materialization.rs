//! Concurrent first access builds each alias exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use crate::context::Factory;
use crate::e2e_tests::helpers::*;
use crate::model::{JwtConfig, KeySetEntry};
use crate::registry::Namespace;

const THREADS: usize = 8;

#[test]
fn test_concurrent_key_access_builds_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let slow = Factory::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        Ok(oct_key("slow"))
    });
    let registry = test_registry(JwtConfig::empty().with_key("slow", slow));

    let keys = run_concurrently(THREADS, || registry.key("slow").expect("key"));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(keys.iter().all(|key| Arc::ptr_eq(key, &keys[0])));
}

#[test]
fn test_concurrent_key_set_access_builds_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = JwtConfig::empty()
        .with_key("k1", counting_key_factory("k1", &calls))
        .with_key("k2", counting_key_factory("k2", &calls))
        .with_key_set("default", KeySetEntry::composite(["k1", "k2"]));
    let registry = test_registry(config);

    let sets = run_concurrently(THREADS, || registry.default_key_set().expect("key set"));

    // One construction per key, however many callers raced for the set.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(sets.iter().all(|set| Arc::ptr_eq(set, &sets[0])));
}

#[test]
fn test_concurrent_profile_access_builds_once() {
    let registry = test_registry(JwtConfig::default());

    let managers = run_concurrently(THREADS, || {
        registry.default_claim_checker_manager().expect("manager")
    });

    assert!(managers.iter().all(|manager| Arc::ptr_eq(manager, &managers[0])));
}

#[test]
fn test_building_one_alias_does_not_block_another() {
    let release = Arc::new(Barrier::new(2));
    let gate = Arc::clone(&release);
    let blocked = Factory::new(move |_| {
        gate.wait();
        Ok(oct_key("blocked"))
    });
    let config = JwtConfig::empty()
        .with_key("blocked", blocked)
        .with_key("free", oct_key("free"));
    let registry = test_registry(config);

    thread::scope(|scope| {
        let pending = scope.spawn(|| registry.key("blocked"));

        // Completes while "blocked" is still under construction.
        let free = registry.key("free").expect("free key");
        assert_eq!(key_id(&free), "free");
        assert!(!registry.is_materialized(Namespace::Key, "blocked"));

        release.wait();
        let blocked = pending.join().expect("thread").expect("blocked key");
        assert_eq!(key_id(&blocked), "blocked");
    });
}
