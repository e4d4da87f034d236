use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use jsonwebtoken::jwk::Jwk;

use crate::context::{Factory, ServiceContainer};
use crate::keys::oct_jwk;
use crate::model::JwtConfig;
use crate::registry::Registry;
use crate::time::FixedTimeSource;

/// The clock every test container reads.
pub const NOW: u64 = 1_700_000_000;

/// HMAC secret whose standard and URL-safe base64 encodings coincide.
pub const TEST_SECRET: &[u8] = b"verifier-test-secret-of-33-bytes!";

/// An `oct` key with a secret derived from its `kid`.
pub fn oct_key(kid: &str) -> Jwk {
    // Alphanumeric secrets in multiples of three bytes encode the same in
    // every base64 alphabet, padded or not.
    let mut secret = format!("secret-{kid}");
    while secret.len() % 3 != 0 {
        secret.push('-');
    }
    oct_jwk(kid, secret.as_bytes()).expect("valid oct jwk")
}

/// An `oct` key holding [`TEST_SECRET`].
pub fn test_secret_key(kid: &str) -> Jwk {
    oct_jwk(kid, TEST_SECRET).expect("valid oct jwk")
}

/// A container with the built-in services, reading time from [`NOW`].
pub fn test_container() -> ServiceContainer {
    ServiceContainer::with_builtins(Arc::new(FixedTimeSource(NOW)), 0)
}

/// A registry over `config` and [`test_container`], with everything registered.
pub fn test_registry(config: JwtConfig) -> Registry {
    let registry = Registry::new(config, Arc::new(test_container()));
    registry.register_all().expect("registered");
    registry
}

/// A key factory counting its invocations in `calls`.
pub fn counting_key_factory(kid: &str, calls: &Arc<AtomicUsize>) -> Factory {
    let kid = kid.to_string();
    let calls = Arc::clone(calls);
    Factory::new(move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(oct_key(&kid))
    })
}
