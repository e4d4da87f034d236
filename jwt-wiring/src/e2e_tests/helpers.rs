//! Common helpers for end-to-end tests.

use std::sync::Barrier;
use std::thread;

use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::Value;

pub use crate::testing::{
    NOW, TEST_SECRET, counting_key_factory, oct_key, test_container, test_registry,
    test_secret_key,
};

/// The `kid` of a key, or an empty string.
pub fn key_id(jwk: &Jwk) -> &str {
    jwk.common.key_id.as_deref().unwrap_or_default()
}

/// Run `f` on `threads` threads released together, returning results in
/// thread order.
pub fn run_concurrently<T, F>(threads: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn() -> T + Sync,
{
    let barrier = Barrier::new(threads);
    thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    f()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("test thread panicked"))
            .collect()
    })
}

/// Sign `claims` with HS256 and [`TEST_SECRET`].
pub fn hs256_token(kid: Option<&str>, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = kid.map(str::to_string);
    encode(&header, claims, &EncodingKey::from_secret(TEST_SECRET))
        .expect("failed to create test token")
}
