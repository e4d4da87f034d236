//! Token issuance over registry-provided components.
//!
//! Signs claims with the default key, restricted to the configured
//! algorithms.
//!
//! # Pre-conditions
//! - The registry has its bindings registered before `from_registry`.
//!
//! # Post-conditions
//! - On success, returns a compact JWS whose header carries the key's `kid`.
//!
//! # Invariants
//! - Only symmetric `oct` keys sign: `jsonwebtoken` JWKs hold public key
//!   parameters only.

use std::sync::Arc;

use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;

use crate::algorithm::{AlgorithmManager, JwsAlgorithm};
use crate::error::RegistryError;
use crate::keys::{key_family, oct_secret};
use crate::registry::Registry;

/// Error returned when a token cannot be issued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IssueError {
    #[error("algorithm '{0}' is not allowed")]
    AlgorithmNotAllowed(String),
    #[error("key cannot sign with '{0}'")]
    KeyMismatch(String),
    #[error("key holds no signing material: {0}")]
    UnsupportedKey(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Issues tokens with one fixed key.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    algorithms: Arc<AlgorithmManager>,
    key: Arc<Jwk>,
}

impl TokenIssuer {
    #[must_use]
    pub const fn new(algorithms: Arc<AlgorithmManager>, key: Arc<Jwk>) -> Self {
        Self { algorithms, key }
    }

    /// An issuer over every configured algorithm and the default key.
    ///
    /// # Errors
    /// Returns the first error raised while materializing a component.
    pub fn from_registry(registry: &Registry) -> Result<Self, RegistryError> {
        Ok(Self::new(registry.algorithm_manager()?, registry.default_key()?))
    }

    #[must_use]
    pub fn key(&self) -> &Arc<Jwk> {
        &self.key
    }

    /// Sign `claims` with the algorithm named `alg`.
    ///
    /// # Errors
    /// - `IssueError::AlgorithmNotAllowed` if `alg` is not configured.
    /// - `IssueError::KeyMismatch` if the key is of another family.
    /// - `IssueError::UnsupportedKey` if the key carries no secret.
    /// - `IssueError::Signing` if `jsonwebtoken` fails to sign.
    pub fn issue(&self, alg: &str, claims: &Value) -> Result<String, IssueError> {
        let algorithm = self
            .algorithms
            .get(alg)
            .ok_or_else(|| IssueError::AlgorithmNotAllowed(alg.to_string()))?;
        let jws = JwsAlgorithm::from_name(algorithm.name())
            .ok_or_else(|| IssueError::AlgorithmNotAllowed(alg.to_string()))?;
        if key_family(&self.key) != algorithm.family() {
            return Err(IssueError::KeyMismatch(alg.to_string()));
        }

        let mut header = Header::new(jws.algorithm());
        header.kid.clone_from(&self.key.common.key_id);

        let secret = oct_secret(&self.key).ok_or_else(|| {
            IssueError::UnsupportedKey("only oct keys carry a secret".to_string())
        })?;
        let token = encode(&header, claims, &EncodingKey::from_secret(&secret))
            .map_err(|e| IssueError::Signing(e.to_string()))?;
        tracing::debug!(alg, kid = ?header.kid, "Issued token");
        Ok(token)
    }
}
