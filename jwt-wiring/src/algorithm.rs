//! Signature algorithms and the algorithm manager.
//!
//! The cryptography itself lives in `jsonwebtoken`; this module only decides
//! which algorithms are available under which names.
//!
//! # Invariants
//! - Algorithm names are unique within a factory and within a manager.
//! - Manager enumeration order is the configured order.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::context::ResolutionContext;
use crate::error::RegistryError;
use crate::model::JwtConfig;
use crate::resolver;

/// Key families a signature algorithm can operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    /// Symmetric `oct` keys (HMAC).
    Octet,
    Rsa,
    EllipticCurve,
    /// `OKP` keys (`EdDSA`).
    OctetKeyPair,
}

/// A pluggable signature algorithm.
pub trait Algorithm: Send + Sync + fmt::Debug {
    /// The JOSE `alg` name, e.g. `"HS256"`.
    fn name(&self) -> &str;

    /// The key family this algorithm signs with.
    fn family(&self) -> KeyFamily;
}

/// Built-in algorithm backed by `jsonwebtoken`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwsAlgorithm {
    algorithm: jsonwebtoken::Algorithm,
    name: String,
}

impl JwsAlgorithm {
    const NAMES: [&'static str; 12] = [
        "HS256", "HS384", "HS512", "ES256", "ES384", "RS256", "RS384", "RS512", "PS256",
        "PS384", "PS512", "EdDSA",
    ];

    #[must_use]
    pub fn new(algorithm: jsonwebtoken::Algorithm) -> Self {
        Self {
            algorithm,
            name: format!("{algorithm:?}"),
        }
    }

    /// Look up an algorithm by its JOSE name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        jsonwebtoken::Algorithm::from_str(name).ok().map(Self::new)
    }

    /// Every algorithm `jsonwebtoken` can verify.
    #[must_use]
    pub fn all() -> Vec<Self> {
        Self::NAMES.iter().filter_map(|name| Self::from_name(name)).collect()
    }

    #[must_use]
    pub const fn algorithm(&self) -> jsonwebtoken::Algorithm {
        self.algorithm
    }
}

impl Algorithm for JwsAlgorithm {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> KeyFamily {
        match &self.name[..2] {
            "HS" => KeyFamily::Octet,
            "ES" => KeyFamily::EllipticCurve,
            "Ed" => KeyFamily::OctetKeyPair,
            _ => KeyFamily::Rsa,
        }
    }
}

/// Collects named algorithms and hands out managers over subsets of them.
#[derive(Debug, Default, Clone)]
pub struct AlgorithmManagerFactory {
    algorithms: Vec<(String, Arc<dyn Algorithm>)>,
}

impl AlgorithmManagerFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an algorithm under `name`, replacing one already registered there.
    pub fn add(&mut self, name: impl Into<String>, algorithm: Arc<dyn Algorithm>) {
        let name = name.into();
        if let Some(slot) = self.algorithms.iter_mut().find(|(known, _)| *known == name) {
            slot.1 = algorithm;
        } else {
            self.algorithms.push((name, algorithm));
        }
    }

    /// Registered names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.algorithms.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// A manager over every registered algorithm.
    #[must_use]
    pub fn create_all(&self) -> AlgorithmManager {
        AlgorithmManager {
            algorithms: self.algorithms.clone(),
        }
    }

    /// A manager restricted to `names`, in the order given.
    ///
    /// # Errors
    /// Returns `RegistryError::AlgorithmNotFound` for the first unknown name.
    pub fn create<S: AsRef<str>>(&self, names: &[S]) -> Result<AlgorithmManager, RegistryError> {
        self.create_all().restrict(names)
    }
}

/// An immutable set of named algorithms.
#[derive(Debug, Clone)]
pub struct AlgorithmManager {
    algorithms: Vec<(String, Arc<dyn Algorithm>)>,
}

impl AlgorithmManager {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Algorithm>> {
        self.algorithms
            .iter()
            .find(|(known, _)| known == name)
            .map(|(_, algorithm)| algorithm)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.algorithms.iter().map(|(name, _)| name.as_str()).collect()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.algorithms.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }

    /// A sub-manager holding only `names`, in the order given.
    ///
    /// # Errors
    /// Returns `RegistryError::AlgorithmNotFound` for the first unknown name.
    pub fn restrict<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, RegistryError> {
        let mut algorithms: Vec<(String, Arc<dyn Algorithm>)> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if algorithms.iter().any(|(known, _)| known == name) {
                continue;
            }
            let algorithm = self
                .get(name)
                .ok_or_else(|| RegistryError::AlgorithmNotFound(name.to_string()))?;
            algorithms.push((name.to_string(), Arc::clone(algorithm)));
        }
        Ok(Self { algorithms })
    }
}

/// Resolve every configured algorithm entry into a factory.
///
/// # Errors
/// Propagates the first entry that fails to resolve.
pub fn assemble_algorithm_factory(
    config: &JwtConfig,
    ctx: &dyn ResolutionContext,
) -> Result<AlgorithmManagerFactory, RegistryError> {
    let mut factory = AlgorithmManagerFactory::new();
    for (name, entry) in config.algorithms() {
        let algorithm = resolver::resolve(entry, name, ctx)?;
        factory.add(name.clone(), algorithm);
    }
    tracing::debug!(algorithms = ?factory.names(), "Assembled algorithm manager factory");
    Ok(factory)
}
