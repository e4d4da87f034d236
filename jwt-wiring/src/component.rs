//! Domain objects handed around by the resolution context and the registry.
//!
//! Every object the registry can produce or consume is one variant of
//! [`Component`]. Asking for the wrong variant is a configuration error
//! (`RegistryError::TypeMismatch`), never a silent fallthrough.
//!
//! # Invariants
//! - A component is cheap to clone; every payload is behind an `Arc`.
//! - `Component::kind()` always names the variant the value carries.

use std::fmt;
use std::sync::Arc;

use jsonwebtoken::jwk::Jwk;

use crate::algorithm::Algorithm;
use crate::checker::{
    ClaimChecker, ClaimCheckerManager, HeaderChecker, HeaderCheckerManager, TokenTypeSupport,
};
use crate::keys::KeySet;

/// The domains a configuration entry can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainKind {
    Key,
    KeySet,
    Algorithm,
    HeaderChecker,
    ClaimChecker,
    TokenType,
    HeaderCheckerManager,
    ClaimCheckerManager,
}

impl DomainKind {
    /// Human readable name used in error messages and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::KeySet => "key set",
            Self::Algorithm => "algorithm",
            Self::HeaderChecker => "header checker",
            Self::ClaimChecker => "claim checker",
            Self::TokenType => "token type",
            Self::HeaderCheckerManager => "header checker manager",
            Self::ClaimCheckerManager => "claim checker manager",
        }
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A materialized domain object.
#[derive(Debug, Clone)]
pub enum Component {
    Key(Arc<Jwk>),
    KeySet(Arc<KeySet>),
    Algorithm(Arc<dyn Algorithm>),
    HeaderChecker(Arc<dyn HeaderChecker>),
    ClaimChecker(Arc<dyn ClaimChecker>),
    TokenType(Arc<dyn TokenTypeSupport>),
    HeaderCheckerManager(Arc<HeaderCheckerManager>),
    ClaimCheckerManager(Arc<ClaimCheckerManager>),
}

impl Component {
    #[must_use]
    pub fn key(jwk: Jwk) -> Self {
        Self::Key(Arc::new(jwk))
    }

    #[must_use]
    pub fn key_set(key_set: KeySet) -> Self {
        Self::KeySet(Arc::new(key_set))
    }

    #[must_use]
    pub fn algorithm(algorithm: impl Algorithm + 'static) -> Self {
        Self::Algorithm(Arc::new(algorithm))
    }

    #[must_use]
    pub fn header_checker(checker: impl HeaderChecker + 'static) -> Self {
        Self::HeaderChecker(Arc::new(checker))
    }

    #[must_use]
    pub fn claim_checker(checker: impl ClaimChecker + 'static) -> Self {
        Self::ClaimChecker(Arc::new(checker))
    }

    #[must_use]
    pub fn token_type(support: impl TokenTypeSupport + 'static) -> Self {
        Self::TokenType(Arc::new(support))
    }

    /// The domain this component belongs to.
    #[must_use]
    pub const fn kind(&self) -> DomainKind {
        match self {
            Self::Key(_) => DomainKind::Key,
            Self::KeySet(_) => DomainKind::KeySet,
            Self::Algorithm(_) => DomainKind::Algorithm,
            Self::HeaderChecker(_) => DomainKind::HeaderChecker,
            Self::ClaimChecker(_) => DomainKind::ClaimChecker,
            Self::TokenType(_) => DomainKind::TokenType,
            Self::HeaderCheckerManager(_) => DomainKind::HeaderCheckerManager,
            Self::ClaimCheckerManager(_) => DomainKind::ClaimCheckerManager,
        }
    }
}

impl From<Jwk> for Component {
    fn from(jwk: Jwk) -> Self {
        Self::key(jwk)
    }
}

impl From<Arc<Jwk>> for Component {
    fn from(jwk: Arc<Jwk>) -> Self {
        Self::Key(jwk)
    }
}

impl From<KeySet> for Component {
    fn from(key_set: KeySet) -> Self {
        Self::key_set(key_set)
    }
}

impl From<Arc<KeySet>> for Component {
    fn from(key_set: Arc<KeySet>) -> Self {
        Self::KeySet(key_set)
    }
}

impl From<Arc<dyn Algorithm>> for Component {
    fn from(algorithm: Arc<dyn Algorithm>) -> Self {
        Self::Algorithm(algorithm)
    }
}

impl From<Arc<dyn HeaderChecker>> for Component {
    fn from(checker: Arc<dyn HeaderChecker>) -> Self {
        Self::HeaderChecker(checker)
    }
}

impl From<Arc<dyn ClaimChecker>> for Component {
    fn from(checker: Arc<dyn ClaimChecker>) -> Self {
        Self::ClaimChecker(checker)
    }
}

impl From<Arc<dyn TokenTypeSupport>> for Component {
    fn from(support: Arc<dyn TokenTypeSupport>) -> Self {
        Self::TokenType(support)
    }
}

/// A typed view over one [`Component`] variant.
///
/// Implemented for the handle type of every domain, so resolution code can be
/// written once and checked per domain.
pub trait DomainObject: Clone + Send + Sync + 'static {
    /// The domain this handle type belongs to.
    const KIND: DomainKind;

    /// Extract the handle, or hand the component back if it is another domain.
    fn from_component(component: Component) -> Result<Self, Component>;
}

macro_rules! domain_object {
    ($handle:ty, $variant:ident) => {
        impl DomainObject for $handle {
            const KIND: DomainKind = DomainKind::$variant;

            fn from_component(component: Component) -> Result<Self, Component> {
                match component {
                    Component::$variant(value) => Ok(value),
                    other => Err(other),
                }
            }
        }
    };
}

domain_object!(Arc<Jwk>, Key);
domain_object!(Arc<KeySet>, KeySet);
domain_object!(Arc<dyn Algorithm>, Algorithm);
domain_object!(Arc<dyn HeaderChecker>, HeaderChecker);
domain_object!(Arc<dyn ClaimChecker>, ClaimChecker);
domain_object!(Arc<dyn TokenTypeSupport>, TokenType);
domain_object!(Arc<HeaderCheckerManager>, HeaderCheckerManager);
domain_object!(Arc<ClaimCheckerManager>, ClaimCheckerManager);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::JwsAlgorithm;
    use crate::checker::ExpirationTimeChecker;
    use crate::testing::oct_key;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(Component::key(oct_key("k1")).kind(), DomainKind::Key);
        assert_eq!(
            Component::algorithm(JwsAlgorithm::new(jsonwebtoken::Algorithm::HS256)).kind(),
            DomainKind::Algorithm
        );
        assert_eq!(
            Component::claim_checker(ExpirationTimeChecker::default()).kind(),
            DomainKind::ClaimChecker
        );
    }

    #[test]
    fn test_from_component_extracts_matching_variant() {
        let key = Arc::new(oct_key("k1"));
        let component = Component::Key(Arc::clone(&key));

        let extracted = <Arc<Jwk>>::from_component(component).expect("key variant");
        assert!(Arc::ptr_eq(&key, &extracted));
    }

    #[test]
    fn test_from_component_hands_back_other_variant() {
        let component = Component::claim_checker(ExpirationTimeChecker::default());

        let result = <Arc<Jwk>>::from_component(component);
        match result {
            Err(other) => assert_eq!(other.kind(), DomainKind::ClaimChecker),
            Ok(_) => panic!("expected mismatch"),
        }
    }

    #[test]
    fn test_domain_kind_display() {
        assert_eq!(DomainKind::KeySet.to_string(), "key set");
        assert_eq!(DomainKind::HeaderChecker.to_string(), "header checker");
    }
}
