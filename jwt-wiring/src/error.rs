//! Error types shared by the resolver, the composers and the registry.
//!
//! All errors are `Clone`: a failed materialization is handed to every caller
//! that was waiting on the same alias.

use crate::component::DomainKind;

/// Failure reported by a resolution context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// No component is known under the requested name.
    #[error("no component named '{0}' in the resolution context")]
    NotFound(String),
    /// A factory could not be invoked, or failed while constructing.
    #[error("factory invocation failed: {0}")]
    Invocation(String),
}

/// Configuration and wiring errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The requested key or key set alias is not configured.
    #[error("no {domain} configured under alias '{alias}'")]
    KeyNotFound { domain: DomainKind, alias: String },
    /// The requested checker profile is not configured.
    #[error("no {kind} profile named '{profile}'")]
    ProfileNotFound { kind: DomainKind, profile: String },
    /// An algorithm subset named an algorithm that is not configured.
    #[error("algorithm '{0}' is not configured")]
    AlgorithmNotFound(String),
    /// The entry matched none of the resolution strategies.
    #[error("{domain} entry '{alias}'{} matches no resolution strategy", member_suffix(.member))]
    Unresolvable {
        domain: DomainKind,
        alias: String,
        member: Option<usize>,
    },
    /// The entry resolved to an object of another domain.
    #[error("{domain} entry '{alias}'{} resolved to a {found}", member_suffix(.member))]
    TypeMismatch {
        domain: DomainKind,
        alias: String,
        member: Option<usize>,
        found: DomainKind,
    },
    /// Raw key material in a composite key set could not be read as a JWK.
    #[error("key set '{alias}' member {member} is not valid key material: {reason}")]
    InvalidKeyMaterial {
        alias: String,
        member: usize,
        reason: String,
    },
    /// A binding with the same namespaced alias already exists.
    #[error("binding '{0}' is already registered")]
    DuplicateBinding(String),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("registry lock poisoned")]
    LockPoisoned,
}

impl RegistryError {
    /// Attach the index of the composite member that failed.
    ///
    /// Only `Unresolvable` and `TypeMismatch` carry a member index; other
    /// errors are returned unchanged.
    #[must_use]
    pub fn at_member(self, index: usize) -> Self {
        match self {
            Self::Unresolvable { domain, alias, .. } => Self::Unresolvable {
                domain,
                alias,
                member: Some(index),
            },
            Self::TypeMismatch {
                domain,
                alias,
                found,
                ..
            } => Self::TypeMismatch {
                domain,
                alias,
                member: Some(index),
                found,
            },
            other => other,
        }
    }
}

#[allow(clippy::ref_option)] // thiserror hands fields over by reference
fn member_suffix(member: &Option<usize>) -> String {
    member.map_or_else(String::new, |index| format!(" (member {index})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolvable_display_names_domain_and_alias() {
        let error = RegistryError::Unresolvable {
            domain: DomainKind::Key,
            alias: "signing".to_string(),
            member: None,
        };
        assert_eq!(
            error.to_string(),
            "key entry 'signing' matches no resolution strategy"
        );
    }

    #[test]
    fn test_at_member_sets_index() {
        let error = RegistryError::Unresolvable {
            domain: DomainKind::KeySet,
            alias: "default".to_string(),
            member: None,
        }
        .at_member(2);

        assert_eq!(
            error.to_string(),
            "key set entry 'default' (member 2) matches no resolution strategy"
        );
    }

    #[test]
    fn test_at_member_leaves_other_errors_alone() {
        let error = RegistryError::DuplicateBinding("key#k1".to_string()).at_member(4);
        assert_eq!(error, RegistryError::DuplicateBinding("key#k1".to_string()));
    }

    #[test]
    fn test_context_error_converts() {
        let error: RegistryError = ContextError::NotFound("hs256".to_string()).into();
        assert_eq!(
            error.to_string(),
            "no component named 'hs256' in the resolution context"
        );
    }

    #[test]
    fn test_type_mismatch_display() {
        let error = RegistryError::TypeMismatch {
            domain: DomainKind::Algorithm,
            alias: "HS256".to_string(),
            member: None,
            found: DomainKind::Key,
        };
        assert_eq!(error.to_string(), "algorithm entry 'HS256' resolved to a key");
    }
}
