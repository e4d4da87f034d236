//! The declarative wiring configuration.
//!
//! # Pre-conditions
//! - Values are already validated and defaulted by whoever built the config.
//!
//! # Post-conditions
//! - Accessors never resolve anything; they only read.
//!
//! # Invariants
//! - Names are unique within each section (re-adding a name replaces it).
//! - Algorithm and token type order is the insertion order.

use std::collections::HashMap;

use crate::component::DomainKind;
use crate::error::RegistryError;

use super::entry::{
    AlgorithmEntry, ClaimCheckerEntry, ClaimProfile, Entry, HeaderCheckerEntry, HeaderProfile,
    KeyEntry, KeySetEntry, TokenTypeEntry,
};

/// Name used for every default when nothing else is configured.
pub const DEFAULT_NAME: &str = "default";

/// Checker section of the configuration.
#[derive(Debug, Clone, Default)]
pub struct CheckersConfig {
    pub token_types: Vec<TokenTypeEntry>,
    pub header_checkers: HashMap<String, HeaderCheckerEntry>,
    pub claim_checkers: HashMap<String, ClaimCheckerEntry>,
    pub header_profiles: HashMap<String, HeaderProfile>,
    pub claim_profiles: HashMap<String, ClaimProfile>,
}

/// All declarative entries the registry is built from.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    algorithms: Vec<(String, AlgorithmEntry)>,
    keys: HashMap<String, KeyEntry>,
    default_key: String,
    key_sets: HashMap<String, KeySetEntry>,
    default_key_set: String,
    checkers: CheckersConfig,
    default_header_profile: String,
    default_claim_profile: String,
}

impl Default for JwtConfig {
    /// The built-in configuration: HS256, JWS token support in the "default"
    /// header profile, and the iat/nbf/exp checkers in the "default" claim
    /// profile. No keys or key sets.
    ///
    /// Every entry names a service, so the clock and leeway come from the
    /// resolution context (see [`ServiceContainer::with_builtins`]).
    ///
    /// [`ServiceContainer::with_builtins`]: crate::context::ServiceContainer::with_builtins
    fn default() -> Self {
        let mut config = Self::empty()
            .with_algorithm("HS256", Entry::service("HS256"))
            .with_token_type(Entry::service("jws"))
            .with_claim_checker("iat", Entry::service("iat"))
            .with_claim_checker("nbf", Entry::service("nbf"))
            .with_claim_checker("exp", Entry::service("exp"))
            .with_claim_profile(DEFAULT_NAME, ClaimProfile::new(["iat", "nbf", "exp"]));
        config.checkers.header_profiles.insert(
            DEFAULT_NAME.to_string(),
            HeaderProfile::default().with_token_type(Entry::service("jws")),
        );
        config
    }
}

impl JwtConfig {
    /// A configuration with every section empty and every default named
    /// [`DEFAULT_NAME`].
    #[must_use]
    pub fn empty() -> Self {
        Self {
            algorithms: Vec::new(),
            keys: HashMap::new(),
            default_key: DEFAULT_NAME.to_string(),
            key_sets: HashMap::new(),
            default_key_set: DEFAULT_NAME.to_string(),
            checkers: CheckersConfig::default(),
            default_header_profile: DEFAULT_NAME.to_string(),
            default_claim_profile: DEFAULT_NAME.to_string(),
        }
    }

    #[must_use]
    pub fn with_algorithm(mut self, name: impl Into<String>, entry: AlgorithmEntry) -> Self {
        let name = name.into();
        if let Some(slot) = self.algorithms.iter_mut().find(|(known, _)| *known == name) {
            slot.1 = entry;
        } else {
            self.algorithms.push((name, entry));
        }
        self
    }

    /// Drop every configured algorithm.
    #[must_use]
    pub fn without_algorithms(mut self) -> Self {
        self.algorithms.clear();
        self
    }

    #[must_use]
    pub fn with_key(mut self, alias: impl Into<String>, entry: impl Into<KeyEntry>) -> Self {
        self.keys.insert(alias.into(), entry.into());
        self
    }

    #[must_use]
    pub fn with_key_set(mut self, alias: impl Into<String>, entry: impl Into<KeySetEntry>) -> Self {
        self.key_sets.insert(alias.into(), entry.into());
        self
    }

    #[must_use]
    pub fn with_token_type(mut self, entry: TokenTypeEntry) -> Self {
        self.checkers.token_types.push(entry);
        self
    }

    #[must_use]
    pub fn with_header_checker(
        mut self,
        alias: impl Into<String>,
        entry: HeaderCheckerEntry,
    ) -> Self {
        self.checkers.header_checkers.insert(alias.into(), entry);
        self
    }

    #[must_use]
    pub fn with_claim_checker(mut self, alias: impl Into<String>, entry: ClaimCheckerEntry) -> Self {
        self.checkers.claim_checkers.insert(alias.into(), entry);
        self
    }

    #[must_use]
    pub fn with_header_profile(mut self, name: impl Into<String>, profile: HeaderProfile) -> Self {
        self.checkers.header_profiles.insert(name.into(), profile);
        self
    }

    #[must_use]
    pub fn with_claim_profile(mut self, name: impl Into<String>, profile: ClaimProfile) -> Self {
        self.checkers.claim_profiles.insert(name.into(), profile);
        self
    }

    #[must_use]
    pub fn with_checkers(mut self, checkers: CheckersConfig) -> Self {
        self.checkers = checkers;
        self
    }

    #[must_use]
    pub fn with_default_key(mut self, alias: impl Into<String>) -> Self {
        self.default_key = alias.into();
        self
    }

    #[must_use]
    pub fn with_default_key_set(mut self, alias: impl Into<String>) -> Self {
        self.default_key_set = alias.into();
        self
    }

    #[must_use]
    pub fn with_default_header_profile(mut self, name: impl Into<String>) -> Self {
        self.default_header_profile = name.into();
        self
    }

    #[must_use]
    pub fn with_default_claim_profile(mut self, name: impl Into<String>) -> Self {
        self.default_claim_profile = name.into();
        self
    }

    // ---- accessors ----

    #[must_use]
    pub fn algorithms(&self) -> &[(String, AlgorithmEntry)] {
        &self.algorithms
    }

    /// Configured algorithm names, in order.
    #[must_use]
    pub fn algorithm_names(&self) -> Vec<&str> {
        self.algorithms.iter().map(|(name, _)| name.as_str()).collect()
    }

    #[must_use]
    pub const fn keys(&self) -> &HashMap<String, KeyEntry> {
        &self.keys
    }

    #[must_use]
    pub fn has_key(&self, alias: &str) -> bool {
        self.keys.contains_key(alias)
    }

    /// The key entry configured under `alias`.
    ///
    /// # Errors
    /// Returns `RegistryError::KeyNotFound` if the alias is not configured.
    pub fn key(&self, alias: &str) -> Result<&KeyEntry, RegistryError> {
        self.keys.get(alias).ok_or_else(|| RegistryError::KeyNotFound {
            domain: DomainKind::Key,
            alias: alias.to_string(),
        })
    }

    #[must_use]
    pub fn default_key_name(&self) -> &str {
        &self.default_key
    }

    #[must_use]
    pub const fn key_sets(&self) -> &HashMap<String, KeySetEntry> {
        &self.key_sets
    }

    #[must_use]
    pub fn has_key_set(&self, alias: &str) -> bool {
        self.key_sets.contains_key(alias)
    }

    /// The key set entry configured under `alias`.
    ///
    /// # Errors
    /// Returns `RegistryError::KeyNotFound` if the alias is not configured.
    pub fn key_set(&self, alias: &str) -> Result<&KeySetEntry, RegistryError> {
        self.key_sets
            .get(alias)
            .ok_or_else(|| RegistryError::KeyNotFound {
                domain: DomainKind::KeySet,
                alias: alias.to_string(),
            })
    }

    #[must_use]
    pub fn default_key_set_name(&self) -> &str {
        &self.default_key_set
    }

    #[must_use]
    pub fn token_types(&self) -> &[TokenTypeEntry] {
        &self.checkers.token_types
    }

    #[must_use]
    pub const fn header_checkers(&self) -> &HashMap<String, HeaderCheckerEntry> {
        &self.checkers.header_checkers
    }

    #[must_use]
    pub const fn claim_checkers(&self) -> &HashMap<String, ClaimCheckerEntry> {
        &self.checkers.claim_checkers
    }

    #[must_use]
    pub const fn header_profiles(&self) -> &HashMap<String, HeaderProfile> {
        &self.checkers.header_profiles
    }

    #[must_use]
    pub const fn claim_profiles(&self) -> &HashMap<String, ClaimProfile> {
        &self.checkers.claim_profiles
    }

    /// The header profile named `name`.
    ///
    /// # Errors
    /// Returns `RegistryError::ProfileNotFound` if no such profile exists.
    pub fn header_profile(&self, name: &str) -> Result<&HeaderProfile, RegistryError> {
        self.checkers
            .header_profiles
            .get(name)
            .ok_or_else(|| RegistryError::ProfileNotFound {
                kind: DomainKind::HeaderChecker,
                profile: name.to_string(),
            })
    }

    /// The claim profile named `name`.
    ///
    /// # Errors
    /// Returns `RegistryError::ProfileNotFound` if no such profile exists.
    pub fn claim_profile(&self, name: &str) -> Result<&ClaimProfile, RegistryError> {
        self.checkers
            .claim_profiles
            .get(name)
            .ok_or_else(|| RegistryError::ProfileNotFound {
                kind: DomainKind::ClaimChecker,
                profile: name.to_string(),
            })
    }

    #[must_use]
    pub fn default_header_profile_name(&self) -> &str {
        &self.default_header_profile
    }

    #[must_use]
    pub fn default_claim_profile_name(&self) -> &str {
        &self.default_claim_profile
    }

    pub(crate) const fn checkers(&self) -> &CheckersConfig {
        &self.checkers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProfileMember;
    use crate::testing::oct_key;

    #[test]
    fn test_default_ships_builtins() {
        let config = JwtConfig::default();

        assert_eq!(config.algorithm_names(), vec!["HS256"]);
        assert!(config.keys().is_empty());
        assert!(config.key_sets().is_empty());
        assert_eq!(config.token_types().len(), 1);

        let mut claim_aliases: Vec<&str> =
            config.claim_checkers().keys().map(String::as_str).collect();
        claim_aliases.sort_unstable();
        assert_eq!(claim_aliases, vec!["exp", "iat", "nbf"]);
        assert!(matches!(
            config.claim_checkers().get("exp"),
            Some(Entry::Service(name)) if name == "exp"
        ));
        assert!(matches!(&config.algorithms()[0].1, Entry::Service(name) if name == "HS256"));

        let profile = config.claim_profile(DEFAULT_NAME).expect("default claim profile");
        let refs: Vec<&str> = profile
            .claims
            .iter()
            .filter_map(|member| match member {
                ProfileMember::Ref(alias) => Some(alias.as_str()),
                ProfileMember::Inline(_) => None,
            })
            .collect();
        assert_eq!(refs, vec!["iat", "nbf", "exp"]);

        let header = config.header_profile(DEFAULT_NAME).expect("default header profile");
        assert!(header.headers.is_empty());
        assert_eq!(header.token_types.len(), 1);

        assert_eq!(config.default_key_name(), "default");
        assert_eq!(config.default_key_set_name(), "default");
        assert_eq!(config.default_header_profile_name(), "default");
        assert_eq!(config.default_claim_profile_name(), "default");
    }

    #[test]
    fn test_key_lookup() {
        let config = JwtConfig::empty().with_key("k1", oct_key("k1"));

        assert!(config.has_key("k1"));
        assert!(config.key("k1").is_ok());
        assert_eq!(
            config.key("k2").err(),
            Some(RegistryError::KeyNotFound {
                domain: DomainKind::Key,
                alias: "k2".to_string(),
            })
        );
    }

    #[test]
    fn test_key_set_lookup() {
        let config =
            JwtConfig::empty().with_key_set("main", KeySetEntry::composite(["k1", "k2"]));

        assert!(config.has_key_set("main"));
        assert_eq!(
            config.key_set("other").err(),
            Some(RegistryError::KeyNotFound {
                domain: DomainKind::KeySet,
                alias: "other".to_string(),
            })
        );
    }

    #[test]
    fn test_profile_not_found() {
        let config = JwtConfig::empty();

        assert_eq!(
            config.claim_profile("strict").err(),
            Some(RegistryError::ProfileNotFound {
                kind: DomainKind::ClaimChecker,
                profile: "strict".to_string(),
            })
        );
        assert!(config.header_profile("strict").is_err());
    }

    #[test]
    fn test_with_algorithm_replaces_and_keeps_order() {
        let config = JwtConfig::default()
            .with_algorithm("RS256", Entry::service("RS256"))
            .with_algorithm("HS256", Entry::service("HS512"));

        assert_eq!(config.algorithm_names(), vec!["HS256", "RS256"]);
        assert!(matches!(&config.algorithms()[0].1, Entry::Service(name) if name == "HS512"));
    }

    #[test]
    fn test_default_names_can_be_changed() {
        let config = JwtConfig::empty()
            .with_default_key("signing")
            .with_default_key_set("jwks")
            .with_default_header_profile("strict")
            .with_default_claim_profile("strict");

        assert_eq!(config.default_key_name(), "signing");
        assert_eq!(config.default_key_set_name(), "jwks");
        assert_eq!(config.default_header_profile_name(), "strict");
        assert_eq!(config.default_claim_profile_name(), "strict");
    }
}
