//! Lazy binding registry.
//!
//! The registry owns the configuration and the resolution context, and maps
//! namespaced aliases (`"key#signing"`, `"keyset#default"`, ...) to bindings.
//! A binding is an explicit recipe plus a once-cell: nothing is built at
//! registration, and the first `get` for an alias builds it exactly once.
//!
//! # Pre-conditions
//! - The configuration is complete before the registry is created; it is
//!   never modified afterwards.
//!
//! # Post-conditions
//! - `get` returns the same instance for an alias on every successful call.
//! - A failed build is reported to every caller waiting on it and leaves the
//!   alias unmaterialized, so a later call may retry.
//!
//! # Invariants
//! - Each namespaced alias is registered at most once.
//! - Builds of different aliases never block each other; the binding map is
//!   only locked to look bindings up or add them.

mod cell;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use jsonwebtoken::jwk::Jwk;

use crate::algorithm::{AlgorithmManager, AlgorithmManagerFactory, assemble_algorithm_factory};
use crate::checker::{
    ClaimCheckerManager, ClaimCheckerManagerFactory, HeaderCheckerManager,
    HeaderCheckerManagerFactory, assemble_claim_checker_factory, assemble_header_checker_factory,
};
use crate::component::{Component, DomainKind};
use crate::context::ResolutionContext;
use crate::error::RegistryError;
use crate::keys::{KeyLookup, KeySet, compose_key_set};
use crate::model::JwtConfig;
use crate::resolver;

pub use cell::OnceSlot;

/// Binding namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Key,
    KeySet,
    /// Header checker managers, one per header profile.
    HeaderProfile,
    /// Claim checker managers, one per claim profile.
    ClaimProfile,
}

impl Namespace {
    pub const ALL: [Self; 4] = [
        Self::Key,
        Self::KeySet,
        Self::HeaderProfile,
        Self::ClaimProfile,
    ];

    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::KeySet => "keyset",
            Self::HeaderProfile => "header-checker",
            Self::ClaimProfile => "claim-checker",
        }
    }

    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|namespace| namespace.prefix() == prefix)
    }

    /// The namespaced alias, e.g. `"keyset#default"`.
    #[must_use]
    pub fn qualify(self, alias: &str) -> String {
        format!("{}#{alias}", self.prefix())
    }

    /// The error for an alias that is not available in this namespace.
    fn not_found(self, alias: &str) -> RegistryError {
        match self {
            Self::Key => RegistryError::KeyNotFound {
                domain: DomainKind::Key,
                alias: alias.to_string(),
            },
            Self::KeySet => RegistryError::KeyNotFound {
                domain: DomainKind::KeySet,
                alias: alias.to_string(),
            },
            Self::HeaderProfile => RegistryError::ProfileNotFound {
                kind: DomainKind::HeaderChecker,
                profile: alias.to_string(),
            },
            Self::ClaimProfile => RegistryError::ProfileNotFound {
                kind: DomainKind::ClaimChecker,
                profile: alias.to_string(),
            },
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// What to build for one binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub namespace: Namespace,
    pub alias: String,
}

struct Binding {
    recipe: Recipe,
    slot: OnceSlot<Component>,
}

/// Registry of lazily built keys, key sets and checker managers.
pub struct Registry {
    config: Arc<JwtConfig>,
    ctx: Arc<dyn ResolutionContext>,
    /// Map from namespaced alias to binding.
    bindings: RwLock<HashMap<String, Arc<Binding>>>,
    algorithm_factory: OnceSlot<Arc<AlgorithmManagerFactory>>,
    algorithm_manager: OnceSlot<Arc<AlgorithmManager>>,
    header_factory: OnceSlot<Arc<HeaderCheckerManagerFactory>>,
    claim_factory: OnceSlot<Arc<ClaimCheckerManagerFactory>>,
}

impl Registry {
    /// Create an empty registry over `config`, resolving through `ctx`.
    #[must_use]
    pub fn new(config: JwtConfig, ctx: Arc<dyn ResolutionContext>) -> Self {
        Self {
            config: Arc::new(config),
            ctx,
            bindings: RwLock::new(HashMap::new()),
            algorithm_factory: OnceSlot::new(),
            algorithm_manager: OnceSlot::new(),
            header_factory: OnceSlot::new(),
            claim_factory: OnceSlot::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Register a deferred binding for `alias` in `namespace`.
    ///
    /// # Pre-conditions
    /// - `alias` is configured in the section matching `namespace`.
    ///
    /// # Errors
    /// - `RegistryError::KeyNotFound` / `RegistryError::ProfileNotFound` if the
    ///   alias is not configured.
    /// - `RegistryError::DuplicateBinding` if the alias is already registered;
    ///   the existing binding is left untouched.
    /// - `RegistryError::LockPoisoned` if the binding map lock is poisoned.
    pub fn register(&self, namespace: Namespace, alias: &str) -> Result<(), RegistryError> {
        if !self.is_configured(namespace, alias) {
            return Err(namespace.not_found(alias));
        }

        let qualified = namespace.qualify(alias);
        let mut bindings = self
            .bindings
            .write()
            .map_err(|_| RegistryError::LockPoisoned)?;
        if bindings.contains_key(&qualified) {
            return Err(RegistryError::DuplicateBinding(qualified));
        }
        bindings.insert(
            qualified.clone(),
            Arc::new(Binding {
                recipe: Recipe {
                    namespace,
                    alias: alias.to_string(),
                },
                slot: OnceSlot::new(),
            }),
        );
        drop(bindings);

        tracing::debug!(binding = %qualified, "Registered binding");
        Ok(())
    }

    /// Register every configured key, key set and checker profile.
    ///
    /// Configured defaults that name nothing are logged; requesting them later
    /// fails with the usual not-found error.
    ///
    /// # Errors
    /// The first `register` error, e.g. `DuplicateBinding` if called twice.
    pub fn register_all(&self) -> Result<(), RegistryError> {
        for namespace in Namespace::ALL {
            let mut aliases = self.configured_aliases(namespace);
            aliases.sort_unstable();
            for alias in aliases {
                self.register(namespace, &alias)?;
            }
        }
        self.warn_on_missing_defaults();
        Ok(())
    }

    fn configured_aliases(&self, namespace: Namespace) -> Vec<String> {
        match namespace {
            Namespace::Key => self.config.keys().keys().cloned().collect(),
            Namespace::KeySet => self.config.key_sets().keys().cloned().collect(),
            Namespace::HeaderProfile => self.config.header_profiles().keys().cloned().collect(),
            Namespace::ClaimProfile => self.config.claim_profiles().keys().cloned().collect(),
        }
    }

    fn is_configured(&self, namespace: Namespace, alias: &str) -> bool {
        match namespace {
            Namespace::Key => self.config.has_key(alias),
            Namespace::KeySet => self.config.has_key_set(alias),
            Namespace::HeaderProfile => self.config.header_profiles().contains_key(alias),
            Namespace::ClaimProfile => self.config.claim_profiles().contains_key(alias),
        }
    }

    fn warn_on_missing_defaults(&self) {
        let defaults = [
            (Namespace::Key, self.config.default_key_name()),
            (Namespace::KeySet, self.config.default_key_set_name()),
            (
                Namespace::HeaderProfile,
                self.config.default_header_profile_name(),
            ),
            (
                Namespace::ClaimProfile,
                self.config.default_claim_profile_name(),
            ),
        ];
        for (namespace, alias) in defaults {
            // An empty section has no default to get wrong.
            if self.configured_aliases(namespace).is_empty() || self.is_configured(namespace, alias)
            {
                continue;
            }
            tracing::warn!(
                namespace = %namespace,
                alias,
                "Configured default does not name a configured entry"
            );
        }
    }

    /// Namespaced aliases of every registered binding, sorted.
    ///
    /// # Errors
    /// Returns `RegistryError::LockPoisoned` if the binding map lock is poisoned.
    pub fn bindings(&self) -> Result<Vec<String>, RegistryError> {
        let bindings = self
            .bindings
            .read()
            .map_err(|_| RegistryError::LockPoisoned)?;
        let mut names: Vec<String> = bindings.keys().cloned().collect();
        drop(bindings);
        names.sort_unstable();
        Ok(names)
    }

    /// Whether the binding for `alias` has been built.
    #[must_use]
    pub fn is_materialized(&self, namespace: Namespace, alias: &str) -> bool {
        self.binding(namespace, alias)
            .is_ok_and(|binding| binding.slot.is_ready())
    }

    fn binding(&self, namespace: Namespace, alias: &str) -> Result<Arc<Binding>, RegistryError> {
        let bindings = self
            .bindings
            .read()
            .map_err(|_| RegistryError::LockPoisoned)?;
        bindings
            .get(&namespace.qualify(alias))
            .cloned()
            .ok_or_else(|| namespace.not_found(alias))
    }

    /// The object bound to `alias` in `namespace`, built on first access.
    ///
    /// # Errors
    /// - The namespace's not-found error if `alias` is not registered.
    /// - Any error raised while building; the alias stays unmaterialized.
    pub fn get(&self, namespace: Namespace, alias: &str) -> Result<Component, RegistryError> {
        let binding = self.binding(namespace, alias)?;
        if let Some(component) = binding.slot.get() {
            return Ok(component);
        }
        binding.slot.get_or_try_init(|| self.materialize(&binding.recipe))
    }

    fn materialize(&self, recipe: &Recipe) -> Result<Component, RegistryError> {
        let Recipe { namespace, alias } = recipe;
        tracing::debug!(namespace = %namespace, alias = %alias, "Materializing binding");

        let result = self.build(*namespace, alias);
        match &result {
            Ok(_) => tracing::info!("Materialized '{}'", namespace.qualify(alias)),
            Err(error) => tracing::warn!(
                namespace = %namespace,
                alias = %alias,
                error = %error,
                "Failed to materialize binding"
            ),
        }
        result
    }

    fn build(&self, namespace: Namespace, alias: &str) -> Result<Component, RegistryError> {
        let ctx = self.ctx.as_ref();
        match namespace {
            Namespace::Key => {
                let entry = self.config.key(alias)?;
                resolver::resolve(entry, alias, ctx).map(Component::Key)
            }
            Namespace::KeySet => {
                let entry = self.config.key_set(alias)?;
                compose_key_set(alias, entry, &self.config, ctx, self).map(Component::KeySet)
            }
            Namespace::HeaderProfile => {
                let profile = self.config.header_profile(alias)?;
                self.header_checker_manager_factory()?
                    .create(alias, profile, ctx)
                    .map(Component::HeaderCheckerManager)
            }
            Namespace::ClaimProfile => {
                let profile = self.config.claim_profile(alias)?;
                self.claim_checker_manager_factory()?
                    .create(alias, profile, ctx)
                    .map(Component::ClaimCheckerManager)
            }
        }
    }

    // ---- typed accessors ----

    /// The key bound to `alias`.
    ///
    /// # Errors
    /// See [`Registry::get`].
    pub fn key(&self, alias: &str) -> Result<Arc<Jwk>, RegistryError> {
        resolver::expect_domain(self.get(Namespace::Key, alias)?, alias)
    }

    /// The key bound to the configured default key alias.
    ///
    /// # Errors
    /// See [`Registry::get`].
    pub fn default_key(&self) -> Result<Arc<Jwk>, RegistryError> {
        self.key(self.config.default_key_name())
    }

    /// The key set bound to `alias`.
    ///
    /// # Errors
    /// See [`Registry::get`].
    pub fn key_set(&self, alias: &str) -> Result<Arc<KeySet>, RegistryError> {
        resolver::expect_domain(self.get(Namespace::KeySet, alias)?, alias)
    }

    /// The key set bound to the configured default key set alias.
    ///
    /// # Errors
    /// See [`Registry::get`].
    pub fn default_key_set(&self) -> Result<Arc<KeySet>, RegistryError> {
        self.key_set(self.config.default_key_set_name())
    }

    /// The header checker manager of the profile named `profile`.
    ///
    /// # Errors
    /// See [`Registry::get`].
    pub fn header_checker_manager(
        &self,
        profile: &str,
    ) -> Result<Arc<HeaderCheckerManager>, RegistryError> {
        resolver::expect_domain(self.get(Namespace::HeaderProfile, profile)?, profile)
    }

    /// The header checker manager of the default header profile.
    ///
    /// # Errors
    /// See [`Registry::get`].
    pub fn default_header_checker_manager(
        &self,
    ) -> Result<Arc<HeaderCheckerManager>, RegistryError> {
        self.header_checker_manager(self.config.default_header_profile_name())
    }

    /// The claim checker manager of the profile named `profile`.
    ///
    /// # Errors
    /// See [`Registry::get`].
    pub fn claim_checker_manager(
        &self,
        profile: &str,
    ) -> Result<Arc<ClaimCheckerManager>, RegistryError> {
        resolver::expect_domain(self.get(Namespace::ClaimProfile, profile)?, profile)
    }

    /// The claim checker manager of the default claim profile.
    ///
    /// # Errors
    /// See [`Registry::get`].
    pub fn default_claim_checker_manager(&self) -> Result<Arc<ClaimCheckerManager>, RegistryError> {
        self.claim_checker_manager(self.config.default_claim_profile_name())
    }

    // ---- singletons ----

    /// The factory holding every configured algorithm.
    ///
    /// # Errors
    /// The first algorithm entry that fails to resolve.
    pub fn algorithm_manager_factory(&self) -> Result<Arc<AlgorithmManagerFactory>, RegistryError> {
        self.algorithm_factory.get_or_try_init(|| {
            assemble_algorithm_factory(&self.config, self.ctx.as_ref()).map(Arc::new)
        })
    }

    /// A manager over every configured algorithm.
    ///
    /// # Errors
    /// See [`Registry::algorithm_manager_factory`].
    pub fn algorithm_manager(&self) -> Result<Arc<AlgorithmManager>, RegistryError> {
        self.algorithm_manager
            .get_or_try_init(|| Ok(Arc::new(self.algorithm_manager_factory()?.create_all())))
    }

    /// A manager restricted to `names`. Not cached.
    ///
    /// # Errors
    /// - `RegistryError::AlgorithmNotFound` for a name that is not configured.
    /// - See [`Registry::algorithm_manager_factory`].
    pub fn algorithm_manager_for<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<AlgorithmManager, RegistryError> {
        self.algorithm_manager_factory()?.create(names)
    }

    /// The factory holding every configured header checker and token type.
    ///
    /// # Errors
    /// The first entry that fails to resolve.
    pub fn header_checker_manager_factory(
        &self,
    ) -> Result<Arc<HeaderCheckerManagerFactory>, RegistryError> {
        self.header_factory.get_or_try_init(|| {
            assemble_header_checker_factory(&self.config, self.ctx.as_ref()).map(Arc::new)
        })
    }

    /// The factory holding every configured claim checker.
    ///
    /// # Errors
    /// The first entry that fails to resolve.
    pub fn claim_checker_manager_factory(
        &self,
    ) -> Result<Arc<ClaimCheckerManagerFactory>, RegistryError> {
        self.claim_factory.get_or_try_init(|| {
            assemble_claim_checker_factory(&self.config, self.ctx.as_ref()).map(Arc::new)
        })
    }
}

impl KeyLookup for Registry {
    fn key(&self, alias: &str) -> Result<Arc<Jwk>, RegistryError> {
        Self::key(self, alias)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("bindings", &self.bindings().unwrap_or_default())
            .finish_non_exhaustive()
    }
}
