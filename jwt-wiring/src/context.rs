//! Resolution context: the capabilities the registry needs from its host.
//!
//! The host application supplies a `ResolutionContext` that can look up named
//! components and invoke factories. `ServiceContainer` is a small in-process
//! implementation used by the binary and the tests; hosts with their own
//! component graph implement the trait directly.
//!
//! # Invariants
//! - `has(name)` is true exactly when `resolve_by_name(name)` would not fail
//!   with `ContextError::NotFound`.
//! - Factories are re-invoked on every call; caching is the registry's job.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::algorithm::{Algorithm, JwsAlgorithm};
use crate::checker::{
    ExpirationTimeChecker, IssuedAtChecker, JwsTokenSupport, NotBeforeChecker,
};
use crate::component::Component;
use crate::error::ContextError;
use crate::time::TimeSource;

type FactoryFn = dyn Fn(&dyn ResolutionContext) -> Result<Component, ContextError> + Send + Sync;

/// A deferred constructor for a domain object.
///
/// The factory receives the context it is invoked through and pulls any
/// dependencies it needs from there.
#[derive(Clone)]
pub struct Factory(Arc<FactoryFn>);

impl Factory {
    /// Wrap a closure producing anything convertible into a [`Component`].
    pub fn new<T, F>(constructor: F) -> Self
    where
        T: Into<Component>,
        F: Fn(&dyn ResolutionContext) -> Result<T, ContextError> + Send + Sync + 'static,
    {
        Self(Arc::new(move |ctx| constructor(ctx).map(Into::into)))
    }

    /// Run the constructor against `ctx`.
    pub fn call(&self, ctx: &dyn ResolutionContext) -> Result<Component, ContextError> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Factory(..)")
    }
}

/// Capabilities the registry consumes from the host environment.
pub trait ResolutionContext: Send + Sync {
    /// Whether a component is known under `name`.
    fn has(&self, name: &str) -> bool;

    /// Produce the component registered under `name`.
    ///
    /// # Errors
    /// Returns `ContextError::NotFound` if the name is unknown.
    fn resolve_by_name(&self, name: &str) -> Result<Component, ContextError>;

    /// Invoke a factory, supplying its dependencies from this context.
    ///
    /// # Errors
    /// Returns `ContextError::Invocation` if a dependency is missing or the
    /// constructor fails.
    fn invoke(&self, factory: &Factory) -> Result<Component, ContextError>;
}

#[derive(Debug, Clone)]
enum Service {
    Shared(Component),
    Factory(Factory),
}

/// A name-keyed component container.
///
/// Shared components are returned as-is on every lookup; factory services
/// run on every lookup.
#[derive(Debug, Default, Clone)]
pub struct ServiceContainer {
    services: HashMap<String, Service>,
}

impl ServiceContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A container pre-populated with the built-in components.
    ///
    /// Registers every JWS algorithm under its name (`"HS256"`, `"RS256"`, ...),
    /// `"jws"` token support, and the `"iat"`, `"nbf"` and `"exp"` claim
    /// checkers reading time from `clock` with `leeway_secs` of tolerance.
    #[must_use]
    pub fn with_builtins(clock: Arc<dyn TimeSource>, leeway_secs: u64) -> Self {
        let mut container = Self::new();
        for algorithm in JwsAlgorithm::all() {
            let name = algorithm.name().to_string();
            container.insert(name, Component::algorithm(algorithm));
        }
        container.insert("jws", Component::token_type(JwsTokenSupport));
        container.insert(
            "iat",
            Component::claim_checker(IssuedAtChecker::new(Arc::clone(&clock), leeway_secs)),
        );
        container.insert(
            "nbf",
            Component::claim_checker(NotBeforeChecker::new(Arc::clone(&clock), leeway_secs)),
        );
        container.insert(
            "exp",
            Component::claim_checker(ExpirationTimeChecker::new(clock, leeway_secs)),
        );
        container
    }

    /// Register a shared component under `name`, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, component: Component) {
        self.services.insert(name.into(), Service::Shared(component));
    }

    /// Register a factory service under `name`, replacing any previous one.
    pub fn insert_factory(&mut self, name: impl Into<String>, factory: Factory) {
        self.services.insert(name.into(), Service::Factory(factory));
    }

    /// Names of all registered services, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl ResolutionContext for ServiceContainer {
    fn has(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    fn resolve_by_name(&self, name: &str) -> Result<Component, ContextError> {
        match self.services.get(name) {
            Some(Service::Shared(component)) => Ok(component.clone()),
            Some(Service::Factory(factory)) => self.invoke(factory),
            None => Err(ContextError::NotFound(name.to_string())),
        }
    }

    fn invoke(&self, factory: &Factory) -> Result<Component, ContextError> {
        factory.call(self).map_err(|error| match error {
            ContextError::Invocation(_) => error,
            ContextError::NotFound(name) => {
                ContextError::Invocation(format!("missing dependency '{name}'"))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::DomainKind;
    use crate::testing::oct_key;

    #[test]
    fn test_shared_component_is_returned_unchanged() {
        let mut container = ServiceContainer::new();
        container.insert("signing", Component::key(oct_key("signing")));

        let first = container.resolve_by_name("signing").expect("known");
        let second = container.resolve_by_name("signing").expect("known");
        match (first, second) {
            (Component::Key(a), Component::Key(b)) => assert!(Arc::ptr_eq(&a, &b)),
            _ => panic!("expected keys"),
        }
    }

    #[test]
    fn test_unknown_name_is_not_found() {
        let container = ServiceContainer::new();
        assert!(!container.has("missing"));
        assert_eq!(
            container.resolve_by_name("missing").map(|c| c.kind()),
            Err(ContextError::NotFound("missing".to_string()))
        );
    }

    #[test]
    fn test_factory_service_runs_per_lookup() {
        let mut container = ServiceContainer::new();
        container.insert_factory("fresh", Factory::new(|_| Ok(oct_key("fresh"))));

        let first = container.resolve_by_name("fresh").expect("known");
        let second = container.resolve_by_name("fresh").expect("known");
        match (first, second) {
            (Component::Key(a), Component::Key(b)) => assert!(!Arc::ptr_eq(&a, &b)),
            _ => panic!("expected keys"),
        }
    }

    #[test]
    fn test_invoke_autowires_from_container() {
        let mut container = ServiceContainer::new();
        container.insert("base", Component::key(oct_key("base")));

        let factory = Factory::new(|ctx: &dyn ResolutionContext| {
            match ctx.resolve_by_name("base")? {
                Component::Key(key) => Ok(key),
                other => Err(ContextError::Invocation(format!("unexpected {}", other.kind()))),
            }
        });

        let component = container.invoke(&factory).expect("invoked");
        assert_eq!(component.kind(), DomainKind::Key);
    }

    #[test]
    fn test_invoke_reports_missing_dependency_as_invocation_error() {
        let container = ServiceContainer::new();
        let factory = Factory::new(|ctx: &dyn ResolutionContext| ctx.resolve_by_name("absent"));

        let result = container.invoke(&factory);
        assert_eq!(
            result.map(|c| c.kind()),
            Err(ContextError::Invocation(
                "missing dependency 'absent'".to_string()
            ))
        );
    }

    #[test]
    fn test_builtins_are_registered() {
        let container =
            ServiceContainer::with_builtins(Arc::new(crate::time::SystemTimeSource), 0);

        for name in ["HS256", "RS256", "EdDSA", "jws", "iat", "nbf", "exp"] {
            assert!(container.has(name), "missing builtin {name}");
        }
        assert_eq!(
            container.resolve_by_name("HS256").map(|c| c.kind()),
            Ok(DomainKind::Algorithm)
        );
    }
}
