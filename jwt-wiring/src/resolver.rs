//! Entry resolution.
//!
//! Turns one declarative [`Entry`] into a domain object. Strategies are tried
//! in a fixed order, first match wins:
//!
//! 1. `Instance` is returned unchanged.
//! 2. `Factory` is invoked through the context; the result must belong to the
//!    expected domain.
//! 3. `Service` is resolved by name if the context knows the name.
//! 4. Anything else is `RegistryError::Unresolvable`.
//!
//! Nothing is cached here. Resolving the same entry twice runs the factory or
//! the service lookup twice; the registry is what makes results singletons.

use crate::component::{Component, DomainObject};
use crate::context::ResolutionContext;
use crate::error::RegistryError;
use crate::model::Entry;

/// Resolve `entry`, configured under `alias`, into a `T`.
///
/// # Errors
/// - `RegistryError::Unresolvable` if the entry names a service the context
///   does not know.
/// - `RegistryError::TypeMismatch` if a factory or service produced another
///   domain's object.
/// - `RegistryError::Context` for failures reported by the context itself.
pub fn resolve<T: DomainObject>(
    entry: &Entry<T>,
    alias: &str,
    ctx: &dyn ResolutionContext,
) -> Result<T, RegistryError> {
    match entry {
        Entry::Instance(instance) => Ok(instance.clone()),
        Entry::Factory(factory) => expect_domain(ctx.invoke(factory)?, alias),
        Entry::Service(name) if ctx.has(name) => expect_domain(ctx.resolve_by_name(name)?, alias),
        Entry::Service(_) => Err(RegistryError::Unresolvable {
            domain: T::KIND,
            alias: alias.to_string(),
            member: None,
        }),
    }
}

/// Narrow a component to the domain `T`.
///
/// # Errors
/// Returns `RegistryError::TypeMismatch` if the component is another domain.
pub fn expect_domain<T: DomainObject>(component: Component, alias: &str) -> Result<T, RegistryError> {
    T::from_component(component).map_err(|other| RegistryError::TypeMismatch {
        domain: T::KIND,
        alias: alias.to_string(),
        member: None,
        found: other.kind(),
    })
}
