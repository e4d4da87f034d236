//! Key set composition.
//!
//! A key set entry is either supplied whole (instance, factory, service), in
//! which case it goes through the entry resolver, or it is a composite list of
//! members resolved one by one:
//!
//! - a key instance is used as-is;
//! - a configured key alias is fetched from the registry, so the set shares
//!   the cached key object;
//! - a factory is invoked through the resolver;
//! - a name known to the context is resolved by name;
//! - raw key material is read as a JWK unchanged.
//!
//! A name that is neither an alias nor a service fails the whole set; a partial
//! set is never returned.

use std::sync::Arc;

use jsonwebtoken::jwk::Jwk;

use crate::component::DomainKind;
use crate::context::ResolutionContext;
use crate::error::RegistryError;
use crate::model::{Entry, JwtConfig, KeyMember, KeySetEntry};
use crate::resolver;

use super::KeySet;

/// Access to the cached keys of the registry.
pub trait KeyLookup {
    /// The registry-cached key configured under `alias`.
    ///
    /// # Errors
    /// Propagates the key's materialization error.
    fn key(&self, alias: &str) -> Result<Arc<Jwk>, RegistryError>;
}

/// Build the key set configured under `alias`.
///
/// # Errors
/// - `RegistryError::Unresolvable` naming the member index of the first member
///   that matches no strategy.
/// - `RegistryError::InvalidKeyMaterial` if raw material is not a JWK.
/// - Any error raised while resolving a member or the whole entry.
pub fn compose_key_set(
    alias: &str,
    entry: &KeySetEntry,
    config: &JwtConfig,
    ctx: &dyn ResolutionContext,
    keys: &dyn KeyLookup,
) -> Result<Arc<KeySet>, RegistryError> {
    let members = match entry {
        KeySetEntry::Whole(whole) => return resolver::resolve(whole, alias, ctx),
        KeySetEntry::Composite(members) => members,
    };

    let mut resolved = Vec::with_capacity(members.len());
    for (index, member) in members.iter().enumerate() {
        let key = resolve_member(alias, index, member, config, ctx, keys)?;
        resolved.push(key);
    }

    tracing::debug!(alias, keys = resolved.len(), "Composed key set");
    Ok(Arc::new(KeySet::new(resolved)))
}

fn resolve_member(
    alias: &str,
    index: usize,
    member: &KeyMember,
    config: &JwtConfig,
    ctx: &dyn ResolutionContext,
    keys: &dyn KeyLookup,
) -> Result<Arc<Jwk>, RegistryError> {
    match member {
        KeyMember::Instance(key) => Ok(Arc::clone(key)),
        KeyMember::Name(name) if config.has_key(name) => keys.key(name),
        KeyMember::Factory(factory) => {
            let entry: Entry<Arc<Jwk>> = Entry::Factory(factory.clone());
            resolver::resolve(&entry, alias, ctx).map_err(|error| error.at_member(index))
        }
        KeyMember::Name(name) if ctx.has(name) => {
            let component = ctx.resolve_by_name(name)?;
            resolver::expect_domain(component, alias).map_err(|error| error.at_member(index))
        }
        KeyMember::Name(_) => Err(RegistryError::Unresolvable {
            domain: DomainKind::KeySet,
            alias: alias.to_string(),
            member: Some(index),
        }),
        KeyMember::Raw(raw) => serde_json::from_value::<Jwk>(raw.clone())
            .map(Arc::new)
            .map_err(|error| RegistryError::InvalidKeyMaterial {
                alias: alias.to_string(),
                member: index,
                reason: error.to_string(),
            }),
    }
}
