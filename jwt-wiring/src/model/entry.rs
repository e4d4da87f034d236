//! Declarative entries: how to obtain one domain object.

use std::sync::Arc;

use jsonwebtoken::jwk::Jwk;
use serde_json::Value;

use crate::algorithm::Algorithm;
use crate::checker::{ClaimChecker, HeaderChecker, TokenTypeSupport};
use crate::context::Factory;
use crate::keys::KeySet;

/// How to obtain an object of one domain.
#[derive(Debug, Clone)]
pub enum Entry<T> {
    /// An already-constructed object, used as-is.
    Instance(T),
    /// A constructor invoked through the resolution context.
    Factory(Factory),
    /// A name the resolution context can resolve.
    Service(String),
}

impl<T> Entry<T> {
    pub fn service(name: impl Into<String>) -> Self {
        Self::Service(name.into())
    }
}

impl<T> From<Factory> for Entry<T> {
    fn from(factory: Factory) -> Self {
        Self::Factory(factory)
    }
}

pub type KeyEntry = Entry<Arc<Jwk>>;
pub type AlgorithmEntry = Entry<Arc<dyn Algorithm>>;
pub type HeaderCheckerEntry = Entry<Arc<dyn HeaderChecker>>;
pub type ClaimCheckerEntry = Entry<Arc<dyn ClaimChecker>>;
pub type TokenTypeEntry = Entry<Arc<dyn TokenTypeSupport>>;

impl From<Jwk> for KeyEntry {
    fn from(jwk: Jwk) -> Self {
        Self::Instance(Arc::new(jwk))
    }
}

/// One member of a composite key set.
#[derive(Debug, Clone)]
pub enum KeyMember {
    /// A key object, used as-is.
    Instance(Arc<Jwk>),
    /// A configured key alias, or failing that a service name.
    Name(String),
    Factory(Factory),
    /// Pre-shaped key material, read as a JWK without further lookup.
    Raw(Value),
}

impl From<&str> for KeyMember {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for KeyMember {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Jwk> for KeyMember {
    fn from(jwk: Jwk) -> Self {
        Self::Instance(Arc::new(jwk))
    }
}

impl From<Arc<Jwk>> for KeyMember {
    fn from(jwk: Arc<Jwk>) -> Self {
        Self::Instance(jwk)
    }
}

impl From<Factory> for KeyMember {
    fn from(factory: Factory) -> Self {
        Self::Factory(factory)
    }
}

impl From<Value> for KeyMember {
    fn from(raw: Value) -> Self {
        Self::Raw(raw)
    }
}

/// How to obtain a key set.
#[derive(Debug, Clone)]
pub enum KeySetEntry {
    /// The whole set is supplied by one entry.
    Whole(Entry<Arc<KeySet>>),
    /// The set is assembled from members, in order.
    Composite(Vec<KeyMember>),
}

impl KeySetEntry {
    pub fn composite<I, M>(members: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<KeyMember>,
    {
        Self::Composite(members.into_iter().map(Into::into).collect())
    }

    pub fn service(name: impl Into<String>) -> Self {
        Self::Whole(Entry::service(name))
    }
}

impl From<Entry<Arc<KeySet>>> for KeySetEntry {
    fn from(entry: Entry<Arc<KeySet>>) -> Self {
        Self::Whole(entry)
    }
}

impl From<KeySet> for KeySetEntry {
    fn from(key_set: KeySet) -> Self {
        Self::Whole(Entry::Instance(Arc::new(key_set)))
    }
}

impl From<Factory> for KeySetEntry {
    fn from(factory: Factory) -> Self {
        Self::Whole(Entry::Factory(factory))
    }
}

/// One participant of a checker profile.
#[derive(Debug, Clone)]
pub enum ProfileMember<T> {
    /// Alias of a checker configured in the same section.
    Ref(String),
    Inline(Entry<T>),
}

impl<T> From<&str> for ProfileMember<T> {
    fn from(alias: &str) -> Self {
        Self::Ref(alias.to_string())
    }
}

impl<T> From<Entry<T>> for ProfileMember<T> {
    fn from(entry: Entry<T>) -> Self {
        Self::Inline(entry)
    }
}

/// A named header checker profile.
#[derive(Debug, Clone, Default)]
pub struct HeaderProfile {
    pub headers: Vec<ProfileMember<Arc<dyn HeaderChecker>>>,
    /// Token types supported in addition to the globally configured ones.
    pub token_types: Vec<TokenTypeEntry>,
}

/// A named claim checker profile.
#[derive(Debug, Clone, Default)]
pub struct ClaimProfile {
    pub claims: Vec<ProfileMember<Arc<dyn ClaimChecker>>>,
}

impl ClaimProfile {
    pub fn new<I, M>(claims: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ProfileMember<Arc<dyn ClaimChecker>>>,
    {
        Self {
            claims: claims.into_iter().map(Into::into).collect(),
        }
    }
}

impl HeaderProfile {
    pub fn new<I, M>(headers: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ProfileMember<Arc<dyn HeaderChecker>>>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            token_types: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_token_type(mut self, entry: TokenTypeEntry) -> Self {
        self.token_types.push(entry);
        self
    }
}
