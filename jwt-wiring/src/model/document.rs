//! JSON form of the wiring configuration.
//!
//! Sections that are absent keep the built-in defaults of [`JwtConfig::default`];
//! a present section replaces the default section as a whole.
//!
//! String values name services in the resolution context. JSON objects under
//! `keys` are JWKs. Key set arrays become composite entries: string members are
//! key aliases or service names, object members are raw key material.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use jsonwebtoken::jwk::Jwk;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::config::{CheckersConfig, JwtConfig};
use super::entry::{
    ClaimProfile, Entry, HeaderProfile, KeyEntry, KeyMember, KeySetEntry, ProfileMember,
};

/// A JSON object read as its entries, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> IntoIterator for OrderedMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::new();
        while let Some(entry) = access.next_entry::<String, V>()? {
            entries.push(entry);
        }
        Ok(OrderedMap(entries))
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KeyDocument {
    Service(String),
    Jwk(Box<Jwk>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KeySetDocument {
    Service(String),
    Members(Vec<Value>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HeaderProfileDocument {
    pub headers: Vec<String>,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClaimProfileDocument {
    pub claims: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckersDocument {
    pub token_types: Option<Vec<String>>,
    pub header_checkers: Option<OrderedMap<String>>,
    pub claim_checkers: Option<OrderedMap<String>>,
    pub headers: Option<OrderedMap<HeaderProfileDocument>>,
    pub claims: Option<OrderedMap<ClaimProfileDocument>>,
}

/// The declarative configuration surface.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigDocument {
    pub algorithms: Option<OrderedMap<String>>,
    pub keys: BTreeMap<String, KeyDocument>,
    pub keysets: BTreeMap<String, KeySetDocument>,
    pub checkers: CheckersDocument,
    pub default_key: Option<String>,
    pub default_keyset: Option<String>,
    pub default_checker_header: Option<String>,
    pub default_checker_claim: Option<String>,
}

impl ConfigDocument {
    /// Parse a document from JSON text.
    ///
    /// # Errors
    /// Returns the `serde_json` error if the text is not a valid document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Merge the document over the built-in defaults.
    #[must_use]
    pub fn into_config(self) -> JwtConfig {
        let mut config = JwtConfig::default();

        if let Some(algorithms) = self.algorithms {
            config = config.without_algorithms();
            for (name, service) in algorithms {
                config = config.with_algorithm(name, Entry::Service(service));
            }
        }

        for (alias, key) in self.keys {
            let entry: KeyEntry = match key {
                KeyDocument::Service(name) => Entry::Service(name),
                KeyDocument::Jwk(jwk) => Entry::Instance(Arc::new(*jwk)),
            };
            config = config.with_key(alias, entry);
        }

        for (alias, key_set) in self.keysets {
            let entry = match key_set {
                KeySetDocument::Service(name) => KeySetEntry::service(name),
                KeySetDocument::Members(members) => {
                    KeySetEntry::Composite(members.into_iter().map(key_member).collect())
                }
            };
            config = config.with_key_set(alias, entry);
        }

        let checkers = merge_checkers(config.checkers().clone(), self.checkers);
        config = config.with_checkers(checkers);

        if let Some(name) = self.default_key {
            config = config.with_default_key(name);
        }
        if let Some(name) = self.default_keyset {
            config = config.with_default_key_set(name);
        }
        if let Some(name) = self.default_checker_header {
            config = config.with_default_header_profile(name);
        }
        if let Some(name) = self.default_checker_claim {
            config = config.with_default_claim_profile(name);
        }

        config
    }
}

fn key_member(member: Value) -> KeyMember {
    match member {
        Value::String(name) => KeyMember::Name(name),
        raw => KeyMember::Raw(raw),
    }
}

fn merge_checkers(mut checkers: CheckersConfig, document: CheckersDocument) -> CheckersConfig {
    if let Some(token_types) = document.token_types {
        checkers.token_types = token_types.into_iter().map(Entry::Service).collect();
    }
    if let Some(header_checkers) = document.header_checkers {
        checkers.header_checkers = header_checkers
            .into_iter()
            .map(|(alias, service)| (alias, Entry::Service(service)))
            .collect();
    }
    if let Some(claim_checkers) = document.claim_checkers {
        checkers.claim_checkers = claim_checkers
            .into_iter()
            .map(|(alias, service)| (alias, Entry::Service(service)))
            .collect();
    }
    if let Some(headers) = document.headers {
        checkers.header_profiles = headers
            .into_iter()
            .map(|(name, profile)| {
                let members = profile
                    .headers
                    .into_iter()
                    .map(|alias| profile_member(alias, |a| checkers.header_checkers.contains_key(a)))
                    .collect();
                let header_profile = HeaderProfile {
                    headers: members,
                    token_types: profile.types.into_iter().map(Entry::Service).collect(),
                };
                (name, header_profile)
            })
            .collect();
    }
    if let Some(claims) = document.claims {
        checkers.claim_profiles = claims
            .into_iter()
            .map(|(name, profile)| {
                let members = profile
                    .claims
                    .into_iter()
                    .map(|alias| profile_member(alias, |a| checkers.claim_checkers.contains_key(a)))
                    .collect();
                (name, ClaimProfile { claims: members })
            })
            .collect();
    }
    checkers
}

/// A configured alias stays a reference; anything else is looked up as a service.
fn profile_member<T>(name: String, is_alias: impl Fn(&str) -> bool) -> ProfileMember<T> {
    if is_alias(&name) {
        ProfileMember::Ref(name)
    } else {
        ProfileMember::Inline(Entry::Service(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DEFAULT_NAME;

    #[test]
    fn test_empty_document_keeps_defaults() {
        let config = ConfigDocument::from_json("{}").expect("valid").into_config();

        assert_eq!(config.algorithm_names(), vec!["HS256"]);
        assert_eq!(config.claim_checkers().len(), 3);
        assert!(config.claim_profile(DEFAULT_NAME).is_ok());
        assert!(config.header_profile(DEFAULT_NAME).is_ok());
    }

    #[test]
    fn test_algorithms_section_replaces_defaults() {
        let config = ConfigDocument::from_json(r#"{"algorithms": {"RS256": "RS256", "ES256": "ES256"}}"#)
            .expect("valid")
            .into_config();

        assert_eq!(config.algorithm_names(), vec!["RS256", "ES256"]);
        assert!(matches!(&config.algorithms()[0].1, Entry::Service(name) if name == "RS256"));
    }

    #[test]
    fn test_algorithms_keep_declared_order() {
        let config = ConfigDocument::from_json(
            r#"{"algorithms": {"RS256": "RS256", "HS256": "HS256", "ES256": "ES256"}}"#,
        )
        .expect("valid")
        .into_config();

        assert_eq!(config.algorithm_names(), vec!["RS256", "HS256", "ES256"]);
    }

    #[test]
    fn test_ordered_map_rejects_non_objects() {
        assert!(serde_json::from_str::<OrderedMap<String>>(r#"["HS256"]"#).is_err());
        assert_eq!(
            serde_json::from_str::<OrderedMap<String>>(r#"{"b": "1", "a": "2"}"#).expect("map"),
            OrderedMap(vec![
                ("b".to_string(), "1".to_string()),
                ("a".to_string(), "2".to_string()),
            ])
        );
    }

    #[test]
    fn test_keys_accept_jwk_objects_and_service_names() {
        let config = ConfigDocument::from_json(
            r#"{
                "keys": {
                    "inline": {"kty": "oct", "kid": "inline", "k": "c2VjcmV0"},
                    "external": "vault.signing"
                },
                "default_key": "inline"
            }"#,
        )
        .expect("valid")
        .into_config();

        match config.key("inline").expect("configured") {
            Entry::Instance(jwk) => assert_eq!(jwk.common.key_id.as_deref(), Some("inline")),
            other => panic!("expected instance, got {other:?}"),
        }
        assert!(matches!(
            config.key("external").expect("configured"),
            Entry::Service(name) if name == "vault.signing"
        ));
        assert_eq!(config.default_key_name(), "inline");
    }

    #[test]
    fn test_keyset_members_split_into_names_and_raw_material() {
        let config = ConfigDocument::from_json(
            r#"{
                "keysets": {
                    "default": ["k1", {"kty": "oct", "k": "c2VjcmV0"}],
                    "remote": "jwks.remote"
                }
            }"#,
        )
        .expect("valid")
        .into_config();

        match config.key_set("default").expect("configured") {
            KeySetEntry::Composite(members) => {
                assert_eq!(members.len(), 2);
                assert!(matches!(&members[0], KeyMember::Name(name) if name == "k1"));
                assert!(matches!(&members[1], KeyMember::Raw(Value::Object(_))));
            }
            other => panic!("expected composite, got {other:?}"),
        }
        assert!(matches!(
            config.key_set("remote").expect("configured"),
            KeySetEntry::Whole(Entry::Service(name)) if name == "jwks.remote"
        ));
    }

    #[test]
    fn test_profiles_reference_configured_aliases() {
        let config = ConfigDocument::from_json(
            r#"{
                "checkers": {
                    "claim_checkers": {"exp": "exp", "iat": "iat"},
                    "claims": {"strict": {"claims": ["exp", "iat", "aud.checker"]}}
                },
                "default_checker_claim": "strict"
            }"#,
        )
        .expect("valid")
        .into_config();

        let profile = config.claim_profile("strict").expect("configured");
        assert!(matches!(&profile.claims[0], ProfileMember::Ref(alias) if alias == "exp"));
        assert!(matches!(&profile.claims[1], ProfileMember::Ref(alias) if alias == "iat"));
        assert!(matches!(
            &profile.claims[2],
            ProfileMember::Inline(Entry::Service(name)) if name == "aud.checker"
        ));
        assert_eq!(config.default_claim_profile_name(), "strict");
        // Untouched sections keep their defaults.
        assert!(config.header_profile(DEFAULT_NAME).is_ok());
    }

    #[test]
    fn test_header_profile_types() {
        let config = ConfigDocument::from_json(
            r#"{"checkers": {"headers": {"default": {"headers": ["alg"], "types": ["jws"]}}}}"#,
        )
        .expect("valid")
        .into_config();

        let profile = config.header_profile(DEFAULT_NAME).expect("configured");
        assert!(matches!(
            &profile.headers[0],
            ProfileMember::Inline(Entry::Service(name)) if name == "alg"
        ));
        assert_eq!(profile.token_types.len(), 1);
    }

    #[test]
    fn test_unknown_top_level_field_is_rejected() {
        assert!(ConfigDocument::from_json(r#"{"serializers": []}"#).is_err());
    }
}
