//! Checker managers and their factories.
//!
//! A factory holds every named checker of one kind, already resolved. A
//! manager is the factory scoped to one profile: exactly the profile's
//! checkers, in the declared order.
//!
//! # Invariants
//! - A manager never changes after it is created.
//! - Profile members that reference an alias must name a checker in the
//!   factory; inline members are resolved on creation.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::component::DomainKind;
use crate::context::ResolutionContext;
use crate::error::RegistryError;
use crate::model::{ClaimProfile, HeaderProfile, JwtConfig, ProfileMember};
use crate::resolver;

use super::{CheckerError, ClaimChecker, HeaderChecker, TokenTypeSupport};

/// Resolve the members of a profile named `profile` against `named`.
fn resolve_profile<T>(
    kind: DomainKind,
    profile: &str,
    members: &[ProfileMember<Arc<T>>],
    named: &HashMap<String, Arc<T>>,
    ctx: &dyn ResolutionContext,
) -> Result<Vec<Arc<T>>, RegistryError>
where
    T: ?Sized,
    Arc<T>: crate::component::DomainObject,
{
    members
        .iter()
        .enumerate()
        .map(|(index, member)| match member {
            ProfileMember::Ref(alias) => {
                named
                    .get(alias)
                    .cloned()
                    .ok_or_else(|| RegistryError::Unresolvable {
                        domain: kind,
                        alias: profile.to_string(),
                        member: Some(index),
                    })
            }
            ProfileMember::Inline(entry) => {
                resolver::resolve(entry, profile, ctx).map_err(|error| error.at_member(index))
            }
        })
        .collect()
}

/// Header checkers by alias, plus the token types every manager supports.
#[derive(Debug, Default, Clone)]
pub struct HeaderCheckerManagerFactory {
    checkers: HashMap<String, Arc<dyn HeaderChecker>>,
    token_types: Vec<Arc<dyn TokenTypeSupport>>,
}

impl HeaderCheckerManagerFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, alias: impl Into<String>, checker: Arc<dyn HeaderChecker>) {
        self.checkers.insert(alias.into(), checker);
    }

    pub fn add_token_type_support(&mut self, support: Arc<dyn TokenTypeSupport>) {
        self.token_types.push(support);
    }

    /// Registered checker aliases, sorted.
    #[must_use]
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.checkers.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }

    /// A manager for the profile named `name`.
    ///
    /// The manager supports the factory's token types followed by the
    /// profile's own.
    ///
    /// # Errors
    /// - `RegistryError::Unresolvable` naming the member index of a reference
    ///   to an unknown checker alias.
    /// - Any error raised while resolving an inline member.
    pub fn create(
        &self,
        name: &str,
        profile: &HeaderProfile,
        ctx: &dyn ResolutionContext,
    ) -> Result<Arc<HeaderCheckerManager>, RegistryError> {
        let checkers = resolve_profile(
            DomainKind::HeaderChecker,
            name,
            &profile.headers,
            &self.checkers,
            ctx,
        )?;
        let mut token_types = self.token_types.clone();
        for (index, entry) in profile.token_types.iter().enumerate() {
            let support =
                resolver::resolve(entry, name, ctx).map_err(|error| error.at_member(index))?;
            token_types.push(support);
        }
        Ok(Arc::new(HeaderCheckerManager {
            checkers,
            token_types,
        }))
    }
}

/// The header checkers and token types of one profile.
#[derive(Debug, Clone)]
pub struct HeaderCheckerManager {
    checkers: Vec<Arc<dyn HeaderChecker>>,
    token_types: Vec<Arc<dyn TokenTypeSupport>>,
}

impl HeaderCheckerManager {
    /// Check a decoded protected header.
    ///
    /// The header must be supported by at least one token type, when any are
    /// configured. Each checker then runs against its header parameter if the
    /// parameter is present.
    ///
    /// # Errors
    /// - `CheckerError::UnsupportedTokenType` if no token type supports it.
    /// - The first failing checker's error.
    pub fn check(&self, header: &Map<String, Value>) -> Result<(), CheckerError> {
        if !self.token_types.is_empty()
            && !self.token_types.iter().any(|support| support.supports(header))
        {
            return Err(CheckerError::UnsupportedTokenType);
        }
        for checker in &self.checkers {
            if let Some(value) = header.get(checker.supported_header()) {
                checker.check_header(value)?;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn checkers(&self) -> &[Arc<dyn HeaderChecker>] {
        &self.checkers
    }

    #[must_use]
    pub fn token_types(&self) -> &[Arc<dyn TokenTypeSupport>] {
        &self.token_types
    }
}

/// Claim checkers by alias.
#[derive(Debug, Default, Clone)]
pub struct ClaimCheckerManagerFactory {
    checkers: HashMap<String, Arc<dyn ClaimChecker>>,
}

impl ClaimCheckerManagerFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, alias: impl Into<String>, checker: Arc<dyn ClaimChecker>) {
        self.checkers.insert(alias.into(), checker);
    }

    /// Registered checker aliases, sorted.
    #[must_use]
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.checkers.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }

    /// A manager for the profile named `name`.
    ///
    /// # Errors
    /// - `RegistryError::Unresolvable` naming the member index of a reference
    ///   to an unknown checker alias.
    /// - Any error raised while resolving an inline member.
    pub fn create(
        &self,
        name: &str,
        profile: &ClaimProfile,
        ctx: &dyn ResolutionContext,
    ) -> Result<Arc<ClaimCheckerManager>, RegistryError> {
        let checkers = resolve_profile(
            DomainKind::ClaimChecker,
            name,
            &profile.claims,
            &self.checkers,
            ctx,
        )?;
        Ok(Arc::new(ClaimCheckerManager { checkers }))
    }
}

/// The claim checkers of one profile.
#[derive(Debug, Clone)]
pub struct ClaimCheckerManager {
    checkers: Vec<Arc<dyn ClaimChecker>>,
}

impl ClaimCheckerManager {
    /// Check the claims of a decoded payload.
    ///
    /// Each checker runs against its claim if the claim is present. Claims in
    /// `mandatory` must be present whether or not a checker covers them.
    /// Returns the names of the claims that were checked, in checker order.
    ///
    /// # Errors
    /// - The first failing checker's error.
    /// - `CheckerError::MissingMandatoryClaims` listing every absent
    ///   mandatory claim.
    pub fn check<S: AsRef<str>>(
        &self,
        claims: &Map<String, Value>,
        mandatory: &[S],
    ) -> Result<Vec<String>, CheckerError> {
        let mut checked = Vec::new();
        for checker in &self.checkers {
            let claim = checker.supported_claim();
            if let Some(value) = claims.get(claim) {
                checker.check_claim(value)?;
                checked.push(claim.to_string());
            }
        }

        let missing: Vec<String> = mandatory
            .iter()
            .map(AsRef::as_ref)
            .filter(|claim| !claims.contains_key(*claim))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(CheckerError::MissingMandatoryClaims(missing));
        }
        Ok(checked)
    }

    #[must_use]
    pub fn checkers(&self) -> &[Arc<dyn ClaimChecker>] {
        &self.checkers
    }
}

/// Resolve the configured header checkers and token types into a factory.
///
/// # Errors
/// Propagates the first entry that fails to resolve.
pub fn assemble_header_checker_factory(
    config: &JwtConfig,
    ctx: &dyn ResolutionContext,
) -> Result<HeaderCheckerManagerFactory, RegistryError> {
    let mut factory = HeaderCheckerManagerFactory::new();
    for (alias, entry) in config.header_checkers() {
        factory.add(alias.clone(), resolver::resolve(entry, alias, ctx)?);
    }
    for (index, entry) in config.token_types().iter().enumerate() {
        let support = resolver::resolve(entry, "token_types", ctx)
            .map_err(|error| error.at_member(index))?;
        factory.add_token_type_support(support);
    }
    tracing::debug!(
        checkers = ?factory.aliases(),
        token_types = factory.token_types.len(),
        "Assembled header checker manager factory"
    );
    Ok(factory)
}

/// Resolve the configured claim checkers into a factory.
///
/// # Errors
/// Propagates the first entry that fails to resolve.
pub fn assemble_claim_checker_factory(
    config: &JwtConfig,
    ctx: &dyn ResolutionContext,
) -> Result<ClaimCheckerManagerFactory, RegistryError> {
    let mut factory = ClaimCheckerManagerFactory::new();
    for (alias, entry) in config.claim_checkers() {
        factory.add(alias.clone(), resolver::resolve(entry, alias, ctx)?);
    }
    tracing::debug!(checkers = ?factory.aliases(), "Assembled claim checker manager factory");
    Ok(factory)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::checker::{
        AlgorithmChecker, AudienceChecker, ExpirationTimeChecker, IssuerChecker, JwsTokenSupport,
    };
    use crate::context::ServiceContainer;
    use crate::model::Entry;
    use crate::time::FixedTimeSource;

    const NOW: u64 = 1_700_000_000;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    fn claim_factory() -> ClaimCheckerManagerFactory {
        let mut factory = ClaimCheckerManagerFactory::new();
        factory.add(
            "exp",
            Arc::new(ExpirationTimeChecker::new(Arc::new(FixedTimeSource(NOW)), 0)),
        );
        factory.add("iss", Arc::new(IssuerChecker::new(["https://issuer.example"])));
        factory
    }

    #[test]
    fn test_profile_keeps_declared_order() {
        let factory = claim_factory();
        let profile = ClaimProfile::new(["iss", "exp"]);

        let manager = factory
            .create("default", &profile, &ServiceContainer::new())
            .expect("created");

        let claims: Vec<&str> = manager
            .checkers()
            .iter()
            .map(|checker| checker.supported_claim())
            .collect();
        assert_eq!(claims, vec!["iss", "exp"]);
    }

    #[test]
    fn test_unknown_reference_reports_profile_and_index() {
        let factory = claim_factory();
        let profile = ClaimProfile::new(["exp", "jti"]);

        let result = factory.create("strict", &profile, &ServiceContainer::new());

        assert_eq!(
            result.err(),
            Some(RegistryError::Unresolvable {
                domain: DomainKind::ClaimChecker,
                alias: "strict".to_string(),
                member: Some(1),
            })
        );
    }

    #[test]
    fn test_inline_members_are_resolved() {
        let mut container = ServiceContainer::new();
        container.insert(
            "checker.aud",
            crate::component::Component::claim_checker(AudienceChecker::new("api")),
        );
        let profile = ClaimProfile {
            claims: vec![
                ProfileMember::Ref("exp".to_string()),
                ProfileMember::Inline(Entry::service("checker.aud")),
            ],
        };

        let manager = claim_factory()
            .create("api", &profile, &container)
            .expect("created");

        assert_eq!(manager.checkers().len(), 2);
        assert_eq!(manager.checkers()[1].supported_claim(), "aud");
    }

    #[test]
    fn test_claim_check_runs_present_claims_only() {
        let manager = claim_factory()
            .create("default", &ClaimProfile::new(["exp", "iss"]), &ServiceContainer::new())
            .expect("created");

        let checked = manager
            .check(&object(json!({"exp": NOW + 60, "sub": "alice"})), &[] as &[&str])
            .expect("valid");
        assert_eq!(checked, vec!["exp"]);

        let expired = manager.check(&object(json!({"exp": NOW - 1})), &[] as &[&str]);
        assert!(matches!(expired, Err(CheckerError::InvalidClaim { .. })));
    }

    #[test]
    fn test_missing_mandatory_claims_are_listed() {
        let manager = claim_factory()
            .create("default", &ClaimProfile::new(["exp"]), &ServiceContainer::new())
            .expect("created");

        let result = manager.check(&object(json!({"exp": NOW + 60})), &["exp", "iss", "sub"]);
        assert_eq!(
            result,
            Err(CheckerError::MissingMandatoryClaims(vec![
                "iss".to_string(),
                "sub".to_string()
            ]))
        );
    }

    #[test]
    fn test_header_check_requires_supported_token_type() {
        let mut factory = HeaderCheckerManagerFactory::new();
        factory.add("alg", Arc::new(AlgorithmChecker::new(["HS256"])));
        factory.add_token_type_support(Arc::new(JwsTokenSupport));

        let manager = factory
            .create("default", &HeaderProfile::new(["alg"]), &ServiceContainer::new())
            .expect("created");

        assert!(manager.check(&object(json!({"alg": "HS256"}))).is_ok());
        assert!(matches!(
            manager.check(&object(json!({"alg": "RS256"}))),
            Err(CheckerError::InvalidHeader { .. })
        ));
        assert_eq!(
            manager.check(&object(json!({"enc": "A128GCM"}))),
            Err(CheckerError::UnsupportedTokenType)
        );
    }

    #[test]
    fn test_profile_token_types_extend_global_ones() {
        let mut factory = HeaderCheckerManagerFactory::new();
        factory.add_token_type_support(Arc::new(JwsTokenSupport));
        let profile = HeaderProfile::default().with_token_type(Entry::Instance(Arc::new(
            JwsTokenSupport,
        )));

        let manager = factory
            .create("default", &profile, &ServiceContainer::new())
            .expect("created");

        assert_eq!(manager.token_types().len(), 2);
        assert!(manager.checkers().is_empty());
    }

    #[test]
    fn test_unknown_profile_token_type_reports_index() {
        let mut factory = HeaderCheckerManagerFactory::new();
        factory.add_token_type_support(Arc::new(JwsTokenSupport));
        let profile = HeaderProfile::default()
            .with_token_type(Entry::Instance(Arc::new(JwsTokenSupport)))
            .with_token_type(Entry::service("jwe"));

        let result = factory.create("encrypted", &profile, &ServiceContainer::new());

        assert_eq!(
            result.err(),
            Some(RegistryError::Unresolvable {
                domain: DomainKind::TokenType,
                alias: "encrypted".to_string(),
                member: Some(1),
            })
        );
    }

    #[test]
    fn test_assemble_from_default_config() {
        let config = JwtConfig::default();
        let container = ServiceContainer::with_builtins(Arc::new(FixedTimeSource(NOW)), 0);

        let claims = assemble_claim_checker_factory(&config, &container).expect("assembled");
        assert_eq!(claims.aliases(), vec!["exp", "iat", "nbf"]);

        let headers = assemble_header_checker_factory(&config, &container).expect("assembled");
        assert!(headers.aliases().is_empty());
        assert_eq!(headers.token_types.len(), 1);
    }

    #[test]
    fn test_assemble_fails_on_unknown_service() {
        let config = JwtConfig::empty().with_claim_checker("aud", Entry::service("checker.aud"));

        let result = assemble_claim_checker_factory(&config, &ServiceContainer::new());
        assert_eq!(
            result.err(),
            Some(RegistryError::Unresolvable {
                domain: DomainKind::ClaimChecker,
                alias: "aud".to_string(),
                member: None,
            })
        );
    }
}
