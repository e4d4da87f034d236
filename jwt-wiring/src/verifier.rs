//! Token verification over registry-provided components.
//!
//! Verifies compact JWS tokens against the default key set, restricted to the
//! configured algorithms, and runs the default header and claim checker
//! managers on the result.
//!
//! # Pre-conditions
//! - The registry has its bindings registered before `from_registry`.
//!
//! # Post-conditions
//! - On success, returns the token's claims.
//! - On failure, returns an error naming the stage that rejected the token.
//!
//! # Invariants
//! - Verification does not modify the verifier or the components it holds.
//! - Time-based claims are judged only by the claim checkers, never by
//!   `jsonwebtoken`'s built-in validation.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde_json::{Map, Value};

use crate::algorithm::{AlgorithmManager, JwsAlgorithm};
use crate::checker::{CheckerError, ClaimCheckerManager, HeaderCheckerManager};
use crate::error::RegistryError;
use crate::keys::{KeySet, oct_secret};
use crate::registry::Registry;

/// Error returned when token verification fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("invalid JWT signature")]
    InvalidSignature,
    #[error("malformed JWT")]
    MalformedToken,
    #[error("algorithm '{0}' is not allowed")]
    AlgorithmNotAllowed(String),
    #[error("no key in the key set matches the token")]
    NoMatchingKey,
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("header rejected: {0}")]
    Header(CheckerError),
    #[error("claims rejected: {0}")]
    Claims(CheckerError),
}

/// Verifies tokens with one fixed set of components.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    algorithms: Arc<AlgorithmManager>,
    keys: Arc<KeySet>,
    header_checkers: Arc<HeaderCheckerManager>,
    claim_checkers: Arc<ClaimCheckerManager>,
    mandatory_claims: Vec<String>,
}

impl TokenVerifier {
    #[must_use]
    pub const fn new(
        algorithms: Arc<AlgorithmManager>,
        keys: Arc<KeySet>,
        header_checkers: Arc<HeaderCheckerManager>,
        claim_checkers: Arc<ClaimCheckerManager>,
    ) -> Self {
        Self {
            algorithms,
            keys,
            header_checkers,
            claim_checkers,
            mandatory_claims: Vec::new(),
        }
    }

    /// A verifier over the registry's defaults: every configured algorithm,
    /// the default key set, and the default header and claim profiles.
    ///
    /// # Errors
    /// Returns the first error raised while materializing a component.
    pub fn from_registry(registry: &Registry) -> Result<Self, RegistryError> {
        Ok(Self::new(
            registry.algorithm_manager()?,
            registry.default_key_set()?,
            registry.default_header_checker_manager()?,
            registry.default_claim_checker_manager()?,
        ))
    }

    /// Require `claims` to be present in every verified token.
    #[must_use]
    pub fn with_mandatory_claims<I, S>(mut self, claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mandatory_claims = claims.into_iter().map(Into::into).collect();
        self
    }

    /// Verify `token` and return its claims.
    ///
    /// # Errors
    /// - `VerifyError::MalformedToken` if the token cannot be parsed.
    /// - `VerifyError::AlgorithmNotAllowed` if its `alg` is not configured.
    /// - `VerifyError::Header` if a header checker rejects it.
    /// - `VerifyError::NoMatchingKey` if no key fits its `kid` or algorithm.
    /// - `VerifyError::InvalidKey` if the selected key cannot verify.
    /// - `VerifyError::InvalidSignature` if the signature does not match.
    /// - `VerifyError::Claims` if a claim checker rejects it.
    pub fn verify(&self, token: &str) -> Result<Value, VerifyError> {
        let header = decode_header_map(token)?;
        let alg = header
            .get("alg")
            .and_then(Value::as_str)
            .ok_or(VerifyError::MalformedToken)?;
        let algorithm = self
            .algorithms
            .get(alg)
            .ok_or_else(|| VerifyError::AlgorithmNotAllowed(alg.to_string()))?;
        let jws = JwsAlgorithm::from_name(algorithm.name())
            .ok_or_else(|| VerifyError::AlgorithmNotAllowed(alg.to_string()))?;

        self.header_checkers
            .check(&header)
            .map_err(VerifyError::Header)?;

        let jwk = match header.get("kid").and_then(Value::as_str) {
            Some(kid) => self.keys.find_by_kid(kid),
            None => self.keys.select_for(algorithm.as_ref()),
        }
        .ok_or(VerifyError::NoMatchingKey)?;
        let key = match oct_secret(jwk) {
            Some(secret) => DecodingKey::from_secret(&secret),
            None => {
                DecodingKey::from_jwk(jwk).map_err(|e| VerifyError::InvalidKey(e.to_string()))?
            }
        };

        let mut validation = Validation::new(jws.algorithm());
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let claims = match decode::<Value>(token, &key, &validation)
            .map_err(map_jwt_error)?
            .claims
        {
            Value::Object(claims) => claims,
            _ => return Err(VerifyError::MalformedToken),
        };

        let checked = self
            .claim_checkers
            .check(&claims, &self.mandatory_claims)
            .map_err(VerifyError::Claims)?;
        tracing::debug!(alg, checked = ?checked, "Verified token");

        Ok(Value::Object(claims))
    }
}

/// Decode the protected header as a JSON object.
fn decode_header_map(token: &str) -> Result<Map<String, Value>, VerifyError> {
    let encoded = token.split('.').next().unwrap_or_default();
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| VerifyError::MalformedToken)?;
    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(header)) => Ok(header),
        _ => Err(VerifyError::MalformedToken),
    }
}

/// Maps jsonwebtoken errors to our `VerifyError` type.
fn map_jwt_error(error: jsonwebtoken::errors::Error) -> VerifyError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::InvalidSignature => VerifyError::InvalidSignature,
        ErrorKind::InvalidKeyFormat => VerifyError::InvalidKey(error.to_string()),
        ErrorKind::InvalidAlgorithm => VerifyError::NoMatchingKey,
        _ => VerifyError::MalformedToken,
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
    use serde_json::json;

    use super::*;
    use crate::model::{JwtConfig, KeySetEntry};
    use crate::testing::{NOW, TEST_SECRET, test_registry, test_secret_key};

    fn hs256_token(kid: Option<&str>, claims: &Value, secret: &[u8]) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = kid.map(str::to_string);
        encode(&header, claims, &EncodingKey::from_secret(secret)).expect("failed to create test token")
    }

    fn verifier() -> TokenVerifier {
        let config = JwtConfig::default()
            .with_key("primary", test_secret_key("primary"))
            .with_key_set("default", KeySetEntry::composite(["primary"]));
        let registry = test_registry(config);
        TokenVerifier::from_registry(&registry).expect("verifier")
    }

    #[test]
    fn test_verify_valid_token() {
        let token = hs256_token(
            Some("primary"),
            &json!({"sub": "user-123", "exp": NOW + 60, "iat": NOW}),
            TEST_SECRET,
        );

        let claims = verifier().verify(&token).expect("verified token");
        assert_eq!(claims["sub"], "user-123");
    }

    #[test]
    fn test_verify_picks_key_by_algorithm_without_kid() {
        let token = hs256_token(None, &json!({"sub": "user-123"}), TEST_SECRET);

        assert!(verifier().verify(&token).is_ok());
    }

    #[test]
    fn test_verify_invalid_signature() {
        let token = hs256_token(
            Some("primary"),
            &json!({"sub": "user-123"}),
            b"wrong-secret-key-that-is-different",
        );

        assert_eq!(verifier().verify(&token), Err(VerifyError::InvalidSignature));
    }

    #[test]
    fn test_verify_unknown_kid() {
        let token = hs256_token(Some("rotated-out"), &json!({"sub": "user-123"}), TEST_SECRET);

        assert_eq!(verifier().verify(&token), Err(VerifyError::NoMatchingKey));
    }

    #[test]
    fn test_verify_expired_token_is_rejected_by_claim_checker() {
        let token = hs256_token(Some("primary"), &json!({"exp": NOW - 1}), TEST_SECRET);

        assert!(matches!(
            verifier().verify(&token),
            Err(VerifyError::Claims(CheckerError::InvalidClaim { .. }))
        ));
    }

    #[test]
    fn test_verify_algorithm_not_configured() {
        let mut header = Header::new(Algorithm::HS512);
        header.kid = Some("primary".to_string());
        let token = encode(&header, &json!({"sub": "x"}), &EncodingKey::from_secret(TEST_SECRET))
            .expect("failed to create test token");

        assert_eq!(
            verifier().verify(&token),
            Err(VerifyError::AlgorithmNotAllowed("HS512".to_string()))
        );
    }

    #[test]
    fn test_verify_mandatory_claims() {
        let token = hs256_token(Some("primary"), &json!({"exp": NOW + 60}), TEST_SECRET);

        let result = verifier().with_mandatory_claims(["sub"]).verify(&token);
        assert_eq!(
            result,
            Err(VerifyError::Claims(CheckerError::MissingMandatoryClaims(vec![
                "sub".to_string()
            ])))
        );
    }

    #[test]
    fn test_verify_malformed_token() {
        assert_eq!(verifier().verify("not-a-valid-jwt"), Err(VerifyError::MalformedToken));
        assert_eq!(verifier().verify(""), Err(VerifyError::MalformedToken));
    }

    #[test]
    fn test_verify_error_display() {
        assert_eq!(VerifyError::InvalidSignature.to_string(), "invalid JWT signature");
        assert_eq!(VerifyError::MalformedToken.to_string(), "malformed JWT");
        assert_eq!(
            VerifyError::InvalidKey("bad key".to_string()).to_string(),
            "invalid key: bad key"
        );
        assert_eq!(
            VerifyError::Claims(CheckerError::UnsupportedTokenType).to_string(),
            "claims rejected: unsupported token type"
        );
    }
}
