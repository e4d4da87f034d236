//! Header and claim checkers.
//!
//! Checkers are the pluggable validation rules run against a decoded token.
//! This module defines their interfaces, a few built-in rules, and the
//! managers that group checkers into named profiles.

mod claims;
mod header;
mod manager;

use std::fmt;

use serde_json::{Map, Value};

pub use claims::{
    AudienceChecker, ExpirationTimeChecker, IssuedAtChecker, IssuerChecker, NotBeforeChecker,
};
pub use header::{AlgorithmChecker, JwsTokenSupport};
pub use manager::{
    ClaimCheckerManager, ClaimCheckerManagerFactory, HeaderCheckerManager,
    HeaderCheckerManagerFactory, assemble_claim_checker_factory, assemble_header_checker_factory,
};

/// A failed check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckerError {
    #[error("invalid claim '{claim}': {reason}")]
    InvalidClaim { claim: String, reason: String },
    #[error("invalid header '{header}': {reason}")]
    InvalidHeader { header: String, reason: String },
    #[error("missing mandatory claims: {}", .0.join(", "))]
    MissingMandatoryClaims(Vec<String>),
    #[error("unsupported token type")]
    UnsupportedTokenType,
}

/// Validates one header parameter.
pub trait HeaderChecker: Send + Sync + fmt::Debug {
    /// The header parameter this checker inspects, e.g. `"alg"`.
    fn supported_header(&self) -> &str;

    fn check_header(&self, value: &Value) -> Result<(), CheckerError>;
}

/// Validates one claim.
pub trait ClaimChecker: Send + Sync + fmt::Debug {
    /// The claim this checker inspects, e.g. `"exp"`.
    fn supported_claim(&self) -> &str;

    fn check_claim(&self, value: &Value) -> Result<(), CheckerError>;
}

/// Recognizes a family of tokens from their header.
pub trait TokenTypeSupport: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn supports(&self, header: &Map<String, Value>) -> bool;
}
