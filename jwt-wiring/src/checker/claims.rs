//! Built-in claim checkers.

use std::sync::Arc;

use serde_json::Value;

use crate::time::{SystemTimeSource, TimeSource};

use super::{CheckerError, ClaimChecker};

fn invalid(claim: &str, reason: impl Into<String>) -> CheckerError {
    CheckerError::InvalidClaim {
        claim: claim.to_string(),
        reason: reason.into(),
    }
}

/// Read a NumericDate claim, truncating fractional seconds.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn numeric_date(claim: &str, value: &Value) -> Result<u64, CheckerError> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| invalid(claim, "must be a non-negative NumericDate")),
        _ => Err(invalid(claim, "must be a NumericDate")),
    }
}

macro_rules! time_checker {
    ($(#[$doc:meta])* $name:ident, $claim:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            clock: Arc<dyn TimeSource>,
            leeway_secs: u64,
        }

        impl $name {
            /// The claim this checker reads.
            pub const CLAIM: &'static str = $claim;

            #[must_use]
            pub fn new(clock: Arc<dyn TimeSource>, leeway_secs: u64) -> Self {
                Self { clock, leeway_secs }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new(Arc::new(SystemTimeSource), 0)
            }
        }
    };
}

time_checker!(
    /// `iat` must not lie in the future.
    IssuedAtChecker,
    "iat"
);
time_checker!(
    /// `nbf` must not lie in the future.
    NotBeforeChecker,
    "nbf"
);
time_checker!(
    /// `exp` must lie in the future.
    ExpirationTimeChecker,
    "exp"
);

impl ClaimChecker for IssuedAtChecker {
    fn supported_claim(&self) -> &str {
        Self::CLAIM
    }

    fn check_claim(&self, value: &Value) -> Result<(), CheckerError> {
        let issued_at = numeric_date(Self::CLAIM, value)?;
        if issued_at > self.clock.now_secs().saturating_add(self.leeway_secs) {
            return Err(invalid(Self::CLAIM, "the token was issued in the future"));
        }
        Ok(())
    }
}

impl ClaimChecker for NotBeforeChecker {
    fn supported_claim(&self) -> &str {
        Self::CLAIM
    }

    fn check_claim(&self, value: &Value) -> Result<(), CheckerError> {
        let not_before = numeric_date(Self::CLAIM, value)?;
        if not_before > self.clock.now_secs().saturating_add(self.leeway_secs) {
            return Err(invalid(Self::CLAIM, "the token cannot be used yet"));
        }
        Ok(())
    }
}

impl ClaimChecker for ExpirationTimeChecker {
    fn supported_claim(&self) -> &str {
        Self::CLAIM
    }

    fn check_claim(&self, value: &Value) -> Result<(), CheckerError> {
        let expires_at = numeric_date(Self::CLAIM, value)?;
        if expires_at.saturating_add(self.leeway_secs) <= self.clock.now_secs() {
            return Err(invalid(Self::CLAIM, "the token expired"));
        }
        Ok(())
    }
}

/// `iss` must be one of the trusted issuers.
#[derive(Debug, Clone)]
pub struct IssuerChecker {
    issuers: Vec<String>,
}

impl IssuerChecker {
    pub fn new<I, S>(issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            issuers: issuers.into_iter().map(Into::into).collect(),
        }
    }
}

impl ClaimChecker for IssuerChecker {
    fn supported_claim(&self) -> &str {
        "iss"
    }

    fn check_claim(&self, value: &Value) -> Result<(), CheckerError> {
        match value {
            Value::String(issuer) if self.issuers.iter().any(|known| known == issuer) => Ok(()),
            Value::String(_) => Err(invalid("iss", "unknown issuer")),
            _ => Err(invalid("iss", "must be a string")),
        }
    }
}

/// `aud` must be, or contain, the expected audience.
#[derive(Debug, Clone)]
pub struct AudienceChecker {
    audience: String,
}

impl AudienceChecker {
    pub fn new(audience: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
        }
    }
}

impl ClaimChecker for AudienceChecker {
    fn supported_claim(&self) -> &str {
        "aud"
    }

    fn check_claim(&self, value: &Value) -> Result<(), CheckerError> {
        let matches = match value {
            Value::String(audience) => *audience == self.audience,
            Value::Array(audiences) => audiences
                .iter()
                .any(|audience| audience.as_str() == Some(self.audience.as_str())),
            _ => return Err(invalid("aud", "must be a string or an array of strings")),
        };
        if matches {
            Ok(())
        } else {
            Err(invalid("aud", "bad audience"))
        }
    }
}
