//! Built-in header checkers and token type support.

use serde_json::{Map, Value};

use super::{CheckerError, HeaderChecker, TokenTypeSupport};

/// Restricts the `alg` header to an allow-list.
#[derive(Debug, Clone)]
pub struct AlgorithmChecker {
    allowed: Vec<String>,
}

impl AlgorithmChecker {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }
}

impl HeaderChecker for AlgorithmChecker {
    fn supported_header(&self) -> &str {
        "alg"
    }

    fn check_header(&self, value: &Value) -> Result<(), CheckerError> {
        match value {
            Value::String(alg) if self.allowed.iter().any(|allowed| allowed == alg) => Ok(()),
            _ => Err(CheckerError::InvalidHeader {
                header: "alg".to_string(),
                reason: "unsupported algorithm".to_string(),
            }),
        }
    }
}

/// Signed (JWS) tokens: any header carrying an `alg` other than `none`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwsTokenSupport;

impl TokenTypeSupport for JwsTokenSupport {
    fn name(&self) -> &str {
        "jws"
    }

    fn supports(&self, header: &Map<String, Value>) -> bool {
        matches!(header.get("alg"), Some(Value::String(alg)) if alg != "none")
    }
}
