//! Settings of the `jwt-wiring` binary.
//!
//! This module loads the binary's settings from environment variables and
//! turns them into a [`JwtConfig`].
//!
//! # Environment Variables
//!
//! - `JWT_WIRING_CONFIG`: Path to a JSON configuration document (optional)
//! - `JWT_WIRING_HS256_SECRET`: Shared secret bound as the `default` key and
//!   key set, unless the document already defines them (optional)
//! - `JWT_WIRING_LEEWAY_SECS`: Leeway for time-based claim checkers (default: `0`)
//!
//! # Invariants
//!
//! - `hs256_secret`, when set, is never empty

use std::path::PathBuf;

use crate::keys::oct_jwk;
use crate::model::{ConfigDocument, DEFAULT_NAME, JwtConfig, KeySetEntry};

pub const CONFIG_VAR: &str = "JWT_WIRING_CONFIG";
pub const SECRET_VAR: &str = "JWT_WIRING_HS256_SECRET";
pub const LEEWAY_VAR: &str = "JWT_WIRING_LEEWAY_SECS";

/// Error returned when loading settings or the configuration document fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to read {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },
    #[error("invalid configuration document {}: {reason}", .path.display())]
    Document { path: PathBuf, reason: String },
}

/// Binary settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WiringSettings {
    /// Path of the JSON configuration document, if any.
    pub config_path: Option<PathBuf>,
    /// Secret for the `default` HS256 key, if any.
    pub hs256_secret: Option<String>,
    /// Leeway, in seconds, for the `iat`, `nbf` and `exp` checkers.
    pub leeway_secs: u64,
}

impl WiringSettings {
    /// Load settings from environment variables.
    ///
    /// # Errors
    /// See [`WiringSettings::from_vars`].
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load settings through `var`, which returns the value of a variable.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `JWT_WIRING_HS256_SECRET` is set but empty
    /// - `JWT_WIRING_LEEWAY_SECS` is set but not a non-negative integer
    pub fn from_vars<F>(var: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = var(CONFIG_VAR)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        let hs256_secret = match var(SECRET_VAR) {
            Some(secret) if secret.is_empty() => {
                return Err(SettingsError::InvalidValue {
                    name: SECRET_VAR.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            other => other,
        };

        let leeway_secs = match var(LEEWAY_VAR) {
            Some(value) => value.parse::<u64>().map_err(|_| SettingsError::InvalidValue {
                name: LEEWAY_VAR.to_string(),
                message: format!("'{value}' is not a number of seconds"),
            })?,
            None => 0,
        };

        Ok(Self {
            config_path,
            hs256_secret,
            leeway_secs,
        })
    }

    /// Build the wiring configuration these settings describe.
    ///
    /// Starts from the document at `config_path`, or the built-in defaults
    /// without one, then binds the HS256 secret if one is set.
    ///
    /// # Errors
    /// Returns an error if the document cannot be read or parsed.
    pub fn load_config(&self) -> Result<JwtConfig, SettingsError> {
        let mut config = match &self.config_path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| SettingsError::Read {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                ConfigDocument::from_json(&text)
                    .map_err(|e| SettingsError::Document {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?
                    .into_config()
            }
            None => JwtConfig::default(),
        };

        if let Some(secret) = &self.hs256_secret {
            if !config.has_key(DEFAULT_NAME) {
                let jwk = oct_jwk(DEFAULT_NAME, secret.as_bytes()).map_err(|e| {
                    SettingsError::InvalidValue {
                        name: SECRET_VAR.to_string(),
                        message: e.to_string(),
                    }
                })?;
                config = config.with_key(DEFAULT_NAME, jwk);
            }
            if !config.has_key_set(DEFAULT_NAME) {
                config = config.with_key_set(DEFAULT_NAME, KeySetEntry::composite([DEFAULT_NAME]));
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;
    use crate::model::KeyMember;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_values() {
        let settings = WiringSettings::from_vars(vars(&[])).expect("settings");
        assert_eq!(settings, WiringSettings::default());
        assert_eq!(settings.leeway_secs, 0);
    }

    #[test]
    fn test_all_values() {
        let settings = WiringSettings::from_vars(vars(&[
            (CONFIG_VAR, "/etc/jwt-wiring.json"),
            (SECRET_VAR, "s3cret"),
            (LEEWAY_VAR, "30"),
        ]))
        .expect("settings");

        assert_eq!(settings.config_path, Some(PathBuf::from("/etc/jwt-wiring.json")));
        assert_eq!(settings.hs256_secret.as_deref(), Some("s3cret"));
        assert_eq!(settings.leeway_secs, 30);
    }

    #[test]
    fn test_invalid_leeway() {
        let result = WiringSettings::from_vars(vars(&[(LEEWAY_VAR, "soon")]));
        assert_eq!(
            result,
            Err(SettingsError::InvalidValue {
                name: LEEWAY_VAR.to_string(),
                message: "'soon' is not a number of seconds".to_string(),
            })
        );
    }

    #[test]
    fn test_empty_secret() {
        let result = WiringSettings::from_vars(vars(&[(SECRET_VAR, "")]));
        assert!(matches!(result, Err(SettingsError::InvalidValue { .. })));
    }

    #[test]
    fn test_secret_binds_default_key_and_key_set() {
        let settings = WiringSettings {
            hs256_secret: Some("s3cret".to_string()),
            ..WiringSettings::default()
        };

        let config = settings.load_config().expect("config");

        assert!(config.has_key("default"));
        match config.key_set("default").expect("key set") {
            KeySetEntry::Composite(members) => {
                assert!(matches!(members.as_slice(), [KeyMember::Name(name)] if name == "default"));
            }
            KeySetEntry::Whole(_) => panic!("expected a composite key set"),
        }
    }

    #[test]
    fn test_document_is_loaded_and_keeps_its_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{
                "keys": {{ "default": "vault.signing" }},
                "keysets": {{ "default": ["default", "vault.backup"] }},
                "default_key": "default"
            }}"#
        )
        .expect("write document");

        let settings = WiringSettings {
            config_path: Some(file.path().to_path_buf()),
            hs256_secret: Some("s3cret".to_string()),
            leeway_secs: 0,
        };
        let config = settings.load_config().expect("config");

        assert!(matches!(
            config.key("default").expect("key"),
            crate::model::Entry::Service(name) if name == "vault.signing"
        ));
        match config.key_set("default").expect("key set") {
            KeySetEntry::Composite(members) => assert_eq!(members.len(), 2),
            KeySetEntry::Whole(_) => panic!("expected a composite key set"),
        }
    }

    #[test]
    fn test_missing_document() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.json");
        let settings = WiringSettings {
            config_path: Some(path.clone()),
            ..WiringSettings::default()
        };

        assert!(matches!(
            settings.load_config(),
            Err(SettingsError::Read { path: failed, .. }) if failed == path
        ));
    }

    #[test]
    fn test_invalid_document() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "unknown_section": true }}"#).expect("write document");

        let settings = WiringSettings {
            config_path: Some(file.path().to_path_buf()),
            ..WiringSettings::default()
        };

        assert!(matches!(
            settings.load_config(),
            Err(SettingsError::Document { .. })
        ));
    }

    #[test]
    fn test_settings_error_display() {
        let error = SettingsError::InvalidValue {
            name: "TEST_VAR".to_string(),
            message: "bad value".to_string(),
        };
        assert_eq!(error.to_string(), "invalid value for TEST_VAR: bad value");
    }
}
