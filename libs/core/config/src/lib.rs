//! Shared configuration for the mailer workspace.
//!
//! Settings are read from environment variables into explicit structs that
//! callers pass into constructors. Nothing here is global.

pub mod smtp;
pub mod tracing;

pub use smtp::SmtpSettings;

use std::env;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Application environment, selects the log format
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development, // Pretty logs
    Production,  // JSON logs
}

impl Environment {
    pub fn from_env() -> Self {
        let app_env = env_or_default("APP_ENV", "development");

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Load an environment variable, falling back to `default` when unset
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Load an environment variable or return `ConfigError::MissingEnvVar`.
///
/// An empty value counts as missing.
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp::SMTP_HOST_VAR;

    #[test]
    fn test_environment_from_app_env() {
        let cases = [
            (None, Environment::Development),
            (Some("production"), Environment::Production),
            (Some("PRODUCTION"), Environment::Production),
            (Some("staging"), Environment::Development),
        ];

        for (value, expected) in cases {
            temp_env::with_var("APP_ENV", value, || {
                let env = Environment::from_env();
                assert_eq!(env, expected, "APP_ENV={:?}", value);
                assert_eq!(env.is_production(), expected == Environment::Production);
            });
        }
    }

    #[test]
    fn test_env_required_treats_empty_as_missing() {
        for value in [None, Some("")] {
            temp_env::with_var(SMTP_HOST_VAR, value, || {
                let err = env_required(SMTP_HOST_VAR).unwrap_err();
                assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == SMTP_HOST_VAR));
            });
        }

        temp_env::with_var(SMTP_HOST_VAR, Some("smtp.example.com"), || {
            assert_eq!(env_required(SMTP_HOST_VAR).unwrap(), "smtp.example.com");
        });
    }
}
