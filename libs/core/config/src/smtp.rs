use crate::{env_or_default, env_required, ConfigError, FromEnv};
use std::fmt;

/// Environment variable holding the SMTP server host.
pub const SMTP_HOST_VAR: &str = "ADMIN_SMTP_HOST";
/// Environment variable holding the SMTP server port.
pub const SMTP_PORT_VAR: &str = "ADMIN_SMTP_PORT";
/// Environment variable holding the login identity (also used as `From`).
pub const SMTP_ADDRESS_VAR: &str = "ADMIN_SMTP_ADDRESS";
/// Environment variable holding the SMTP password.
pub const SMTP_PASSWORD_VAR: &str = "ADMIN_SMTP_PASSWORD";
/// Environment variable selecting implicit TLS (`true`) or STARTTLS (`false`).
pub const SMTP_INITIAL_TLS_VAR: &str = "ADMIN_SMTP_INITIAL_TLS";

/// SMTP connection settings
///
/// `address` is both the login identity and the `From` address of every
/// outgoing message.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub address: String,
    pub password: String,
}

impl SmtpSettings {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        address: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            address: address.into(),
            password: password.into(),
        }
    }
}

// Never print the password, these settings end up in logs.
impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("address", &self.address)
            .field("password", &"********")
            .finish()
    }
}

impl FromEnv for SmtpSettings {
    /// All four variables are required:
    /// - ADMIN_SMTP_HOST
    /// - ADMIN_SMTP_PORT (must fit in a u16)
    /// - ADMIN_SMTP_ADDRESS
    /// - ADMIN_SMTP_PASSWORD
    fn from_env() -> Result<Self, ConfigError> {
        let host = env_required(SMTP_HOST_VAR)?;
        let port = env_required(SMTP_PORT_VAR)?
            .trim()
            .parse()
            .map_err(|e| ConfigError::ParseError {
                key: SMTP_PORT_VAR.to_string(),
                details: format!("{}", e),
            })?;
        let address = env_required(SMTP_ADDRESS_VAR)?;
        let password = env_required(SMTP_PASSWORD_VAR)?;

        Ok(Self {
            host,
            port,
            address,
            password,
        })
    }
}

/// Whether the connection should start with TLS (implicit TLS).
///
/// Reads ADMIN_SMTP_INITIAL_TLS, defaulting to `default` when unset.
/// Accepts `true`/`1`/`yes` and `false`/`0`/`no`, case-insensitively.
pub fn initial_tls_from_env(default: bool) -> Result<bool, ConfigError> {
    let raw = env_or_default(SMTP_INITIAL_TLS_VAR, if default { "true" } else { "false" });

    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::ParseError {
            key: SMTP_INITIAL_TLS_VAR.to_string(),
            details: format!("expected a boolean, got '{}'", other),
        }),
    }
}
