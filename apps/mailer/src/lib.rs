//! Mailer application
//!
//! Loads SMTP settings from the environment and sends a test communication.
//!
//! Environment variables:
//! - `ADMIN_SMTP_HOST`, `ADMIN_SMTP_PORT`, `ADMIN_SMTP_ADDRESS`,
//!   `ADMIN_SMTP_PASSWORD`: required
//! - `ADMIN_SMTP_INITIAL_TLS`: `true` for implicit TLS, defaults to `false`
//!   (STARTTLS), which is what most submission servers expect
//! - `MAIL_TEST_RECIPIENT`: address to send to (default `receiver@mail.com`)
//! - `APP_ENV`, `RUST_LOG`: logging

use core_config::{
    ConfigError, Environment, FromEnv, SmtpSettings, env_or_default, smtp::initial_tls_from_env,
};
use eyre::{Result, WrapErr};
use mailer::{Communication, DeliveryReport, MailService, Recipient};
use tracing::{error, info};

pub const TEST_RECIPIENT_VAR: &str = "MAIL_TEST_RECIPIENT";
pub const DEFAULT_TEST_RECIPIENT: &str = "receiver@mail.com";

/// Everything the application reads from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub smtp: SmtpSettings,
    pub initial_tls: bool,
    pub test_recipient: String,
}

impl FromEnv for AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            smtp: SmtpSettings::from_env()?,
            initial_tls: initial_tls_from_env(false)?,
            test_recipient: env_or_default(TEST_RECIPIENT_VAR, DEFAULT_TEST_RECIPIENT),
        })
    }
}

/// The communication sent by the application.
pub fn test_communication(recipient_address: &str) -> Communication {
    Communication::new("Admin", "Test", "This is a test mail.").with_receiver(Recipient::new(
        Some("Receiver name"),
        Some("Receiver last name"),
        Some(recipient_address),
    ))
}

/// Build the mail service with the configured TLS mode.
pub fn build_service(config: &AppConfig) -> Result<MailService> {
    let mut service =
        MailService::new(config.smtp.clone()).wrap_err("Failed to create mail service")?;
    service.set_initial_tls(config.initial_tls);
    Ok(service)
}

/// Send the test communication through `service`.
pub async fn send_test_communication(
    service: &MailService,
    recipient_address: &str,
) -> Result<DeliveryReport> {
    let communication = test_communication(recipient_address);

    match service.send(&communication).await {
        Ok(report) => {
            info!(
                to = %recipient_address,
                message_ids = ?report.message_ids(),
                "Test communication sent"
            );
            Ok(report)
        }
        Err(e) => {
            error!(to = %recipient_address, error = %e, "Test communication failed");
            Err(e).wrap_err_with(|| format!("Failed to send test mail to {}", recipient_address))
        }
    }
}

/// Run the application
///
/// 1. Sets up structured logging (JSON for prod, pretty for dev)
/// 2. Loads SMTP settings from the environment
/// 3. Sends the test communication
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    let config = AppConfig::from_env().wrap_err("Failed to load SMTP configuration")?;
    info!(
        smtp = ?config.smtp,
        initial_tls = config.initial_tls,
        "Loaded SMTP configuration"
    );

    let service = build_service(&config)?;
    send_test_communication(&service, &config.test_recipient).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::smtp::{
        SMTP_ADDRESS_VAR, SMTP_HOST_VAR, SMTP_INITIAL_TLS_VAR, SMTP_PASSWORD_VAR, SMTP_PORT_VAR,
    };
    use mailer::{InMemoryConnector, SmtpStage, TlsMode};
    use std::sync::Arc;

    fn smtp_env() -> [(&'static str, Option<&'static str>); 4] {
        [
            (SMTP_HOST_VAR, Some("smtp.example.com")),
            (SMTP_PORT_VAR, Some("587")),
            (SMTP_ADDRESS_VAR, Some("admin@example.com")),
            (SMTP_PASSWORD_VAR, Some("secret")),
        ]
    }

    #[test]
    fn test_app_config_defaults() {
        temp_env::with_vars(smtp_env(), || {
            temp_env::with_vars_unset([SMTP_INITIAL_TLS_VAR, TEST_RECIPIENT_VAR], || {
                let config = AppConfig::from_env().unwrap();
                assert_eq!(config.smtp.port, 587);
                assert!(!config.initial_tls);
                assert_eq!(config.test_recipient, DEFAULT_TEST_RECIPIENT);
            });
        });
    }

    #[test]
    fn test_app_config_missing_host() {
        temp_env::with_vars(smtp_env(), || {
            temp_env::with_var_unset(SMTP_HOST_VAR, || {
                let err = AppConfig::from_env().unwrap_err();
                assert!(err.to_string().contains(SMTP_HOST_VAR));
            });
        });
    }

    #[test]
    fn test_build_service_applies_tls_mode() {
        let config = AppConfig {
            smtp: SmtpSettings::new("smtp.example.com", 465, "admin@example.com", "secret"),
            initial_tls: true,
            test_recipient: DEFAULT_TEST_RECIPIENT.to_string(),
        };
        assert_eq!(build_service(&config).unwrap().tls_mode(), TlsMode::Implicit);

        let config = AppConfig {
            initial_tls: false,
            ..config
        };
        assert_eq!(build_service(&config).unwrap().tls_mode(), TlsMode::StartTls);
    }

    #[test]
    fn test_communication_recipient_has_complete_name() {
        let communication = test_communication("receiver@mail.com");
        assert_eq!(communication.receivers.len(), 1);
        assert_eq!(
            communication.receivers[0].complete_name.as_deref(),
            Some("Receiver name Receiver last name")
        );
    }

    fn service(connector: &InMemoryConnector) -> MailService {
        let settings = SmtpSettings::new("smtp.example.com", 587, "admin@example.com", "secret");
        MailService::with_connector(settings, Arc::new(connector.clone())).unwrap()
    }

    #[tokio::test]
    async fn test_send_test_communication() {
        let connector = InMemoryConnector::new();
        let report = send_test_communication(&service(&connector), "receiver@mail.com")
            .await
            .unwrap();

        assert_eq!(report.len(), 1);
        assert!(connector.was_sent_to("receiver@mail.com").await);
    }

    #[tokio::test]
    async fn test_send_test_communication_failure_is_an_error() {
        let connector = InMemoryConnector::failing_at(SmtpStage::Connect);
        let err = send_test_communication(&service(&connector), "receiver@mail.com")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("receiver@mail.com"));
    }
}
