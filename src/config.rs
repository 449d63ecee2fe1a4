//! Configuration types.

use std::net::SocketAddr;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Internal id of an employee record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EmployeeId(pub i64);

impl std::fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the customer resolver treats a directory search that returns more
/// than one customer for the same email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Rows are applied in directory order; the last one wins.
    #[default]
    LastWins,
    /// The first row returned wins.
    FirstWins,
    /// More than one row is a directory fault.
    RejectAmbiguous,
}

/// Field ids of the inquiry record type.
#[derive(Debug, Clone)]
pub struct InquiryFields {
    pub customer_name: String,
    pub customer_email: String,
    pub subject: String,
    pub message: String,
    /// Reference to the matched customer.
    pub customer: String,
}

impl Default for InquiryFields {
    fn default() -> Self {
        Self {
            customer_name: "custrecord_jj_customer_name".to_string(),
            customer_email: "custrecord_jj_customer_email".to_string(),
            subject: "custrecord_jj_subject".to_string(),
            message: "custrecord_jj_message".to_string(),
            customer: "custrecord_jj_customer".to_string(),
        }
    }
}

/// Deployment constants for the intake workflow.
///
/// These are compiled defaults, not read from the environment.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Employee used as the sender of every notification and as the
    /// fallback recipient.
    pub system_employee: EmployeeId,
    /// Record type of the inquiry record.
    pub inquiry_record_type: String,
    pub fields: InquiryFields,
    /// Subject line of every notification.
    pub notification_subject: String,
    pub match_policy: MatchPolicy,
    /// Whether saving an inquiry checks the record type's required fields.
    pub enforce_required_fields: bool,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            system_employee: EmployeeId(-5),
            inquiry_record_type: "customrecord_jj_external_customer_record".to_string(),
            fields: InquiryFields::default(),
            notification_subject: "Record Creation".to_string(),
            match_policy: MatchPolicy::default(),
            enforce_required_fields: false,
        }
    }
}

/// HTTP server and storage settings, built from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    /// Address assigned to the system employee at startup, if set.
    pub admin_email: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_raw =
            std::env::var("INTAKE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_addr = bind_raw.parse().map_err(|e| ConfigError::InvalidValue {
            key: "INTAKE_BIND_ADDR".into(),
            message: format!("{e}"),
        })?;

        let db_path = std::env::var("INTAKE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/intake.db"));

        let admin_email = std::env::var("INTAKE_ADMIN_EMAIL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            bind_addr,
            db_path,
            admin_email,
        })
    }
}

/// SMTP relay settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

impl SmtpConfig {
    /// Build config from environment variables.
    /// Returns `Ok(None)` if `INTAKE_SMTP_HOST` is not set (mail is logged only).
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Ok(host) = std::env::var("INTAKE_SMTP_HOST") else {
            return Ok(None);
        };

        let port = match std::env::var("INTAKE_SMTP_PORT") {
            Ok(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "INTAKE_SMTP_PORT".into(),
                message: format!("{e}"),
            })?,
            Err(_) => 587,
        };

        let username = std::env::var("INTAKE_SMTP_USERNAME").unwrap_or_default();
        let password = SecretString::from(std::env::var("INTAKE_SMTP_PASSWORD").unwrap_or_default());
        let from_address = std::env::var("INTAKE_SMTP_FROM")
            .or_else(|_| {
                if username.contains('@') {
                    Ok(username.clone())
                } else {
                    Err(ConfigError::MissingEnvVar("INTAKE_SMTP_FROM".into()))
                }
            })?;

        Ok(Some(Self {
            host,
            port,
            username,
            password,
            from_address,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intake_defaults_match_deployment() {
        let config = IntakeConfig::default();
        assert_eq!(config.system_employee, EmployeeId(-5));
        assert_eq!(config.system_employee.to_string(), "-5");
        assert_eq!(config.notification_subject, "Record Creation");
        assert_eq!(config.match_policy, MatchPolicy::LastWins);
        assert!(!config.enforce_required_fields);
        assert_eq!(config.fields.customer, "custrecord_jj_customer");
    }

    #[test]
    fn smtp_config_absent_without_host() {
        // SAFETY: no other test in this crate reads INTAKE_SMTP_HOST.
        unsafe { std::env::remove_var("INTAKE_SMTP_HOST") };
        assert!(SmtpConfig::from_env().unwrap().is_none());
    }
}
