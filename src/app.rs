//! Service wiring: storage, mail transport and the HTTP router.

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{IntakeConfig, ServerConfig, SmtpConfig};
use crate::error::{ConfigError, Result};
use crate::intake::{IntakeService, intake_routes};
use crate::mail::{LogMailer, MailTransport, SmtpMailer};
use crate::store::{Column, Directory, Filter, LibSqlBackend, SearchQuery};

/// Open the database and apply startup settings from the server config.
pub async fn open_database(
    server: &ServerConfig,
    intake: &IntakeConfig,
) -> Result<Arc<LibSqlBackend>> {
    let db = LibSqlBackend::new_local(&server.db_path)
        .await?
        .with_inquiry_type(intake);

    if let Some(email) = &server.admin_email {
        db.set_employee_email(&intake.system_employee.to_string(), email)
            .await?;
        info!(employee = %intake.system_employee, "System employee address set");
    }

    Ok(Arc::new(db))
}

/// Fail unless the system employee, the fallback recipient, has an address.
pub async fn require_fallback_address(
    directory: &dyn Directory,
    intake: &IntakeConfig,
) -> Result<()> {
    let email = Column::new("email");
    let query = SearchQuery::new("employee")
        .filter(Filter::is("internalid", intake.system_employee.to_string()))
        .column(email.clone());
    let rows = directory.search(&query).await?;

    let has_address = rows
        .first()
        .and_then(|row| row.get(&email))
        .is_some_and(|address| !address.is_empty());
    if !has_address {
        return Err(ConfigError::MissingEnvVar("INTAKE_ADMIN_EMAIL".to_string()).into());
    }
    Ok(())
}

/// SMTP when configured, otherwise log-only delivery.
pub fn build_mailer(
    smtp: Option<&SmtpConfig>,
    directory: Arc<dyn Directory>,
) -> Result<Arc<dyn MailTransport>> {
    match smtp {
        Some(config) => {
            info!(host = %config.host, port = config.port, "SMTP delivery enabled");
            Ok(Arc::new(SmtpMailer::new(config, directory)?))
        }
        None => {
            info!("INTAKE_SMTP_HOST not set, notifications will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

/// The full HTTP application.
pub fn router(service: Arc<IntakeService>) -> Router {
    intake_routes(service).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Open storage, pick a mailer and assemble the router.
pub async fn build(
    server: &ServerConfig,
    smtp: Option<&SmtpConfig>,
    intake: IntakeConfig,
) -> Result<Router> {
    let db = open_database(server, &intake).await?;
    if smtp.is_some() {
        require_fallback_address(&*db, &intake).await?;
    }
    let mailer = build_mailer(smtp, db.clone())?;
    let service = Arc::new(IntakeService::new(db.clone(), db, mailer, intake));
    Ok(router(service))
}
