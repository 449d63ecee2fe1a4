//! Error types for the inquiry intake service.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Mail transport errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("No address on file for employee {0}")]
    UnresolvedRecipient(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Transport failed: {0}")]
    Transport(String),
}

/// Faults raised by the submission workflow.
///
/// Each variant maps to a distinct response status at the HTTP boundary.
/// `Mail` is only raised after the record was persisted, so it carries the
/// record id.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Customer lookup failed: {0}")]
    Directory(#[source] DatabaseError),

    #[error("Inquiry record could not be saved: {0}")]
    RecordWrite(#[source] DatabaseError),

    #[error("Record {record_id} created but {} notification(s) failed", .failures.len())]
    Mail {
        record_id: String,
        failures: Vec<MailError>,
    },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
