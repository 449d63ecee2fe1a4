//! Outbound mail: message type and the transport capability.

pub mod log;
pub mod smtp;

use async_trait::async_trait;

use crate::config::EmployeeId;
use crate::error::MailError;

pub use log::LogMailer;
pub use smtp::SmtpMailer;

/// Who a notification goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// A literal address.
    Address(String),
    /// An employee; the transport resolves the address.
    Employee(EmployeeId),
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Address(a) => write!(f, "{a}"),
            Self::Employee(id) => write!(f, "employee:{id}"),
        }
    }
}

/// A single outbound notification. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub author: EmployeeId,
    pub recipient: Recipient,
    pub subject: String,
    pub body: String,
}

/// Fire-and-forget mail dispatch. `Ok` only means the transport accepted
/// the message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &NotificationMessage) -> Result<(), MailError>;
}
