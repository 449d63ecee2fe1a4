//! Mail transport that only logs. Used when no SMTP relay is configured.

use async_trait::async_trait;

use super::{MailTransport, NotificationMessage};
use crate::error::MailError;

#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl MailTransport for LogMailer {
    async fn send(&self, message: &NotificationMessage) -> Result<(), MailError> {
        tracing::info!(
            author = %message.author,
            recipient = %message.recipient,
            subject = %message.subject,
            body_len = message.body.len(),
            "Mail delivery disabled, notification logged"
        );
        Ok(())
    }
}
