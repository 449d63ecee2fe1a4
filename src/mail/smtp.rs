//! SMTP mail transport via lettre.
//!
//! Employee recipients are resolved to addresses through the directory, the
//! same way the author's reply-to address is.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;

use super::{MailTransport, NotificationMessage, Recipient};
use crate::config::{EmployeeId, SmtpConfig};
use crate::error::MailError;
use crate::store::{Column, Directory, Filter, SearchQuery};

pub struct SmtpMailer {
    from: Mailbox,
    transport: SmtpTransport,
    directory: Arc<dyn Directory>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, directory: Arc<dyn Directory>) -> Result<Self, MailError> {
        let from = parse_mailbox(&config.from_address)?;

        let mut builder = SmtpTransport::relay(&config.host)
            .map_err(|e| MailError::Transport(format!("SMTP relay error: {e}")))?
            .port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.expose_secret().to_string(),
            ));
        }

        Ok(Self {
            from,
            transport: builder.build(),
            directory,
        })
    }

    /// Look up an employee's address. `Ok(None)` when the employee is
    /// unknown or has no address on file.
    async fn employee_address(&self, id: EmployeeId) -> Result<Option<String>, MailError> {
        let query = SearchQuery::new("employee")
            .filter(Filter::is("internalid", id.to_string()))
            .column(Column::new("email"));
        let rows = self
            .directory
            .search(&query)
            .await
            .map_err(|e| MailError::Transport(format!("employee lookup failed: {e}")))?;

        Ok(rows
            .first()
            .and_then(|row| row.get(&Column::new("email")))
            .filter(|email| !email.is_empty())
            .map(str::to_string))
    }

    async fn resolve(&self, recipient: &Recipient) -> Result<Mailbox, MailError> {
        match recipient {
            Recipient::Address(address) => parse_mailbox(address),
            Recipient::Employee(id) => {
                let address = self
                    .employee_address(*id)
                    .await?
                    .ok_or_else(|| MailError::UnresolvedRecipient(id.to_string()))?;
                parse_mailbox(&address)
            }
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e| MailError::InvalidAddress {
        address: address.to_string(),
        reason: format!("{e}"),
    })
}

/// Build the RFC 5322 message for a notification.
fn build_message(
    from: Mailbox,
    reply_to: Option<Mailbox>,
    to: Mailbox,
    subject: &str,
    body: &str,
) -> Result<Message, MailError> {
    let mut builder = Message::builder().from(from).to(to).subject(subject);
    if let Some(reply_to) = reply_to {
        builder = builder.reply_to(reply_to);
    }
    builder
        .body(body.to_string())
        .map_err(|e| MailError::Build(format!("{e}")))
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: &NotificationMessage) -> Result<(), MailError> {
        let to = self.resolve(&message.recipient).await?;
        // The author's own address is a courtesy header; missing is fine.
        let reply_to = match self.employee_address(message.author).await {
            Ok(Some(address)) => parse_mailbox(&address).ok(),
            _ => None,
        };
        let email = build_message(
            self.from.clone(),
            reply_to,
            to,
            &message.subject,
            &message.body,
        )?;

        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|e| MailError::Transport(format!("SMTP task panicked: {e}")))?
            .map_err(|e| MailError::Transport(format!("SMTP send failed: {e}")))?;

        tracing::info!(recipient = %message.recipient, "Notification email sent");
        Ok(())
    }
}
