//! Submission workflow: resolve the customer, write the inquiry, notify.

use std::sync::Arc;

use tracing::info;

use super::model::{IntakeReceipt, Submission};
use super::notifier::Notifier;
use super::resolver::CustomerResolver;
use super::writer::RecordWriter;
use crate::config::IntakeConfig;
use crate::error::IntakeError;
use crate::mail::MailTransport;
use crate::store::{Directory, RecordStore};

pub struct IntakeService {
    resolver: CustomerResolver,
    writer: RecordWriter,
    notifier: Notifier,
}

impl IntakeService {
    pub fn new(
        directory: Arc<dyn Directory>,
        store: Arc<dyn RecordStore>,
        mailer: Arc<dyn MailTransport>,
        config: IntakeConfig,
    ) -> Self {
        Self {
            resolver: CustomerResolver::new(Arc::clone(&directory), config.match_policy),
            writer: RecordWriter::new(store, config.clone()),
            notifier: Notifier::new(directory, mailer, config),
        }
    }

    /// Run one submission end to end.
    ///
    /// A directory or write fault stops the workflow before anything is
    /// persisted or sent. Notification faults are reported only after both
    /// sends were attempted, and never undo the saved record.
    pub async fn submit(&self, submission: &Submission) -> Result<IntakeReceipt, IntakeError> {
        let customer = self
            .resolver
            .resolve(submission.email.as_deref())
            .await
            .map_err(IntakeError::Directory)?;

        let record_id = self
            .writer
            .create_inquiry(submission, customer.linked_customer())
            .await
            .map_err(IntakeError::RecordWrite)?;

        let report = self.notifier.notify(customer.owner_address()).await;
        let notifications_sent = report.sent();
        let failures = report.into_failures();
        if !failures.is_empty() {
            return Err(IntakeError::Mail {
                record_id,
                failures,
            });
        }

        info!(
            record_id = %record_id,
            customer_id = customer.linked_customer().unwrap_or(""),
            notifications_sent,
            "Submission processed"
        );
        Ok(IntakeReceipt {
            record_id,
            customer_id: customer.linked_customer().map(str::to_string),
            notifications_sent,
        })
    }
}
