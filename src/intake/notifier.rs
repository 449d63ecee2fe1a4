//! Record-creation notifications: one to the sales owner when known, and
//! always one to the system employee.

use std::sync::Arc;

use tracing::{debug, warn};

use super::model::NotificationReport;
use crate::config::IntakeConfig;
use crate::mail::{MailTransport, NotificationMessage, Recipient};
use crate::store::{Column, Directory, Filter, SearchQuery};

/// Render the notification body.
pub fn render_body(greeting: &str, signature: &str) -> String {
    format!(
        "Dear {greeting},\n\
         \n\
         I hope this email finds you well.\n\
         \n\
         I wanted to inform you that a custom record has been successfully created. \
         Please review the details at your earliest convenience and let me know if you \
         need any further information.\n\
         \n\
         Best regards,\n\
         {signature}"
    )
}

pub struct Notifier {
    directory: Arc<dyn Directory>,
    mailer: Arc<dyn MailTransport>,
    config: IntakeConfig,
}

impl Notifier {
    pub fn new(
        directory: Arc<dyn Directory>,
        mailer: Arc<dyn MailTransport>,
        config: IntakeConfig,
    ) -> Self {
        Self {
            directory,
            mailer,
            config,
        }
    }

    /// Display name of the system employee. Empty when the employee is
    /// missing or the lookup fails.
    pub async fn sender_name(&self) -> String {
        let query = SearchQuery::new("employee")
            .filter(Filter::is(
                "internalid",
                self.config.system_employee.to_string(),
            ))
            .column(Column::new("entityid"));

        match self.directory.search(&query).await {
            Ok(rows) => rows
                .first()
                .and_then(|row| row.get(&Column::new("entityid")))
                .map(str::to_string)
                .unwrap_or_else(|| {
                    warn!(
                        employee = %self.config.system_employee,
                        "System employee not found, sending without a name"
                    );
                    String::new()
                }),
            Err(e) => {
                warn!(error = %e, "System employee lookup failed, sending without a name");
                String::new()
            }
        }
    }

    fn message(&self, recipient: Recipient, body: String) -> NotificationMessage {
        NotificationMessage {
            author: self.config.system_employee,
            recipient,
            subject: self.config.notification_subject.clone(),
            body,
        }
    }

    /// Send the notifications. The owner send and the fallback send are
    /// independent; neither outcome affects whether the other is attempted.
    pub async fn notify(&self, sales_owner_email: Option<&str>) -> NotificationReport {
        let sender_name = self.sender_name().await;

        let owner = match sales_owner_email.filter(|e| !e.is_empty()) {
            Some(address) => {
                let msg = self.message(
                    Recipient::Address(address.to_string()),
                    render_body(address, &sender_name),
                );
                let result = self.mailer.send(&msg).await;
                if let Err(e) = &result {
                    warn!(recipient = address, error = %e, "Owner notification failed");
                }
                Some(result)
            }
            None => None,
        };

        let msg = self.message(
            Recipient::Employee(self.config.system_employee),
            render_body(&sender_name, &sender_name),
        );
        let fallback = self.mailer.send(&msg).await;
        if let Err(e) = &fallback {
            warn!(error = %e, "Fallback notification failed");
        }

        let report = NotificationReport {
            sender_name,
            owner,
            fallback,
        };
        debug!(sent = report.sent(), "Notifications dispatched");
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::config::EmployeeId;
    use crate::error::{DatabaseError, MailError};
    use crate::store::{LibSqlBackend, SearchRow};

    /// Records every message; fails sends to addresses in `fail_for`.
    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<NotificationMessage>>,
        fail_for: Vec<Recipient>,
    }

    #[async_trait]
    impl MailTransport for Recorder {
        async fn send(&self, message: &NotificationMessage) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(message.clone());
            if self.fail_for.contains(&message.recipient) {
                return Err(MailError::Transport("relay down".into()));
            }
            Ok(())
        }
    }

    struct BrokenDirectory;

    #[async_trait]
    impl Directory for BrokenDirectory {
        async fn search(&self, _query: &SearchQuery) -> Result<Vec<SearchRow>, DatabaseError> {
            Err(DatabaseError::Pool("gone".into()))
        }
    }

    async fn notifier(mailer: Arc<Recorder>) -> Notifier {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        Notifier::new(db, mailer, IntakeConfig::default())
    }

    #[test]
    fn body_interpolates_greeting_and_signature() {
        let body = render_body("rep@x.com", "Administrator");
        assert!(body.starts_with("Dear rep@x.com,\n\n"));
        assert!(body.ends_with("Best regards,\nAdministrator"));
        assert!(body.contains("a custom record has been successfully created"));
    }

    #[tokio::test]
    async fn owner_and_fallback_both_sent() {
        let mailer = Arc::new(Recorder::default());
        let report = notifier(mailer.clone()).await.notify(Some("rep@x.com")).await;

        assert_eq!(report.sent(), 2);
        assert_eq!(report.sender_name, "Administrator");
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].recipient, Recipient::Address("rep@x.com".into()));
        assert_eq!(sent[0].subject, "Record Creation");
        assert!(sent[0].body.starts_with("Dear rep@x.com,"));
        assert_eq!(sent[1].recipient, Recipient::Employee(EmployeeId(-5)));
        assert!(sent[1].body.starts_with("Dear Administrator,"));
        assert!(sent.iter().all(|m| m.author == EmployeeId(-5)));
    }

    #[tokio::test]
    async fn no_owner_sends_only_fallback() {
        for owner in [None, Some("")] {
            let mailer = Arc::new(Recorder::default());
            let report = notifier(mailer.clone()).await.notify(owner).await;
            assert!(report.owner.is_none());
            assert_eq!(mailer.sent.lock().unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn owner_failure_does_not_block_fallback() {
        let mailer = Arc::new(Recorder {
            fail_for: vec![Recipient::Address("rep@x.com".into())],
            ..Recorder::default()
        });
        let report = notifier(mailer.clone()).await.notify(Some("rep@x.com")).await;

        assert!(matches!(report.owner, Some(Err(_))));
        assert!(report.fallback.is_ok());
        assert_eq!(mailer.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_system_employee_sends_with_empty_name() {
        let mailer = Arc::new(Recorder::default());
        let config = IntakeConfig {
            system_employee: EmployeeId(-99),
            ..IntakeConfig::default()
        };
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let report = Notifier::new(db, mailer.clone(), config).notify(None).await;

        assert_eq!(report.sender_name, "");
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.starts_with("Dear ,"));
    }

    #[tokio::test]
    async fn directory_fault_degrades_to_empty_name() {
        let mailer = Arc::new(Recorder::default());
        let n = Notifier::new(Arc::new(BrokenDirectory), mailer.clone(), IntakeConfig::default());
        let report = n.notify(Some("rep@x.com")).await;
        assert_eq!(report.sender_name, "");
        assert_eq!(report.sent(), 2);
    }
}
