//! Data carried through a single submission.

use serde::Deserialize;

use crate::error::MailError;
use crate::store::RecordId;

/// Form parameter names of the intake form.
pub const PARAM_NAME: &str = "custpage_name";
pub const PARAM_EMAIL: &str = "custpage_email";
pub const PARAM_SUBJECT: &str = "custpage_subject";
pub const PARAM_MESSAGE: &str = "custpage_message";

/// Submitted form fields, passed through unvalidated.
///
/// Absent parameters stay `None`; present-but-empty ones stay `Some("")`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Submission {
    #[serde(rename = "custpage_name")]
    pub name: Option<String>,
    #[serde(rename = "custpage_email")]
    pub email: Option<String>,
    #[serde(rename = "custpage_subject")]
    pub subject: Option<String>,
    #[serde(rename = "custpage_message")]
    pub message: Option<String>,
}

/// Result of looking a submitter up in the customer directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerMatch {
    pub customer_id: Option<String>,
    /// Address on the matched customer. Not used downstream.
    pub customer_email: Option<String>,
    pub sales_owner_email: Option<String>,
}

impl CustomerMatch {
    /// The matched customer id, if present and non-empty.
    pub fn linked_customer(&self) -> Option<&str> {
        self.customer_id.as_deref().filter(|id| !id.is_empty())
    }

    /// The sales owner's address, if present and non-empty.
    pub fn owner_address(&self) -> Option<&str> {
        self.sales_owner_email.as_deref().filter(|e| !e.is_empty())
    }
}

/// Outcome of the notification step. Each send is attempted independently.
#[derive(Debug)]
pub struct NotificationReport {
    pub sender_name: String,
    /// `None` when there was no sales owner to notify.
    pub owner: Option<Result<(), MailError>>,
    pub fallback: Result<(), MailError>,
}

impl NotificationReport {
    /// Number of messages the transport accepted.
    pub fn sent(&self) -> usize {
        let owner = matches!(self.owner, Some(Ok(())));
        usize::from(owner) + usize::from(self.fallback.is_ok())
    }

    /// Consume the report, keeping only the failed sends.
    pub fn into_failures(self) -> Vec<MailError> {
        let mut failures = Vec::new();
        if let Some(Err(e)) = self.owner {
            failures.push(e);
        }
        if let Err(e) = self.fallback {
            failures.push(e);
        }
        failures
    }
}

/// What a successful submission produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeReceipt {
    pub record_id: RecordId,
    pub customer_id: Option<String>,
    pub notifications_sent: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ids_do_not_link() {
        let m = CustomerMatch {
            customer_id: Some(String::new()),
            customer_email: None,
            sales_owner_email: Some(String::new()),
        };
        assert_eq!(m.linked_customer(), None);
        assert_eq!(m.owner_address(), None);
    }

    #[test]
    fn report_counts_and_failures() {
        let report = NotificationReport {
            sender_name: "Administrator".into(),
            owner: Some(Err(MailError::Transport("down".into()))),
            fallback: Ok(()),
        };
        assert_eq!(report.sent(), 1);
        let failures = report.into_failures();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], MailError::Transport(_)));
    }

    #[test]
    fn report_without_owner() {
        let report = NotificationReport {
            sender_name: String::new(),
            owner: None,
            fallback: Ok(()),
        };
        assert_eq!(report.sent(), 1);
        assert!(report.into_failures().is_empty());
    }
}
