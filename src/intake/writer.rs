//! Inquiry record creation.

use std::sync::Arc;

use tracing::info;

use super::model::Submission;
use crate::config::IntakeConfig;
use crate::error::DatabaseError;
use crate::store::{FieldValue, NewRecord, RecordId, RecordStore, SaveOptions};

pub struct RecordWriter {
    store: Arc<dyn RecordStore>,
    config: IntakeConfig,
}

impl RecordWriter {
    pub fn new(store: Arc<dyn RecordStore>, config: IntakeConfig) -> Self {
        Self { store, config }
    }

    /// Build the inquiry record for a submission. Text fields are copied
    /// verbatim; the customer link is only set for a non-empty id.
    pub fn build(&self, submission: &Submission, customer_id: Option<&str>) -> NewRecord {
        let fields = &self.config.fields;
        let mut record = NewRecord::create(&self.config.inquiry_record_type);
        record
            .set_value(&fields.customer_name, FieldValue::Text(submission.name.clone()))
            .set_value(&fields.customer_email, FieldValue::Text(submission.email.clone()))
            .set_value(&fields.subject, FieldValue::Text(submission.subject.clone()))
            .set_value(&fields.message, FieldValue::Text(submission.message.clone()));

        if let Some(id) = customer_id.filter(|id| !id.is_empty()) {
            record.set_value(&fields.customer, FieldValue::Reference(id.to_string()));
        }
        record
    }

    /// Persist a new inquiry. Every call creates a new record.
    pub async fn create_inquiry(
        &self,
        submission: &Submission,
        customer_id: Option<&str>,
    ) -> Result<RecordId, DatabaseError> {
        let record = self.build(submission, customer_id);
        let options = SaveOptions {
            enforce_required_fields: self.config.enforce_required_fields,
        };
        let id = self.store.save(&record, options).await?;
        info!(
            record_id = %id,
            linked = record.get_value(&self.config.fields.customer).is_some(),
            "Inquiry record created"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;

    fn submission() -> Submission {
        Submission {
            name: Some(" Alice ".into()),
            email: Some("a@x.com".into()),
            subject: Some("Hi".into()),
            message: Some("Test".into()),
        }
    }

    async fn writer() -> (Arc<LibSqlBackend>, RecordWriter) {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let writer = RecordWriter::new(db.clone(), IntakeConfig::default());
        (db, writer)
    }

    #[tokio::test]
    async fn unlinked_record_copies_fields_verbatim() {
        let (db, writer) = writer().await;
        let id = writer.create_inquiry(&submission(), None).await.unwrap();

        let stored = db.get_inquiry(&id).await.unwrap().unwrap();
        assert_eq!(stored.customer_name.as_deref(), Some(" Alice "));
        assert_eq!(stored.customer_email.as_deref(), Some("a@x.com"));
        assert_eq!(stored.subject.as_deref(), Some("Hi"));
        assert_eq!(stored.message.as_deref(), Some("Test"));
        assert_eq!(stored.customer_id, None);
    }

    #[tokio::test]
    async fn linked_record_references_customer() {
        let (db, writer) = writer().await;
        db.upsert_customer("123", "Acme", Some("a@x.com"), None)
            .await
            .unwrap();

        let id = writer
            .create_inquiry(&submission(), Some("123"))
            .await
            .unwrap();
        let stored = db.get_inquiry(&id).await.unwrap().unwrap();
        assert_eq!(stored.customer_id.as_deref(), Some("123"));
    }

    #[tokio::test]
    async fn empty_customer_id_leaves_link_unset() {
        let (_db, writer) = writer().await;
        let record = writer.build(&submission(), Some(""));
        assert_eq!(record.get_value("custrecord_jj_customer"), None);
    }

    #[tokio::test]
    async fn empty_submission_still_saves() {
        let (db, writer) = writer().await;
        let id = writer
            .create_inquiry(&Submission::default(), None)
            .await
            .unwrap();
        let stored = db.get_inquiry(&id).await.unwrap().unwrap();
        assert_eq!(stored.customer_name, None);
        assert_eq!(stored.subject, None);
    }

    #[tokio::test]
    async fn enforced_mode_rejects_empty_submission() {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let config = IntakeConfig {
            enforce_required_fields: true,
            ..IntakeConfig::default()
        };
        let writer = RecordWriter::new(db.clone(), config);
        let result = writer.create_inquiry(&Submission::default(), None).await;
        assert!(matches!(result, Err(DatabaseError::Constraint(_))));
        assert_eq!(db.count_inquiries().await.unwrap(), 0);
    }
}
