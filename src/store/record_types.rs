//! Record type definitions: which fields a record type has, how they map to
//! columns, and which of them are required.

use crate::config::IntakeConfig;
use crate::error::DatabaseError;
use crate::store::traits::{FieldValue, NewRecord, SaveOptions};

/// Kind of value a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Reference to a customer record.
    CustomerRef,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub id: String,
    pub column: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

/// Schema of a persisted record type.
#[derive(Debug, Clone)]
pub struct RecordTypeDef {
    pub record_type: String,
    pub table: &'static str,
    pub fields: Vec<FieldDef>,
}

impl RecordTypeDef {
    /// The inquiry record type, with field ids taken from the deployment config.
    pub fn inquiry(config: &IntakeConfig) -> Self {
        let f = &config.fields;
        let text = |id: &str, column: &'static str| FieldDef {
            id: id.to_string(),
            column,
            kind: FieldKind::Text,
            required: true,
        };
        Self {
            record_type: config.inquiry_record_type.clone(),
            table: "inquiries",
            fields: vec![
                text(&f.customer_name, "customer_name"),
                text(&f.customer_email, "customer_email"),
                text(&f.subject, "subject"),
                text(&f.message, "message"),
                FieldDef {
                    id: f.customer.clone(),
                    column: "customer_id",
                    kind: FieldKind::CustomerRef,
                    required: false,
                },
            ],
        }
    }

    fn field(&self, id: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Check a record against this type and return `(column, value)` pairs
    /// ready for insertion.
    ///
    /// Unknown fields and kind mismatches are always rejected. Required
    /// fields are only checked when `options.enforce_required_fields` is set.
    pub fn bind<'a>(
        &self,
        record: &'a NewRecord,
        options: SaveOptions,
    ) -> Result<Vec<(&'static str, &'a FieldValue)>, DatabaseError> {
        if record.record_type != self.record_type {
            return Err(DatabaseError::Constraint(format!(
                "record type {} does not match {}",
                record.record_type, self.record_type
            )));
        }

        let mut bound = Vec::new();
        for (id, value) in record.values() {
            let def = self.field(id).ok_or_else(|| {
                DatabaseError::Constraint(format!("unknown field {id} on {}", self.record_type))
            })?;
            match (def.kind, value) {
                (FieldKind::Text, FieldValue::Text(_))
                | (FieldKind::CustomerRef, FieldValue::Reference(_)) => {}
                _ => {
                    return Err(DatabaseError::Constraint(format!(
                        "field {id} expects {:?}, got {value:?}",
                        def.kind
                    )));
                }
            }
            bound.push((def.column, value));
        }

        if options.enforce_required_fields {
            for def in self.fields.iter().filter(|f| f.required) {
                if record.get_value(&def.id).is_none_or(FieldValue::is_empty) {
                    return Err(DatabaseError::Constraint(format!(
                        "missing required field {}",
                        def.id
                    )));
                }
            }
        }

        Ok(bound)
    }
}
