//! Storage capabilities consumed by the intake workflow.
//!
//! `Directory` answers exact-match searches over customers and employees;
//! `RecordStore` persists new records. Both are backend-agnostic so the
//! workflow can run against libSQL in production and fakes in tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;

/// Identifier assigned to a saved record.
pub type RecordId = String;

/// A column requested from a directory search.
///
/// `join` names a reference field to follow first, e.g. the `email` column
/// joined through `salesRep` is the sales rep's address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Column {
    pub name: String,
    pub join: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            join: None,
        }
    }

    pub fn joined(name: impl Into<String>, join: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            join: Some(join.into()),
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.join {
            Some(join) => write!(f, "{join}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Exact-match filter (`field is value`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub value: String,
}

impl Filter {
    pub fn is(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// A directory search: record type, filters (ANDed) and projected columns.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub record_type: String,
    pub filters: Vec<Filter>,
    pub columns: Vec<Column>,
}

impl SearchQuery {
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            filters: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }
}

/// One row of a directory search. Missing or NULL columns read as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRow {
    values: BTreeMap<Column, Option<String>>,
}

impl SearchRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: Column, value: Option<String>) -> Self {
        self.values.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: Column, value: Option<String>) {
        self.values.insert(column, value);
    }

    pub fn get(&self, column: &Column) -> Option<&str> {
        self.values.get(column).and_then(|v| v.as_deref())
    }
}

/// Value of a record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Free text. `None` leaves the field empty.
    Text(Option<String>),
    /// Reference to another record by id.
    Reference(String),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(v) => v.as_deref().is_none_or(str::is_empty),
            Self::Reference(id) => id.is_empty(),
        }
    }
}

/// An unsaved record: a type plus the field values set on it.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub record_type: String,
    values: BTreeMap<String, FieldValue>,
}

impl NewRecord {
    pub fn create(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn set_value(&mut self, field: impl Into<String>, value: FieldValue) -> &mut Self {
        self.values.insert(field.into(), value);
        self
    }

    pub fn get_value(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Options for `RecordStore::save`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Reject the save when a field the record type marks as required is
    /// missing or empty.
    pub enforce_required_fields: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            enforce_required_fields: true,
        }
    }
}

/// A persisted inquiry, as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredInquiry {
    pub id: RecordId,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Exact-match search over directory records.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Run a search. Rows are returned in the directory's own order.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchRow>, DatabaseError>;
}

/// Record persistence.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a new record and return its assigned id.
    async fn save(&self, record: &NewRecord, options: SaveOptions)
    -> Result<RecordId, DatabaseError>;
}
