//! Persistence layer: libSQL-backed customer directory and record storage.

pub mod libsql_backend;
pub mod migrations;
pub mod record_types;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{
    Column, Directory, FieldValue, Filter, NewRecord, RecordId, RecordStore, SaveOptions,
    SearchQuery, SearchRow, StoredInquiry,
};
