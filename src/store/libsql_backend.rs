//! libSQL backend, async `Directory` and `RecordStore` implementation.
//!
//! Supports local file and in-memory databases. Directory searches are
//! translated to SQL from a fixed column map, so only known record types,
//! fields and joins can be queried.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::params::Params;
use libsql::{Connection, Database as LibSqlDatabase, Value, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::IntakeConfig;
use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::record_types::RecordTypeDef;
use crate::store::traits::{
    Column, Directory, FieldValue, NewRecord, RecordId, RecordStore, SaveOptions, SearchQuery,
    SearchRow, StoredInquiry,
};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    _db: Arc<LibSqlDatabase>,
    conn: Connection,
    record_types: Vec<RecordTypeDef>,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to enable foreign keys: {e}")))?;

        migrations::run_migrations(&conn).await?;

        Ok(Self {
            _db: Arc::new(db),
            conn,
            record_types: vec![RecordTypeDef::inquiry(&IntakeConfig::default())],
        })
    }

    /// Replace the registered inquiry record type, e.g. for non-default field ids.
    pub fn with_inquiry_type(mut self, config: &IntakeConfig) -> Self {
        self.record_types = vec![RecordTypeDef::inquiry(config)];
        self
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    fn record_type(&self, name: &str) -> Result<&RecordTypeDef, DatabaseError> {
        self.record_types
            .iter()
            .find(|t| t.record_type == name)
            .ok_or_else(|| DatabaseError::Query(format!("unknown record type {name}")))
    }

    // ── Directory administration ────────────────────────────────────

    /// Insert or update an employee.
    pub async fn upsert_employee(
        &self,
        id: &str,
        entity_id: &str,
        email: Option<&str>,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO employees (id, entity_id, email) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET entity_id = excluded.entity_id,
                     email = excluded.email",
                params![id, entity_id, opt_text(email)],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_employee: {e}")))?;
        debug!(id = id, "Employee upserted");
        Ok(())
    }

    /// Set the address of an existing employee.
    pub async fn set_employee_email(&self, id: &str, email: &str) -> Result<(), DatabaseError> {
        let updated = self
            .conn()
            .execute(
                "UPDATE employees SET email = ?2 WHERE id = ?1",
                params![id, email],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_employee_email: {e}")))?;
        if updated == 0 {
            return Err(DatabaseError::NotFound {
                entity: "employee".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Insert or update a customer. Re-upserting keeps the row's directory position.
    pub async fn upsert_customer(
        &self,
        id: &str,
        entity_id: &str,
        email: Option<&str>,
        sales_rep_id: Option<&str>,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO customers (id, entity_id, email, sales_rep_id) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET entity_id = excluded.entity_id,
                     email = excluded.email, sales_rep_id = excluded.sales_rep_id",
                params![id, entity_id, opt_text(email), opt_text(sales_rep_id)],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_customer: {e}")))?;
        debug!(id = id, "Customer upserted");
        Ok(())
    }

    // ── Inquiry reads ───────────────────────────────────────────────

    /// Fetch a saved inquiry by id.
    pub async fn get_inquiry(&self, id: &str) -> Result<Option<StoredInquiry>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, customer_name, customer_email, subject, message, customer_id, created_at
                 FROM inquiries WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_inquiry: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let inquiry = row_to_inquiry(&row)
                    .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
                Ok(Some(inquiry))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_inquiry: {e}"))),
        }
    }

    /// Number of saved inquiries.
    pub async fn count_inquiries(&self) -> Result<usize, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM inquiries", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count_inquiries: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("count_inquiries: {e}")))?;
        let count: i64 = match row {
            Some(row) => row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("count_inquiries: {e}")))?,
            None => 0,
        };
        Ok(count as usize)
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> Value {
    match s {
        Some(s) => Value::Text(s.to_string()),
        None => Value::Null,
    }
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn row_to_inquiry(row: &libsql::Row) -> Result<StoredInquiry, libsql::Error> {
    let created_str: String = row.get(6)?;
    Ok(StoredInquiry {
        id: row.get(0)?,
        customer_name: row.get::<String>(1).ok(),
        customer_email: row.get::<String>(2).ok(),
        subject: row.get::<String>(3).ok(),
        message: row.get::<String>(4).ok(),
        customer_id: row.get::<String>(5).ok(),
        created_at: parse_datetime(&created_str),
    })
}

/// FROM clause for a searchable record type.
fn search_source(record_type: &str) -> Option<&'static str> {
    match record_type {
        "customer" => Some("customers c LEFT JOIN employees s ON s.id = c.sales_rep_id"),
        "employee" => Some("employees e"),
        _ => None,
    }
}

/// Map a search column (or filter field) to its SQL expression.
fn column_expr(record_type: &str, name: &str, join: Option<&str>) -> Option<&'static str> {
    let join = join.map(str::to_ascii_lowercase);
    match (record_type, join.as_deref(), name) {
        ("customer", None, "internalid") => Some("c.id"),
        ("customer", None, "entityid") => Some("c.entity_id"),
        ("customer", None, "email") => Some("c.email"),
        ("customer", Some("salesrep"), "internalid") => Some("s.id"),
        ("customer", Some("salesrep"), "entityid") => Some("s.entity_id"),
        ("customer", Some("salesrep"), "email") => Some("s.email"),
        ("employee", None, "internalid") => Some("e.id"),
        ("employee", None, "entityid") => Some("e.entity_id"),
        ("employee", None, "email") => Some("e.email"),
        _ => None,
    }
}

fn order_expr(record_type: &str) -> &'static str {
    match record_type {
        "customer" => "c.rowid",
        _ => "e.rowid",
    }
}

/// Build the SQL and positional params for a directory search.
fn build_search_sql(query: &SearchQuery) -> Result<(String, Vec<Value>), DatabaseError> {
    let rt = query.record_type.as_str();
    let source = search_source(rt)
        .ok_or_else(|| DatabaseError::Query(format!("record type {rt} is not searchable")))?;

    if query.columns.is_empty() {
        return Err(DatabaseError::Query("search requires at least one column".into()));
    }

    let select = query
        .columns
        .iter()
        .map(|c| {
            column_expr(rt, &c.name, c.join.as_deref())
                .ok_or_else(|| DatabaseError::Query(format!("unknown column {c} on {rt}")))
        })
        .collect::<Result<Vec<_>, _>>()?
        .join(", ");

    let mut sql = format!("SELECT {select} FROM {source}");
    let mut values = Vec::with_capacity(query.filters.len());
    for (i, filter) in query.filters.iter().enumerate() {
        let expr = column_expr(rt, &filter.field, None).ok_or_else(|| {
            DatabaseError::Query(format!("unknown filter field {} on {rt}", filter.field))
        })?;
        sql.push_str(if i == 0 { " WHERE " } else { " AND " });
        sql.push_str(&format!("{expr} = ?{}", i + 1));
        values.push(Value::Text(filter.value.clone()));
    }
    sql.push_str(&format!(" ORDER BY {}", order_expr(rt)));

    Ok((sql, values))
}

// ── Trait implementations ───────────────────────────────────────────

#[async_trait]
impl Directory for LibSqlBackend {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchRow>, DatabaseError> {
        let (sql, values) = build_search_sql(query)?;
        let mut rows = self
            .conn()
            .query(&sql, Params::Positional(values))
            .await
            .map_err(|e| DatabaseError::Query(format!("search {}: {e}", query.record_type)))?;

        let mut results = Vec::new();
        loop {
            let row = match rows.next().await {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(e) => {
                    return Err(DatabaseError::Query(format!(
                        "search {}: {e}",
                        query.record_type
                    )));
                }
            };
            let mut result = SearchRow::new();
            for (i, column) in query.columns.iter().enumerate() {
                let value = row.get::<String>(i as i32).ok();
                result.insert(Column::clone(column), value);
            }
            results.push(result);
        }

        debug!(
            record_type = %query.record_type,
            rows = results.len(),
            "Directory search complete"
        );
        Ok(results)
    }
}

#[async_trait]
impl RecordStore for LibSqlBackend {
    async fn save(
        &self,
        record: &NewRecord,
        options: SaveOptions,
    ) -> Result<RecordId, DatabaseError> {
        let def = self.record_type(&record.record_type)?;
        let bound = def.bind(record, options)?;

        let id = Uuid::new_v4().to_string();
        let mut columns = vec!["id"];
        let mut values = vec![Value::Text(id.clone())];
        for (column, value) in bound {
            columns.push(column);
            values.push(match value {
                FieldValue::Text(text) => opt_text(text.as_deref()),
                FieldValue::Reference(target) => Value::Text(target.clone()),
            });
        }
        columns.push("created_at");
        values.push(Value::Text(Utc::now().to_rfc3339()));

        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            def.table,
            columns.join(", ")
        );

        self.conn()
            .execute(&sql, Params::Positional(values))
            .await
            .map_err(|e| DatabaseError::Query(format!("save {}: {e}", record.record_type)))?;

        debug!(id = %id, record_type = %record.record_type, "Record saved");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::traits::Filter;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    fn customer_query(email: &str) -> SearchQuery {
        SearchQuery::new("customer")
            .filter(Filter::is("email", email))
            .column(Column::new("internalid"))
            .column(Column::joined("email", "salesRep"))
    }

    fn inquiry(subject: Option<&str>) -> NewRecord {
        let mut record = NewRecord::create("customrecord_jj_external_customer_record");
        record
            .set_value(
                "custrecord_jj_customer_name",
                FieldValue::Text(Some("Alice".into())),
            )
            .set_value(
                "custrecord_jj_subject",
                FieldValue::Text(subject.map(str::to_string)),
            );
        record
    }

    // ── Directory tests ─────────────────────────────────────────────

    #[tokio::test]
    async fn search_customer_with_sales_rep() {
        let db = test_db().await;
        db.upsert_employee("7", "Rep", Some("rep@x.com")).await.unwrap();
        db.upsert_customer("123", "Acme", Some("a@x.com"), Some("7"))
            .await
            .unwrap();

        let rows = db.search(&customer_query("a@x.com")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(&Column::new("internalid")), Some("123"));
        assert_eq!(
            rows[0].get(&Column::joined("email", "salesRep")),
            Some("rep@x.com")
        );
    }

    #[tokio::test]
    async fn search_customer_without_sales_rep_yields_none() {
        let db = test_db().await;
        db.upsert_customer("123", "Acme", Some("a@x.com"), None)
            .await
            .unwrap();

        let rows = db.search(&customer_query("a@x.com")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(&Column::joined("email", "salesRep")), None);
    }

    #[tokio::test]
    async fn search_is_exact_and_case_sensitive() {
        let db = test_db().await;
        db.upsert_customer("123", "Acme", Some("a@x.com"), None)
            .await
            .unwrap();

        assert!(db.search(&customer_query("A@x.com")).await.unwrap().is_empty());
        assert!(db.search(&customer_query(" a@x.com")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_returns_rows_in_insertion_order() {
        let db = test_db().await;
        db.upsert_customer("456", "Second", Some("a@x.com"), None)
            .await
            .unwrap();
        db.upsert_customer("123", "First", Some("a@x.com"), None)
            .await
            .unwrap();

        let rows = db.search(&customer_query("a@x.com")).await.unwrap();
        let ids: Vec<_> = rows
            .iter()
            .filter_map(|r| r.get(&Column::new("internalid")))
            .collect();
        assert_eq!(ids, vec!["456", "123"]);
    }

    #[tokio::test]
    async fn search_seeded_system_employee() {
        let db = test_db().await;
        let query = SearchQuery::new("employee")
            .filter(Filter::is("internalid", "-5"))
            .column(Column::new("entityid"));
        let rows = db.search(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(&Column::new("entityid")), Some("Administrator"));
    }

    #[tokio::test]
    async fn search_unknown_column_fails() {
        let db = test_db().await;
        let query = SearchQuery::new("customer").column(Column::new("phone"));
        assert!(matches!(
            db.search(&query).await,
            Err(DatabaseError::Query(_))
        ));
    }

    #[tokio::test]
    async fn search_unknown_type_fails() {
        let db = test_db().await;
        let query = SearchQuery::new("vendor").column(Column::new("email"));
        assert!(db.search(&query).await.is_err());
    }

    #[test]
    fn search_sql_uses_placeholders_for_filters() {
        let (sql, values) = build_search_sql(&customer_query("x' OR 1=1 --")).unwrap();
        assert!(sql.contains("c.email = ?1"));
        assert!(!sql.contains("OR 1=1"));
        assert_eq!(values.len(), 1);
    }

    // ── Record store tests ──────────────────────────────────────────

    #[tokio::test]
    async fn save_relaxed_accepts_missing_fields() {
        let db = test_db().await;
        let id = db
            .save(
                &inquiry(None),
                SaveOptions {
                    enforce_required_fields: false,
                },
            )
            .await
            .unwrap();

        let stored = db.get_inquiry(&id).await.unwrap().unwrap();
        assert_eq!(stored.customer_name.as_deref(), Some("Alice"));
        assert_eq!(stored.subject, None);
        assert_eq!(stored.customer_id, None);
        assert_eq!(db.count_inquiries().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn save_enforced_rejects_missing_fields() {
        let db = test_db().await;
        let err = db
            .save(&inquiry(Some("Hi")), SaveOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Constraint(_)));
        assert_eq!(db.count_inquiries().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn save_links_existing_customer() {
        let db = test_db().await;
        db.upsert_customer("123", "Acme", Some("a@x.com"), None)
            .await
            .unwrap();
        let mut record = inquiry(Some("Hi"));
        record.set_value(
            "custrecord_jj_customer",
            FieldValue::Reference("123".into()),
        );

        let id = db
            .save(
                &record,
                SaveOptions {
                    enforce_required_fields: false,
                },
            )
            .await
            .unwrap();
        let stored = db.get_inquiry(&id).await.unwrap().unwrap();
        assert_eq!(stored.customer_id.as_deref(), Some("123"));
    }

    #[tokio::test]
    async fn save_rejects_dangling_customer_reference() {
        let db = test_db().await;
        let mut record = inquiry(Some("Hi"));
        record.set_value(
            "custrecord_jj_customer",
            FieldValue::Reference("999".into()),
        );

        let result = db
            .save(
                &record,
                SaveOptions {
                    enforce_required_fields: false,
                },
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn save_is_not_idempotent() {
        let db = test_db().await;
        let options = SaveOptions {
            enforce_required_fields: false,
        };
        let a = db.save(&inquiry(Some("Hi")), options).await.unwrap();
        let b = db.save(&inquiry(Some("Hi")), options).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(db.count_inquiries().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn set_employee_email_requires_existing_row() {
        let db = test_db().await;
        db.set_employee_email("-5", "admin@x.com").await.unwrap();
        assert!(matches!(
            db.set_employee_email("404", "nobody@x.com").await,
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn new_local_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("intake.db");
        let db = LibSqlBackend::new_local(&path).await.unwrap();
        assert!(path.exists());
        drop(db);
    }
}
