//! SQLite implementation of the `StorageBackend` port.
//!
//! Relational-hybrid layout: one table per record kind carrying the indexed
//! filter columns plus the full JSON document, so records round-trip
//! losslessly while `list` stays an indexed query. All queries run through
//! the shared `DbManager` pool on the blocking thread pool.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, OptionalExtension};
use serde_json::Value;
use tides_core::{RecordFilter, RecordKind, StorageBackend};
use tides_domain::{Result, TidesError};
use tokio::task;

use super::manager::{map_sql_error, DbManager};

/// SQLite-backed storage.
pub struct SqliteBackend {
    db: Arc<DbManager>,
}

impl SqliteBackend {
    /// Create a backend over the shared `DbManager`.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn put(&self, kind: RecordKind, id: &str, record: Value) -> Result<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_owned();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let columns = IndexColumns::extract(kind, &id, &record)?;
            conn.execute(&upsert_sql(kind), params_from_iter(columns.as_params()))
                .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Value>> {
        let db = Arc::clone(&self.db);
        let id = id.to_owned();

        task::spawn_blocking(move || -> Result<Option<Value>> {
            let conn = db.get_connection()?;
            let document: Option<String> = conn
                .query_row(
                    &format!("SELECT record FROM {} WHERE id = ?1", table(kind)),
                    params![id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(map_sql_error)?;
            document.map(|doc| parse_document(&doc)).transpose()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list(&self, kind: RecordKind, filter: &RecordFilter) -> Result<Vec<Value>> {
        let db = Arc::clone(&self.db);
        let (sql, bindings) = list_query(kind, filter);

        task::spawn_blocking(move || -> Result<Vec<Value>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params_from_iter(bindings.iter()), |row| row.get::<_, String>(0))
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<String>>>()
                .map_err(map_sql_error)?;
            rows.iter().map(|doc| parse_document(doc)).collect()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete(&self, kind: RecordKind, id: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_owned();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(&format!("DELETE FROM {} WHERE id = ?1", table(kind)), params![id])
                .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn create_if_absent(&self, kind: RecordKind, id: &str, record: Value) -> Result<bool> {
        let db = Arc::clone(&self.db);
        let id = id.to_owned();

        task::spawn_blocking(move || -> Result<bool> {
            let conn = db.get_connection()?;
            let columns = IndexColumns::extract(kind, &id, &record)?;
            let inserted = conn
                .execute(&insert_if_absent_sql(kind), params_from_iter(columns.as_params()))
                .map_err(map_sql_error)?;
            Ok(inserted > 0)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn table(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Tide => "tides",
        RecordKind::Session => "sessions",
        RecordKind::Energy => "energy_samples",
        RecordKind::TaskLink => "task_links",
        RecordKind::Preference => "preferences",
    }
}

/// Indexed columns pulled from the JSON document before a write.
struct IndexColumns {
    id: String,
    owner: String,
    // Tide rows
    flow_type: Option<String>,
    status: Option<String>,
    start_date: Option<String>,
    // Child rows
    tide_id: Option<String>,
    document: String,
}

impl IndexColumns {
    fn extract(kind: RecordKind, id: &str, record: &Value) -> Result<Self> {
        let owner = str_field(record, "owner")?;
        let (flow_type, status, start_date, tide_id) = match kind {
            RecordKind::Tide => (
                Some(str_field(record, "flow_type")?),
                Some(str_field(record, "status")?),
                record.get("start_date").and_then(Value::as_str).map(str::to_owned),
                None,
            ),
            RecordKind::Session | RecordKind::Energy | RecordKind::TaskLink => {
                (None, None, None, Some(str_field(record, "tide_id")?))
            }
            RecordKind::Preference => (None, None, None, None),
        };
        let document = serde_json::to_string(record)
            .map_err(|e| TidesError::Internal(format!("failed to serialize record: {e}")))?;
        Ok(Self { id: id.to_owned(), owner, flow_type, status, start_date, tide_id, document })
    }

    /// Parameter list matching the column order of the write statements.
    fn as_params(&self) -> Vec<Option<&str>> {
        let mut params = vec![Some(self.id.as_str()), Some(self.owner.as_str())];
        if self.flow_type.is_some() {
            params.push(self.flow_type.as_deref());
            params.push(self.status.as_deref());
            params.push(self.start_date.as_deref());
        }
        if let Some(tide_id) = &self.tide_id {
            params.push(Some(tide_id.as_str()));
        }
        params.push(Some(self.document.as_str()));
        params
    }
}

fn upsert_sql(kind: RecordKind) -> String {
    format!("INSERT OR REPLACE INTO {}", write_columns(kind))
}

fn insert_if_absent_sql(kind: RecordKind) -> String {
    format!("INSERT OR IGNORE INTO {}", write_columns(kind))
}

fn write_columns(kind: RecordKind) -> String {
    match kind {
        RecordKind::Tide => format!(
            "{} (id, owner, flow_type, status, start_date, record) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            table(kind)
        ),
        RecordKind::Session | RecordKind::Energy | RecordKind::TaskLink => format!(
            "{} (id, owner, tide_id, record) VALUES (?1, ?2, ?3, ?4)",
            table(kind)
        ),
        RecordKind::Preference => {
            format!("{} (id, owner, record) VALUES (?1, ?2, ?3)", table(kind))
        }
    }
}

fn list_query(kind: RecordKind, filter: &RecordFilter) -> (String, Vec<String>) {
    let mut sql = format!("SELECT record FROM {} WHERE owner = ?1", table(kind));
    let mut bindings = vec![filter.owner.clone()];

    if kind == RecordKind::Tide {
        if let Some(flow_type) = filter.flow_type {
            bindings.push(flow_type.as_str().to_owned());
            sql.push_str(&format!(" AND flow_type = ?{}", bindings.len()));
        }
        if let Some(status) = filter.status {
            bindings.push(status.as_str().to_owned());
            sql.push_str(&format!(" AND status = ?{}", bindings.len()));
        }
        if let Some(start_date) = &filter.start_date {
            bindings.push(start_date.clone());
            sql.push_str(&format!(" AND start_date = ?{}", bindings.len()));
        }
    } else if let Some(tide_id) = &filter.tide_id {
        bindings.push(tide_id.clone());
        sql.push_str(&format!(" AND tide_id = ?{}", bindings.len()));
    }

    sql.push_str(" ORDER BY id ASC");
    (sql, bindings)
}

fn str_field(record: &Value, field: &str) -> Result<String> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| TidesError::Internal(format!("record missing '{field}' field")))
}

fn parse_document(document: &str) -> Result<Value> {
    serde_json::from_str(document)
        .map_err(|e| TidesError::Internal(format!("corrupt stored record: {e}")))
}

fn map_join_error(err: task::JoinError) -> TidesError {
    if err.is_cancelled() {
        TidesError::Internal("blocking storage task cancelled".into())
    } else {
        TidesError::Internal(format!("blocking storage task failed: {err}"))
    }
}
