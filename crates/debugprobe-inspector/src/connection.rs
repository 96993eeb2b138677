//! Per-call read-only connection discipline.
//!
//! Every inspector operation opens a fresh connection, uses it, and
//! closes it; no connection is cached across calls. This trades
//! throughput for freedom from coherence issues with the host's own
//! reads/writes to the same file.

use crate::error::InspectorError;
use crate::key_provider;
use rusqlite::{Connection, OpenFlags};
use std::time::Duration;

/// Open `location` read-only, apply the 5s busy timeout, and — if `key`
/// is present — unlock it via the key/prepare/verify sequence.
pub fn open_readonly(
    location: &str,
    key: Option<&str>,
    preparation_statements: &[String],
) -> Result<Connection, InspectorError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(location, flags)
        .map_err(|e| InspectorError::InternalError(e.to_string()))?;
    conn.busy_timeout(Duration::from_millis(5000))
        .map_err(|e| InspectorError::InternalError(e.to_string()))?;

    if let Some(key) = key {
        key_provider::validate_key(key).map_err(|e| InspectorError::AccessDenied(e.to_string()))?;
        let literal = key.replace('"', "\"\"");
        conn.execute_batch(&format!("PRAGMA key = \"{literal}\";"))
            .map_err(|e| InspectorError::AccessDenied(e.to_string()))?;
        for statement in preparation_statements {
            conn.execute_batch(statement)
                .map_err(|e| InspectorError::AccessDenied(e.to_string()))?;
        }
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|_| InspectorError::AccessDenied("Invalid encryption key".to_string()))?;
    }

    Ok(conn)
}

/// Best-effort open used by `list_databases` to classify a descriptor
/// without failing the whole listing if one database can't be opened.
pub fn try_open_readonly(
    location: &str,
    key: Option<&str>,
    preparation_statements: &[String],
) -> Option<Connection> {
    open_readonly(location, key, preparation_statements).ok()
}

/// Convert a SQLite value into the JSON representation used in row
/// payloads sent to the Hub (blobs are base64-encoded).
pub fn value_ref_to_json(value: rusqlite::types::ValueRef<'_>) -> serde_json::Value {
    use base64::Engine;
    use rusqlite::types::ValueRef;

    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) => {
            serde_json::Value::String(String::from_utf8_lossy(t).into_owned())
        }
        ValueRef::Blob(b) => serde_json::Value::String(
            base64::engine::general_purpose::STANDARD.encode(b),
        ),
    }
}
