//! Database descriptor types, plus the response payloads the inspector
//! returns to the Hub.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whether the inspector can currently read a database's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionStatus {
    /// Not encrypted.
    None,
    /// Encrypted, and a key provider successfully unlocked it.
    Unlocked,
    /// Encrypted, and no key (or a non-working key) is available.
    Locked,
}

/// Host-supplied metadata identifying a database the inspector may query.
///
/// A descriptor is bound to exactly one file URL at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseDescriptor {
    /// Stable id, referenced by all inspector operations.
    pub id: String,
    /// Display name shown in the Hub.
    pub display_name: String,
    /// Database kind, e.g. "sqlite".
    pub kind: String,
    /// Filesystem path or URL to the database file.
    pub location: String,
    /// Whether the database is encrypted (e.g. SQLCipher).
    pub is_encrypted: bool,
    /// Whether the database is sensitive; sensitive descriptors reject all
    /// inspection operations regardless of other flags.
    pub is_sensitive: bool,
    /// Preparation statements run after `PRAGMA key`, in order, e.g.
    /// `PRAGMA cipher_compatibility = 4;`.
    #[serde(default)]
    pub preparation_statements: Vec<String>,
}

/// `list_databases()` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseInfo {
    /// The descriptor's stable id.
    pub id: String,
    /// Display name shown in the Hub.
    pub display_name: String,
    /// Database kind, e.g. "sqlite".
    pub kind: String,
    /// File size in bytes, captured without opening the database.
    pub size_bytes: u64,
    /// Number of user tables, or 0 if the database could not be opened.
    pub table_count: u32,
    /// Current encryption/unlock status.
    pub encryption_status: EncryptionStatus,
}

/// `list_tables()` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    /// Table name.
    pub name: String,
    /// Approximate row count (`SELECT COUNT(*)`).
    pub row_count: i64,
}

/// One column in a `describe_table()` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Declared SQL type, e.g. "TEXT", "INTEGER".
    #[serde(rename = "type")]
    pub column_type: String,
    /// Whether the column has a `NOT NULL` constraint.
    pub not_null: bool,
    /// Whether the column is (part of) the primary key.
    pub is_primary_key: bool,
    /// Default value expression, if any.
    pub default_value: Option<String>,
}

/// `describe_table()` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Columns, in declaration order.
    pub columns: Vec<ColumnInfo>,
}

/// One row in a paginated or query result set. Every row carries an
/// implicit `_rowid` column for Hub-side highlight.
pub type Row = HashMap<String, serde_json::Value>;

/// `fetch_table_page()` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowPage {
    /// 1-based page number actually returned (may differ from the
    /// requested page if `target_row_id` caused a rewrite).
    pub page: u32,
    /// Rows per page actually used.
    pub page_size: u32,
    /// Total row count in the table.
    pub total_rows: i64,
    /// The page's rows.
    pub rows: Vec<Row>,
}

/// `execute_query()` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names, in result-set order.
    pub columns: Vec<String>,
    /// Result rows, hard-capped at 1000.
    pub rows: Vec<Row>,
    /// Whether the 1000-row cap truncated the result.
    pub truncated: bool,
}

/// One table's results within a `search_in_database()` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSearchResult {
    /// Table name.
    pub table: String,
    /// Total number of matching rows (may exceed `preview_rows.len()`).
    pub match_count: u64,
    /// All matching rowids, even beyond the preview cap.
    pub matching_row_ids: Vec<i64>,
    /// Up to `max_results_per_table` preview rows.
    pub preview_rows: Vec<Row>,
}
