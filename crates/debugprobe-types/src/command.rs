//! Plugin command envelope and database-specific command payloads.

use serde::{Deserialize, Serialize};

/// A command the Hub sends to a specific plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginCommand {
    /// Target plugin id.
    pub plugin_id: String,
    /// Correlation id; the response MUST echo this unchanged.
    pub command_id: String,
    /// Command discriminator, e.g. "update_rules", "db_command".
    pub command_type: String,
    /// Command-specific payload.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// The plugin's reply to a [`PluginCommand`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginCommandResponse {
    /// Plugin id that produced the response.
    pub plugin_id: String,
    /// Echoes the originating command's `command_id`.
    pub command_id: String,
    /// Whether the command succeeded.
    pub success: bool,
    /// Result payload, present on success.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    /// Error message, present on failure.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl PluginCommandResponse {
    /// Build a success response echoing `command.command_id`.
    pub fn success(command: &PluginCommand, payload: Option<serde_json::Value>) -> Self {
        Self {
            plugin_id: command.plugin_id.clone(),
            command_id: command.command_id.clone(),
            success: true,
            payload,
            error_message: None,
        }
    }

    /// Build a failure response echoing `command.command_id`.
    pub fn failure(command: &PluginCommand, error_message: impl Into<String>) -> Self {
        Self {
            plugin_id: command.plugin_id.clone(),
            command_id: command.command_id.clone(),
            success: false,
            payload: None,
            error_message: Some(error_message.into()),
        }
    }
}

/// The kind of database operation a `db_command` payload wraps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DbCommand {
    /// `list_databases()`.
    ListDatabases,
    /// `list_tables(dbId)`.
    ListTables {
        /// Target database id.
        db_id: String,
    },
    /// `describe_table(dbId, table)`.
    DescribeTable {
        /// Target database id.
        db_id: String,
        /// Table name.
        table: String,
    },
    /// `fetch_table_page(...)`.
    FetchTablePage {
        /// Target database id.
        db_id: String,
        /// Table name.
        table: String,
        /// 1-based page number.
        page: u32,
        /// Rows per page, clamped to [1, 500].
        page_size: u32,
        /// Optional column to order by.
        order_by: Option<String>,
        /// Sort ascending if true.
        #[serde(default = "default_true")]
        ascending: bool,
        /// If present, rewrite `page` to the page containing this rowid.
        target_row_id: Option<i64>,
    },
    /// `execute_query(dbId, sql)`.
    ExecuteQuery {
        /// Target database id.
        db_id: String,
        /// A single `SELECT` statement.
        sql: String,
    },
    /// `search_in_database(dbId, keyword, maxResultsPerTable)`.
    SearchDatabase {
        /// Target database id.
        db_id: String,
        /// Keyword to search for.
        keyword: String,
        /// Maximum preview rows per table.
        max_results_per_table: u32,
    },
    /// `fetch_rows_by_rowids`.
    FetchRowsByRowIds {
        /// Target database id.
        db_id: String,
        /// Table name.
        table: String,
        /// Rowids to fetch.
        row_ids: Vec<i64>,
    },
}

fn default_true() -> bool {
    true
}
