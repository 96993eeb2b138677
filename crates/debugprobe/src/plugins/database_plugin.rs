//! The SQLite introspection plugin — dispatches a `db_command` wrapping
//! a `DBCommand` to the underlying [`debugprobe_inspector::Inspector`].
//!
//! Database registration (`register_database`/`unregister_database`) is
//! a host-side Rust API, not a Hub command — the Hub only ever drives
//! read-only introspection through `db_command`.

use async_trait::async_trait;
use debugprobe_inspector::Inspector;
use debugprobe_kernel::{Plugin, PluginContext, Result as KernelResult};
use debugprobe_types::{DbCommand, PluginCommand, PluginCommandResponse};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct DatabasePlugin {
    inspector: Arc<Inspector>,
    active: AtomicBool,
}

impl DatabasePlugin {
    pub fn new(inspector: Arc<Inspector>) -> Self {
        Self {
            inspector,
            active: AtomicBool::new(true),
        }
    }

    /// The inspector a host shim registers its databases against.
    pub fn inspector(&self) -> Arc<Inspector> {
        self.inspector.clone()
    }

    async fn dispatch(&self, db_command: DbCommand) -> Result<serde_json::Value, String> {
        match db_command {
            DbCommand::ListDatabases => self
                .inspector
                .list_databases()
                .await
                .map(|v| serde_json::json!({ "databases": v }))
                .map_err(|e| e.to_string()),
            DbCommand::ListTables { db_id } => self
                .inspector
                .list_tables(&db_id)
                .await
                .map(|v| serde_json::json!({ "tables": v }))
                .map_err(|e| e.to_string()),
            DbCommand::DescribeTable { db_id, table } => self
                .inspector
                .describe_table(&db_id, &table)
                .await
                .map(|schema| serde_json::to_value(schema).unwrap_or(serde_json::Value::Null))
                .map_err(|e| e.to_string()),
            DbCommand::FetchTablePage {
                db_id,
                table,
                page,
                page_size,
                order_by,
                ascending,
                target_row_id,
            } => self
                .inspector
                .fetch_table_page(&db_id, &table, page, page_size, order_by, ascending, target_row_id)
                .await
                .map(|page| serde_json::to_value(page).unwrap_or(serde_json::Value::Null))
                .map_err(|e| e.to_string()),
            DbCommand::ExecuteQuery { db_id, sql } => self
                .inspector
                .execute_query(&db_id, &sql)
                .await
                .map(|result| serde_json::to_value(result).unwrap_or(serde_json::Value::Null))
                .map_err(|e| e.to_string()),
            DbCommand::SearchDatabase {
                db_id,
                keyword,
                max_results_per_table,
            } => self
                .inspector
                .search_in_database(&db_id, &keyword, max_results_per_table)
                .await
                .map(|v| serde_json::json!({ "results": v }))
                .map_err(|e| e.to_string()),
            DbCommand::FetchRowsByRowIds { db_id, table, row_ids } => self
                .inspector
                .fetch_rows_by_row_ids(&db_id, &table, row_ids)
                .await
                .map(|v| serde_json::json!({ "rows": v }))
                .map_err(|e| e.to_string()),
        }
    }
}

#[async_trait]
impl Plugin for DatabasePlugin {
    fn id(&self) -> &str {
        "database"
    }

    fn display_name(&self) -> &str {
        "Database Inspector"
    }

    async fn initialize(&mut self, _ctx: PluginContext) -> KernelResult<()> {
        Ok(())
    }

    async fn start(&mut self) -> KernelResult<()> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> KernelResult<()> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn pause(&mut self) -> KernelResult<()> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&mut self) -> KernelResult<()> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn handle_command(&mut self, command: PluginCommand) -> PluginCommandResponse {
        match command.command_type.as_str() {
            "enable" => {
                self.active.store(true, Ordering::SeqCst);
                PluginCommandResponse::success(&command, None)
            }
            "disable" => {
                self.active.store(false, Ordering::SeqCst);
                PluginCommandResponse::success(&command, None)
            }
            "get_status" => PluginCommandResponse::success(
                &command,
                Some(serde_json::json!({ "active": self.active.load(Ordering::SeqCst) })),
            ),
            "db_command" => {
                let db_command: Option<DbCommand> =
                    command.payload.clone().and_then(|v| serde_json::from_value(v).ok());
                match db_command {
                    Some(db_command) => match self.dispatch(db_command).await {
                        Ok(payload) => PluginCommandResponse::success(&command, Some(payload)),
                        Err(message) => PluginCommandResponse::failure(&command, message),
                    },
                    None => PluginCommandResponse::failure(&command, "invalid db_command payload"),
                }
            }
            other => PluginCommandResponse::failure(&command, format!("unknown command_type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(command_type: &str, payload: Option<serde_json::Value>) -> PluginCommand {
        PluginCommand {
            plugin_id: "database".to_string(),
            command_id: "c1".to_string(),
            command_type: command_type.to_string(),
            payload,
        }
    }

    #[tokio::test]
    async fn list_databases_with_nothing_registered_returns_empty_list() {
        let mut plugin = DatabasePlugin::new(Arc::new(Inspector::new()));
        let response = plugin
            .handle_command(command("db_command", Some(serde_json::json!({ "kind": "listDatabases" }))))
            .await;
        assert!(response.success);
        assert_eq!(response.payload.unwrap()["databases"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn unknown_database_id_fails_the_command() {
        let mut plugin = DatabasePlugin::new(Arc::new(Inspector::new()));
        let response = plugin
            .handle_command(command(
                "db_command",
                Some(serde_json::json!({ "kind": "listTables", "dbId": "missing" })),
            ))
            .await;
        assert!(!response.success);
    }

    #[tokio::test]
    async fn invalid_db_command_payload_fails() {
        let mut plugin = DatabasePlugin::new(Arc::new(Inspector::new()));
        let response = plugin.handle_command(command("db_command", None)).await;
        assert!(!response.success);
    }
}
