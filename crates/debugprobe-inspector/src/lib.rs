//! Read-only SQLite introspection over host-owned databases.
//!
//! Every operation opens a connection, does its work, and closes it —
//! no connection is cached between calls. Blocking SQLite work runs on
//! `spawn_blocking`; `execute_query` additionally races a 10s watchdog
//! against the connection's interrupt handle.

mod connection;
pub mod error;
mod identifiers;
mod key_provider;
mod operations;

pub use error::{InspectorError, KeyProviderError, Result};
pub use key_provider::{validate_key, KeyProvider, StaticKeyProvider};

use debugprobe_types::{
    DatabaseDescriptor, DatabaseInfo, EncryptionStatus, QueryResult, Row, RowPage, TableInfo,
    TableSchema, TableSearchResult,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

struct Registration {
    descriptor: DatabaseDescriptor,
    key_provider: Option<Arc<dyn KeyProvider>>,
}

/// The SQLite inspector — the `debugprobe-inspector` facade consumed by
/// the database plugin.
#[derive(Default)]
pub struct Inspector {
    databases: RwLock<HashMap<String, Registration>>,
}

impl Inspector {
    /// An inspector with no databases registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a database descriptor and its optional key
    /// provider.
    pub fn register_database(
        &self,
        descriptor: DatabaseDescriptor,
        key_provider: Option<Arc<dyn KeyProvider>>,
    ) {
        self.databases.write().insert(
            descriptor.id.clone(),
            Registration {
                descriptor,
                key_provider,
            },
        );
    }

    /// Remove a previously registered database.
    pub fn unregister_database(&self, id: &str) {
        self.databases.write().remove(id);
    }

    fn lookup(&self, id: &str) -> Result<(DatabaseDescriptor, Option<Arc<dyn KeyProvider>>)> {
        let databases = self.databases.read();
        let entry = databases
            .get(id)
            .ok_or_else(|| InspectorError::DatabaseNotFound(id.to_string()))?;
        if entry.descriptor.is_sensitive {
            return Err(InspectorError::AccessDenied(
                "database is marked sensitive".to_string(),
            ));
        }
        Ok((entry.descriptor.clone(), entry.key_provider.clone()))
    }

    async fn resolve_key(
        descriptor: &DatabaseDescriptor,
        key_provider: &Option<Arc<dyn KeyProvider>>,
    ) -> Result<Option<String>> {
        if !descriptor.is_encrypted {
            return Ok(None);
        }
        match key_provider {
            Some(provider) => {
                let key = provider
                    .get_key()
                    .await
                    .map_err(|e| InspectorError::AccessDenied(e.to_string()))?;
                Ok(Some(key))
            }
            None => Err(InspectorError::AccessDenied(
                "database is locked: no key provider registered".to_string(),
            )),
        }
    }

    /// `list_databases()`. File size never requires
    /// opening; opening is attempted only to count tables and classify
    /// encryption status. An unopenable database reports `table_count =
    /// 0` and `locked` if `is_encrypted`.
    pub async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        let entries: Vec<(DatabaseDescriptor, Option<Arc<dyn KeyProvider>>)> = {
            let databases = self.databases.read();
            databases
                .values()
                .map(|e| (e.descriptor.clone(), e.key_provider.clone()))
                .collect()
        };

        let mut out = Vec::with_capacity(entries.len());
        for (descriptor, key_provider) in entries {
            if descriptor.is_sensitive {
                continue;
            }
            let size_bytes = std::fs::metadata(&descriptor.location)
                .map(|m| m.len())
                .unwrap_or(0);

            let key = if descriptor.is_encrypted {
                match &key_provider {
                    Some(provider) => provider.get_key().await.ok(),
                    None => None,
                }
            } else {
                None
            };

            let location = descriptor.location.clone();
            let prep = descriptor.preparation_statements.clone();
            let (table_count, opened) = tokio::task::spawn_blocking(move || {
                match connection::try_open_readonly(&location, key.as_deref(), &prep) {
                    Some(conn) => (operations::count_user_tables(&conn), true),
                    None => (0, false),
                }
            })
            .await
            .unwrap_or((0, false));

            let encryption_status = if !descriptor.is_encrypted {
                EncryptionStatus::None
            } else if opened {
                EncryptionStatus::Unlocked
            } else {
                EncryptionStatus::Locked
            };

            out.push(DatabaseInfo {
                id: descriptor.id,
                display_name: descriptor.display_name,
                kind: descriptor.kind,
                size_bytes,
                table_count: table_count as u32,
                encryption_status,
            });
        }
        Ok(out)
    }

    /// Run `f` against a freshly opened, freshly closed connection to
    /// `db_id` on a blocking thread.
    async fn with_connection<T, F>(&self, db_id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (descriptor, key_provider) = self.lookup(db_id)?;
        let key = Self::resolve_key(&descriptor, &key_provider).await?;
        let location = descriptor.location.clone();
        let prep = descriptor.preparation_statements.clone();
        tokio::task::spawn_blocking(move || {
            let conn = connection::open_readonly(&location, key.as_deref(), &prep)?;
            f(&conn)
        })
        .await
        .map_err(|e| InspectorError::InternalError(e.to_string()))?
    }

    /// `list_tables(dbId)`.
    pub async fn list_tables(&self, db_id: &str) -> Result<Vec<TableInfo>> {
        self.with_connection(db_id, |conn| operations::list_tables(conn)).await
    }

    /// `describe_table(dbId, table)`.
    pub async fn describe_table(&self, db_id: &str, table: &str) -> Result<TableSchema> {
        let table = table.to_string();
        self.with_connection(db_id, move |conn| operations::describe_table(conn, &table))
            .await
    }

    /// `fetch_table_page(...)`.
    #[allow(clippy::too_many_arguments)]
    pub async fn fetch_table_page(
        &self,
        db_id: &str,
        table: &str,
        page: u32,
        page_size: u32,
        order_by: Option<String>,
        ascending: bool,
        target_row_id: Option<i64>,
    ) -> Result<RowPage> {
        let table = table.to_string();
        self.with_connection(db_id, move |conn| {
            operations::fetch_table_page(
                conn,
                &table,
                page,
                page_size,
                order_by.as_deref(),
                ascending,
                target_row_id,
            )
        })
        .await
    }

    /// `execute_query(dbId, sql)`.
    /// Enforces the 10s wall-clock budget via the connection's interrupt
    /// handle; on expiry the in-flight query is interrupted and the
    /// call returns [`InspectorError::Timeout`].
    pub async fn execute_query(&self, db_id: &str, sql: &str) -> Result<QueryResult> {
        identifiers::validate_select_only(sql)?;
        let (descriptor, key_provider) = self.lookup(db_id)?;
        let key = Self::resolve_key(&descriptor, &key_provider).await?;
        let location = descriptor.location.clone();
        let prep = descriptor.preparation_statements.clone();
        let sql = sql.to_string();

        let conn = tokio::task::spawn_blocking(move || {
            connection::open_readonly(&location, key.as_deref(), &prep)
        })
        .await
        .map_err(|e| InspectorError::InternalError(e.to_string()))??;

        let interrupt_handle = conn.get_interrupt_handle();
        let query_task =
            tokio::task::spawn_blocking(move || operations::execute_query(&conn, &sql));

        tokio::select! {
            result = query_task => {
                result.map_err(|e| InspectorError::InternalError(e.to_string()))?
            }
            _ = tokio::time::sleep(QUERY_TIMEOUT) => {
                interrupt_handle.interrupt();
                Err(InspectorError::Timeout)
            }
        }
    }

    /// `search_in_database(dbId, keyword, maxResultsPerTable)`, sorted by
    /// `match_count` descending.
    pub async fn search_in_database(
        &self,
        db_id: &str,
        keyword: &str,
        max_results_per_table: u32,
    ) -> Result<Vec<TableSearchResult>> {
        let keyword = keyword.to_string();
        self.with_connection(db_id, move |conn| {
            let tables = operations::list_tables(conn)?;
            let mut results = Vec::new();
            for table in tables {
                if let Some(result) =
                    operations::search_table(conn, &table.name, &keyword, max_results_per_table)?
                {
                    results.push(result);
                }
            }
            results.sort_by(|a, b| b.match_count.cmp(&a.match_count));
            Ok(results)
        })
        .await
    }

    /// `fetch_rows_by_rowids(dbId, table, rowIds)`.
    pub async fn fetch_rows_by_row_ids(
        &self,
        db_id: &str,
        table: &str,
        row_ids: Vec<i64>,
    ) -> Result<Vec<Row>> {
        let table = table.to_string();
        self.with_connection(db_id, move |conn| {
            operations::fetch_rows_by_row_ids(conn, &table, &row_ids)
        })
        .await
    }
}
