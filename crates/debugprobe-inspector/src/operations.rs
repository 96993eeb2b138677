//! Blocking query bodies run inside `spawn_blocking` by [`crate::Inspector`].

use crate::connection::value_ref_to_json;
use crate::error::InspectorError;
use crate::identifiers::{quote_identifier, validate_identifier};
use debugprobe_types::{ColumnInfo, QueryResult, Row, RowPage, TableInfo, TableSchema, TableSearchResult};
use rusqlite::Connection;

const MAX_QUERY_ROWS: usize = 1000;
const MIN_PAGE_SIZE: u32 = 1;
const MAX_PAGE_SIZE: u32 = 500;

/// `SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE
/// 'sqlite_%'`, with an approximate row count
/// per table.
pub fn list_tables(conn: &Connection) -> Result<Vec<TableInfo>, InspectorError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let quoted = quote_identifier(&name);
        let row_count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {quoted}"), [], |r| r.get(0))
            .unwrap_or(0);
        out.push(TableInfo {
            name,
            row_count,
        });
    }
    Ok(out)
}

/// Does `table` exist as a user table?
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, InspectorError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

/// `PRAGMA table_info(table)` translated into [`TableSchema`].
pub fn describe_table(conn: &Connection, table: &str) -> Result<TableSchema, InspectorError> {
    validate_identifier(table)?;
    if !table_exists(conn, table)? {
        return Err(InspectorError::TableNotFound(table.to_string()));
    }
    let quoted = quote_identifier(table);
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({quoted})"))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                column_type: row.get(2)?,
                not_null: row.get::<_, i64>(3)? != 0,
                is_primary_key: row.get::<_, i64>(5)? != 0,
                default_value: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(TableSchema {
        name: table.to_string(),
        columns,
    })
}

fn read_rows(stmt: &mut rusqlite::Statement<'_>) -> Result<(Vec<String>, Vec<Row>), InspectorError> {
    let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let rows = stmt
        .query_map([], |row| {
            let mut out = Row::new();
            for (idx, name) in column_names.iter().enumerate() {
                out.insert(name.clone(), value_ref_to_json(row.get_ref(idx)?));
            }
            Ok(out)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok((column_names, rows))
}

/// Resolve the absolute row ordinal of `target_row_id` within `table`
/// under the given order, preferring `ROW_NUMBER() OVER (...)` and
/// falling back to a `COUNT(*) WHERE rowid <= ?` estimate when there is
/// no explicit order.
fn resolve_target_page(
    conn: &Connection,
    table: &str,
    order_by: Option<&str>,
    ascending: bool,
    target_row_id: i64,
    page_size: u32,
) -> Result<u32, InspectorError> {
    let quoted = quote_identifier(table);
    let ordinal: i64 = if let Some(col) = order_by {
        validate_identifier(col)?;
        let direction = if ascending { "ASC" } else { "DESC" };
        let quoted_col = quote_identifier(col);
        let sql = format!(
            "SELECT rn FROM (SELECT rowid, ROW_NUMBER() OVER (ORDER BY {quoted_col} {direction}) AS rn FROM {quoted}) WHERE rowid = ?1"
        );
        match conn.query_row(&sql, [target_row_id], |r| r.get(0)) {
            Ok(rn) => rn,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(InspectorError::InvalidQuery(format!(
                    "rowid {target_row_id} not found in {table}"
                )))
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        conn.query_row(
            &format!("SELECT COUNT(*) FROM {quoted} WHERE rowid <= ?1"),
            [target_row_id],
            |r| r.get(0),
        )?
    };
    let page = ((ordinal.max(1) - 1) / i64::from(page_size)) + 1;
    Ok(page.max(1) as u32)
}

/// `fetch_table_page`, clamping `page_size` to `[1, 500]` and `page` to
/// `>= 1`. Rows carry an implicit `_rowid` column.
#[allow(clippy::too_many_arguments)]
pub fn fetch_table_page(
    conn: &Connection,
    table: &str,
    page: u32,
    page_size: u32,
    order_by: Option<&str>,
    ascending: bool,
    target_row_id: Option<i64>,
) -> Result<RowPage, InspectorError> {
    validate_identifier(table)?;
    if !table_exists(conn, table)? {
        return Err(InspectorError::TableNotFound(table.to_string()));
    }
    let page_size = page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);
    let mut page = page.max(1);

    if let Some(row_id) = target_row_id {
        page = resolve_target_page(conn, table, order_by, ascending, row_id, page_size)?;
    }

    let quoted = quote_identifier(table);
    let total_rows: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {quoted}"), [], |r| r.get(0))?;

    let order_clause = match order_by {
        Some(col) => {
            validate_identifier(col)?;
            format!(
                "ORDER BY {} {}",
                quote_identifier(col),
                if ascending { "ASC" } else { "DESC" }
            )
        }
        None => "ORDER BY rowid ASC".to_string(),
    };

    let offset = i64::from(page - 1) * i64::from(page_size);
    let sql = format!(
        "SELECT rowid AS _rowid, * FROM {quoted} {order_clause} LIMIT ?1 OFFSET ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params![page_size, offset], |row| {
            let column_names: Vec<String> =
                stmt_column_names(row);
            let mut out = Row::new();
            for (idx, name) in column_names.iter().enumerate() {
                out.insert(name.clone(), value_ref_to_json(row.get_ref(idx)?));
            }
            Ok(out)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(RowPage {
        page,
        page_size,
        total_rows,
        rows,
    })
}

fn stmt_column_names(row: &rusqlite::Row<'_>) -> Vec<String> {
    row.as_ref().column_names().iter().map(|s| s.to_string()).collect()
}

/// `execute_query` — caller has already validated `sql` is a bare
/// `SELECT` with no denylisted keyword.
/// Result set is hard-capped at 1000 rows.
pub fn execute_query(conn: &Connection, sql: &str) -> Result<QueryResult, InspectorError> {
    let mut stmt = conn.prepare(sql)?;
    let (columns, mut rows) = read_rows(&mut stmt)?;
    let truncated = rows.len() > MAX_QUERY_ROWS;
    rows.truncate(MAX_QUERY_ROWS);
    Ok(QueryResult {
        columns,
        rows,
        truncated,
    })
}

fn escape_like(keyword: &str) -> String {
    let mut out = String::with_capacity(keyword.len());
    for ch in keyword.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '%' => out.push_str("\\%"),
            '_' => out.push_str("\\_"),
            '\'' => out.push_str("\\'"),
            other => out.push(other),
        }
    }
    out
}

/// Text-typed (or untyped) columns eligible for keyword search.
fn searchable_columns(conn: &Connection, table: &str) -> Result<Vec<String>, InspectorError> {
    let schema = describe_table(conn, table)?;
    Ok(schema
        .columns
        .into_iter()
        .filter(|c| {
            let upper = c.column_type.to_ascii_uppercase();
            upper.is_empty()
                || ["TEXT", "CHAR", "CLOB", "VARCHAR", "STRING"]
                    .iter()
                    .any(|t| upper.contains(t))
        })
        .map(|c| c.name)
        .collect())
}

/// `search_in_database` for a single table — caller aggregates and
/// sorts by `match_count` descending across tables.
pub fn search_table(
    conn: &Connection,
    table: &str,
    keyword: &str,
    max_results_per_table: u32,
) -> Result<Option<TableSearchResult>, InspectorError> {
    let columns = searchable_columns(conn, table)?;
    if columns.is_empty() {
        return Ok(None);
    }
    let quoted = quote_identifier(table);
    let pattern = format!("%{}%", escape_like(keyword));
    let where_clause = columns
        .iter()
        .map(|c| format!("{} LIKE ?1 ESCAPE '\\'", quote_identifier(c)))
        .collect::<Vec<_>>()
        .join(" OR ");

    let match_count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {quoted} WHERE {where_clause}"),
        [&pattern],
        |r| r.get(0),
    )?;
    if match_count == 0 {
        return Ok(None);
    }

    let mut rowid_stmt =
        conn.prepare(&format!("SELECT rowid FROM {quoted} WHERE {where_clause}"))?;
    let matching_row_ids: Vec<i64> = rowid_stmt
        .query_map([&pattern], |r| r.get(0))?
        .collect::<rusqlite::Result<_>>()?;

    let mut preview_stmt = conn.prepare(&format!(
        "SELECT rowid AS _rowid, * FROM {quoted} WHERE {where_clause} LIMIT ?2"
    ))?;
    let preview_rows = preview_stmt
        .query_map(rusqlite::params![pattern, max_results_per_table], |row| {
            let column_names = stmt_column_names(row);
            let mut out = Row::new();
            for (idx, name) in column_names.iter().enumerate() {
                out.insert(name.clone(), value_ref_to_json(row.get_ref(idx)?));
            }
            Ok(out)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Some(TableSearchResult {
        table: table.to_string(),
        match_count: match_count as u64,
        matching_row_ids,
        preview_rows,
    }))
}

/// `fetch_rows_by_rowids`.
pub fn fetch_rows_by_row_ids(
    conn: &Connection,
    table: &str,
    row_ids: &[i64],
) -> Result<Vec<Row>, InspectorError> {
    validate_identifier(table)?;
    if !table_exists(conn, table)? {
        return Err(InspectorError::TableNotFound(table.to_string()));
    }
    if row_ids.is_empty() {
        return Ok(Vec::new());
    }
    let quoted = quote_identifier(table);
    let placeholders = row_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!("SELECT rowid AS _rowid, * FROM {quoted} WHERE rowid IN ({placeholders})");
    let mut stmt = conn.prepare(&sql)?;
    let bound: Vec<&dyn rusqlite::ToSql> = row_ids.iter().map(|i| i as &dyn rusqlite::ToSql).collect();
    let rows = stmt
        .query_map(bound.as_slice(), |row| {
            let column_names = stmt_column_names(row);
            let mut out = Row::new();
            for (idx, name) in column_names.iter().enumerate() {
                out.insert(name.clone(), value_ref_to_json(row.get_ref(idx)?));
            }
            Ok(out)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Count of user tables, for `list_databases` classification.
pub fn count_user_tables(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )
    .unwrap_or(0)
}
