//! Idempotent keyed upserts

use std::sync::Arc;

use duckdb::{Connection, Statement, params_from_iter};

use crate::config::UpsertMode;
use crate::connect::{self, Connector};
use crate::error::LoadError;
use crate::frame::{Frame, Value};
use crate::sql;

/// Outcome of one upsert batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub table: String,
    pub applied: usize,
    pub rejected: usize,
}

/// Loads frames into warehouse tables, one connection per load.
pub struct Loader {
    connector: Arc<dyn Connector>,
    mode: UpsertMode,
    create_tables: bool,
}

impl Loader {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            mode: UpsertMode::default(),
            create_tables: true,
        }
    }

    pub fn with_mode(mut self, mode: UpsertMode) -> Self {
        self.mode = mode;
        self
    }

    /// Whether a missing table is created (with the conflict key as primary
    /// key) before loading.
    pub fn with_create_tables(mut self, create: bool) -> Self {
        self.create_tables = create;
        self
    }

    /// Insert every row of `frame` into `table`, overwriting all non-key
    /// columns of rows whose `conflict_key` already exists.
    ///
    /// Re-applying the same frame leaves the table unchanged.
    pub fn upsert(
        &self,
        frame: &Frame,
        table: &str,
        conflict_key: &str,
    ) -> Result<LoadSummary, LoadError> {
        sql::validate_identifier(table)?;
        sql::validate_identifier(conflict_key)?;
        for column in &frame.columns {
            sql::validate_identifier(&column.name)?;
        }
        let key_idx = frame
            .column_index(conflict_key)
            .ok_or_else(|| LoadError::Constraint {
                table: table.to_string(),
                row: None,
                message: format!("conflict key column {conflict_key:?} is not in the frame"),
            })?;

        let target = self.connector.describe();
        let mut conn = self.connector.connect()?;
        log::debug!("Connected to warehouse {target}");

        let result = self.apply(&mut conn, frame, table, conflict_key, key_idx);
        connect::close(conn, &target);

        let summary = result?;
        if summary.rejected > 0 {
            log::warn!(
                "{table}: upserted {} rows, rejected {}",
                summary.applied,
                summary.rejected
            );
        } else {
            log::info!("{table}: upserted {} rows", summary.applied);
        }
        Ok(summary)
    }

    fn apply(
        &self,
        conn: &mut Connection,
        frame: &Frame,
        table: &str,
        conflict_key: &str,
        key_idx: usize,
    ) -> Result<LoadSummary, LoadError> {
        let statement_error = |row: Option<usize>, source: duckdb::Error| LoadError::Statement {
            table: table.to_string(),
            row,
            source,
        };

        if self.create_tables {
            conn.execute_batch(&sql::create_table(table, &frame.columns, conflict_key))
                .map_err(|e| statement_error(None, e))?;
        }

        let upsert_sql = sql::upsert(table, &frame.columns, conflict_key);
        let mut summary = LoadSummary {
            table: table.to_string(),
            applied: 0,
            rejected: 0,
        };

        match self.mode {
            UpsertMode::FailFast => {
                let tx = conn.transaction().map_err(|e| statement_error(None, e))?;
                {
                    let mut stmt = tx
                        .prepare(&upsert_sql)
                        .map_err(|e| statement_error(None, e))?;
                    for (i, row) in frame.rows.iter().enumerate() {
                        apply_row(&mut stmt, table, frame, key_idx, i, row)?;
                    }
                }
                // Dropping an uncommitted transaction rolls it back, so an
                // early return above leaves the table untouched.
                tx.commit().map_err(|e| statement_error(None, e))?;
                summary.applied = frame.rows.len();
            }
            UpsertMode::BestEffort => {
                let mut stmt = conn
                    .prepare(&upsert_sql)
                    .map_err(|e| statement_error(None, e))?;
                for (i, row) in frame.rows.iter().enumerate() {
                    match apply_row(&mut stmt, table, frame, key_idx, i, row) {
                        Ok(()) => summary.applied += 1,
                        Err(e) => {
                            log::warn!("{e}");
                            summary.rejected += 1;
                        }
                    }
                }
            }
        }
        Ok(summary)
    }
}

fn apply_row(
    stmt: &mut Statement<'_>,
    table: &str,
    frame: &Frame,
    key_idx: usize,
    i: usize,
    row: &[Value],
) -> Result<(), LoadError> {
    let constraint = |message: String| LoadError::Constraint {
        table: table.to_string(),
        row: Some(i),
        message,
    };
    if row.len() != frame.columns.len() {
        return Err(constraint(format!(
            "expected {} cells, got {}",
            frame.columns.len(),
            row.len()
        )));
    }
    if row[key_idx].is_null() {
        return Err(constraint("conflict key is NULL".to_string()));
    }
    stmt.execute(params_from_iter(row.iter().map(Value::to_duckdb)))
        .map_err(|source| LoadError::Statement {
            table: table.to_string(),
            row: Some(i),
            source,
        })?;
    Ok(())
}

/// Row count and key listing of a loaded table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub table: String,
    pub rows: u64,
    pub keys: Vec<String>,
}

/// Inspect a table. A missing table is a [`LoadError::Statement`].
pub fn table_summary(
    connector: &dyn Connector,
    table: &str,
    conflict_key: &str,
) -> Result<TableSummary, LoadError> {
    sql::validate_identifier(table)?;
    sql::validate_identifier(conflict_key)?;

    let target = connector.describe();
    let conn = connector.connect()?;
    let result = summarize(&conn, table, conflict_key);
    connect::close(conn, &target);
    result
}

fn summarize(
    conn: &Connection,
    table: &str,
    conflict_key: &str,
) -> Result<TableSummary, LoadError> {
    let statement_error = |source| LoadError::Statement {
        table: table.to_string(),
        row: None,
        source,
    };

    let rows: i64 = conn
        .query_row(&sql::count_rows(table), [], |r| r.get(0))
        .map_err(statement_error)?;

    let mut stmt = conn
        .prepare(&sql::list_keys(table, conflict_key))
        .map_err(statement_error)?;
    let keys = stmt
        .query_map([], |r| r.get::<_, Option<String>>(0))
        .map_err(statement_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(statement_error)?
        .into_iter()
        .flatten()
        .collect();

    Ok(TableSummary {
        table: table.to_string(),
        rows: u64::try_from(rows).unwrap_or(0),
        keys,
    })
}
