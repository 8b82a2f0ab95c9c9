//! Warehouse connections

use std::path::{Path, PathBuf};

use duckdb::Connection;

use crate::error::LoadError;

/// Something that can hand out a fresh warehouse connection.
///
/// A connection is opened per load and closed afterwards, so a warehouse
/// that is down for one cycle is retried naturally on the next.
pub trait Connector: Send + Sync {
    fn connect(&self) -> Result<Connection, LoadError>;

    /// Human-readable target for log lines.
    fn describe(&self) -> String;
}

/// File-backed (or in-memory, with `:memory:`) DuckDB database.
#[derive(Debug, Clone)]
pub struct DuckDbConnector {
    path: PathBuf,
    memory_limit: Option<String>,
}

impl DuckDbConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            memory_limit: None,
        }
    }

    /// DuckDB memory limit, e.g. "2GB".
    pub fn with_memory_limit(mut self, limit: impl Into<String>) -> Self {
        self.memory_limit = Some(limit.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_memory(&self) -> bool {
        self.path.as_os_str() == ":memory:"
    }
}

impl Connector for DuckDbConnector {
    fn connect(&self) -> Result<Connection, LoadError> {
        let connection_error = |source| LoadError::Connection {
            target: self.describe(),
            source,
        };

        let conn = if self.is_memory() {
            Connection::open_in_memory()
        } else {
            Connection::open(&self.path)
        }
        .map_err(connection_error)?;

        if let Some(limit) = &self.memory_limit {
            if !limit.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
                return Err(LoadError::InvalidIdentifier(limit.clone()));
            }
            conn.execute_batch(&format!("SET memory_limit = '{limit}'"))
                .map_err(connection_error)?;
        }
        Ok(conn)
    }

    fn describe(&self) -> String {
        format!("duckdb:{}", self.path.display())
    }
}

/// Close a connection, logging instead of failing.
pub(crate) fn close(conn: Connection, target: &str) {
    if let Err((_, e)) = conn.close() {
        log::warn!("Failed to close warehouse connection {target}: {e}");
    }
}
