//! Loader error type

/// Error from loading a frame into the warehouse.
#[derive(Debug)]
pub enum LoadError {
    /// Warehouse unreachable. The load step is skipped, not retried.
    Connection {
        target: String,
        source: duckdb::Error,
    },
    /// Row (or frame) cannot be targeted by the upsert: conflict key column
    /// absent, key value NULL, or wrong number of cells.
    Constraint {
        table: String,
        row: Option<usize>,
        message: String,
    },
    /// Statement failed inside the warehouse.
    Statement {
        table: String,
        row: Option<usize>,
        source: duckdb::Error,
    },
    InvalidIdentifier(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection { target, source } => {
                write!(f, "cannot connect to warehouse {target}: {source}")
            }
            Self::Constraint {
                table,
                row: Some(row),
                message,
            } => write!(f, "{table}: row {row} rejected: {message}"),
            Self::Constraint {
                table,
                row: None,
                message,
            } => write!(f, "{table}: {message}"),
            Self::Statement {
                table,
                row: Some(row),
                source,
            } => write!(f, "{table}: row {row} failed: {source}"),
            Self::Statement {
                table,
                row: None,
                source,
            } => write!(f, "{table}: {source}"),
            Self::InvalidIdentifier(ident) => write!(f, "invalid SQL identifier: {ident:?}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connection { source, .. } | Self::Statement { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl LoadError {
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}
