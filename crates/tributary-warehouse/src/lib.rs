//! DuckDB-backed warehouse: keyed, idempotent upserts of aggregate tables.

pub mod config;
pub mod connect;
pub mod error;
pub mod frame;
pub mod loader;
pub mod sql;

pub use config::UpsertMode;
pub use connect::{Connector, DuckDbConnector};
pub use error::LoadError;
pub use frame::{Column, Frame, SqlType, TableRow, Value};
pub use loader::{LoadSummary, Loader, TableSummary, table_summary};
