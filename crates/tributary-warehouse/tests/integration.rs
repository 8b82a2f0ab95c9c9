use std::path::Path;
use std::sync::Arc;

use tributary_warehouse::{
    Column, DuckDbConnector, Frame, LoadError, Loader, SqlType, UpsertMode, Value, table_summary,
};

fn columns() -> Vec<Column> {
    vec![
        Column::new("symbol", SqlType::Text),
        Column::new("avg_close_price", SqlType::Double),
        Column::new("trades", SqlType::BigInt),
    ]
}

fn frame(rows: &[(&str, f64, i64)]) -> Frame {
    let mut frame = Frame::new(columns());
    for &(symbol, price, trades) in rows {
        frame.push(vec![symbol.into(), price.into(), trades.into()]);
    }
    frame
}

fn loader(path: &Path, mode: UpsertMode) -> Loader {
    Loader::new(Arc::new(DuckDbConnector::new(path))).with_mode(mode)
}

/// Read the table back with a short-lived connection.
fn read_rows(path: &Path) -> Vec<(String, Option<f64>, Option<i64>)> {
    let conn = duckdb::Connection::open(path).unwrap();
    let mut stmt = conn
        .prepare("SELECT symbol, avg_close_price, trades FROM finance_data ORDER BY symbol")
        .unwrap();
    let rows = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    rows
}

#[test]
fn upsert_inserts_then_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("w.duckdb");
    let loader = loader(&db, UpsertMode::FailFast);

    let summary = loader
        .upsert(&frame(&[("AAPL", 150.0, 2), ("MSFT", 300.0, 1)]), "finance_data", "symbol")
        .unwrap();
    assert_eq!(summary.applied, 2);
    assert_eq!(summary.rejected, 0);

    loader
        .upsert(&frame(&[("AAPL", 175.5, 4)]), "finance_data", "symbol")
        .unwrap();

    assert_eq!(
        read_rows(&db),
        vec![
            ("AAPL".to_string(), Some(175.5), Some(4)),
            ("MSFT".to_string(), Some(300.0), Some(1)),
        ]
    );
}

#[test]
fn reapplying_same_frame_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("w.duckdb");
    let loader = loader(&db, UpsertMode::FailFast);
    let batch = frame(&[("AAPL", 150.0, 2), ("GOOG", 2800.0, 3)]);

    loader.upsert(&batch, "finance_data", "symbol").unwrap();
    let first = read_rows(&db);
    loader.upsert(&batch, "finance_data", "symbol").unwrap();
    loader.upsert(&batch, "finance_data", "symbol").unwrap();
    assert_eq!(read_rows(&db), first);
    assert_eq!(first.len(), 2);
}

#[test]
fn null_values_overwrite_too() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("w.duckdb");
    let loader = loader(&db, UpsertMode::FailFast);
    loader
        .upsert(&frame(&[("AAPL", 150.0, 2)]), "finance_data", "symbol")
        .unwrap();

    let mut update = Frame::new(columns());
    update.push(vec!["AAPL".into(), Value::Null, 5i64.into()]);
    loader.upsert(&update, "finance_data", "symbol").unwrap();

    assert_eq!(read_rows(&db), vec![("AAPL".to_string(), None, Some(5))]);
}

#[test]
fn fail_fast_rolls_back_whole_batch() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("w.duckdb");
    let loader = loader(&db, UpsertMode::FailFast);
    loader
        .upsert(&frame(&[("AAPL", 150.0, 2)]), "finance_data", "symbol")
        .unwrap();

    let mut batch = frame(&[("AAPL", 999.0, 9), ("MSFT", 300.0, 1)]);
    batch.push(vec![Value::Null, 1.0.into(), 1i64.into()]);

    let err = loader.upsert(&batch, "finance_data", "symbol").unwrap_err();
    assert!(matches!(err, LoadError::Constraint { row: Some(2), .. }), "{err}");

    assert_eq!(read_rows(&db), vec![("AAPL".to_string(), Some(150.0), Some(2))]);
}

#[test]
fn best_effort_skips_rejected_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("w.duckdb");
    let loader = loader(&db, UpsertMode::BestEffort);

    let mut batch = frame(&[("AAPL", 150.0, 2)]);
    batch.push(vec![Value::Null, 1.0.into(), 1i64.into()]);
    batch.push(vec!["BAD".into(), "not a number".into(), 1i64.into()]);
    batch.push(vec!["MSFT".into(), 300.0.into()]);
    batch.push(vec!["GOOG".into(), 2800.0.into(), 3i64.into()]);

    let summary = loader.upsert(&batch, "finance_data", "symbol").unwrap();
    assert_eq!(summary.applied, 2);
    assert_eq!(summary.rejected, 3);

    let symbols: Vec<String> = read_rows(&db).into_iter().map(|r| r.0).collect();
    assert_eq!(symbols, vec!["AAPL", "GOOG"]);
}

#[test]
fn missing_conflict_column_fails_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("w.duckdb");
    let err = loader(&db, UpsertMode::FailFast)
        .upsert(&frame(&[("AAPL", 1.0, 1)]), "finance_data", "ticker")
        .unwrap_err();
    assert!(matches!(err, LoadError::Constraint { row: None, .. }), "{err}");
    assert!(!db.exists());
}

#[test]
fn hostile_identifiers_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("w.duckdb");
    let err = loader(&db, UpsertMode::FailFast)
        .upsert(&frame(&[]), "finance_data; DROP TABLE x", "symbol")
        .unwrap_err();
    assert!(matches!(err, LoadError::InvalidIdentifier(_)));
}

#[test]
fn unreachable_warehouse_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("missing-dir/w.duckdb");
    let err = loader(&db, UpsertMode::FailFast)
        .upsert(&frame(&[("AAPL", 1.0, 1)]), "finance_data", "symbol")
        .unwrap_err();
    assert!(err.is_connection(), "{err}");
}

#[test]
fn empty_frame_creates_table_only() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("w.duckdb");
    let summary = loader(&db, UpsertMode::FailFast)
        .upsert(&frame(&[]), "finance_data", "symbol")
        .unwrap();
    assert_eq!(summary.applied, 0);
    assert!(read_rows(&db).is_empty());
}

#[test]
fn summary_lists_keys() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("w.duckdb");
    let loader = loader(&db, UpsertMode::FailFast);
    loader
        .upsert(&frame(&[("MSFT", 1.0, 1), ("AAPL", 2.0, 1)]), "finance_data", "symbol")
        .unwrap();

    let connector = DuckDbConnector::new(&db);
    let summary = table_summary(&connector, "finance_data", "symbol").unwrap();
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.keys, vec!["AAPL", "MSFT"]);

    let missing = table_summary(&connector, "ml_data", "cholesterol_level").unwrap_err();
    assert!(matches!(missing, LoadError::Statement { .. }));
}
