//! SQL generation for warehouse tables.
//!
//! Identifiers are validated before they are spliced into statements;
//! values always go through bound parameters.

use crate::error::LoadError;
use crate::frame::Column;

/// Accept `[A-Za-z_][A-Za-z0-9_]*` only.
pub fn validate_identifier(ident: &str) -> Result<(), LoadError> {
    let mut chars = ident.chars();
    let ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(LoadError::InvalidIdentifier(ident.to_string()))
    }
}

fn quote(ident: &str) -> String {
    format!("\"{ident}\"")
}

/// `CREATE TABLE IF NOT EXISTS` with the conflict key as primary key.
pub fn create_table(table: &str, columns: &[Column], conflict_key: &str) -> String {
    let cols = columns
        .iter()
        .map(|c| {
            let pk = if c.name == conflict_key {
                " PRIMARY KEY"
            } else {
                ""
            };
            format!("{} {}{pk}", quote(&c.name), c.sql_type.ddl())
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE IF NOT EXISTS {} ({cols})", quote(table))
}

/// Single-row insert that overwrites every non-key column on key conflict.
///
/// When the key is the only column there is nothing to overwrite and the
/// conflict is ignored.
pub fn upsert(table: &str, columns: &[Column], conflict_key: &str) -> String {
    let names = columns
        .iter()
        .map(|c| quote(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; columns.len()].join(", ");
    let updates = columns
        .iter()
        .filter(|c| c.name != conflict_key)
        .map(|c| format!("{0} = EXCLUDED.{0}", quote(&c.name)))
        .collect::<Vec<_>>();

    let action = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    format!(
        "INSERT INTO {} ({names}) VALUES ({placeholders}) ON CONFLICT ({}) {action}",
        quote(table),
        quote(conflict_key)
    )
}

/// Row count of a table.
pub fn count_rows(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", quote(table))
}

/// Conflict key values as text, sorted.
pub fn list_keys(table: &str, conflict_key: &str) -> String {
    format!(
        "SELECT CAST({0} AS VARCHAR) FROM {1} ORDER BY {0}",
        quote(conflict_key),
        quote(table)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::SqlType;

    fn cols() -> Vec<Column> {
        vec![
            Column::new("symbol", SqlType::Text),
            Column::new("avg_close_price", SqlType::Double),
            Column::new("n", SqlType::BigInt),
        ]
    }

    #[test]
    fn identifiers() {
        assert!(validate_identifier("finance_data").is_ok());
        assert!(validate_identifier("_x1").is_ok());
        for bad in ["", "1abc", "a-b", "a b", "x;DROP TABLE y", "\"q\""] {
            assert!(validate_identifier(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn create_table_marks_primary_key() {
        let sql = create_table("finance_data", &cols(), "symbol");
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"finance_data\" (\"symbol\" VARCHAR PRIMARY KEY, \
             \"avg_close_price\" DOUBLE, \"n\" BIGINT)"
        );
    }

    #[test]
    fn upsert_updates_every_non_key_column() {
        let sql = upsert("finance_data", &cols(), "symbol");
        assert!(sql.starts_with(
            "INSERT INTO \"finance_data\" (\"symbol\", \"avg_close_price\", \"n\") VALUES (?, ?, ?)"
        ));
        assert!(sql.ends_with(
            "ON CONFLICT (\"symbol\") DO UPDATE SET \
             \"avg_close_price\" = EXCLUDED.\"avg_close_price\", \"n\" = EXCLUDED.\"n\""
        ));
        assert!(!sql.contains("\"symbol\" = EXCLUDED"));
    }

    #[test]
    fn upsert_key_only_does_nothing() {
        let sql = upsert("keys", &[Column::new("k", SqlType::Text)], "k");
        assert!(sql.ends_with("ON CONFLICT (\"k\") DO NOTHING"));
    }
}
