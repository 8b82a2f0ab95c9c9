//! Status subcommand - summarize warehouse tables

use anyhow::Result;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use tributary_domains::Domain;
use tributary_warehouse::table_summary;

use crate::config::Config;

pub fn run(config: &Config) -> Result<()> {
    if !config.warehouse.path.exists() {
        eprintln!(
            "No warehouse at {} yet (run `tributary consume` first)",
            config.warehouse.path.display()
        );
        return Ok(());
    }

    let connector = config.connector();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Table").fg(Color::Cyan),
            Cell::new("Key").fg(Color::Cyan),
            Cell::new("Rows").fg(Color::Cyan),
            Cell::new("Keys").fg(Color::Cyan),
        ]);

    for domain in Domain::ALL {
        let (rows, keys) = match table_summary(&connector, domain.table(), domain.conflict_key()) {
            Ok(summary) => (summary.rows.to_string(), summary.keys.join(", ")),
            Err(e) if e.is_connection() => return Err(e.into()),
            Err(e) => {
                log::debug!("{}: {e}", domain.table());
                ("-".to_string(), "not loaded yet".to_string())
            }
        };
        table.add_row(vec![
            Cell::new(domain.table()),
            Cell::new(domain.conflict_key()),
            Cell::new(rows),
            Cell::new(keys),
        ]);
    }

    eprintln!("\n{table}");
    Ok(())
}
