//! tributary - synthetic data producer and warehouse loader
//!
//! The producer appends generated finance, healthcare and ML records to
//! per-domain objects; the consumer aggregates those objects and upserts
//! the summaries into a DuckDB warehouse.

use std::io::IsTerminal;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;
use tributary_core::shutdown_flag;

#[derive(Parser)]
#[command(name = "tributary")]
#[command(about = "Synthetic data producer and warehouse loader")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file path (default: ./tributary.toml or ~/.config/tributary/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Append generated records to the object store on a fixed cadence
    Produce(cmd::produce::ProduceArgs),
    /// Aggregate stored objects and upsert them into the warehouse
    Consume(cmd::consume::ConsumeArgs),
    /// Run producer and consumer loops together
    Run(cmd::run::RunArgs),
    /// Show warehouse tables
    Status,
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tributary_core::init_logging(cli.quiet, cli.debug, std::io::stderr().is_terminal());
    setup_signal_handler()?;

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Produce(args) => cmd::produce::run(args, &config),
        Command::Consume(args) => cmd::consume::run(args, &config),
        Command::Run(args) => cmd::run::run(args, &config),
        Command::Status => cmd::status::run(&config),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "Object store",
                &config.store.root.display().to_string(),
            ]);
            table.add_row(vec![
                "Warehouse",
                &config.warehouse.path.display().to_string(),
            ]);
            table.add_row(vec![
                "Memory limit",
                config.warehouse.memory_limit.as_deref().unwrap_or("default"),
            ]);
            table.add_row(vec!["Upsert mode", &config.warehouse.upsert_mode.to_string()]);
            table.add_row(vec![
                "Create tables",
                if config.warehouse.create_tables {
                    "yes"
                } else {
                    "no"
                },
            ]);
            table.add_row(vec![
                "Producer",
                &format!(
                    "every {}s (max in flight: {})",
                    config.producer.interval_secs, config.producer.max_inflight
                ),
            ]);
            table.add_row(vec![
                "Conflict retries",
                &format!(
                    "{} (backoff {}ms)",
                    config.producer.conflict_retries, config.producer.conflict_backoff_ms
                ),
            ]);
            table.add_row(vec![
                "Compression level",
                &config.producer.compression_level.to_string(),
            ]);
            table.add_row(vec![
                "Consumer",
                &format!("every {}s", config.consumer.interval_secs),
            ]);
            let targets = config.targets();
            for domain in tributary_domains::Domain::ALL {
                table.add_row(vec![
                    format!("{domain} target"),
                    format!("{} -> {}", targets.get(domain), domain.table()),
                ]);
            }

            eprintln!("\n{table}");
            Ok(())
        }
    }
}

fn setup_signal_handler() -> Result<()> {
    // First signal: set graceful shutdown flag
    // Second signal: force exit
    // SAFETY: AtomicBool::swap and process::exit are async-signal-safe
    for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT] {
        unsafe {
            signal_hook::low_level::register(signal, || {
                if shutdown_flag().swap(true, Ordering::Relaxed) {
                    std::process::exit(130);
                }
            })
        }
        .with_context(|| format!("Failed to register handler for signal {signal}"))?;
    }
    Ok(())
}
