pub mod consume;
pub mod produce;
pub mod run;
pub mod status;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use tributary_core::LocalStore;
use tributary_pipeline::{Cadence, Consumer, Producer};

use crate::config::Config;

/// Loop options shared by `produce` and `consume`.
#[derive(Args, Debug, Clone, Copy)]
pub struct LoopArgs {
    /// Seconds between cycles (overrides config)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Run a single cycle and print its report
    #[arg(long)]
    pub once: bool,

    /// Stop after this many cycles
    #[arg(long)]
    pub max_cycles: Option<u64>,
}

impl LoopArgs {
    pub fn cadence(&self, default_secs: u64) -> Cadence {
        let cadence = Cadence::every(Duration::from_secs(self.interval.unwrap_or(default_secs)));
        match self.max_cycles {
            Some(n) => cadence.with_max_cycles(n),
            None => cadence,
        }
    }
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .build()
        .context("Failed to start tokio runtime")
}

fn open_store(config: &Config) -> Result<Arc<LocalStore>> {
    let store = LocalStore::new(&config.store.root).with_context(|| {
        format!(
            "Cannot open object store at {}",
            config.store.root.display()
        )
    })?;
    Ok(Arc::new(store))
}

pub fn producer(config: &Config) -> Result<Producer> {
    Ok(Producer::new(open_store(config)?, config.targets())
        .with_retry(config.conflict_retry())
        .with_zstd_level(config.producer.compression_level))
}

pub fn consumer(config: &Config) -> Result<Consumer> {
    if let Some(parent) = config.warehouse.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Cannot create warehouse directory {}", parent.display())
            })?;
        }
    }
    Ok(Consumer::new(
        open_store(config)?,
        config.targets(),
        config.loader(),
    ))
}

/// Print a one-off cycle report and turn failed domains into an error.
fn finish_once(report: &tributary_pipeline::CycleReport) -> Result<()> {
    eprintln!("\n{}", report.format_table());
    if report.is_success() {
        Ok(())
    } else {
        anyhow::bail!("{} domain(s) failed", report.failed())
    }
}
