//! Produce subcommand - append synthetic records on a fixed cadence

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use tributary_pipeline::Scheduler;

use super::LoopArgs;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ProduceArgs {
    #[command(flatten)]
    pub schedule: LoopArgs,

    /// Producer cycles allowed in flight at once (overrides config)
    #[arg(long)]
    pub max_inflight: Option<usize>,
}

pub fn run(args: ProduceArgs, config: &Config) -> Result<()> {
    let producer = super::producer(config)?;
    producer.bootstrap()?;

    if args.schedule.once {
        return super::finish_once(&producer.run_cycle(1));
    }

    let cadence = args.schedule.cadence(config.producer.interval_secs);
    let max_inflight = args.max_inflight.unwrap_or(config.producer.max_inflight);
    let stats = super::runtime()?.block_on(
        Scheduler::new("producer", cadence).run_producer(Arc::new(producer), max_inflight),
    );
    log::debug!("producer loop stats: {stats:?}");
    Ok(())
}
