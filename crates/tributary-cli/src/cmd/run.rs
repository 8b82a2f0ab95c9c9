//! Run subcommand - producer and consumer loops in one process

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use tributary_pipeline::{Cadence, Scheduler};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Seconds between producer cycles (overrides config)
    #[arg(long)]
    pub produce_interval: Option<u64>,

    /// Seconds between consumer cycles (overrides config)
    #[arg(long)]
    pub consume_interval: Option<u64>,
}

pub fn run(args: RunArgs, config: &Config) -> Result<()> {
    let producer = super::producer(config)?;
    producer.bootstrap()?;
    let consumer = super::consumer(config)?;

    let produce_every = Cadence::every(Duration::from_secs(
        args.produce_interval.unwrap_or(config.producer.interval_secs),
    ));
    let consume_every = Cadence::every(Duration::from_secs(
        args.consume_interval.unwrap_or(config.consumer.interval_secs),
    ));

    let (produced, consumed) = super::runtime()?.block_on(async {
        tokio::join!(
            Scheduler::new("producer", produce_every)
                .run_producer(Arc::new(producer), config.producer.max_inflight),
            Scheduler::new("consumer", consume_every).run_consumer(Arc::new(consumer)),
        )
    });

    log::info!(
        "Stopped: {} producer cycles, {} consumer cycles",
        produced.cycles,
        consumed.cycles
    );
    Ok(())
}
