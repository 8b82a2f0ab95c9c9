//! Consume subcommand - aggregate stored objects into the warehouse

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use tributary_pipeline::Scheduler;

use super::LoopArgs;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ConsumeArgs {
    #[command(flatten)]
    pub schedule: LoopArgs,
}

pub fn run(args: ConsumeArgs, config: &Config) -> Result<()> {
    let consumer = super::consumer(config)?;

    if args.schedule.once {
        return super::finish_once(&consumer.run_cycle(1));
    }

    let cadence = args.schedule.cadence(config.consumer.interval_secs);
    let stats = super::runtime()?
        .block_on(Scheduler::new("consumer", cadence).run_consumer(Arc::new(consumer)));
    log::debug!("consumer loop stats: {stats:?}");
    Ok(())
}
