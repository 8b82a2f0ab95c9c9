//! Tributary Pipeline - producer and consumer cycles and their scheduler
//!
//! The producer appends freshly generated records to each domain's stored
//! object; the consumer reads those objects back, aggregates them and
//! upserts the result into the warehouse. Domains are isolated from each
//! other within every cycle.

pub mod config;
pub mod consumer;
pub mod producer;
pub mod report;
pub mod scheduler;

pub use config::{Cadence, Target, Targets};
pub use consumer::Consumer;
pub use producer::Producer;
pub use report::{CycleReport, DomainOutcome, Outcome, Side};
pub use scheduler::{LoopStats, Scheduler, SchedulerState};
