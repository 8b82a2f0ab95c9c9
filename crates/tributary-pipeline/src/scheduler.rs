//! Cooperative scheduler driving producer and consumer cycles
//!
//! Each loop alternates between `Idle` and `RunningCycle`. Producer cycles
//! are dispatched onto the blocking pool and not awaited, so the tick clock
//! keeps its cadence; a semaphore bounds how many may be in flight at once.
//! Consumer cycles are awaited before the next sleep. Shutdown is checked
//! before every cycle and while sleeping; a running cycle always completes.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::Instant;

use tributary_core::shutdown_flag;

use crate::config::Cadence;
use crate::consumer::Consumer;
use crate::producer::Producer;

/// Granularity of shutdown checks while idling.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    RunningCycle,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::RunningCycle => "RUNNING_CYCLE",
        })
    }
}

/// Counters returned when a loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Cycles that ran (or were dispatched, for the producer).
    pub cycles: u64,
    /// Producer ticks dropped because every permit was taken.
    pub skipped: u64,
    /// Cycles that reported at least one failed domain.
    pub failed: u64,
}

/// Loop state plus the stop conditions it honours.
pub struct Scheduler {
    cadence: Cadence,
    shutdown: &'static AtomicBool,
    state: SchedulerState,
    name: &'static str,
}

impl Scheduler {
    pub fn new(name: &'static str, cadence: Cadence) -> Self {
        Self {
            cadence,
            shutdown: shutdown_flag(),
            state: SchedulerState::Idle,
            name,
        }
    }

    /// Watch a different stop flag than the process-wide one.
    pub fn with_shutdown(mut self, flag: &'static AtomicBool) -> Self {
        self.shutdown = flag;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    fn stop_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn transition(&mut self, next: SchedulerState) {
        if self.state != next {
            log::debug!("{}: {} -> {}", self.name, self.state, next);
            self.state = next;
        }
    }

    fn should_continue(&self, ticks: u64) -> bool {
        !self.stop_requested() && self.cadence.max_cycles.map_or(true, |max| ticks < max)
    }

    fn log_stop_reason(&self) {
        if self.stop_requested() {
            log::info!("{}: shutdown requested, not starting another cycle", self.name);
        }
    }

    /// Sleep for one interval, waking early on shutdown.
    async fn idle(&self) {
        let deadline = Instant::now() + self.cadence.interval;
        while !self.stop_requested() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep((deadline - now).min(SHUTDOWN_POLL)).await;
        }
    }

    /// Run producer cycles until stopped.
    ///
    /// At most `max_inflight` cycles run concurrently; a tick that finds no
    /// free permit is skipped. Returns once every dispatched cycle finished.
    pub async fn run_producer(mut self, producer: Arc<Producer>, max_inflight: usize) -> LoopStats {
        let max_inflight = max_inflight.max(1);
        let permits = Arc::new(Semaphore::new(max_inflight));
        let failed = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let mut stats = LoopStats::default();
        let mut ticks = 0u64;

        log::info!(
            "{}: every {:?}, up to {max_inflight} cycles in flight",
            self.name,
            self.cadence.interval
        );

        while self.should_continue(ticks) {
            ticks += 1;
            match permits.clone().try_acquire_owned() {
                Ok(permit) => {
                    self.transition(SchedulerState::RunningCycle);
                    stats.cycles += 1;
                    let cycle = stats.cycles;
                    let producer = producer.clone();
                    let failed = failed.clone();
                    tokio::task::spawn_blocking(move || {
                        let report = producer.run_cycle(cycle);
                        report.log();
                        if !report.is_success() {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                        drop(permit);
                    });
                }
                Err(_) => {
                    stats.skipped += 1;
                    log::warn!(
                        "{}: {max_inflight} cycles still in flight, skipping tick {ticks}",
                        self.name
                    );
                }
            }
            self.transition(SchedulerState::Idle);
            if self.should_continue(ticks) {
                self.idle().await;
            }
        }

        self.log_stop_reason();

        // Wait for in-flight cycles by taking every permit back.
        let n = u32::try_from(max_inflight).unwrap_or(u32::MAX);
        if permits.acquire_many(n).await.is_err() {
            log::warn!("{}: permit pool closed before draining", self.name);
        }
        stats.failed = failed.load(Ordering::Relaxed);
        log::info!(
            "{}: stopped after {} cycles ({} skipped, {} with failures)",
            self.name,
            stats.cycles,
            stats.skipped,
            stats.failed
        );
        stats
    }

    /// Run consumer cycles until stopped, each to completion before sleeping.
    pub async fn run_consumer(mut self, consumer: Arc<Consumer>) -> LoopStats {
        let mut stats = LoopStats::default();
        log::info!("{}: every {:?}", self.name, self.cadence.interval);

        while self.should_continue(stats.cycles) {
            stats.cycles += 1;
            let cycle = stats.cycles;
            self.transition(SchedulerState::RunningCycle);

            let consumer = consumer.clone();
            match tokio::task::spawn_blocking(move || consumer.run_cycle(cycle)).await {
                Ok(report) => {
                    report.log();
                    if !report.is_success() {
                        stats.failed += 1;
                    }
                }
                Err(e) => {
                    stats.failed += 1;
                    log::error!("{}: cycle {cycle} aborted: {e}", self.name);
                }
            }

            self.transition(SchedulerState::Idle);
            if self.should_continue(stats.cycles) {
                log::info!(
                    "{}: waiting {:?} before next run",
                    self.name,
                    self.cadence.interval
                );
                self.idle().await;
            }
        }

        self.log_stop_reason();
        log::info!(
            "{}: stopped after {} cycles ({} with failures)",
            self.name,
            stats.cycles,
            stats.failed
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag() -> &'static AtomicBool {
        Box::leak(Box::new(AtomicBool::new(false)))
    }

    #[test]
    fn max_cycles_bounds_loop() {
        let s = Scheduler::new("t", Cadence::every(Duration::ZERO).with_max_cycles(2))
            .with_shutdown(flag());
        assert!(s.should_continue(0));
        assert!(s.should_continue(1));
        assert!(!s.should_continue(2));
    }

    #[test]
    fn shutdown_stops_before_next_cycle() {
        let stop = flag();
        let s = Scheduler::new("t", Cadence::every(Duration::ZERO)).with_shutdown(stop);
        assert!(s.should_continue(100));
        stop.store(true, Ordering::Relaxed);
        assert!(!s.should_continue(0));
    }

    #[tokio::test]
    async fn idle_wakes_on_shutdown() {
        let stop = flag();
        stop.store(true, Ordering::Relaxed);
        let s = Scheduler::new("t", Cadence::every(Duration::from_secs(3600))).with_shutdown(stop);
        tokio::time::timeout(Duration::from_secs(5), s.idle())
            .await
            .unwrap();
    }

    #[test]
    fn starts_idle() {
        let s = Scheduler::new("t", Cadence::once());
        assert_eq!(s.state(), SchedulerState::Idle);
        assert_eq!(SchedulerState::RunningCycle.to_string(), "RUNNING_CYCLE");
    }
}
