//! Producer side: generate one record per domain and append it

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use rand::Rng;

use tributary_core::{
    AppendSummary, Codec, ConflictRetry, CsvCodec, JsonCodec, MergeError, ObjectStore,
    ParquetCodec, append_records, ensure_bucket,
};
use tributary_domains::Domain;
use tributary_domains::finance::FinanceTick;
use tributary_domains::healthcare::HealthcareReading;
use tributary_domains::ml::MlSample;
use tributary_domains::synth::now_epoch_seconds;

use crate::config::{Target, Targets};
use crate::report::{CycleReport, Outcome, Side};

pub struct Producer {
    store: Arc<dyn ObjectStore>,
    targets: Targets,
    retry: ConflictRetry,
    zstd_level: i32,
}

impl Producer {
    pub fn new(store: Arc<dyn ObjectStore>, targets: Targets) -> Self {
        Self {
            store,
            targets,
            retry: ConflictRetry::default(),
            zstd_level: tributary_core::codec::DEFAULT_ZSTD_LEVEL,
        }
    }

    pub fn with_retry(mut self, retry: ConflictRetry) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_zstd_level(mut self, level: i32) -> Self {
        self.zstd_level = level;
        self
    }

    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    /// Make sure every target bucket exists and is publicly readable.
    ///
    /// All buckets are attempted; the first failure is returned afterwards.
    pub fn bootstrap(&self) -> Result<()> {
        let mut first_err = None;
        for bucket in self.targets.buckets() {
            match ensure_bucket(self.store.as_ref(), bucket) {
                Ok(true) => {}
                Ok(false) => log::debug!("Bucket {bucket} already exists"),
                Err(e) => {
                    log::error!("Error while creating bucket {bucket}: {e}");
                    first_err.get_or_insert((bucket.to_string(), e));
                }
            }
        }
        match first_err {
            Some((bucket, e)) => Err(e).with_context(|| format!("cannot provision bucket {bucket}")),
            None => Ok(()),
        }
    }

    /// Generate and append one record for every domain.
    pub fn run_cycle(&self, cycle: u64) -> CycleReport {
        self.run_cycle_with(cycle, &mut rand::rng())
    }

    /// [`Producer::run_cycle`] with a caller-supplied random source.
    pub fn run_cycle_with<R: Rng + ?Sized>(&self, cycle: u64, rng: &mut R) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::new(Side::Producer, cycle);
        for domain in Domain::ALL {
            let t = Instant::now();
            let target = self.targets.get(domain);
            let outcome = match self.produce(domain, target, rng) {
                Ok(summary) => {
                    log::info!(
                        "Appended {domain} data to {} in bucket {} ({} records)",
                        target.object,
                        target.bucket,
                        summary.total
                    );
                    Outcome::Appended {
                        appended: summary.appended,
                        total: summary.total,
                        attempts: summary.attempts,
                    }
                }
                Err(e) => {
                    log::error!("Error appending {domain} data to {target}: {e}");
                    Outcome::Failed(e.to_string())
                }
            };
            report.push(domain, outcome, t.elapsed());
        }
        report.elapsed = started.elapsed();
        report
    }

    fn produce<R: Rng + ?Sized>(
        &self,
        domain: Domain,
        target: &Target,
        rng: &mut R,
    ) -> Result<AppendSummary, MergeError> {
        let now = now_epoch_seconds();
        match domain {
            Domain::Finance => self.append(
                target,
                &[FinanceTick::generate(rng, now)],
                &CsvCodec::new(),
            ),
            Domain::Healthcare => self.append(
                target,
                &[HealthcareReading::generate(rng, now)],
                &ParquetCodec::new(self.zstd_level),
            ),
            Domain::Ml => self.append(target, &[MlSample::generate(rng)], &JsonCodec::new()),
        }
    }

    fn append<C>(
        &self,
        target: &Target,
        batch: &[C::Record],
        codec: &C,
    ) -> Result<AppendSummary, MergeError>
    where
        C: Codec,
        C::Record: Clone,
    {
        append_records(
            self.store.as_ref(),
            &target.bucket,
            &target.object,
            batch,
            codec,
            &self.retry,
        )
    }
}
