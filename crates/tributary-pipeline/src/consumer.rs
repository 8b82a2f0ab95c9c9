//! Consumer side: extract, transform and load every domain

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use tributary_core::{Codec, CsvCodec, JsonCodec, ObjectStore, ParquetCodec};
use tributary_domains::Domain;
use tributary_domains::finance::{self, FinanceRow};
use tributary_domains::healthcare::{self, HealthcareReading};
use tributary_domains::ml::{self, MlSample};
use tributary_warehouse::{Frame, Loader, TableRow};

use crate::config::{Target, Targets};
use crate::report::{CycleReport, Outcome, Side};

pub struct Consumer {
    store: Arc<dyn ObjectStore>,
    targets: Targets,
    loader: Loader,
    overrides: HashMap<Domain, Loader>,
}

impl Consumer {
    pub fn new(store: Arc<dyn ObjectStore>, targets: Targets, loader: Loader) -> Self {
        Self {
            store,
            targets,
            loader,
            overrides: HashMap::new(),
        }
    }

    /// Load `domain` through its own loader instead of the shared one.
    pub fn with_loader(mut self, domain: Domain, loader: Loader) -> Self {
        self.overrides.insert(domain, loader);
        self
    }

    fn loader_for(&self, domain: Domain) -> &Loader {
        self.overrides.get(&domain).unwrap_or(&self.loader)
    }

    /// One extract → transform → load pass over every domain.
    ///
    /// A failing domain is logged and reported; the others still run.
    pub fn run_cycle(&self, cycle: u64) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::new(Side::Consumer, cycle);
        for domain in Domain::ALL {
            let t = Instant::now();
            let outcome = match self.consume(domain) {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("{domain}: {e:#}");
                    Outcome::Failed(format!("{e:#}"))
                }
            };
            report.push(domain, outcome, t.elapsed());
        }
        report.elapsed = started.elapsed();
        report
    }

    fn consume(&self, domain: Domain) -> Result<Outcome> {
        let target = self.targets.get(domain);
        let frame = match domain {
            Domain::Finance => {
                self.stage(target, &CsvCodec::<FinanceRow>::new(), finance::transform)?
            }
            Domain::Healthcare => self.stage(
                target,
                &ParquetCodec::<HealthcareReading>::default(),
                healthcare::transform,
            )?,
            Domain::Ml => self.stage(target, &JsonCodec::<MlSample>::new(), ml::transform)?,
        };

        let Some(frame) = frame else {
            log::info!("{target} does not exist yet, nothing to load");
            return Ok(Outcome::Skipped(format!("{target} does not exist yet")));
        };
        if frame.is_empty() {
            return Ok(Outcome::Skipped("no aggregate rows".to_string()));
        }

        let summary = self
            .loader_for(domain)
            .upsert(&frame, domain.table(), domain.conflict_key())
            .with_context(|| format!("loading {domain} data into {}", domain.table()))?;
        Ok(Outcome::Loaded {
            applied: summary.applied,
            rejected: summary.rejected,
        })
    }

    /// Read and decode the object, then aggregate. `None` if the object is absent.
    fn stage<C, T>(
        &self,
        target: &Target,
        codec: &C,
        transform: fn(&[C::Record]) -> Vec<T>,
    ) -> Result<Option<Frame>>
    where
        C: Codec,
        T: TableRow,
    {
        let object = match self.store.get_object(&target.bucket, &target.object) {
            Ok(object) => object,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {target}")),
        };
        let records = codec
            .decode(&object.data)
            .with_context(|| format!("decoding {target} as {}", codec.format()))?;
        log::info!(
            "Successfully read {} {} records from {target}",
            records.len(),
            codec.format()
        );
        Ok(Some(Frame::from_rows(&transform(&records))))
    }
}
