//! Settings shared by the producer and consumer sides

use std::time::Duration;

use tributary_domains::Domain;

/// Where a domain's growing object lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub bucket: String,
    pub object: String,
}

impl Target {
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
        }
    }

    pub fn default_for(domain: Domain) -> Self {
        Self::new(domain.default_bucket(), domain.default_object())
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.object)
    }
}

/// One target per domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets {
    pub finance: Target,
    pub healthcare: Target,
    pub ml: Target,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            finance: Target::default_for(Domain::Finance),
            healthcare: Target::default_for(Domain::Healthcare),
            ml: Target::default_for(Domain::Ml),
        }
    }
}

impl Targets {
    pub fn get(&self, domain: Domain) -> &Target {
        match domain {
            Domain::Finance => &self.finance,
            Domain::Healthcare => &self.healthcare,
            Domain::Ml => &self.ml,
        }
    }

    pub fn set(&mut self, domain: Domain, target: Target) {
        match domain {
            Domain::Finance => self.finance = target,
            Domain::Healthcare => self.healthcare = target,
            Domain::Ml => self.ml = target,
        }
    }

    /// Distinct buckets, in domain order.
    pub fn buckets(&self) -> Vec<&str> {
        let mut buckets: Vec<&str> = Vec::new();
        for domain in Domain::ALL {
            let bucket = self.get(domain).bucket.as_str();
            if !buckets.contains(&bucket) {
                buckets.push(bucket);
            }
        }
        buckets
    }
}

/// Cadence of one scheduler loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub interval: Duration,
    /// Stop after this many ticks. `None` runs until shutdown.
    pub max_cycles: Option<u64>,
}

impl Cadence {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            max_cycles: None,
        }
    }

    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    /// A single tick.
    pub fn once() -> Self {
        Self::every(Duration::ZERO).with_max_cycles(1)
    }
}
