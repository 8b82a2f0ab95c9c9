//! Per-cycle outcome reporting

use std::fmt;
use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use tributary_domains::Domain;

/// Which side of the pipeline ran the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Producer,
    Consumer,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Producer => "producer",
            Self::Consumer => "consumer",
        })
    }
}

/// What happened to one domain in one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Records appended to the stored object.
    Appended {
        appended: usize,
        total: usize,
        attempts: u32,
    },
    /// Aggregate rows upserted into the warehouse.
    Loaded { applied: usize, rejected: usize },
    /// Nothing to do this cycle (e.g. the object does not exist yet).
    Skipped(String),
    /// The domain failed; siblings were unaffected.
    Failed(String),
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    fn status(&self) -> &'static str {
        match self {
            Self::Appended { .. } => "appended",
            Self::Loaded { .. } => "loaded",
            Self::Skipped(_) => "skipped",
            Self::Failed(_) => "FAILED",
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::Appended {
                appended,
                total,
                attempts,
            } => {
                let mut s = format!("+{appended} → {total} records");
                if *attempts > 1 {
                    s.push_str(&format!(" ({attempts} attempts)"));
                }
                s
            }
            Self::Loaded { applied, rejected } if *rejected > 0 => {
                format!("{applied} rows, {rejected} rejected")
            }
            Self::Loaded { applied, .. } => format!("{applied} rows"),
            Self::Skipped(reason) | Self::Failed(reason) => reason.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomainOutcome {
    pub domain: Domain,
    pub outcome: Outcome,
    pub elapsed: Duration,
}

/// Outcomes of every domain for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub side: Side,
    pub cycle: u64,
    pub outcomes: Vec<DomainOutcome>,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn new(side: Side, cycle: u64) -> Self {
        Self {
            side,
            cycle,
            outcomes: Vec::with_capacity(Domain::ALL.len()),
            elapsed: Duration::ZERO,
        }
    }

    pub fn push(&mut self, domain: Domain, outcome: Outcome, elapsed: Duration) {
        self.outcomes.push(DomainOutcome {
            domain,
            outcome,
            elapsed,
        });
    }

    pub fn outcome(&self, domain: Domain) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| o.domain == domain)
            .map(|o| &o.outcome)
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_failed()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// One summary line per cycle; failures were already logged with context.
    pub fn log(&self) {
        let parts: Vec<String> = self
            .outcomes
            .iter()
            .map(|o| format!("{}={}", o.domain, o.outcome.status()))
            .collect();
        if self.is_success() {
            log::info!(
                "{} cycle {} done: {} [{:.2}s]",
                self.side,
                self.cycle,
                parts.join(" "),
                self.elapsed.as_secs_f64()
            );
        } else {
            log::warn!(
                "{} cycle {} finished with {} failed domain(s): {} [{:.2}s]",
                self.side,
                self.cycle,
                self.failed(),
                parts.join(" "),
                self.elapsed.as_secs_f64()
            );
        }
    }

    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new(format!("{} cycle {}", self.side, self.cycle))
                    .fg(Color::Cyan)
                    .add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Status").fg(Color::Cyan),
                Cell::new("Detail").fg(Color::Cyan),
                Cell::new("Time").fg(Color::Cyan),
            ]);
        for o in &self.outcomes {
            let status = Cell::new(o.outcome.status());
            let status = if o.outcome.is_failed() {
                status.fg(Color::Red)
            } else {
                status
            };
            table.add_row(vec![
                Cell::new(o.domain),
                status,
                Cell::new(o.outcome.detail()),
                Cell::new(format!("{:.2}s", o.elapsed.as_secs_f64())),
            ]);
        }
        table.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> CycleReport {
        let mut r = CycleReport::new(Side::Consumer, 7);
        r.push(
            Domain::Finance,
            Outcome::Loaded {
                applied: 4,
                rejected: 0,
            },
            Duration::from_millis(5),
        );
        r.push(
            Domain::Healthcare,
            Outcome::Failed("cannot connect".into()),
            Duration::from_millis(1),
        );
        r.push(
            Domain::Ml,
            Outcome::Skipped("ml-bucket/ml_data.json does not exist yet".into()),
            Duration::ZERO,
        );
        r
    }

    #[test]
    fn counts_failures() {
        let r = report();
        assert_eq!(r.failed(), 1);
        assert!(!r.is_success());
        assert!(r.outcome(Domain::Healthcare).unwrap().is_failed());
        assert!(matches!(
            r.outcome(Domain::Finance),
            Some(Outcome::Loaded { applied: 4, .. })
        ));
    }

    #[test]
    fn table_mentions_every_domain() {
        let table = report().format_table();
        for needle in ["finance", "healthcare", "ml", "FAILED", "4 rows", "consumer cycle 7"] {
            assert!(table.contains(needle), "{needle} missing from\n{table}");
        }
    }

    #[test]
    fn appended_detail() {
        let o = Outcome::Appended {
            appended: 1,
            total: 9,
            attempts: 2,
        };
        assert_eq!(o.detail(), "+1 → 9 records (2 attempts)");
    }
}
