//! Grouping and accumulation shared by the transforms

use rustc_hash::FxHashMap;

use crate::error::TransformError;

/// Groups keyed by string, iterated in order of first occurrence.
#[derive(Debug)]
pub struct Groups<A> {
    entries: Vec<(String, A)>,
    index: FxHashMap<String, usize>,
}

impl<A: Default> Groups<A> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Accumulator for `key`, created on first sight.
    pub fn entry(&mut self, key: &str) -> &mut A {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                let idx = self.entries.len();
                self.index.insert(key.to_string(), idx);
                self.entries.push((key.to_string(), A::default()));
                idx
            }
        };
        &mut self.entries[idx].1
    }

    pub fn into_entries(self) -> Vec<(String, A)> {
        self.entries
    }
}

impl<A: Default> Default for Groups<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Running sum and count.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mean {
    sum: f64,
    count: u64,
}

impl Mean {
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Add `value` unless it is NaN or infinite. Returns whether it counted.
    pub fn add_finite(&mut self, value: f64) -> bool {
        if value.is_finite() {
            self.add(value);
        }
        value.is_finite()
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// NaN for an empty accumulator.
    pub fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Reject NaN and infinite aggregates.
pub fn finite(group: &str, column: &'static str, value: f64) -> Result<f64, TransformError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TransformError::NonFinite {
            group: group.to_string(),
            column,
            value,
        })
    }
}

/// Mean of a column that skipped non-finite inputs. `None` when no value
/// counted; an overflowing sum is still an error.
pub fn finite_mean(
    group: &str,
    column: &'static str,
    acc: &Mean,
) -> Result<Option<f64>, TransformError> {
    if acc.count() == 0 {
        return Ok(None);
    }
    finite(group, column, acc.mean()).map(Some)
}

/// Run a transform, logging and swallowing its error.
pub fn fail_closed<T>(domain: &str, result: Result<Vec<T>, TransformError>) -> Vec<T> {
    match result {
        Ok(rows) => {
            log::info!("Transformed {domain} data into {} rows", rows.len());
            rows
        }
        Err(e) => {
            log::error!("Error transforming {domain} data: {e}");
            Vec::new()
        }
    }
}
