//! Retry with exponential backoff for conflicting object writes

use std::time::Duration;

use crate::error::MergeError;

/// How often and how patiently to redo a merge whose conditional write lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictRetry {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for ConflictRetry {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

impl ConflictRetry {
    /// No retries: the first conflict is reported.
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Exponential backoff: base × 2^(attempt-1) (50ms, 100ms, 200ms, ... by default)
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Run `attempt_fn` until it succeeds, fails for good, or retries run out.
    ///
    /// Returns the value together with the number of attempts made. A
    /// retryable error that outlives `max_retries` becomes
    /// [`MergeError::Conflict`].
    pub fn run<T>(
        &self,
        label: &str,
        mut attempt_fn: impl FnMut() -> Result<T, MergeError>,
    ) -> Result<(T, u32), MergeError> {
        let mut attempt = 0u32;
        loop {
            match attempt_fn() {
                Ok(v) => return Ok((v, attempt + 1)),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    log::debug!(
                        "{label}: attempt {attempt}/{} lost a write race: {e}, retrying...",
                        self.max_retries
                    );
                    std::thread::sleep(self.backoff_duration(attempt));
                }
                Err(e) if e.is_retryable() => {
                    return Err(MergeError::Conflict {
                        object: label.to_string(),
                        attempts: attempt + 1,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}
