//! Error type for the incremental merge

use crate::codec::{CodecError, Format};
use crate::store::StoreError;

/// Error from appending a batch to a stored object.
///
/// None of these leave the object partially written: the write is the last
/// step and only happens once the full concatenation has been encoded.
#[derive(Debug)]
pub enum MergeError {
    /// Store read or write failed (absence of the object is not an error).
    Store(StoreError),
    /// Existing object could not be decoded; it is left untouched.
    Decode {
        object: String,
        format: Format,
        source: CodecError,
    },
    Encode {
        object: String,
        format: Format,
        source: CodecError,
    },
    /// Object kept changing underneath us until retries ran out.
    Conflict { object: String, attempts: u32 },
}

impl std::fmt::Display for MergeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Decode {
                object,
                format,
                source,
            } => write!(f, "decoding existing {format} object {object}: {source}"),
            Self::Encode {
                object,
                format,
                source,
            } => write!(f, "encoding {format} object {object}: {source}"),
            Self::Conflict { object, attempts } => write!(
                f,
                "{object} modified concurrently, gave up after {attempts} attempts"
            ),
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Decode { source, .. } | Self::Encode { source, .. } => Some(source),
            Self::Conflict { .. } => None,
        }
    }
}

impl From<StoreError> for MergeError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl MergeError {
    /// Only a lost conditional write is worth retrying: the next attempt
    /// re-reads the object and rebuilds the concatenation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_precondition())
    }

    /// Stored content is malformed or has an incompatible schema.
    pub fn is_corrupt_object(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}
