//! Tributary Core - object storage, format codecs and the incremental merge engine
//!
//! This crate provides the storage-facing half of the pipeline: a small
//! object store contract with filesystem and in-memory backends, the three
//! record codecs (CSV, Parquet, JSON), and the read-modify-write merge that
//! appends new records to a stored object.

pub mod codec;
pub mod error;
pub mod hash;
pub mod logging;
pub mod merge;
pub mod retry;
pub mod shutdown;
pub mod store;

// Re-exports for convenience
pub use codec::{Codec, CodecError, Columnar, CsvCodec, Format, JsonCodec, ParquetCodec};
pub use error::MergeError;
pub use hash::Version;
pub use logging::init_logging;
pub use merge::{AppendSummary, append_records};
pub use retry::ConflictRetry;
pub use shutdown::shutdown_flag;
pub use store::{
    LocalStore, MemoryStore, ObjectStore, StoreError, StoredObject, ensure_bucket,
};
