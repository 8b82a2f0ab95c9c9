//! Incremental merge: append a batch to a stored object
//!
//! The store only offers whole-object reads and writes, so an append is a
//! read-modify-write:
//!
//! 1. read the object (absence means "start empty")
//! 2. decode it with the object's codec
//! 3. existing records first, then the new batch
//! 4. encode everything and write it back, conditioned on the version read in 1
//!
//! If another writer replaced the object between 1 and 4 the write is
//! refused and the sequence starts over (see [`ConflictRetry`]), so
//! overlapping appends to the same object never drop each other's records.

use crate::codec::Codec;
use crate::error::MergeError;
use crate::retry::ConflictRetry;
use crate::store::ObjectStore;

/// Outcome of one [`append_records`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendSummary {
    /// Records already stored before this append.
    pub existing: usize,
    pub appended: usize,
    /// Records in the object after this append.
    pub total: usize,
    /// The object did not exist and was created.
    pub created: bool,
    /// Read-modify-write attempts (1 unless a write race was lost).
    pub attempts: u32,
}

/// Append `batch` to `bucket/name`, preserving existing-records-first order.
///
/// Never shrinks the object and never writes a partial result: a decode
/// failure aborts before anything is written. An empty batch reads the
/// object but does not rewrite it.
pub fn append_records<C>(
    store: &dyn ObjectStore,
    bucket: &str,
    name: &str,
    batch: &[C::Record],
    codec: &C,
    retry: &ConflictRetry,
) -> Result<AppendSummary, MergeError>
where
    C: Codec,
    C::Record: Clone,
{
    let object = format!("{bucket}/{name}");
    let (summary, attempts) =
        retry.run(&object, || append_once(store, bucket, name, &object, batch, codec))?;
    Ok(AppendSummary {
        attempts,
        ..summary
    })
}

fn append_once<C>(
    store: &dyn ObjectStore,
    bucket: &str,
    name: &str,
    object: &str,
    batch: &[C::Record],
    codec: &C,
) -> Result<AppendSummary, MergeError>
where
    C: Codec,
    C::Record: Clone,
{
    let (mut records, expected) = match store.get_object(bucket, name) {
        Ok(stored) => {
            let records = codec
                .decode(&stored.data)
                .map_err(|source| MergeError::Decode {
                    object: object.to_string(),
                    format: codec.format(),
                    source,
                })?;
            (records, Some(stored.version))
        }
        Err(e) if e.is_object_not_found() => {
            log::info!("{object} does not exist, creating a new one");
            (Vec::new(), None)
        }
        Err(e) => return Err(e.into()),
    };

    let existing = records.len();
    let created = expected.is_none();
    if batch.is_empty() {
        return Ok(AppendSummary {
            existing,
            appended: 0,
            total: existing,
            created: false,
            attempts: 1,
        });
    }

    records.extend_from_slice(batch);
    let data = codec
        .encode(&records)
        .map_err(|source| MergeError::Encode {
            object: object.to_string(),
            format: codec.format(),
            source,
        })?;

    let version = store.put_object_if(bucket, name, &data, expected.as_ref())?;
    log::debug!(
        "{object}: {existing} + {} records -> version {version}",
        batch.len()
    );

    Ok(AppendSummary {
        existing,
        appended: batch.len(),
        total: records.len(),
        created,
        attempts: 1,
    })
}
