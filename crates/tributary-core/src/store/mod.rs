//! Object store contract and backends
//!
//! Buckets are named containers and objects are named blobs inside them.
//! Only whole-object reads and writes exist; there is no append primitive,
//! which is why appends go through [`crate::merge`].

mod local;
mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

use crate::hash::Version;

/// Errors from object store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Bucket or object does not exist. Expected on first write.
    NotFound { bucket: String, name: Option<String> },
    /// Conditional write lost: the object changed since it was read.
    Precondition {
        bucket: String,
        name: String,
        expected: Option<Version>,
        found: Option<Version>,
    },
    /// Bucket or object name rejected before touching the backend.
    InvalidName(String),
    Io(std::io::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { bucket, name: None } => write!(f, "bucket not found: {bucket}"),
            Self::NotFound {
                bucket,
                name: Some(name),
            } => write!(f, "object not found: {bucket}/{name}"),
            Self::Precondition {
                bucket,
                name,
                expected,
                found,
            } => write!(
                f,
                "{bucket}/{name} changed concurrently (expected {}, found {})",
                fmt_version(expected),
                fmt_version(found)
            ),
            Self::InvalidName(name) => write!(f, "invalid bucket or object name: {name:?}"),
            Self::Io(e) => write!(f, "IO: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The bucket exists but the object does not.
    pub fn is_object_not_found(&self) -> bool {
        matches!(self, Self::NotFound { name: Some(_), .. })
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }
}

fn fmt_version(v: &Option<Version>) -> String {
    v.map_or_else(|| "absent".to_string(), |v| v.short())
}

/// A whole object as read from the store, with the version it had at read time.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub version: Version,
}

impl StoredObject {
    pub fn new(data: Vec<u8>) -> Self {
        let version = Version::of(&data);
        Self { data, version }
    }
}

/// Blob storage over named buckets and objects.
///
/// All calls are blocking. Timeouts, if any, belong to the backend.
pub trait ObjectStore: Send + Sync {
    fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError>;

    fn create_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    /// Allow anonymous reads of every object in the bucket.
    fn set_public_read_policy(&self, bucket: &str) -> Result<(), StoreError>;

    /// Read a whole object. Absence is reported as [`StoreError::NotFound`].
    fn get_object(&self, bucket: &str, name: &str) -> Result<StoredObject, StoreError>;

    /// Unconditionally replace (or create) an object.
    fn put_object(&self, bucket: &str, name: &str, data: &[u8]) -> Result<Version, StoreError>;

    /// Replace an object only if its current version is `expected`.
    ///
    /// `expected = None` means the object must not exist yet. On mismatch the
    /// object is left untouched and [`StoreError::Precondition`] is returned.
    fn put_object_if(
        &self,
        bucket: &str,
        name: &str,
        data: &[u8],
        expected: Option<&Version>,
    ) -> Result<Version, StoreError>;
}

/// S3-style bucket policy granting anonymous `GetObject` on every key.
pub fn public_read_policy(bucket: &str) -> serde_json::Value {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Sid": "PublicReadGetObject",
                "Effect": "Allow",
                "Principal": "*",
                "Action": "s3:GetObject",
                "Resource": format!("arn:aws:s3:::{bucket}/*"),
            }
        ]
    })
}

/// Create `bucket` if missing and open it for public reads.
///
/// Returns `true` if the bucket was created. A failure to apply the policy
/// is logged; the bucket is still usable by the pipeline itself.
pub fn ensure_bucket(store: &dyn ObjectStore, bucket: &str) -> Result<bool, StoreError> {
    if store.bucket_exists(bucket)? {
        return Ok(false);
    }
    store.create_bucket(bucket)?;
    log::info!("Created bucket: {bucket}");
    match store.set_public_read_policy(bucket) {
        Ok(()) => log::info!("Set public read policy for bucket: {bucket}"),
        Err(e) => log::error!("Error setting public read policy for bucket {bucket}: {e}"),
    }
    Ok(true)
}

/// Reject names that could escape a bucket directory or collide with
/// backend bookkeeping files.
pub(crate) fn validate_name(name: &str) -> Result<(), StoreError> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
        || name.ends_with(".tmp");
    if bad {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}
