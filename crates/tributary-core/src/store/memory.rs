//! In-memory object store

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::{ObjectStore, StoreError, StoredObject, validate_name};
use crate::hash::Version;

#[derive(Default)]
struct Inner {
    buckets: HashSet<String>,
    public: HashSet<String>,
    objects: HashMap<(String, String), Vec<u8>>,
}

/// Object store held entirely in memory. Same semantics as [`super::LocalStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether a public-read policy was applied to `bucket`.
    pub fn is_public(&self, bucket: &str) -> bool {
        self.lock().public.contains(bucket)
    }

    /// Number of objects across all buckets.
    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }
}

fn bucket_missing(bucket: &str) -> StoreError {
    StoreError::NotFound {
        bucket: bucket.to_string(),
        name: None,
    }
}

impl ObjectStore for MemoryStore {
    fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        validate_name(bucket)?;
        Ok(self.lock().buckets.contains(bucket))
    }

    fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        validate_name(bucket)?;
        self.lock().buckets.insert(bucket.to_string());
        Ok(())
    }

    fn set_public_read_policy(&self, bucket: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.buckets.contains(bucket) {
            return Err(bucket_missing(bucket));
        }
        inner.public.insert(bucket.to_string());
        Ok(())
    }

    fn get_object(&self, bucket: &str, name: &str) -> Result<StoredObject, StoreError> {
        validate_name(name)?;
        let inner = self.lock();
        if !inner.buckets.contains(bucket) {
            return Err(bucket_missing(bucket));
        }
        inner
            .objects
            .get(&(bucket.to_string(), name.to_string()))
            .map(|data| StoredObject::new(data.clone()))
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                name: Some(name.to_string()),
            })
    }

    fn put_object(&self, bucket: &str, name: &str, data: &[u8]) -> Result<Version, StoreError> {
        validate_name(name)?;
        let mut inner = self.lock();
        if !inner.buckets.contains(bucket) {
            return Err(bucket_missing(bucket));
        }
        inner
            .objects
            .insert((bucket.to_string(), name.to_string()), data.to_vec());
        Ok(Version::of(data))
    }

    fn put_object_if(
        &self,
        bucket: &str,
        name: &str,
        data: &[u8],
        expected: Option<&Version>,
    ) -> Result<Version, StoreError> {
        validate_name(name)?;
        let mut inner = self.lock();
        if !inner.buckets.contains(bucket) {
            return Err(bucket_missing(bucket));
        }
        let key = (bucket.to_string(), name.to_string());
        let found = inner.objects.get(&key).map(|d| Version::of(d));
        if found.as_ref() != expected {
            return Err(StoreError::Precondition {
                bucket: key.0,
                name: key.1,
                expected: expected.copied(),
                found,
            });
        }
        inner.objects.insert(key, data.to_vec());
        Ok(Version::of(data))
    }
}
