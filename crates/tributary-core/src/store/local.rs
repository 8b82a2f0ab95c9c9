//! Filesystem object store: buckets are directories, objects are files

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{ObjectStore, StoreError, StoredObject, public_read_policy, validate_name};
use crate::hash::Version;

const POLICY_FILE: &str = ".policy.json";

/// Object store rooted at a local directory.
///
/// Writes go to `{name}.tmp` and are renamed into place, so readers never
/// observe a half-written object. Writes from this process are serialized
/// so that the version check of [`ObjectStore::put_object_if`] and the
/// rename happen as one step.
pub struct LocalStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl LocalStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn new(root: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, StoreError> {
        validate_name(bucket)?;
        Ok(self.root.join(bucket))
    }

    fn existing_bucket_dir(&self, bucket: &str) -> Result<PathBuf, StoreError> {
        let dir = self.bucket_dir(bucket)?;
        if !dir.is_dir() {
            return Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                name: None,
            });
        }
        Ok(dir)
    }

    fn current_version(path: &Path) -> Result<Option<Version>, StoreError> {
        match fs::read(path) {
            Ok(data) => Ok(Some(Version::of(&data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write via tmp file + rename. Caller holds `write_lock`.
    fn write_atomic(dir: &Path, name: &str, data: &[u8]) -> Result<Version, StoreError> {
        let final_path = dir.join(name);
        let tmp_path = dir.join(format!("{name}.tmp"));
        fs::write(&tmp_path, data)?;
        if let Err(e) = fs::rename(&tmp_path, &final_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(Version::of(data))
    }
}

impl ObjectStore for LocalStore {
    fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        Ok(self.bucket_dir(bucket)?.is_dir())
    }

    fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let dir = self.bucket_dir(bucket)?;
        fs::create_dir_all(&dir)?;
        Ok(())
    }

    fn set_public_read_policy(&self, bucket: &str) -> Result<(), StoreError> {
        let dir = self.existing_bucket_dir(bucket)?;
        let policy = serde_json::to_vec_pretty(&public_read_policy(bucket))
            .map_err(|e| StoreError::Io(io::Error::other(e)))?;
        fs::write(dir.join(POLICY_FILE), policy)?;
        Ok(())
    }

    fn get_object(&self, bucket: &str, name: &str) -> Result<StoredObject, StoreError> {
        validate_name(name)?;
        let dir = self.existing_bucket_dir(bucket)?;
        match fs::read(dir.join(name)) {
            Ok(data) => Ok(StoredObject::new(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                name: Some(name.to_string()),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn put_object(&self, bucket: &str, name: &str, data: &[u8]) -> Result<Version, StoreError> {
        validate_name(name)?;
        let dir = self.existing_bucket_dir(bucket)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        Self::write_atomic(&dir, name, data)
    }

    fn put_object_if(
        &self,
        bucket: &str,
        name: &str,
        data: &[u8],
        expected: Option<&Version>,
    ) -> Result<Version, StoreError> {
        validate_name(name)?;
        let dir = self.existing_bucket_dir(bucket)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let found = Self::current_version(&dir.join(name))?;
        if found.as_ref() != expected {
            return Err(StoreError::Precondition {
                bucket: bucket.to_string(),
                name: name.to_string(),
                expected: expected.copied(),
                found,
            });
        }
        Self::write_atomic(&dir, name, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, LocalStore) {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn create_bucket_makes_dir() {
        let (dir, store) = store();
        assert!(!store.bucket_exists("b").unwrap());
        store.create_bucket("b").unwrap();
        assert!(store.bucket_exists("b").unwrap());
        assert!(dir.path().join("b").is_dir());
    }

    #[test]
    fn get_missing_object_is_not_found() {
        let (_dir, store) = store();
        store.create_bucket("b").unwrap();
        let err = store.get_object("b", "nope.csv").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn get_from_missing_bucket_is_not_found() {
        let (_dir, store) = store();
        let err = store.get_object("nobucket", "x.json").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { name: None, .. }));
    }

    #[test]
    fn put_then_get_roundtrip() {
        let (_dir, store) = store();
        store.create_bucket("b").unwrap();
        let v = store.put_object("b", "o.json", b"[1,2]").unwrap();
        let obj = store.get_object("b", "o.json").unwrap();
        assert_eq!(obj.data, b"[1,2]");
        assert_eq!(obj.version, v);
    }

    #[test]
    fn put_leaves_no_tmp_file() {
        let (dir, store) = store();
        store.create_bucket("b").unwrap();
        store.put_object("b", "o.csv", b"a\n1\n").unwrap();
        assert!(!dir.path().join("b").join("o.csv.tmp").exists());
    }

    #[test]
    fn put_if_absent_rejects_existing() {
        let (_dir, store) = store();
        store.create_bucket("b").unwrap();
        store.put_object_if("b", "o", b"first", None).unwrap();
        let err = store.put_object_if("b", "o", b"second", None).unwrap_err();
        assert!(err.is_precondition());
        assert_eq!(store.get_object("b", "o").unwrap().data, b"first");
    }

    #[test]
    fn put_if_matching_version_succeeds() {
        let (_dir, store) = store();
        store.create_bucket("b").unwrap();
        let v1 = store.put_object("b", "o", b"one").unwrap();
        let v2 = store.put_object_if("b", "o", b"two", Some(&v1)).unwrap();
        assert_ne!(v1, v2);
        // stale version now loses
        let err = store.put_object_if("b", "o", b"three", Some(&v1)).unwrap_err();
        assert!(err.is_precondition());
        assert_eq!(store.get_object("b", "o").unwrap().data, b"two");
    }

    #[test]
    fn put_into_missing_bucket_fails() {
        let (_dir, store) = store();
        let err = store.put_object("missing", "o", b"x").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn policy_file_written() {
        let (dir, store) = store();
        store.create_bucket("b").unwrap();
        store.set_public_read_policy("b").unwrap();
        let raw = fs::read_to_string(dir.path().join("b").join(POLICY_FILE)).unwrap();
        let policy: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(policy["Statement"][0]["Principal"], "*");
    }

    #[test]
    fn object_names_are_validated() {
        let (_dir, store) = store();
        store.create_bucket("b").unwrap();
        let err = store.put_object("b", "../escape", b"x").unwrap_err();
        assert!(matches!(err, StoreError::InvalidName(_)));
    }
}
