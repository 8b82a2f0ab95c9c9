//! Blake3 content versions for conditional object writes

use std::fmt;

/// Version tag of a stored object: the blake3 hash of its bytes.
///
/// Two reads that return the same version saw the same content, so a
/// writer can detect that someone else replaced the object in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version(blake3::Hash);

impl Version {
    /// Compute the version of raw object bytes.
    pub fn of(data: &[u8]) -> Self {
        Self(blake3::hash(data))
    }

    /// Full hex representation (64 chars).
    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }

    /// First 8 hex characters, for log lines.
    pub fn short(&self) -> String {
        self.0.to_hex()[..8].to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_deterministic() {
        assert_eq!(Version::of(b"hello"), Version::of(b"hello"));
    }

    #[test]
    fn version_different_input() {
        assert_ne!(Version::of(b"hello"), Version::of(b"world"));
    }

    #[test]
    fn short_is_prefix_of_hex() {
        let v = Version::of(b"test");
        assert_eq!(v.short().len(), 8);
        assert!(v.to_hex().starts_with(&v.short()));
        assert_eq!(v.to_hex().len(), 64);
    }

    #[test]
    fn display_uses_short_form() {
        let v = Version::of(b"abc");
        assert_eq!(format!("{v}"), v.short());
    }
}
