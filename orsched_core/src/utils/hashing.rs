//! Utility functions for deriving short, stable labels from hashable values
use std::hash::{DefaultHasher, Hash, Hasher};

pub(crate) fn calculate_hash<T: Hash>(t: &T) -> u64 {
    let mut s = DefaultHasher::new();
    t.hash(&mut s);
    s.finish()
}

/// Hex label for a value, used to name schedule variables in the master problem
///
/// # Note:
/// Labels are only for display and debugging, column identity is always the member set
pub(crate) fn hash_as_hex_string<T: Hash>(t: &T) -> String {
    format!("{:x}", calculate_hash(t))
}
