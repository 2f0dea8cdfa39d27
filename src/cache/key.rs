//! Cache key derivation.
//!
//! A key is the SHA-256 of `prefix_arg1_arg2_...`, where absent arguments are
//! dropped from the sequence rather than rendered. No time or randomness goes
//! into the input, so keys are stable across restarts.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

const DELIMITER: &str = "_";

/// Fixed-length (64 hex chars) cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive a key from a namespace prefix and ordered call arguments.
    pub fn derive(prefix: &str, args: &[&dyn KeyArg]) -> Self {
        let mut parts: Vec<String> = Vec::with_capacity(args.len() + 1);
        parts.push(prefix.to_string());
        parts.extend(args.iter().filter_map(|arg| arg.key_part()));

        let mut hasher = Sha256::new();
        hasher.update(parts.join(DELIMITER).as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value that can take part in a cache key.
///
/// `None` means "absent" and is elided from the key input.
pub trait KeyArg {
    fn key_part(&self) -> Option<String>;
}

impl KeyArg for str {
    fn key_part(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl KeyArg for String {
    fn key_part(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl KeyArg for bool {
    fn key_part(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl KeyArg for u32 {
    fn key_part(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl KeyArg for u64 {
    fn key_part(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl KeyArg for i64 {
    fn key_part(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<T: KeyArg + ?Sized> KeyArg for &T {
    fn key_part(&self) -> Option<String> {
        (**self).key_part()
    }
}

impl<T: KeyArg> KeyArg for Option<T> {
    fn key_part(&self) -> Option<String> {
        self.as_ref().and_then(KeyArg::key_part)
    }
}
