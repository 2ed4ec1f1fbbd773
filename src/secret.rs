//! Redacted string wrapper for passwords and Backblaze keys.
//!
//! A [`Secret`] prints as `********` through both `Debug` and `Display`, so
//! it can sit inside config structs, repository descriptors and error values
//! without ever reaching a log line.  The raw value is only reachable through
//! [`Secret::expose`], which is called when the value is handed to a child
//! process environment.

use std::fmt;

use serde::Deserialize;
use zeroize::Zeroize;

const REDACTED: &str = "********";

/// A string that must never be printed.
///
/// Equality, ordering and hashing compare the underlying value so that
/// descriptors holding secrets can still be compared structurally.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value.  Only for injecting into a child environment.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({REDACTED})")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}
