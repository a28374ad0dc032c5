use std::{
    fmt,
    fmt::{Debug, Display},
};

use subtle::ConstantTimeEq;

/// A wrapper for sensitive configuration values (signing keys, API keys).
///
/// The wrapped value never shows up in `Debug` or `Display` output, so configuration structs that hold a `Secret` can
/// be logged freely. Use [`Secret::reveal`] at the single point where the raw value is needed.
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl Secret<String> {
    /// True if no secret has been configured. An empty signing key is never a valid configuration.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Constant-time comparison against a candidate value, e.g. an API key supplied in a request header.
    /// Slices of different lengths never match.
    pub fn matches(&self, candidate: &str) -> bool {
        self.value.as_bytes().ct_eq(candidate.as_bytes()).unwrap_u8() == 1
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}
