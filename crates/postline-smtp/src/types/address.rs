//! Envelope address type.

use crate::error::{Error, Result};

/// Address used in the `MAIL FROM` and `RCPT TO` envelope.
///
/// The empty address is the null reverse-path (`MAIL FROM:<>`) and is only
/// obtainable through [`Address::null`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address is empty, lacks a
    /// local or domain part, or contains characters that would break the
    /// command line.
    pub fn new(addr: impl AsRef<str>) -> Result<Self> {
        let addr = addr.as_ref().trim();

        if addr.is_empty() {
            return Err(Error::InvalidAddress("address cannot be empty".into()));
        }
        if addr.chars().any(|c| matches!(c, '\r' | '\n' | '<' | '>')) {
            return Err(Error::InvalidAddress(format!(
                "address contains forbidden characters: {addr:?}"
            )));
        }

        match addr.rsplit_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(Self(addr.to_string()))
            }
            _ => Err(Error::InvalidAddress(format!(
                "address must be local@domain: {addr}"
            ))),
        }
    }

    /// The null reverse-path.
    #[must_use]
    pub const fn null() -> Self {
        Self(String::new())
    }

    /// Returns true for the null reverse-path.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}>", self.0)
    }
}
