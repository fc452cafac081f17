//! SHA-1 strong checksum.
//!
//! A single algorithm is used uniformly for block content, whole-file content
//! and directory serialisations. Digests are rendered as 40 lowercase hex
//! characters wherever they are persisted or compared as text.

mod hasher;

pub use hasher::{StrongHasher, strong_checksum};

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Length in bytes of a [`Strong`] digest.
pub const STRONG_LEN: usize = 20;

/// A 160-bit SHA-1 content identity.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Strong([u8; STRONG_LEN]);

impl Strong {
    /// Wraps raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; STRONG_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; STRONG_LEN] {
        &self.0
    }

    /// Renders the digest as 40 lowercase hex characters.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Strong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Strong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Strong({self})")
    }
}

/// Error returned when parsing a [`Strong`] from text fails.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum StrongParseError {
    /// The input was not exactly 40 characters long.
    #[error("strong digest must be {expected} hex characters, found {found}")]
    InvalidLength {
        /// Required number of characters.
        expected: usize,
        /// Number of characters supplied.
        found: usize,
    },
    /// The input contained a character outside `[0-9a-fA-F]`.
    #[error("invalid hex character {0:?} in strong digest")]
    InvalidCharacter(char),
}

impl FromStr for Strong {
    type Err = StrongParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != STRONG_LEN * 2 {
            return Err(StrongParseError::InvalidLength {
                expected: STRONG_LEN * 2,
                found: s.len(),
            });
        }

        let mut bytes = [0u8; STRONG_LEN];
        let mut chars = s.chars();
        for byte in &mut bytes {
            let mut value = 0u8;
            for _ in 0..2 {
                let c = chars.next().unwrap_or_default();
                let nibble = c.to_digit(16).ok_or(StrongParseError::InvalidCharacter(c))?;
                value = (value << 4) | nibble as u8;
            }
            *byte = value;
        }
        Ok(Self(bytes))
    }
}
