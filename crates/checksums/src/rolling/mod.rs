//! Weak rolling checksum.
//!
//! The checksum keeps two accumulators over a window of bytes `x[0..n]`:
//!
//! - `a = sum(x[i])`
//! - `b = sum((n - i) * x[i])`
//!
//! and packs them as `(b << 16) | a`. Sliding the window by one byte is O(1)
//! via [`RollingChecksum::roll`], which is what makes the byte-at-a-time scan of
//! the matcher affordable.
//!
//! ```rust
//! use checksums::RollingChecksum;
//!
//! let mut rolling = RollingChecksum::new();
//! rolling.update(b"hello");
//!
//! // Slide window: remove 'h', add '!'
//! rolling.roll(b'h', b'!').unwrap();
//!
//! let mut fresh = RollingChecksum::new();
//! fresh.update(b"ello!");
//! assert_eq!(rolling.value(), fresh.value());
//! ```

mod checksum;
mod error;


pub use checksum::{RollingChecksum, weak_checksum};
pub use error::RollingError;
