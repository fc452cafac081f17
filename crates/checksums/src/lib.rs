#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `checksums` provides the two content identities every other crate in the
//! workspace is built on:
//!
//! - [`RollingChecksum`], the weak, O(1)-updatable checksum used to find
//!   candidate block matches while sliding a window over a destination file.
//! - [`Strong`] and [`StrongHasher`], the SHA-1 digest used as the identity of
//!   blocks, files and directories.
//!
//! Both operate on blocks of [`BLOCK_SIZE`] bytes. The constant is shared by the
//! indexer, the matcher and the patch planner; changing it invalidates every
//! persisted index.
//!
//! # Examples
//!
//! ```
//! use checksums::{BLOCK_SIZE, RollingChecksum, strong_checksum};
//!
//! let data = vec![7u8; BLOCK_SIZE];
//! let mut rolling = RollingChecksum::new();
//! rolling.update(&data);
//! let weak = rolling.value();
//! let strong = strong_checksum(&data);
//!
//! assert_eq!(strong.to_string().len(), 40);
//! assert_ne!(weak, 0);
//! ```

mod rolling;
mod strong;

pub use rolling::{RollingChecksum, RollingError, weak_checksum};
pub use strong::{STRONG_LEN, Strong, StrongHasher, StrongParseError, strong_checksum};

/// Size in bytes of the blocks produced by the indexer and searched for by the matcher.
///
/// The final block of a file may be shorter.
pub const BLOCK_SIZE: usize = 8192;
