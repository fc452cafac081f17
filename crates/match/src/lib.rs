#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Block matching of a destination file against an indexed source file.
//!
//! This crate implements the rolling-checksum scan:
//! - [`Matcher`] walks a destination byte stream with a [`BLOCK_SIZE`] window,
//!   using the weak checksum as a pre-filter and the SHA-1 digest to confirm
//!   every candidate, so weak collisions never yield a match;
//! - [`FileMatch`] collects the verified [`BlockMatch`]es and derives the
//!   source ranges still missing with [`FileMatch::not_matched`].
//!
//! # Design
//!
//! After a verified match the scan resumes with a fresh chunk immediately
//! after the window, so matches in unchanged regions stay aligned. Between
//! matches the window advances one byte at a time, which finds content that
//! was shifted within the file.
//!
//! [`BLOCK_SIZE`]: checksums::BLOCK_SIZE

mod error;
mod file_match;
mod matcher;
mod window;

pub use error::MatchError;
pub use file_match::{BlockMatch, FileMatch, RangePair};
pub use matcher::{Matcher, match_file};
