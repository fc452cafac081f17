#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `walk` provides the deterministic filesystem traversal used when indexing a
//! tree and when pruning a destination. Directory entries are sorted by name
//! before they are yielded, so two walks of byte-identical trees produce the
//! same sequence regardless of the order the operating system lists entries in.
//! Content identities of directories depend on child order, which makes this
//! property load-bearing rather than cosmetic.
//!
//! # Design
//!
//! - [`WalkBuilder`] configures whether the root entry is emitted and which
//!   root-relative paths are excluded (neither yielded nor descended into).
//! - [`Walker`] implements [`Iterator`] and yields [`WalkEntry`] values in
//!   depth-first pre-order: a directory is yielded before its contents.
//! - [`WalkError`] captures the path that failed alongside the I/O error.
//!
//! Symbolic links are reported as entries but never followed.
//!
//! # Examples
//!
//! ```
//! use walk::WalkBuilder;
//! use std::fs;
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let temp = tempfile::tempdir()?;
//! let root = temp.path();
//! fs::create_dir_all(root.join("nested"))?;
//! fs::write(root.join("b.txt"), b"data")?;
//! fs::write(root.join("nested/a.txt"), b"data")?;
//!
//! let names: Vec<_> = WalkBuilder::new(root)
//!     .include_root(false)
//!     .build()?
//!     .map(|entry| entry.map(|e| e.relative_path().to_path_buf()))
//!     .collect::<Result<_, _>>()?;
//!
//! assert_eq!(
//!     names,
//!     ["b.txt", "nested", "nested/a.txt"].map(std::path::PathBuf::from)
//! );
//! # Ok(())
//! # }
//! # demo().unwrap();
//! ```

mod builder;
mod entry;
mod error;
mod walker;


pub use builder::WalkBuilder;
pub use entry::WalkEntry;
pub use error::WalkError;
pub use walker::Walker;
