#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `tree` models an indexed directory as a content-addressed tree of blocks,
//! files and directories. Every node carries a SHA-1 identity:
//!
//! - a block is identified by the digest of its bytes, plus a weak rolling
//!   checksum used as a cheap pre-filter when matching;
//! - a file is identified by the digest of its whole content;
//! - a directory is identified by the digest of a canonical listing of its
//!   children (`"<strong>\td\t<name>\n"` for each subdirectory, then
//!   `"<strong>\tf\t<name>\n"` for each file, both sorted by name).
//!
//! # Design
//!
//! Nodes live in a [`Tree`] arena and refer to each other by [`NodeId`].
//! Directory digests are cached; mutations mark the parent chain stale and
//! [`Tree::update_strong`] recomputes the stale digests bottom-up.
//!
//! The [`Repository`] trait is the storage contract consumed by planning and
//! execution. [`MemRepo`] implements it with hash maps and keeps every
//! candidate for a weak checksum. [`BlockIndex`] flattens any subtree into
//! read-only lookup tables. [`Indexer`] fills a repository from disk, and the
//! [`records`] module serialises a tree into the flat 29-byte record format.
//!
//! # Examples
//!
//! ```
//! use std::fs;
//! use tree::{BlockIndex, Indexer, Repository};
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let temp = tempfile::tempdir()?;
//! fs::write(temp.path().join("hello.txt"), b"hello")?;
//!
//! let repo = Indexer::new(temp.path()).index()?;
//! let tree = repo.tree();
//! let index = BlockIndex::new(tree);
//! let strong = checksums::strong_checksum(b"hello");
//! let file = index.file(&strong).expect("indexed");
//! assert_eq!(tree.path(file), std::path::Path::new("hello.txt"));
//! # Ok(())
//! # }
//! # demo().unwrap();
//! ```

mod arena;
mod error;
mod index;
mod indexer;
mod node;
pub mod records;
mod repository;

pub use arena::{Bfs, Tree};
pub use error::{IndexError, RecordError, TreeError};
pub use index::BlockIndex;
pub use indexer::{
    IndexStats, Indexer, RELOC_PREFIX, TEMP_PREFIX, index_dir, index_file, is_internal_path,
};
pub use node::{BlockInfo, DirInfo, DirNode, FileInfo, FileNode, Kind, NodeId, NodeKind};
pub use repository::{MemRepo, Repository};
