//! Flat, fixed-size record encoding of an indexed tree.
//!
//! Each record is [`RECORD_SIZE`] bytes: a one-byte tag followed by a 20-byte
//! SHA-1 digest and two little-endian `i32` fields. Blocks carry their weak
//! checksum and position. Files and directories carry a `sibling` link and
//! their depth below the root.
//!
//! Records are emitted in post-order. For each directory the stream holds its
//! subdirectories, then its files (each preceded by its blocks), then the
//! directory itself. The `sibling` field of a file or directory record is the
//! sequence number of the previous file or directory record with the same
//! parent, or `-1` for the first child, which lets a reader skip across a
//! level without decoding the whole stream.
//!
//! ```
//! use tree::records::{Record, RecordReader, RecordWriter};
//! use checksums::Strong;
//!
//! let mut writer = RecordWriter::new(Vec::new());
//! writer.write_record(&Record::Dir { strong: Strong::default(), sibling: -1, depth: 0 })?;
//! let bytes = writer.into_inner()?;
//! assert_eq!(bytes.len(), tree::records::RECORD_SIZE);
//!
//! let decoded: Vec<_> = RecordReader::new(bytes.as_slice()).collect::<Result<_, _>>()?;
//! assert!(matches!(decoded[0], Record::Dir { depth: 0, sibling: -1, .. }));
//! # Ok::<(), tree::RecordError>(())
//! ```

mod codec;
mod reader;
mod writer;

pub use codec::{RECORD_SIZE, Record, RecordType};
pub use reader::RecordReader;
pub use writer::{RecordSink, RecordWriter, spawn_writer, tree_records};
