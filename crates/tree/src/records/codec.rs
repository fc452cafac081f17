use std::fmt;

use checksums::{STRONG_LEN, Strong};

use crate::error::RecordError;

/// Encoded size of every record.
pub const RECORD_SIZE: usize = 1 + STRONG_LEN + 4 + 4;

/// Leading tag byte of a record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum RecordType {
    /// A block of a file.
    Block = 1,
    /// A regular file.
    File = 2,
    /// A directory.
    Dir = 3,
}

impl RecordType {
    /// Decodes a tag byte.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Block),
            2 => Some(Self::File),
            3 => Some(Self::Dir),
            _ => None,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Block => "BLOCK",
            Self::File => "FILE",
            Self::Dir => "DIR",
        })
    }
}

/// One decoded record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Record {
    /// Block identity.
    Block {
        /// Block digest.
        strong: Strong,
        /// Weak checksum, bit-cast to `i32`.
        weak: i32,
        /// Block ordinal within its file.
        position: i32,
    },
    /// File identity.
    File {
        /// File digest.
        strong: Strong,
        /// Sequence number of the previous sibling record, or `-1`.
        sibling: i32,
        /// Depth below the root.
        depth: i32,
    },
    /// Directory identity.
    Dir {
        /// Directory digest.
        strong: Strong,
        /// Sequence number of the previous sibling record, or `-1`.
        sibling: i32,
        /// Depth below the root.
        depth: i32,
    },
}

impl Record {
    /// Tag of this record.
    #[must_use]
    pub const fn record_type(&self) -> RecordType {
        match self {
            Self::Block { .. } => RecordType::Block,
            Self::File { .. } => RecordType::File,
            Self::Dir { .. } => RecordType::Dir,
        }
    }

    /// Digest carried by the record.
    #[must_use]
    pub const fn strong(&self) -> &Strong {
        match self {
            Self::Block { strong, .. } | Self::File { strong, .. } | Self::Dir { strong, .. } => {
                strong
            }
        }
    }

    /// Encodes the record into its fixed-size wire form.
    #[must_use]
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let (first, second) = match *self {
            Self::Block { weak, position, .. } => (weak, position),
            Self::File { sibling, depth, .. } | Self::Dir { sibling, depth, .. } => {
                (sibling, depth)
            }
        };
        let mut out = [0_u8; RECORD_SIZE];
        out[0] = self.record_type() as u8;
        out[1..=STRONG_LEN].copy_from_slice(self.strong().as_bytes());
        out[STRONG_LEN + 1..STRONG_LEN + 5].copy_from_slice(&first.to_le_bytes());
        out[STRONG_LEN + 5..].copy_from_slice(&second.to_le_bytes());
        out
    }

    /// Decodes a record; `index` is used in error reports only.
    pub fn decode(bytes: &[u8; RECORD_SIZE], index: u64) -> Result<Self, RecordError> {
        let tag = bytes[0];
        let record_type =
            RecordType::from_tag(tag).ok_or(RecordError::UnknownTag { tag, index })?;
        let mut digest = [0_u8; STRONG_LEN];
        digest.copy_from_slice(&bytes[1..=STRONG_LEN]);
        let strong = Strong::from_bytes(digest);
        let field = |at: usize| {
            let mut raw = [0_u8; 4];
            raw.copy_from_slice(&bytes[at..at + 4]);
            i32::from_le_bytes(raw)
        };
        let (first, second) = (field(STRONG_LEN + 1), field(STRONG_LEN + 5));
        Ok(match record_type {
            RecordType::Block => Self::Block {
                strong,
                weak: first,
                position: second,
            },
            RecordType::File => Self::File {
                strong,
                sibling: first,
                depth: second,
            },
            RecordType::Dir => Self::Dir {
                strong,
                sibling: first,
                depth: second,
            },
        })
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block {
                strong,
                weak,
                position,
            } => write!(f, "BLOCK {strong} weak={weak:#010x} position={position}"),
            Self::File {
                strong,
                sibling,
                depth,
            }
            | Self::Dir {
                strong,
                sibling,
                depth,
            } => write!(
                f,
                "{} {strong} sibling={sibling} depth={depth}",
                self.record_type()
            ),
        }
    }
}
