//! Node payloads stored in the [`Tree`](crate::Tree) arena.

use std::ffi::{OsStr, OsString};
use std::fmt;

use checksums::{BLOCK_SIZE, Strong};

/// Index of a node inside its [`Tree`](crate::Tree).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Node variant, used for lookups and error messages.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Kind {
    /// A fixed-size chunk of a file.
    Block,
    /// A regular file.
    File,
    /// A directory.
    Dir,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Block => "block",
            Self::File => "file",
            Self::Dir => "dir",
        })
    }
}

/// Identity of one block of a file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockInfo {
    /// Ordinal of the block within its file.
    pub position: u32,
    /// Weak rolling checksum of the block bytes.
    pub weak: u32,
    /// SHA-1 of the block bytes.
    pub strong: Strong,
}

impl BlockInfo {
    /// Byte offset of the block within its file.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.position as u64 * BLOCK_SIZE as u64
    }
}

/// Identity and metadata of a regular file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileInfo {
    /// Entry name within the parent directory.
    pub name: OsString,
    /// Permission bits.
    pub mode: u32,
    /// Content length in bytes.
    pub size: u64,
    /// SHA-1 of the whole content.
    pub strong: Strong,
}

/// Metadata of a directory. Its digest is derived from its children.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DirInfo {
    /// Entry name within the parent directory.
    pub name: OsString,
    /// Permission bits.
    pub mode: u32,
}

/// A file node and its ordered blocks.
#[derive(Clone, Debug)]
pub struct FileNode {
    /// File identity.
    pub info: FileInfo,
    pub(crate) blocks: Vec<NodeId>,
}

impl FileNode {
    /// Blocks in position order.
    #[must_use]
    pub fn blocks(&self) -> &[NodeId] {
        &self.blocks
    }
}

/// A directory node, its children and its cached digest.
#[derive(Clone, Debug)]
pub struct DirNode {
    /// Directory metadata.
    pub info: DirInfo,
    pub(crate) strong: Strong,
    pub(crate) stale: bool,
    pub(crate) subdirs: Vec<NodeId>,
    pub(crate) files: Vec<NodeId>,
}

impl DirNode {
    /// Subdirectories sorted by name.
    #[must_use]
    pub fn subdirs(&self) -> &[NodeId] {
        &self.subdirs
    }

    /// Files sorted by name.
    #[must_use]
    pub fn files(&self) -> &[NodeId] {
        &self.files
    }

    /// Cached digest. Only meaningful while [`Self::is_stale`] is `false`.
    #[must_use]
    pub const fn cached_strong(&self) -> Strong {
        self.strong
    }

    /// `true` when a descendant changed since the digest was last computed.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.stale
    }
}

/// Payload of a tree node.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// A block of its parent file.
    Block(BlockInfo),
    /// A regular file.
    File(FileNode),
    /// A directory.
    Dir(DirNode),
}

impl NodeKind {
    /// Variant of this payload.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::Block(_) => Kind::Block,
            Self::File(_) => Kind::File,
            Self::Dir(_) => Kind::Dir,
        }
    }

    /// Entry name for files and directories.
    #[must_use]
    pub fn name(&self) -> Option<&OsStr> {
        match self {
            Self::Block(_) => None,
            Self::File(file) => Some(&file.info.name),
            Self::Dir(dir) => Some(&dir.info.name),
        }
    }

    /// Permission bits for files and directories.
    #[must_use]
    pub const fn mode(&self) -> Option<u32> {
        match self {
            Self::Block(_) => None,
            Self::File(file) => Some(file.info.mode),
            Self::Dir(dir) => Some(dir.info.mode),
        }
    }

    /// The block payload, if this is a block.
    #[must_use]
    pub const fn as_block(&self) -> Option<&BlockInfo> {
        match self {
            Self::Block(block) => Some(block),
            _ => None,
        }
    }

    /// The file payload, if this is a file.
    #[must_use]
    pub const fn as_file(&self) -> Option<&FileNode> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }

    /// The directory payload, if this is a directory.
    #[must_use]
    pub const fn as_dir(&self) -> Option<&DirNode> {
        match self {
            Self::Dir(dir) => Some(dir),
            _ => None,
        }
    }
}
