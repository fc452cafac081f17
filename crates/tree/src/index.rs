use checksums::Strong;
use rustc_hash::FxHashMap;

use crate::arena::Tree;
use crate::node::{Kind, NodeId, NodeKind};

/// Flat lookup tables over a tree, keyed by weak and strong identity.
///
/// Built by a breadth-first walk from a starting node, so candidates for the
/// same identity are ordered shallowest first.
#[derive(Clone, Debug, Default)]
pub struct BlockIndex {
    weak: FxHashMap<u32, Vec<NodeId>>,
    blocks: FxHashMap<Strong, NodeId>,
    files: FxHashMap<Strong, Vec<NodeId>>,
    dirs: FxHashMap<Strong, Vec<NodeId>>,
}

impl BlockIndex {
    /// Indexes the whole tree.
    #[must_use]
    pub fn new(tree: &Tree) -> Self {
        Self::of_subtree(tree, tree.root())
    }

    /// Indexes `start` and everything beneath it. Passing a file indexes only
    /// that file's blocks.
    #[must_use]
    pub fn of_subtree(tree: &Tree, start: NodeId) -> Self {
        let mut index = Self::default();
        for id in tree.bfs(start) {
            match tree.node(id) {
                NodeKind::Block(block) => {
                    index.weak.entry(block.weak).or_default().push(id);
                    index.blocks.entry(block.strong).or_insert(id);
                }
                NodeKind::File(file) => {
                    index.files.entry(file.info.strong).or_default().push(id);
                }
                NodeKind::Dir(dir) => {
                    index.dirs.entry(dir.cached_strong()).or_default().push(id);
                }
            }
        }
        index
    }

    /// Blocks whose weak checksum equals `weak`.
    #[must_use]
    pub fn weak_blocks(&self, weak: u32) -> &[NodeId] {
        self.weak.get(&weak).map(Vec::as_slice).unwrap_or_default()
    }

    /// A block with identity `strong`.
    #[must_use]
    pub fn block(&self, strong: &Strong) -> Option<NodeId> {
        self.blocks.get(strong).copied()
    }

    /// Files with identity `strong`.
    #[must_use]
    pub fn files(&self, strong: &Strong) -> &[NodeId] {
        self.files.get(strong).map(Vec::as_slice).unwrap_or_default()
    }

    /// Directories with identity `strong`.
    #[must_use]
    pub fn dirs(&self, strong: &Strong) -> &[NodeId] {
        self.dirs.get(strong).map(Vec::as_slice).unwrap_or_default()
    }

    /// First file with identity `strong`.
    #[must_use]
    pub fn file(&self, strong: &Strong) -> Option<NodeId> {
        self.files(strong).first().copied()
    }

    /// First directory with identity `strong`.
    #[must_use]
    pub fn dir(&self, strong: &Strong) -> Option<NodeId> {
        self.dirs(strong).first().copied()
    }

    /// Files and directories with identity `strong` of the requested kind.
    #[must_use]
    pub fn fs_nodes(&self, strong: &Strong, kind: Kind) -> &[NodeId] {
        match kind {
            Kind::File => self.files(strong),
            Kind::Dir => self.dirs(strong),
            Kind::Block => &[],
        }
    }

    /// A file or directory with identity `strong`, files first.
    #[must_use]
    pub fn strong_fs_node(&self, strong: &Strong) -> Option<NodeId> {
        self.file(strong).or_else(|| self.dir(strong))
    }

    /// Number of distinct weak checksums.
    #[must_use]
    pub fn weak_len(&self) -> usize {
        self.weak.len()
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use checksums::strong_checksum;

    use super::*;
    use crate::node::{BlockInfo, DirInfo, FileInfo};

    #[test]
    fn distinguishes_empty_file_from_empty_dir() {
        let mut tree = Tree::new(DirInfo {
            name: OsString::from("root"),
            mode: 0o755,
        });
        let root = tree.root();
        let dir = tree
            .add_dir(root, DirInfo { name: "d".into(), mode: 0o755 })
            .expect("dir");
        let file = tree
            .add_file(
                root,
                FileInfo {
                    name: "f".into(),
                    mode: 0o644,
                    size: 0,
                    strong: strong_checksum(b""),
                },
                [],
            )
            .expect("file");
        tree.update_strong(root);

        let index = BlockIndex::new(&tree);
        let empty = strong_checksum(b"");
        assert_eq!(index.files(&empty), &[file]);
        assert_eq!(index.dirs(&empty), &[dir]);
        assert_eq!(index.fs_nodes(&empty, Kind::Dir), &[dir]);
        assert_eq!(index.strong_fs_node(&empty), Some(file));
    }

    #[test]
    fn subtree_index_only_sees_one_file() {
        let mut tree = Tree::new(DirInfo {
            name: OsString::from("root"),
            mode: 0o755,
        });
        let root = tree.root();
        let mut ids = Vec::new();
        for (name, weak) in [("a", 1_u32), ("b", 2)] {
            let block = BlockInfo {
                position: 0,
                weak,
                strong: strong_checksum(name.as_bytes()),
            };
            let info = FileInfo {
                name: name.into(),
                mode: 0o644,
                size: 1,
                strong: strong_checksum(name.as_bytes()),
            };
            ids.push(tree.add_file(root, info, [block]).expect("file"));
        }
        let whole = BlockIndex::new(&tree);
        assert_eq!(whole.weak_len(), 2);
        let only_a = BlockIndex::of_subtree(&tree, ids[0]);
        assert_eq!(only_a.weak_blocks(1).len(), 1);
        assert!(only_a.weak_blocks(2).is_empty());
        assert!(only_a.dir(&tree.strong(root)).is_none());
    }
}
