use std::collections::VecDeque;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use checksums::{BLOCK_SIZE, Strong, StrongHasher};

use crate::error::TreeError;
use crate::node::{BlockInfo, DirInfo, DirNode, FileInfo, FileNode, Kind, NodeId, NodeKind};

#[derive(Clone, Debug)]
struct Slot {
    parent: Option<NodeId>,
    node: NodeKind,
    live: bool,
}

/// Arena holding a directory tree of [`NodeKind`] payloads.
///
/// Children are kept sorted by name, which makes directory digests
/// independent of the order entries were discovered in. Parents are stored as
/// indices. Removing a node detaches it and marks its subtree dead; slots are
/// not reused.
#[derive(Clone, Debug)]
pub struct Tree {
    slots: Vec<Slot>,
    root: NodeId,
}

impl Tree {
    /// Creates a tree containing only an empty root directory.
    #[must_use]
    pub fn new(root: DirInfo) -> Self {
        let node = NodeKind::Dir(DirNode {
            info: root,
            strong: StrongHasher::new().finalize(),
            stale: false,
            subdirs: Vec::new(),
            files: Vec::new(),
        });
        Self {
            slots: vec![Slot {
                parent: None,
                node,
                live: true,
            }],
            root: NodeId(0),
        }
    }

    /// Root directory.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Payload of `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was produced by a different tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeKind {
        &self.slots[id.index()].node
    }

    /// Parent of `id`; `None` for the root.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.index()].parent
    }

    /// `false` once `id` or one of its ancestors has been removed.
    #[must_use]
    pub fn is_live(&self, id: NodeId) -> bool {
        self.slots.get(id.index()).is_some_and(|slot| slot.live)
    }

    /// Variant of `id`.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> Kind {
        self.node(id).kind()
    }

    /// Entry name of a file or directory.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&OsStr> {
        self.node(id).name()
    }

    /// Block payload of `id`, if it is a block.
    #[must_use]
    pub fn block(&self, id: NodeId) -> Option<&BlockInfo> {
        self.node(id).as_block()
    }

    /// File payload of `id`, if it is a file.
    #[must_use]
    pub fn file(&self, id: NodeId) -> Option<&FileNode> {
        self.node(id).as_file()
    }

    /// Directory payload of `id`, if it is a directory.
    #[must_use]
    pub fn dir(&self, id: NodeId) -> Option<&DirNode> {
        self.node(id).as_dir()
    }

    /// Content identity of `id`.
    ///
    /// For directories this is the cached digest; call
    /// [`Self::update_strong`] after mutating the tree.
    #[must_use]
    pub fn strong(&self, id: NodeId) -> Strong {
        match self.node(id) {
            NodeKind::Block(block) => block.strong,
            NodeKind::File(file) => file.info.strong,
            NodeKind::Dir(dir) => dir.strong,
        }
    }

    /// Number of bytes covered by the block `id`.
    ///
    /// Every block spans [`BLOCK_SIZE`] bytes except the last block of a
    /// file, which covers the remainder.
    #[must_use]
    pub fn block_len(&self, id: NodeId) -> u64 {
        let Some(block) = self.block(id) else {
            return 0;
        };
        let size = self
            .parent(id)
            .and_then(|file| self.file(file))
            .map_or(0, |file| file.info.size);
        size.saturating_sub(block.offset()).min(BLOCK_SIZE as u64)
    }

    /// File that owns the block `id`.
    #[must_use]
    pub fn block_file(&self, id: NodeId) -> Option<NodeId> {
        self.block(id)?;
        self.parent(id)
    }

    fn expect_kind(&self, id: NodeId, expected: Kind) -> Result<(), TreeError> {
        if !self.is_live(id) {
            return Err(TreeError::Detached);
        }
        let found = self.kind(id);
        if found == expected {
            Ok(())
        } else {
            Err(TreeError::WrongKind { expected, found })
        }
    }

    fn push(&mut self, parent: NodeId, node: NodeKind) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Slot {
            parent: Some(parent),
            node,
            live: true,
        });
        id
    }

    fn dir_mut(&mut self, id: NodeId) -> Option<&mut DirNode> {
        match &mut self.slots[id.index()].node {
            NodeKind::Dir(dir) => Some(dir),
            _ => None,
        }
    }

    /// Returns the child of `dir` named `name`.
    #[must_use]
    pub fn child(&self, dir: NodeId, name: &OsStr) -> Option<NodeId> {
        let node = self.dir(dir)?;
        let find = |list: &[NodeId]| {
            list.binary_search_by(|c| self.name(*c).unwrap_or_default().cmp(name))
                .ok()
                .map(|pos| list[pos])
        };
        find(&node.subdirs).or_else(|| find(&node.files))
    }

    /// Resolves a path relative to the root.
    #[must_use]
    pub fn lookup(&self, rel: &Path) -> Option<NodeId> {
        let mut current = self.root;
        for component in rel.components() {
            match component {
                Component::Normal(name) => current = self.child(current, name)?,
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(current)
    }

    /// Path of `id` relative to the root. Blocks report their file's path.
    #[must_use]
    pub fn path(&self, id: NodeId) -> PathBuf {
        let mut names = Vec::new();
        let mut current = if self.block(id).is_some() {
            self.parent(id)
        } else {
            Some(id)
        };
        while let Some(node) = current {
            let Some(parent) = self.parent(node) else {
                break;
            };
            if let Some(name) = self.name(node) {
                names.push(name);
            }
            current = Some(parent);
        }
        names.iter().rev().collect()
    }

    /// Depth of `id` below the root (root is `0`).
    #[must_use]
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(node) = current {
            depth += 1;
            current = self.parent(node);
        }
        depth
    }

    /// Appends a block to `file`, keeping blocks ordered by position.
    pub fn add_block(&mut self, file: NodeId, info: BlockInfo) -> Result<NodeId, TreeError> {
        self.expect_kind(file, Kind::File)?;
        let id = self.push(file, NodeKind::Block(info));
        let positions: Vec<u32> = self
            .file(file)
            .map(|node| {
                node.blocks
                    .iter()
                    .filter_map(|b| self.block(*b).map(|info| info.position))
                    .collect()
            })
            .unwrap_or_default();
        let at = positions.partition_point(|p| *p <= info.position);
        if let NodeKind::File(node) = &mut self.slots[file.index()].node {
            node.blocks.insert(at, id);
        }
        Ok(id)
    }

    /// Inserts a file and its blocks into `dir`.
    ///
    /// An existing entry with the same name is replaced.
    pub fn add_file(
        &mut self,
        dir: NodeId,
        info: FileInfo,
        blocks: impl IntoIterator<Item = BlockInfo>,
    ) -> Result<NodeId, TreeError> {
        self.expect_kind(dir, Kind::Dir)?;
        if let Some(existing) = self.child(dir, &info.name) {
            self.remove(existing)?;
        }
        let name = info.name.clone();
        let id = self.push(
            dir,
            NodeKind::File(FileNode {
                info,
                blocks: Vec::new(),
            }),
        );
        for block in blocks {
            self.add_block(id, block)?;
        }
        self.insert_sorted(dir, id, &name, Kind::File);
        self.invalidate(dir);
        Ok(id)
    }

    /// Inserts an empty directory into `dir`.
    ///
    /// When a directory of that name already exists its mode is updated and
    /// its id returned; a file of that name is replaced.
    pub fn add_dir(&mut self, dir: NodeId, info: DirInfo) -> Result<NodeId, TreeError> {
        self.expect_kind(dir, Kind::Dir)?;
        if let Some(existing) = self.child(dir, &info.name) {
            if let Some(node) = self.dir_mut(existing) {
                node.info.mode = info.mode;
                return Ok(existing);
            }
            self.remove(existing)?;
        }
        let name = info.name.clone();
        let id = self.push(
            dir,
            NodeKind::Dir(DirNode {
                info,
                strong: StrongHasher::new().finalize(),
                stale: false,
                subdirs: Vec::new(),
                files: Vec::new(),
            }),
        );
        self.insert_sorted(dir, id, &name, Kind::Dir);
        self.invalidate(dir);
        Ok(id)
    }

    fn insert_sorted(&mut self, dir: NodeId, id: NodeId, name: &OsStr, kind: Kind) {
        let Some(node) = self.dir(dir) else {
            return;
        };
        let list = if kind == Kind::Dir {
            &node.subdirs
        } else {
            &node.files
        };
        let at = list.partition_point(|c| self.name(*c).unwrap_or_default() < name);
        if let Some(node) = self.dir_mut(dir) {
            let list = if kind == Kind::Dir {
                &mut node.subdirs
            } else {
                &mut node.files
            };
            list.insert(at, id);
        }
    }

    /// Detaches `id` and its subtree from the tree.
    pub fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        if !self.is_live(id) {
            return Err(TreeError::Detached);
        }
        let Some(parent) = self.parent(id) else {
            return Err(TreeError::RemoveRoot);
        };
        match &mut self.slots[parent.index()].node {
            NodeKind::Dir(dir) => {
                dir.subdirs.retain(|c| *c != id);
                dir.files.retain(|c| *c != id);
            }
            NodeKind::File(file) => file.blocks.retain(|c| *c != id),
            NodeKind::Block(_) => {}
        }
        for node in self.bfs(id).collect::<Vec<_>>() {
            self.slots[node.index()].live = false;
        }
        if self.kind(parent) == Kind::Dir {
            self.invalidate(parent);
        }
        Ok(())
    }

    /// Marks `dir` and all of its ancestors as needing a digest refresh.
    fn invalidate(&mut self, dir: NodeId) {
        let mut current = Some(dir);
        while let Some(id) = current {
            if let Some(node) = self.dir_mut(id) {
                node.stale = true;
            }
            current = self.parent(id);
        }
    }

    /// Directories under (and including) `id` whose digest is stale.
    #[must_use]
    pub fn stale_dirs(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(dir) = self.dir(current) {
                if dir.stale {
                    out.push(current);
                    stack.extend(dir.subdirs.iter().copied());
                }
            }
        }
        out
    }

    /// Recomputes stale directory digests under `id`, children first, and
    /// returns the identity of `id`.
    pub fn update_strong(&mut self, id: NodeId) -> Strong {
        let Some(dir) = self.dir(id) else {
            return self.strong(id);
        };
        if !dir.stale {
            return dir.strong;
        }
        for sub in dir.subdirs.clone() {
            self.update_strong(sub);
        }
        let strong = self.compute_dir_strong(id);
        if let Some(node) = self.dir_mut(id) {
            node.strong = strong;
            node.stale = false;
        }
        strong
    }

    /// Digest of the canonical listing of `dir` from its children's current
    /// identities.
    fn compute_dir_strong(&self, dir: NodeId) -> Strong {
        let mut hasher = StrongHasher::new();
        if let Some(node) = self.dir(dir) {
            for (list, tag) in [(&node.subdirs, b'd'), (&node.files, b'f')] {
                for child in list {
                    let name = self.name(*child).unwrap_or_default();
                    hasher.update(self.strong(*child).to_hex().as_bytes());
                    hasher.update(&[b'\t', tag, b'\t']);
                    hasher.update(name.as_encoded_bytes());
                    hasher.update(b"\n");
                }
            }
        }
        hasher.finalize()
    }

    /// Breadth-first iterator over `start` and every node beneath it.
    #[must_use]
    pub fn bfs(&self, start: NodeId) -> Bfs<'_> {
        Bfs {
            tree: self,
            queue: VecDeque::from([start]),
            blocks: true,
        }
    }

    /// Breadth-first iterator over files and directories only.
    #[must_use]
    pub fn bfs_fs(&self, start: NodeId) -> Bfs<'_> {
        Bfs {
            tree: self,
            queue: VecDeque::from([start]),
            blocks: false,
        }
    }
}

/// Breadth-first traversal returned by [`Tree::bfs`] and [`Tree::bfs_fs`].
#[derive(Debug)]
pub struct Bfs<'a> {
    tree: &'a Tree,
    queue: VecDeque<NodeId>,
    blocks: bool,
}

impl Iterator for Bfs<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.queue.pop_front()?;
        match self.tree.node(id) {
            NodeKind::Block(_) => {}
            NodeKind::File(file) => {
                if self.blocks {
                    self.queue.extend(file.blocks.iter().copied());
                }
            }
            NodeKind::Dir(dir) => {
                self.queue.extend(dir.subdirs.iter().copied());
                self.queue.extend(dir.files.iter().copied());
            }
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use checksums::strong_checksum;

    use super::*;

    fn dir_info(name: &str) -> DirInfo {
        DirInfo {
            name: OsString::from(name),
            mode: 0o755,
        }
    }

    fn file_info(name: &str, content: &[u8]) -> FileInfo {
        FileInfo {
            name: OsString::from(name),
            mode: 0o644,
            size: content.len() as u64,
            strong: strong_checksum(content),
        }
    }

    #[test]
    fn empty_directory_digest_is_sha1_of_nothing() {
        let tree = Tree::new(dir_info("root"));
        assert_eq!(
            tree.strong(tree.root()).to_hex(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[test]
    fn directory_digest_follows_canonical_listing() {
        let mut tree = Tree::new(dir_info("root"));
        let root = tree.root();
        let sub = tree.add_dir(root, dir_info("sub")).expect("dir");
        tree.add_file(root, file_info("b", b"bee"), []).expect("b");
        tree.add_file(root, file_info("a", b"ay"), []).expect("a");
        assert!(tree.dir(root).expect("dir").is_stale());

        let digest = tree.update_strong(root);
        let expected = strong_checksum(
            format!(
                "{}\td\tsub\n{}\tf\ta\n{}\tf\tb\n",
                tree.strong(sub),
                strong_checksum(b"ay"),
                strong_checksum(b"bee"),
            )
            .as_bytes(),
        );
        assert_eq!(digest, expected);
        assert!(!tree.dir(root).expect("dir").is_stale());
    }

    #[test]
    fn insertion_order_does_not_change_digest() {
        let mut first = Tree::new(dir_info("x"));
        let mut second = Tree::new(dir_info("y"));
        for name in ["c", "a", "b"] {
            let root = first.root();
            first.add_file(root, file_info(name, name.as_bytes()), []).expect("add");
        }
        for name in ["b", "c", "a"] {
            let root = second.root();
            second.add_file(root, file_info(name, name.as_bytes()), []).expect("add");
        }
        let (r1, r2) = (first.root(), second.root());
        assert_eq!(first.update_strong(r1), second.update_strong(r2));
    }

    #[test]
    fn nested_change_propagates_to_root() {
        let mut tree = Tree::new(dir_info("root"));
        let root = tree.root();
        let sub = tree.add_dir(root, dir_info("sub")).expect("dir");
        let file = tree.add_file(sub, file_info("f", b"one"), []).expect("file");
        let before = tree.update_strong(root);

        tree.remove(file).expect("remove");
        tree.add_file(sub, file_info("f", b"two"), []).expect("file");
        assert_eq!(tree.stale_dirs(root), vec![root, sub]);
        assert_ne!(tree.update_strong(root), before);
    }

    #[test]
    fn paths_lookup_and_removal() {
        let mut tree = Tree::new(dir_info("root"));
        let root = tree.root();
        let a = tree.add_dir(root, dir_info("a")).expect("a");
        let b = tree.add_dir(a, dir_info("b")).expect("b");
        let f = tree.add_file(b, file_info("f", b"x"), []).expect("f");

        assert_eq!(tree.path(f), PathBuf::from("a/b/f"));
        assert_eq!(tree.path(root), PathBuf::new());
        assert_eq!(tree.lookup(Path::new("a/b/f")), Some(f));
        assert_eq!(tree.depth(f), 3);

        tree.remove(a).expect("remove");
        assert!(!tree.is_live(f));
        assert_eq!(tree.lookup(Path::new("a")), None);
        assert_eq!(tree.remove(a), Err(TreeError::Detached));
        assert_eq!(tree.remove(root), Err(TreeError::RemoveRoot));
    }

    #[test]
    fn block_lengths_and_order() {
        let mut tree = Tree::new(dir_info("root"));
        let root = tree.root();
        let mut info = file_info("f", b"");
        info.size = BLOCK_SIZE as u64 + 5;
        let block = |position| BlockInfo {
            position,
            weak: position,
            strong: Strong::default(),
        };
        let file = tree.add_file(root, info, [block(1), block(0)]).expect("file");
        let blocks = tree.file(file).expect("file").blocks().to_vec();
        assert_eq!(tree.block(blocks[0]).map(|b| b.position), Some(0));
        assert_eq!(tree.block_len(blocks[0]), BLOCK_SIZE as u64);
        assert_eq!(tree.block_len(blocks[1]), 5);
        assert_eq!(tree.block_file(blocks[1]), Some(file));
        assert_eq!(tree.path(blocks[1]), PathBuf::from("f"));
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let mut tree = Tree::new(dir_info("root"));
        let root = tree.root();
        let file = tree.add_file(root, file_info("f", b""), []).expect("file");
        assert_eq!(
            tree.add_dir(file, dir_info("d")),
            Err(TreeError::WrongKind {
                expected: Kind::Dir,
                found: Kind::File
            })
        );
    }

    #[test]
    fn same_name_replaces_previous_entry() {
        let mut tree = Tree::new(dir_info("root"));
        let root = tree.root();
        let old = tree.add_file(root, file_info("x", b"1"), []).expect("file");
        let new = tree.add_dir(root, dir_info("x")).expect("dir");
        assert!(!tree.is_live(old));
        assert_eq!(tree.child(root, OsStr::new("x")), Some(new));
        let again = tree.add_dir(root, DirInfo { name: "x".into(), mode: 0o700 }).expect("dir");
        assert_eq!(again, new);
        assert_eq!(tree.node(new).mode(), Some(0o700));
    }
}
