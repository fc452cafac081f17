//! The node repository contract and its in-memory implementation.

use std::io;

use checksums::Strong;
use rustc_hash::FxHashMap;

use crate::arena::Tree;
use crate::error::TreeError;
use crate::node::{BlockInfo, DirInfo, FileInfo, Kind, NodeId, NodeKind};

/// Storage and identity lookup for an indexed tree.
///
/// Lookups return the first node carrying the requested identity. Weak
/// lookups may return several candidates; callers confirm them with the
/// strong identity. Implementations are not required to be thread-safe.
pub trait Repository {
    /// The tree backing this repository.
    fn tree(&self) -> &Tree;

    /// Root directory node.
    fn root(&self) -> NodeId {
        self.tree().root()
    }

    /// Every block whose weak checksum equals `weak`.
    fn weak_blocks(&self, weak: u32) -> &[NodeId];

    /// First block whose weak checksum equals `weak`.
    fn weak_block(&self, weak: u32) -> Option<NodeId> {
        self.weak_blocks(weak).first().copied()
    }

    /// A block with identity `strong`.
    fn block(&self, strong: &Strong) -> Option<NodeId>;

    /// A file with identity `strong`.
    fn file(&self, strong: &Strong) -> Option<NodeId>;

    /// A directory with identity `strong`.
    fn dir(&self, strong: &Strong) -> Option<NodeId>;

    /// Appends a block to `file`.
    fn add_block(&mut self, file: NodeId, info: BlockInfo) -> Result<NodeId, TreeError>;

    /// Inserts a file and its blocks under `dir`.
    fn add_file(
        &mut self,
        dir: NodeId,
        info: FileInfo,
        blocks: Vec<BlockInfo>,
    ) -> Result<NodeId, TreeError>;

    /// Inserts an empty directory under `dir`.
    fn add_dir(&mut self, dir: NodeId, info: DirInfo) -> Result<NodeId, TreeError>;

    /// Removes `id` and everything beneath it.
    fn remove(&mut self, id: NodeId) -> Result<(), TreeError>;

    /// Refreshes stale directory identities under `id` and returns its
    /// identity.
    fn update_strong(&mut self, id: NodeId) -> Strong;

    /// Releases backend resources.
    fn close(&mut self) -> io::Result<()>;
}

type Multi<K> = FxHashMap<K, Vec<NodeId>>;

fn insert<K: std::hash::Hash + Eq>(map: &mut Multi<K>, key: K, id: NodeId) {
    map.entry(key).or_default().push(id);
}

fn forget<K: std::hash::Hash + Eq>(map: &mut Multi<K>, key: &K, id: NodeId) {
    if let Some(ids) = map.get_mut(key) {
        ids.retain(|existing| *existing != id);
        if ids.is_empty() {
            map.remove(key);
        }
    }
}

fn first<K: std::hash::Hash + Eq>(map: &Multi<K>, key: &K) -> Option<NodeId> {
    map.get(key).and_then(|ids| ids.first().copied())
}

/// [`Repository`] kept entirely in memory.
#[derive(Clone, Debug)]
pub struct MemRepo {
    tree: Tree,
    weak: Multi<u32>,
    blocks: Multi<Strong>,
    files: Multi<Strong>,
    dirs: Multi<Strong>,
}

impl MemRepo {
    /// Creates a repository whose tree holds only the root directory.
    #[must_use]
    pub fn new(root: DirInfo) -> Self {
        let tree = Tree::new(root);
        let mut repo = Self {
            tree,
            weak: Multi::default(),
            blocks: Multi::default(),
            files: Multi::default(),
            dirs: Multi::default(),
        };
        let root = repo.tree.root();
        let strong = repo.tree.strong(root);
        insert(&mut repo.dirs, strong, root);
        repo
    }

    fn register(&mut self, id: NodeId) {
        match self.tree.node(id) {
            NodeKind::Block(block) => {
                let (weak, strong) = (block.weak, block.strong);
                insert(&mut self.weak, weak, id);
                insert(&mut self.blocks, strong, id);
            }
            NodeKind::File(file) => {
                let strong = file.info.strong;
                insert(&mut self.files, strong, id);
            }
            NodeKind::Dir(dir) => {
                let strong = dir.cached_strong();
                insert(&mut self.dirs, strong, id);
            }
        }
    }

    fn unregister(&mut self, id: NodeId) {
        match self.tree.node(id) {
            NodeKind::Block(block) => {
                let (weak, strong) = (block.weak, block.strong);
                forget(&mut self.weak, &weak, id);
                forget(&mut self.blocks, &strong, id);
            }
            NodeKind::File(file) => {
                let strong = file.info.strong;
                forget(&mut self.files, &strong, id);
            }
            NodeKind::Dir(dir) => {
                let strong = dir.cached_strong();
                forget(&mut self.dirs, &strong, id);
            }
        }
    }

    fn unregister_subtree(&mut self, id: NodeId) {
        let ids: Vec<_> = self.tree.bfs(id).collect();
        for node in ids {
            self.unregister(node);
        }
    }
}

impl Repository for MemRepo {
    fn tree(&self) -> &Tree {
        &self.tree
    }

    fn weak_blocks(&self, weak: u32) -> &[NodeId] {
        self.weak.get(&weak).map(Vec::as_slice).unwrap_or_default()
    }

    fn block(&self, strong: &Strong) -> Option<NodeId> {
        first(&self.blocks, strong)
    }

    fn file(&self, strong: &Strong) -> Option<NodeId> {
        first(&self.files, strong)
    }

    fn dir(&self, strong: &Strong) -> Option<NodeId> {
        first(&self.dirs, strong)
    }

    fn add_block(&mut self, file: NodeId, info: BlockInfo) -> Result<NodeId, TreeError> {
        let id = self.tree.add_block(file, info)?;
        self.register(id);
        Ok(id)
    }

    fn add_file(
        &mut self,
        dir: NodeId,
        info: FileInfo,
        blocks: Vec<BlockInfo>,
    ) -> Result<NodeId, TreeError> {
        if let Some(existing) = self.tree.child(dir, &info.name) {
            self.unregister_subtree(existing);
        }
        let id = self.tree.add_file(dir, info, blocks)?;
        let ids: Vec<_> = self.tree.bfs(id).collect();
        for node in ids {
            self.register(node);
        }
        Ok(id)
    }

    fn add_dir(&mut self, dir: NodeId, info: DirInfo) -> Result<NodeId, TreeError> {
        if let Some(existing) = self.tree.child(dir, &info.name) {
            if self.tree.kind(existing) == Kind::Dir {
                return self.tree.add_dir(dir, info);
            }
            self.unregister_subtree(existing);
        }
        let id = self.tree.add_dir(dir, info)?;
        self.register(id);
        Ok(id)
    }

    fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        if !self.tree.is_live(id) {
            return Err(TreeError::Detached);
        }
        if self.tree.parent(id).is_none() {
            return Err(TreeError::RemoveRoot);
        }
        self.unregister_subtree(id);
        self.tree.remove(id)
    }

    fn update_strong(&mut self, id: NodeId) -> Strong {
        let stale = self.tree.stale_dirs(id);
        for dir in &stale {
            self.unregister(*dir);
        }
        let strong = self.tree.update_strong(id);
        for dir in stale {
            self.register(dir);
        }
        strong
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}
