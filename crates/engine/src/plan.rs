//! Diffing a source tree against a destination store.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use checksums::Strong;
use logging::trace_plan;
use matching::match_file;
use rustc_hash::{FxHashMap, FxHashSet};
use tree::{BlockIndex, Kind, NodeId, Repository, Tree};

use crate::command::{
    Command, Conflict, Keep, LocalTemp, LocalTempCopy, Occupant, ReplaceWithTemp, Shown,
    SrcFileDownload, SrcTempCopy, TempId, Transfer,
};
use crate::error::{EngineError, EngineResult};
use crate::store::{BlockStore, LocalStore};

/// Outstanding uses of destination paths by `Keep` and `Transfer` commands
/// and by patches reading from a relocated original.
#[derive(Clone, Debug, Default)]
pub(crate) struct RefCounts(FxHashMap<PathBuf, i64>);

impl RefCounts {
    fn add(&mut self, path: &Path) {
        *self.0.entry(path.to_path_buf()).or_default() += 1;
    }

    /// Drops one use of `path` and returns the uses left.
    pub(crate) fn release(&mut self, path: &Path) -> EngineResult<i64> {
        let count = self.0.entry(path.to_path_buf()).or_default();
        *count -= 1;
        if *count < 0 {
            return Err(EngineError::RefCountUnderflow(path.to_path_buf()));
        }
        Ok(*count)
    }

    /// `true` if a path above or below `path` is still in use.
    pub(crate) fn held_nearby(&self, path: &Path) -> bool {
        self.0.iter().any(|(other, &count)| {
            count > 0 && other != path && (other.starts_with(path) || path.starts_with(other))
        })
    }

    pub(crate) fn get(&self, path: &Path) -> i64 {
        self.0.get(path).copied().unwrap_or_default()
    }
}

/// An ordered list of commands turning a destination into a copy of a source.
///
/// Planning only inspects the filesystem; [`PatchPlan::exec`] applies it.
#[derive(Clone, Debug, Default)]
pub struct PatchPlan {
    pub(crate) commands: Vec<Command>,
    pub(crate) refs: RefCounts,
    pub(crate) temps: usize,
    /// Temp files whose original is read from a relocation; each holds a
    /// reference on its path until replaced.
    pub(crate) held: FxHashSet<TempId>,
}

impl PatchPlan {
    /// Plans the commands that make `dst` match `src`.
    ///
    /// The source tree is walked breadth first. A node whose identity exists
    /// in the destination with the same kind becomes a `Keep` or `Transfer`
    /// and is not descended into. Other files are downloaded whole or, when
    /// the destination already has a regular file at the path, patched block
    /// by block through a temp file. A path occupied by the wrong kind of
    /// entry is freed with a `Conflict` first.
    pub fn new<S, R>(src: &S, dst: &LocalStore<R>) -> EngineResult<Self>
    where
        S: BlockStore + ?Sized,
        R: Repository,
    {
        let planner = Planner {
            src: src.tree(),
            dst,
            dst_tree: dst.tree(),
            dst_index: dst.index(),
            relocated: Vec::new(),
            plan: Self::default(),
        };
        planner.run()
    }

    /// The planned commands, in execution order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Consumes the plan, returning its commands.
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// `true` when there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// `true` when every command is a `Keep`.
    pub fn is_noop(&self) -> bool {
        self.commands
            .iter()
            .all(|command| matches!(command, Command::Keep(_)))
    }

    /// Number of references to `path` held by `Keep` and `Transfer` commands
    /// and by patches of relocated files.
    pub fn references(&self, path: &Path) -> i64 {
        self.refs.get(path)
    }

    /// Number of temp files the plan creates.
    pub const fn temp_files(&self) -> usize {
        self.temps
    }
}

impl fmt::Display for PatchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for command in &self.commands {
            writeln!(f, "{command}")?;
        }
        Ok(())
    }
}

struct Visit {
    id: NodeId,
    path: PathBuf,
    kind: Kind,
    matched: Option<PathBuf>,
}

struct Planner<'a, R: Repository> {
    src: &'a Tree,
    dst: &'a LocalStore<R>,
    dst_tree: &'a Tree,
    dst_index: &'a BlockIndex,
    relocated: Vec<PathBuf>,
    plan: PatchPlan,
}

impl<R: Repository> Planner<'_, R> {
    fn run(mut self) -> EngineResult<PatchPlan> {
        let visits = self.visits();
        self.relocate_contested(&visits);

        for visit in &visits {
            if visit.path.as_os_str().is_empty() {
                if visit.matched.is_some() {
                    self.keep(&visit.path);
                }
                continue;
            }
            match (&visit.matched, visit.kind) {
                (Some(from), kind) => self.identity(from, &visit.path, kind),
                (None, Kind::File) => self.file(visit)?,
                (None, _) => self.dir(&visit.path),
            }
        }

        trace_plan!(
            commands = self.plan.commands.len(),
            temps = self.plan.temps,
            relocated = self.relocated.len(),
            "plan ready"
        );
        Ok(self.plan)
    }

    fn visits(&self) -> Vec<Visit> {
        let mut visits = Vec::new();
        let mut queue = VecDeque::from([self.src.root()]);
        while let Some(id) = queue.pop_front() {
            let kind = self.src.kind(id);
            let path = self.src.path(id);
            let matched = self.find_identity(id, &path, kind);
            if matched.is_none()
                && let Some(dir) = self.src.dir(id)
            {
                queue.extend(dir.subdirs().iter().copied());
                queue.extend(dir.files().iter().copied());
            }
            visits.push(Visit {
                id,
                path,
                kind,
                matched,
            });
        }
        visits
    }

    /// Destination path of an entry identical to `id`, preferring `path` itself.
    fn find_identity(&self, id: NodeId, path: &Path, kind: Kind) -> Option<PathBuf> {
        let strong = self.src.strong(id);
        let candidates = self.dst_index.fs_nodes(&strong, kind);
        let dst_root = self.dst_tree.root();
        if path.as_os_str().is_empty() {
            return candidates.contains(&dst_root).then(PathBuf::new);
        }
        let mut first = None;
        for &candidate in candidates.iter().filter(|&&c| c != dst_root) {
            let candidate_path = self.dst_tree.path(candidate);
            if candidate_path == path {
                return Some(candidate_path);
            }
            first.get_or_insert(candidate_path);
        }
        first
    }

    /// Relocates transfer sources that the plan also writes at or beneath.
    fn relocate_contested(&mut self, visits: &[Visit]) {
        let writes: Vec<&Path> = visits
            .iter()
            .filter(|visit| !visit.path.as_os_str().is_empty())
            .filter(|visit| visit.matched.as_deref() != Some(visit.path.as_path()))
            .map(|visit| visit.path.as_path())
            .collect();
        let contested: BTreeSet<&Path> = visits
            .iter()
            .filter_map(|visit| {
                visit
                    .matched
                    .as_deref()
                    .filter(|from| *from != visit.path.as_path())
            })
            .filter(|from| writes.iter().any(|write| write.starts_with(from)))
            .collect();

        for path in contested {
            if self.is_relocated(path) {
                continue;
            }
            if let Some(occupant) = self.original_occupant(path) {
                trace_plan!(path = %path.display(), "transfer source is rewritten, relocating first");
                self.conflict(path, occupant);
            }
        }
    }

    fn is_relocated(&self, path: &Path) -> bool {
        self.relocated
            .iter()
            .any(|relocated| path.starts_with(relocated))
    }

    fn original_occupant(&self, path: &Path) -> Option<Occupant> {
        let metadata = fs::symlink_metadata(self.dst.local_path(path)).ok()?;
        let file_type = metadata.file_type();
        Some(if file_type.is_dir() {
            Occupant::Dir
        } else if file_type.is_file() {
            Occupant::File
        } else {
            Occupant::Other
        })
    }

    fn current_occupant(&self, path: &Path) -> Option<Occupant> {
        if self.is_relocated(path) {
            None
        } else {
            self.original_occupant(path)
        }
    }

    fn push(&mut self, command: Command) {
        trace_plan!(command = %command, "planned");
        self.plan.commands.push(command);
    }

    fn keep(&mut self, path: &Path) {
        self.plan.refs.add(path);
        self.push(Command::Keep(Keep {
            path: path.to_path_buf(),
        }));
    }

    fn conflict(&mut self, path: &Path, occupant: Occupant) {
        self.relocated.push(path.to_path_buf());
        self.push(Command::Conflict(Conflict {
            path: path.to_path_buf(),
            occupant,
        }));
    }

    fn identity(&mut self, from: &Path, to: &Path, kind: Kind) {
        if from == to && !self.is_relocated(to) {
            self.keep(to);
            return;
        }
        if let Some(occupant) = self.current_occupant(to)
            && !(occupant == Occupant::File && kind == Kind::File)
        {
            self.conflict(to, occupant);
        }
        self.plan.refs.add(from);
        self.push(Command::Transfer(Transfer {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            kind,
        }));
    }

    fn file(&mut self, visit: &Visit) -> EngineResult<()> {
        let Some(node) = self.src.file(visit.id) else {
            return Err(EngineError::NotRegularFile(visit.path.clone()));
        };
        let (strong, size) = (node.info.strong, node.info.size);
        let original = self.original_occupant(&visit.path);
        match self.current_occupant(&visit.path) {
            Some(Occupant::File) => self.patch(visit, strong, size),
            None if original == Some(Occupant::File) => self.patch(visit, strong, size),
            Some(occupant) => {
                self.conflict(&visit.path, occupant);
                self.download(&visit.path, strong, size);
                Ok(())
            }
            None => {
                self.download(&visit.path, strong, size);
                Ok(())
            }
        }
    }

    fn download(&mut self, path: &Path, strong: Strong, size: u64) {
        self.push(Command::SrcFileDownload(SrcFileDownload {
            strong,
            size,
            path: path.to_path_buf(),
        }));
    }

    /// Rebuilds an existing destination file from its own matching blocks
    /// plus the unmatched ranges of the source.
    fn patch(&mut self, visit: &Visit, strong: Strong, size: u64) -> EngineResult<()> {
        let found = match_file(self.src, visit.id, &self.dst.local_path(&visit.path))?;
        let temp = TempId(self.plan.temps);
        self.plan.temps += 1;
        let path = &visit.path;
        if self.is_relocated(path) {
            // keeps a transfer out of the same relocation from moving it away
            self.plan.refs.add(path);
            self.plan.held.insert(temp);
        }

        self.push(Command::LocalTemp(LocalTemp {
            temp,
            path: path.clone(),
            size,
        }));
        for block in &found.block_matches {
            self.push(Command::LocalTempCopy(LocalTempCopy {
                temp,
                path: path.clone(),
                local_offset: block.dst_offset,
                temp_offset: block.src_offset,
                len: block.len,
            }));
        }
        for range in found.not_matched() {
            self.push(Command::SrcTempCopy(SrcTempCopy {
                temp,
                path: path.clone(),
                strong,
                src_offset: range.from,
                temp_offset: range.from,
                len: range.len(),
            }));
        }
        self.push(Command::ReplaceWithTemp(ReplaceWithTemp {
            temp,
            path: path.clone(),
        }));
        trace_plan!(
            path = %Shown(path),
            matched = found.block_matches.len(),
            "patching in place"
        );
        Ok(())
    }

    fn dir(&mut self, path: &Path) {
        if let Some(occupant) = self.current_occupant(path)
            && occupant != Occupant::Dir
        {
            self.conflict(path, occupant);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_counts_release_and_underflow() {
        let mut refs = RefCounts::default();
        refs.add(Path::new("a"));
        refs.add(Path::new("a"));
        assert_eq!(refs.release(Path::new("a")).expect("one left"), 1);
        assert_eq!(refs.release(Path::new("a")).expect("none left"), 0);
        assert!(matches!(
            refs.release(Path::new("a")),
            Err(EngineError::RefCountUnderflow(_))
        ));
    }

    #[test]
    fn nearby_references_cover_ancestors_and_descendants() {
        let mut refs = RefCounts::default();
        refs.add(Path::new("dir/child"));
        assert!(refs.held_nearby(Path::new("dir")));
        assert!(!refs.held_nearby(Path::new("dir/child")));
        assert!(!refs.held_nearby(Path::new("dirt")));

        let mut refs = RefCounts::default();
        refs.add(Path::new("dir"));
        assert!(refs.held_nearby(Path::new("dir/child")));
        refs.release(Path::new("dir")).expect("release");
        assert!(!refs.held_nearby(Path::new("dir/child")));
    }

    #[test]
    fn empty_plan_renders_nothing() {
        let plan = PatchPlan::default();
        assert!(plan.is_empty());
        assert!(plan.is_noop());
        assert_eq!(plan.to_string(), "");
    }
}
