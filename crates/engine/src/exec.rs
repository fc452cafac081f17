//! Applying a [`PatchPlan`] to a destination store.

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};

use logging::trace_exec;
use rustc_hash::FxHashSet;
use tree::Repository;

use crate::command::{
    Command, Conflict, LocalTemp, LocalTempCopy, ReplaceWithTemp, Shown, SrcFileDownload,
    SrcTempCopy, TempId, Transfer,
};
use crate::error::{EngineError, EngineResult};
use crate::fsutil::{TempFile, copy_recursive, create_parent_dirs, move_path, remove_all};
use crate::plan::{PatchPlan, RefCounts};
use crate::store::{BlockStore, LocalStore};

/// Counters collected while executing a plan.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ExecStats {
    /// Commands executed.
    pub commands: usize,
    /// Bytes read from the source store.
    pub source_bytes: u64,
    /// Bytes reused from destination files.
    pub local_bytes: u64,
    /// Transfers that renamed an entry.
    pub moved: usize,
    /// Transfers that copied an entry.
    pub copied: usize,
    /// Entries relocated by conflicts and removed after success.
    pub relocated: usize,
}

struct OpenTemp {
    local: File,
    temp: TempFile,
}

struct Executor<'a, S: ?Sized, R: Repository> {
    src: &'a S,
    dst: &'a mut LocalStore<R>,
    refs: RefCounts,
    held: &'a FxHashSet<TempId>,
    temps: Vec<Option<OpenTemp>>,
    stats: ExecStats,
}

impl PatchPlan {
    /// Runs every command in order against `dst`, reading new content from `src`.
    ///
    /// The first failing command stops execution and is reported as
    /// [`EngineError::ExecFailure`]. Nothing is rolled back: entries moved
    /// aside by conflicts stay at their relocated paths. Once every command
    /// has succeeded the relocated entries are deleted.
    pub fn exec<S, R>(&self, src: &S, dst: &mut LocalStore<R>) -> EngineResult<ExecStats>
    where
        S: BlockStore + ?Sized,
        R: Repository,
    {
        let mut executor = Executor {
            src,
            dst,
            refs: self.refs.clone(),
            held: &self.held,
            temps: (0..self.temps).map(|_| None).collect(),
            stats: ExecStats::default(),
        };

        for (index, command) in self.commands.iter().enumerate() {
            trace_exec!(index, command = %command, "executing");
            executor
                .run(command)
                .map_err(|source| EngineError::ExecFailure {
                    index,
                    command: Box::new(command.clone()),
                    source: Box::new(source),
                })?;
            executor.stats.commands += 1;
        }

        for relocated in executor.dst.clear_relocations() {
            trace_exec!(path = %relocated.display(), "removing relocated original");
            remove_all(&relocated)?;
            executor.stats.relocated += 1;
        }
        Ok(executor.stats)
    }
}

impl<S, R> Executor<'_, S, R>
where
    S: BlockStore + ?Sized,
    R: Repository,
{
    fn run(&mut self, command: &Command) -> EngineResult<()> {
        match command {
            Command::Keep(_) => Ok(()),
            Command::Transfer(transfer) => self.transfer(transfer),
            Command::Conflict(conflict) => self.conflict(conflict),
            Command::SrcFileDownload(download) => self.download(download),
            Command::LocalTemp(temp) => self.local_temp(temp),
            Command::LocalTempCopy(copy) => self.local_temp_copy(copy),
            Command::SrcTempCopy(copy) => self.src_temp_copy(copy),
            Command::ReplaceWithTemp(replace) => self.replace(replace),
        }
    }

    /// Moves when this is the last use of the source path and nothing above
    /// or below it is still needed; copies otherwise.
    fn transfer(&mut self, transfer: &Transfer) -> EngineResult<()> {
        let remaining = self.refs.release(&transfer.from)?;
        let source = self.dst.resolve(&transfer.from);
        let target = self.dst.local_path(&transfer.to);
        create_parent_dirs(&target)?;
        if remaining == 0 && !self.refs.held_nearby(&transfer.from) {
            move_path(&source, &target)?;
            self.stats.moved += 1;
        } else {
            copy_recursive(&source, &target)?;
            self.stats.copied += 1;
        }
        Ok(())
    }

    fn conflict(&mut self, conflict: &Conflict) -> EngineResult<()> {
        self.dst.relocate(&conflict.path)?;
        Ok(())
    }

    fn download(&mut self, download: &SrcFileDownload) -> EngineResult<()> {
        let target = self.dst.local_path(&download.path);
        create_parent_dirs(&target)?;
        let mut temp = TempFile::beside(&target)?;
        let staged = temp.path().to_path_buf();
        let mut writer = BufWriter::new(temp.file_mut()?);
        let copied = self
            .src
            .read_into(&download.strong, 0, download.size, &mut writer)?;
        writer
            .flush()
            .map_err(|error| EngineError::io("write", &staged, error))?;
        drop(writer);
        temp.commit(&target)?;
        self.stats.source_bytes += copied;
        Ok(())
    }

    fn local_temp(&mut self, command: &LocalTemp) -> EngineResult<()> {
        let original = self.dst.resolve(&command.path);
        let target = self.dst.local_path(&command.path);
        let local = File::open(&original).map_err(|error| EngineError::io("open", &original, error))?;
        create_parent_dirs(&target)?;
        let mut temp = TempFile::beside(&target)?;
        let staged = temp.path().to_path_buf();
        let file = temp.file_mut()?;
        file.set_len(command.size)
            .map_err(|error| EngineError::io("resize", &staged, error))?;
        if let Ok(metadata) = local.metadata() {
            file.set_permissions(metadata.permissions())
                .map_err(|error| EngineError::io("set permissions", &staged, error))?;
        }
        let slot = self
            .temps
            .get_mut(command.temp.index())
            .ok_or(EngineError::TempNotOpen(command.temp.index()))?;
        *slot = Some(OpenTemp { local, temp });
        Ok(())
    }

    fn open_temp(&mut self, temp: TempId) -> EngineResult<&mut OpenTemp> {
        self.temps
            .get_mut(temp.index())
            .and_then(Option::as_mut)
            .ok_or(EngineError::TempNotOpen(temp.index()))
    }

    fn local_temp_copy(&mut self, copy: &LocalTempCopy) -> EngineResult<()> {
        let local_path = self.dst.resolve(&copy.path);
        let open = self.open_temp(copy.temp)?;
        let staged = open.temp.path().to_path_buf();
        open.local
            .seek(SeekFrom::Start(copy.local_offset))
            .map_err(|error| EngineError::io("seek", &local_path, error))?;
        let file = open.temp.file_mut()?;
        file.seek(SeekFrom::Start(copy.temp_offset))
            .map_err(|error| EngineError::io("seek", &staged, error))?;
        let copied = io::copy(&mut Read::by_ref(&mut open.local).take(copy.len), file)
            .map_err(|error| EngineError::io("copy into", &staged, error))?;
        if copied < copy.len {
            return Err(EngineError::ShortRead {
                path: local_path,
                expected: copy.len,
                copied,
            });
        }
        self.stats.local_bytes += copied;
        Ok(())
    }

    fn src_temp_copy(&mut self, copy: &SrcTempCopy) -> EngineResult<()> {
        let src = self.src;
        let open = self.open_temp(copy.temp)?;
        let staged = open.temp.path().to_path_buf();
        let file = open.temp.file_mut()?;
        file.seek(SeekFrom::Start(copy.temp_offset))
            .map_err(|error| EngineError::io("seek", &staged, error))?;
        let copied = src.read_into(&copy.strong, copy.src_offset, copy.len, file)?;
        self.stats.source_bytes += copied;
        Ok(())
    }

    fn replace(&mut self, replace: &ReplaceWithTemp) -> EngineResult<()> {
        let index = replace.temp.index();
        let OpenTemp { local, temp } = self
            .temps
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(EngineError::TempNotOpen(index))?;
        drop(local);
        let target = self.dst.local_path(&replace.path);
        temp.commit(&target)?;
        if self.held.contains(&replace.temp) {
            self.refs.release(&replace.path)?;
        }
        trace_exec!(path = %Shown(&replace.path), "replaced with temporary file");
        Ok(())
    }
}
