use std::io::{BufWriter, Write};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, bounded};
use logging::trace_index;

use crate::arena::Tree;
use crate::error::RecordError;
use crate::node::{NodeId, NodeKind};

use super::codec::Record;

/// Flattens `tree` into its post-order record sequence.
#[must_use]
pub fn tree_records(tree: &Tree) -> Vec<Record> {
    let mut out = Vec::new();
    push_dir(tree, tree.root(), 0, -1, &mut out);
    out
}

fn seq(out: &[Record]) -> i32 {
    i32::try_from(out.len()).unwrap_or(i32::MAX)
}

fn push_dir(tree: &Tree, dir: NodeId, depth: i32, sibling: i32, out: &mut Vec<Record>) -> i32 {
    let Some(node) = tree.dir(dir) else {
        return sibling;
    };
    let mut previous = -1;
    for sub in node.subdirs() {
        previous = push_dir(tree, *sub, depth + 1, previous, out);
    }
    for file in node.files() {
        let Some(file_node) = tree.file(*file) else {
            continue;
        };
        for block in file_node.blocks() {
            if let NodeKind::Block(info) = tree.node(*block) {
                out.push(Record::Block {
                    strong: info.strong,
                    weak: info.weak as i32,
                    position: i32::try_from(info.position).unwrap_or(i32::MAX),
                });
            }
        }
        let at = seq(out);
        out.push(Record::File {
            strong: file_node.info.strong,
            sibling: previous,
            depth: depth + 1,
        });
        previous = at;
    }
    let at = seq(out);
    out.push(Record::Dir {
        strong: node.cached_strong(),
        sibling,
        depth,
    });
    at
}

/// Writes records to an underlying byte sink.
#[derive(Debug)]
pub struct RecordWriter<W: Write> {
    inner: BufWriter<W>,
    written: u64,
}

impl<W: Write> RecordWriter<W> {
    /// Wraps `inner` in a buffered record writer.
    pub fn new(inner: W) -> Self {
        Self {
            inner: BufWriter::new(inner),
            written: 0,
        }
    }

    /// Number of records written.
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Appends one record.
    pub fn write_record(&mut self, record: &Record) -> Result<(), RecordError> {
        self.inner.write_all(&record.encode())?;
        self.written += 1;
        Ok(())
    }

    /// Appends the records of a whole tree and returns how many were written.
    pub fn write_tree(&mut self, tree: &Tree) -> Result<u64, RecordError> {
        let records = tree_records(tree);
        for record in &records {
            self.write_record(record)?;
        }
        Ok(records.len() as u64)
    }

    /// Flushes buffered records.
    pub fn flush(&mut self) -> Result<(), RecordError> {
        self.inner.flush()?;
        Ok(())
    }

    /// Flushes and returns the underlying sink.
    pub fn into_inner(self) -> Result<W, RecordError> {
        self.inner
            .into_inner()
            .map_err(|error| RecordError::Io(error.into_error()))
    }
}

/// Producer handle for a writer running on its own thread.
///
/// The channel is bounded, so [`RecordSink::send`] blocks while the writer
/// thread is behind.
#[derive(Debug)]
pub struct RecordSink<W> {
    sender: Sender<Record>,
    handle: JoinHandle<Result<(W, u64), RecordError>>,
}

impl<W> RecordSink<W> {
    /// Queues a record for writing.
    pub fn send(&self, record: Record) -> Result<(), RecordError> {
        self.sender.send(record).map_err(|_| RecordError::WriterGone)
    }

    /// Closes the channel, waits for the writer and returns the sink and the
    /// number of records written.
    pub fn finish(self) -> Result<(W, u64), RecordError> {
        drop(self.sender);
        self.handle.join().map_err(|_| RecordError::WriterGone)?
    }
}

/// Starts a writer thread fed by a channel holding at most `capacity`
/// records.
pub fn spawn_writer<W>(sink: W, capacity: usize) -> RecordSink<W>
where
    W: Write + Send + 'static,
{
    let (sender, receiver) = bounded::<Record>(capacity.max(1));
    let handle = thread::spawn(move || {
        let mut writer = RecordWriter::new(sink);
        for record in receiver {
            writer.write_record(&record)?;
        }
        let written = writer.written();
        trace_index!(records = written, "record stream complete");
        Ok((writer.into_inner()?, written))
    });
    RecordSink { sender, handle }
}
