use std::io::{self, Read};

use crate::error::RecordError;

use super::codec::{RECORD_SIZE, Record};

/// Lazily decodes records from a byte stream.
///
/// Iteration stops after the first error.
#[derive(Debug)]
pub struct RecordReader<R> {
    inner: R,
    index: u64,
    done: bool,
}

impl<R: Read> RecordReader<R> {
    /// Wraps a reader positioned at the start of a record stream.
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            index: 0,
            done: false,
        }
    }

    /// Number of records decoded so far.
    pub const fn position(&self) -> u64 {
        self.index
    }

    fn read_record(&mut self) -> Result<Option<Record>, RecordError> {
        let mut buf = [0_u8; RECORD_SIZE];
        let mut filled = 0;
        while filled < RECORD_SIZE {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(error.into()),
            }
        }
        match filled {
            0 => Ok(None),
            RECORD_SIZE => {
                let record = Record::decode(&buf, self.index)?;
                self.index += 1;
                Ok(Some(record))
            }
            read => Err(RecordError::Truncated {
                index: self.index,
                read,
                expected: RECORD_SIZE,
            }),
        }
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Record, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}
