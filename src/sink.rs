//! Record sinks.
//!
//! The driver hands records to a sink strictly in order and waits for each
//! commit to return before producing the next record.

use std::fs::{self, File};
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;

use tracing::debug;

use crate::error::SinkError;
use crate::record::Record;

/// Terminator appended after each record by [`WriterSink::new`].
pub const DEFAULT_TERMINATOR: &str = "\n";

/// An ordered consumer of records.
pub trait Sink {
    /// Persist one record. Must complete before the next call.
    fn commit(&mut self, record: Record) -> Result<(), SinkError>;

    /// Flush anything buffered. Called once, after the last commit of a
    /// successful run.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn commit(&mut self, record: Record) -> Result<(), SinkError> {
        (**self).commit(record)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn commit(&mut self, record: Record) -> Result<(), SinkError> {
        (**self).commit(record)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

/// Writes each record, followed by a terminator, to a buffered writer.
///
/// `commit` only fills the in-memory buffer (8 KiB); bytes reach `W` when the
/// buffer fills or on [`Sink::finish`]. Errors from the final flush surface in
/// `finish` alone. A sink dropped without `finish`, as on a failed run, still
/// flushes what it holds and ignores any error doing so.
pub struct WriterSink<W: Write> {
    writer: BufWriter<W>,
    terminator: String,
    written: u64,
}

impl WriterSink<File> {
    /// Create (or truncate) `path`, creating parent directories as needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let path = path.as_ref();
        let create_err = |source| SinkError::Create {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(create_err)?;
        }
        let file = File::create(path).map_err(create_err)?;
        debug!(path = %path.display(), "opened sink");
        Ok(Self::new(file))
    }
}

impl WriterSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self::with_terminator(writer, DEFAULT_TERMINATOR)
    }

    /// Write records exactly as formatted, with nothing appended.
    pub fn raw(writer: W) -> Self {
        Self::with_terminator(writer, "")
    }

    pub fn with_terminator(writer: W, terminator: impl Into<String>) -> Self {
        Self {
            writer: BufWriter::new(writer),
            terminator: terminator.into(),
            written: 0,
        }
    }

    /// Replace the terminator written after each record.
    pub fn terminated_by(mut self, terminator: impl Into<String>) -> Self {
        self.terminator = terminator.into();
        self
    }

    /// Records committed so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|e| SinkError::Flush(e.into_error()))
    }
}

impl<W: Write> Sink for WriterSink<W> {
    fn commit(&mut self, record: Record) -> Result<(), SinkError> {
        let number = record.number();
        let write_err = |source| SinkError::Write {
            record: number,
            source,
        };
        self.writer
            .write_all(record.as_str().as_bytes())
            .map_err(write_err)?;
        self.writer
            .write_all(self.terminator.as_bytes())
            .map_err(write_err)?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush().map_err(SinkError::Flush)
    }
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    records: Vec<Record>,
    finished: bool,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// True once `finish` has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Record texts, in commit order.
    pub fn texts(&self) -> Vec<&str> {
        self.records.iter().map(Record::as_str).collect()
    }
}

impl Sink for VecSink {
    fn commit(&mut self, record: Record) -> Result<(), SinkError> {
        self.records.push(record);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.finished = true;
        Ok(())
    }
}
