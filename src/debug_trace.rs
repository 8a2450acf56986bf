//! Debug trace types for pipeline runs.
//!
//! A trace records what each pulled chunk turned into, which makes the
//! pull/commit interleaving of a run visible after the fact.

use crate::record::{Chunk, Line, Record};

/// Lines and records derived from one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkTrace {
    /// The chunk as delivered by the source.
    pub chunk: Chunk,
    /// Lines the reassembler completed on this chunk.
    pub lines: Vec<Line>,
    /// Records committed to the sink before the next chunk was pulled.
    pub records: Vec<Record>,
}

/// The trailing line emitted at end of input.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushTrace {
    pub line: Line,
    pub record: Record,
}

/// Complete trace of one run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunTrace {
    /// One entry per chunk pulled, in pull order.
    pub chunk_traces: Vec<ChunkTrace>,
    /// Present when the input did not end with a delimiter.
    pub flush_trace: Option<FlushTrace>,
}

impl RunTrace {
    /// Every committed record, in commit order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.chunk_traces
            .iter()
            .flat_map(|c| c.records.iter())
            .chain(self.flush_trace.iter().map(|f| &f.record))
    }

    /// Every emitted line, in order.
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.chunk_traces
            .iter()
            .flat_map(|c| c.lines.iter())
            .chain(self.flush_trace.iter().map(|f| &f.line))
    }
}

/// Optional trace sink used by the driver.
pub(crate) struct Recorder<'a>(Option<&'a mut RunTrace>);

impl<'a> Recorder<'a> {
    pub(crate) fn new(trace: Option<&'a mut RunTrace>) -> Self {
        Self(trace)
    }

    pub(crate) fn enabled(&self) -> bool {
        self.0.is_some()
    }

    pub(crate) fn chunk(&mut self, chunk: &Chunk) {
        if let Some(trace) = self.0.as_deref_mut() {
            trace.chunk_traces.push(ChunkTrace {
                chunk: chunk.clone(),
                lines: Vec::new(),
                records: Vec::new(),
            });
        }
    }

    /// Attach a line and its record to the most recent chunk.
    pub(crate) fn record(&mut self, line: Line, record: &Record) {
        if let Some(trace) = self.0.as_deref_mut()
            && let Some(last) = trace.chunk_traces.last_mut()
        {
            last.lines.push(line);
            last.records.push(record.clone());
        }
    }

    pub(crate) fn flush(&mut self, line: Line, record: &Record) {
        if let Some(trace) = self.0.as_deref_mut() {
            trace.flush_trace = Some(FlushTrace {
                line,
                record: record.clone(),
            });
        }
    }
}
