//! Error types for pipeline runs.
//!
//! Every failure aborts the whole run. The top-level [`PipelineError`] says
//! which stage failed; the wrapped error carries the underlying cause.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The pipeline stage an error originated in.
///
/// Reassembly and numbering are pure in-memory steps and cannot fail, so only
/// the I/O stages appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Source,
    Sink,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Source => "source",
            Stage::Sink => "sink",
        };
        f.write_str(name)
    }
}

/// Terminal failure of a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The chunk source could not be opened or read.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// The sink could not commit or finalize a record.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// The configuration was rejected before the run started.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The caller cancelled the run.
    #[error("pipeline cancelled after {records} records")]
    Cancelled {
        /// Records committed before the run stopped.
        records: u64,
    },

    /// `run` was called on a pipeline that has already run.
    #[error("pipeline already started")]
    AlreadyStarted,
}

impl PipelineError {
    /// The stage that raised this error, if it came from a stage.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Source(_) => Some(Stage::Source),
            PipelineError::Sink(_) => Some(Stage::Sink),
            PipelineError::Config(_)
            | PipelineError::Cancelled { .. }
            | PipelineError::AlreadyStarted => None,
        }
    }
}

/// Failures reading from a chunk source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read failed at byte {offset}: {source}")]
    Read {
        /// Bytes successfully consumed before the failure.
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// Input bytes are not valid in the configured encoding.
    #[error("invalid {encoding} data at byte {offset}")]
    InvalidData { encoding: String, offset: u64 },

    /// Input ended in the middle of a multi-byte character.
    #[error("input ends inside a {encoding} sequence at byte {offset}")]
    Truncated { encoding: String, offset: u64 },

    #[error("read took {elapsed:?}, limit is {limit:?}")]
    Timeout { elapsed: Duration, limit: Duration },
}

/// Failures committing records to a sink.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("write of record {record} failed: {source}")]
    Write {
        /// Line number of the record being written.
        record: u64,
        #[source]
        source: io::Error,
    },

    #[error("flush failed: {0}")]
    Flush(#[source] io::Error),

    #[error("commit took {elapsed:?}, limit is {limit:?}")]
    Timeout { elapsed: Duration, limit: Duration },
}

/// Rejected configuration values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("high-water mark must be positive")]
    ZeroHighWaterMark,

    #[error("delimiter must not be empty")]
    EmptyDelimiter,

    #[error("unknown encoding: {0} (expected utf8, utf8-lossy or latin1)")]
    UnknownEncoding(String),

    #[error("timeout must be positive")]
    ZeroTimeout,

    #[error("invalid escape sequence in delimiter: {0}")]
    InvalidEscape(String),
}
