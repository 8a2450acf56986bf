//! # linestream-rs
//!
//! Streaming line numbering for text files too large to load at once.
//!
//! Input is read in bounded chunks whose boundaries have nothing to do with
//! line boundaries. The pipeline reassembles complete lines across chunks,
//! prefixes each with its line number and commits it to a sink before the
//! next chunk is read.
//!
//! ## Overview
//!
//! - **Source**: yields decoded chunks of at most `high_water_mark` bytes
//! - **Reassembler**: carries unterminated text between chunks and emits
//!   whole lines, delimiter included
//! - **Numberer**: turns the Nth line into the record `"N: <line>"`
//! - **Sink**: commits records one at a time, in order
//! - **Pipeline**: drives the stages sequentially; at most one chunk is in
//!   flight, so the sink sets the pace
//!
//! ## Example
//!
//! ```
//! use linestream_rs::{IterSource, Pipeline, PipelineConfig, VecSink};
//!
//! let mut sink = VecSink::new();
//! Pipeline::new(PipelineConfig::default())?
//!     .run(IterSource::new(["x"]), &mut sink)?;
//!
//! assert_eq!(sink.texts(), vec!["1: x"]);
//! # Ok::<(), linestream_rs::PipelineError>(())
//! ```

pub mod config;
pub mod debug_trace;
pub mod error;
pub mod executor;
pub mod iter;
pub mod numberer;
pub mod reassembler;
pub mod record;
pub mod sink;
pub mod source;
pub mod timing;

pub use config::{
    DEFAULT_DELIMITER, DEFAULT_HIGH_WATER_MARK, Encoding, PipelineConfig, parse_delimiter,
};
pub use debug_trace::{ChunkTrace, FlushTrace, RunTrace};
pub use error::{ConfigError, PipelineError, Result, SinkError, SourceError, Stage};
pub use executor::{CancelToken, Pipeline, PipelineState, RunSummary};
pub use iter::{LinesExt, Numbered, Reassembled};
pub use numberer::LineNumberer;
pub use reassembler::LineReassembler;
pub use record::{Chunk, Line, Record};
pub use sink::{Sink, VecSink, WriterSink};
pub use source::{ChunkSource, IterSource, ReaderSource};
pub use timing::RunTimer;
