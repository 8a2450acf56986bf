//! Pipeline driver.
//!
//! Pulls one chunk at a time from the source, splits it into lines, numbers
//! each line and commits it to the sink before the next chunk is pulled.
//! Nothing is queued between stages: the source is never read faster than
//! the sink commits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::config::PipelineConfig;
use crate::debug_trace::{Recorder, RunTrace};
use crate::error::{ConfigError, PipelineError, Result, SinkError, SourceError};
use crate::numberer::LineNumberer;
use crate::reassembler::LineReassembler;
use crate::record::{Chunk, Line, Record};
use crate::sink::Sink;
use crate::source::ChunkSource;
use crate::timing::{self, RunTimer, timed};

/// Lifecycle of a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Shared flag used to ask a running pipeline to stop.
///
/// The driver checks the flag before each pull. Records already committed
/// stay committed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters reported by a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Chunks pulled from the source.
    pub chunks: u64,
    /// Bytes of decoded text across all chunks.
    pub bytes: u64,
    /// Records committed to the sink.
    pub records: u64,
    /// Time from the `"begin"` mark to the `"finish"` mark.
    pub elapsed: Duration,
}

/// A single-use Source → Reassembler → Numberer → Sink run.
///
/// ```
/// use linestream_rs::{IterSource, Pipeline, PipelineConfig, VecSink};
///
/// let mut sink = VecSink::new();
/// let mut pipeline = Pipeline::new(PipelineConfig::default())?;
/// let summary = pipeline.run(IterSource::new(["ab\ncd", "e\n"]), &mut sink)?;
///
/// assert_eq!(summary.records, 2);
/// assert_eq!(sink.texts(), vec!["1: ab\n", "2: cde\n"]);
/// # Ok::<(), linestream_rs::PipelineError>(())
/// ```
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    state: PipelineState,
    cancel: Option<CancelToken>,
    timer: RunTimer,
}

impl Pipeline {
    /// Create an idle pipeline, rejecting an invalid configuration.
    pub fn new(config: PipelineConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: PipelineState::Idle,
            cancel: None,
            timer: RunTimer::new(),
        })
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Timing marks of the run.
    pub fn timer(&self) -> &RunTimer {
        &self.timer
    }

    /// Drive `source` to exhaustion into `sink`.
    ///
    /// The source is dropped before this returns, releasing its handle on
    /// success and on failure alike. The sink is finalized only on success
    /// or cancellation.
    pub fn run<S: ChunkSource, K: Sink>(&mut self, source: S, sink: K) -> Result<RunSummary> {
        self.drive(source, sink, None)
    }

    /// Like [`run`](Self::run), also returning what each chunk produced.
    pub fn run_traced<S: ChunkSource, K: Sink>(
        &mut self,
        source: S,
        sink: K,
    ) -> Result<(RunSummary, RunTrace)> {
        let mut trace = RunTrace::default();
        let summary = self.drive(source, sink, Some(&mut trace))?;
        Ok((summary, trace))
    }

    fn drive<S: ChunkSource, K: Sink>(
        &mut self,
        mut source: S,
        mut sink: K,
        trace: Option<&mut RunTrace>,
    ) -> Result<RunSummary> {
        if self.state != PipelineState::Idle {
            return Err(PipelineError::AlreadyStarted);
        }
        self.state = PipelineState::Running;
        self.timer.mark(timing::BEGIN);
        info!(
            high_water_mark = self.config.high_water_mark,
            encoding = %self.config.encoding,
            delimiter = ?self.config.delimiter,
            "pipeline started"
        );

        let result = self.pump(&mut source, &mut sink, Recorder::new(trace));
        drop(source);

        match result {
            Ok(summary) => {
                self.state = PipelineState::Completed;
                info!(
                    chunks = summary.chunks,
                    bytes = summary.bytes,
                    records = summary.records,
                    elapsed_ms = summary.elapsed.as_secs_f64() * 1000.0,
                    "pipeline completed"
                );
                Ok(summary)
            }
            Err(err) => {
                self.state = PipelineState::Failed;
                let elapsed = self.timer.elapsed().unwrap_or_default();
                match &err {
                    PipelineError::Cancelled { records } => {
                        warn!(records, ?elapsed, "pipeline cancelled");
                    }
                    other => {
                        warn!(stage = ?other.stage(), error = %other, ?elapsed, "pipeline failed");
                    }
                }
                Err(err)
            }
        }
    }

    fn pump<S: ChunkSource, K: Sink>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        mut recorder: Recorder<'_>,
    ) -> Result<RunSummary> {
        let mut reassembler = LineReassembler::new(self.config.delimiter.clone())?;
        let mut numberer = LineNumberer::new();
        let mut chunks = 0u64;
        let mut bytes = 0u64;

        loop {
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                // Keep what was committed.
                sink.finish()?;
                return Err(PipelineError::Cancelled {
                    records: numberer.count(),
                });
            }

            let Some(chunk) = self.pull(source)? else {
                break;
            };
            chunks += 1;
            bytes += chunk.len() as u64;
            recorder.chunk(&chunk);

            let lines = reassembler.feed(chunk.as_str());
            debug!(
                chunk = chunks,
                len = chunk.len(),
                lines = lines.len(),
                pending = reassembler.pending(),
                "fed chunk"
            );

            for line in lines {
                let traced = recorder.enabled().then(|| line.clone());
                let record = numberer.transform(line);
                if let Some(line) = traced {
                    recorder.record(line, &record);
                }
                self.commit(sink, record)?;
            }
        }

        if let Some(line) = reassembler.finish() {
            debug!(len = line.as_str().len(), "flushing trailing line");
            let traced: Option<Line> = recorder.enabled().then(|| line.clone());
            let record = numberer.transform(line);
            if let Some(line) = traced {
                recorder.flush(line, &record);
            }
            self.commit(sink, record)?;
        }

        sink.finish()?;
        self.timer.mark(timing::FINISH);

        Ok(RunSummary {
            chunks,
            bytes,
            records: numberer.count(),
            elapsed: self.timer.measure().unwrap_or_default(),
        })
    }

    fn pull<S: ChunkSource>(
        &self,
        source: &mut S,
    ) -> std::result::Result<Option<Chunk>, SourceError> {
        let (chunk, elapsed) = timed(|| source.next_chunk());
        let chunk = chunk?;
        if let Some(limit) = self.exceeded(elapsed) {
            return Err(SourceError::Timeout { elapsed, limit });
        }
        Ok(chunk)
    }

    fn commit<K: Sink>(
        &self,
        sink: &mut K,
        record: Record,
    ) -> std::result::Result<(), SinkError> {
        trace!(record = record.number(), "commit");
        let (result, elapsed) = timed(|| sink.commit(record));
        result?;
        if let Some(limit) = self.exceeded(elapsed) {
            return Err(SinkError::Timeout { elapsed, limit });
        }
        Ok(())
    }

    /// The configured limit, if `elapsed` went past it.
    fn exceeded(&self, elapsed: Duration) -> Option<Duration> {
        self.config.op_timeout.filter(|limit| elapsed > *limit)
    }
}
