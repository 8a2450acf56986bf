//! Per-run timing.
//!
//! A [`RunTimer`] holds named instants for one pipeline run. The driver marks
//! `"begin"` when it starts and `"finish"` once the sink has been finalized.

use std::time::{Duration, Instant};

pub const BEGIN: &str = "begin";
pub const FINISH: &str = "finish";

/// Named timing marks for a single run.
#[derive(Debug, Clone, Default)]
pub struct RunTimer {
    marks: Vec<(&'static str, Instant)>,
}

impl RunTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` at the current instant. Marks are write-once: a name
    /// that is already set keeps its first instant.
    pub fn mark(&mut self, name: &'static str) {
        if self.get(name).is_none() {
            self.marks.push((name, Instant::now()));
        }
    }

    pub fn get(&self, name: &str) -> Option<Instant> {
        self.marks
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, at)| *at)
    }

    /// Time between two marks, if both exist and are in order.
    pub fn between(&self, start: &str, end: &str) -> Option<Duration> {
        let start = self.get(start)?;
        let end = self.get(end)?;
        end.checked_duration_since(start)
    }

    /// Duration from `"begin"` to `"finish"`.
    pub fn measure(&self) -> Option<Duration> {
        self.between(BEGIN, FINISH)
    }

    /// Time since `"begin"`, for reporting runs that did not finish.
    pub fn elapsed(&self) -> Option<Duration> {
        self.get(BEGIN).map(|at| at.elapsed())
    }
}

/// Runs `op` and returns its result with the time it took.
pub(crate) fn timed<T>(op: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let out = op();
    (out, start.elapsed())
}
