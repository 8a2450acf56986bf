//! Line numbering stage.

use crate::record::{Line, Record};

/// Prefixes each line with its 1-based position in the stream.
#[derive(Debug, Clone)]
pub struct LineNumberer {
    next: u64,
}

impl Default for LineNumberer {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl LineNumberer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number `line`. The Nth call returns record N.
    pub fn transform(&mut self, line: Line) -> Record {
        let record = Record::new(self.next, line);
        self.next += 1;
        record
    }

    /// Lines numbered so far.
    pub fn count(&self) -> u64 {
        self.next - 1
    }
}
