//! Iterator adapters for composing the pipeline in memory.
//!
//! These mirror the driver's stages for callers that already hold their
//! chunks in an iterator and have no sink to commit to:
//!
//! ```
//! use linestream_rs::LinesExt;
//!
//! let records: Vec<String> = ["ab\ncd", "e\n", "f"]
//!     .into_iter()
//!     .reassemble("\n")?
//!     .numbered()
//!     .map(|r| r.into_string())
//!     .collect();
//! assert_eq!(records, vec!["1: ab\n", "2: cde\n", "3: f"]);
//! # Ok::<(), linestream_rs::ConfigError>(())
//! ```

use std::collections::VecDeque;

use crate::error::ConfigError;
use crate::numberer::LineNumberer;
use crate::reassembler::LineReassembler;
use crate::record::{Line, Record};

/// Lines reassembled from an iterator of chunks.
pub struct Reassembled<I> {
    chunks: I,
    reassembler: LineReassembler,
    ready: VecDeque<Line>,
    finished: bool,
}

impl<I> Iterator for Reassembled<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = Line;

    fn next(&mut self) -> Option<Line> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Some(line);
            }
            if self.finished {
                return None;
            }
            match self.chunks.next() {
                Some(chunk) => self.ready.extend(self.reassembler.feed(chunk.as_ref())),
                None => {
                    self.finished = true;
                    return self.reassembler.finish();
                }
            }
        }
    }
}

/// Records numbered from an iterator of lines.
pub struct Numbered<I> {
    lines: I,
    numberer: LineNumberer,
}

impl<I: Iterator<Item = Line>> Iterator for Numbered<I> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        self.lines.next().map(|line| self.numberer.transform(line))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.lines.size_hint()
    }
}

/// Extension methods for building the pipeline out of iterators.
pub trait LinesExt: Iterator + Sized {
    /// Split chunks into lines ending in `delimiter`.
    fn reassemble(self, delimiter: &str) -> Result<Reassembled<Self>, ConfigError>
    where
        Self::Item: AsRef<str>,
    {
        Ok(Reassembled {
            chunks: self,
            reassembler: LineReassembler::new(delimiter)?,
            ready: VecDeque::new(),
            finished: false,
        })
    }

    /// Prefix each line with its 1-based position.
    fn numbered(self) -> Numbered<Self>
    where
        Self: Iterator<Item = Line>,
    {
        Numbered {
            lines: self,
            numberer: LineNumberer::new(),
        }
    }
}

impl<I: Iterator> LinesExt for I {}
