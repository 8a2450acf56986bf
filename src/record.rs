//! Units of data flowing between pipeline stages.
//!
//! Each type is a thin wrapper over `String` so that a chunk can't be handed
//! to the sink or a line to the reassembler by mistake.

use std::fmt;

/// A block of decoded input text, as delivered by a source.
///
/// Chunk boundaries carry no meaning; they rarely line up with delimiters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Chunk(String);

impl Chunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Chunk {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl From<String> for Chunk {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl AsRef<str> for Chunk {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One logical line, including its delimiter.
///
/// Only the last line of a stream may lack the delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line(String);

impl Line {
    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// True if the line ends with `delimiter`.
    pub fn is_terminated_by(&self, delimiter: &str) -> bool {
        self.0.ends_with(delimiter)
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A numbered line, formatted as `"<number>: <line>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    number: u64,
    text: String,
}

impl Record {
    pub fn new(number: u64, line: Line) -> Self {
        let line = line.into_string();
        let mut text = String::with_capacity(line.len() + 8);
        text.push_str(&number.to_string());
        text.push_str(": ");
        text.push_str(&line);
        Self { number, text }
    }

    /// The 1-based line number.
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
