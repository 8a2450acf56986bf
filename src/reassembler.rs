//! Chunk-to-line reassembly.
//!
//! Chunks arrive with arbitrary boundaries. The reassembler keeps the
//! unterminated tail of everything seen so far and emits each line as soon as
//! its delimiter has arrived.

use crate::config::DEFAULT_DELIMITER;
use crate::error::ConfigError;
use crate::record::Line;

/// Splits a stream of chunks into delimiter-terminated lines.
///
/// ```
/// use linestream_rs::LineReassembler;
///
/// let mut lines = LineReassembler::default();
/// let first: Vec<String> = lines.feed("ab\ncd").into_iter().map(|l| l.into_string()).collect();
/// let second: Vec<String> = lines.feed("e\n").into_iter().map(|l| l.into_string()).collect();
/// assert_eq!(first, vec!["ab\n"]);
/// assert_eq!(second, vec!["cde\n"]);
/// assert!(lines.finish().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct LineReassembler {
    delimiter: String,
    /// Unterminated tail; never holds a complete delimiter.
    carry: String,
}

impl Default for LineReassembler {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            carry: String::new(),
        }
    }
}

impl LineReassembler {
    pub fn new(delimiter: impl Into<String>) -> Result<Self, ConfigError> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(ConfigError::EmptyDelimiter);
        }
        Ok(Self {
            delimiter,
            carry: String::new(),
        })
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Bytes currently held back waiting for a delimiter.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    /// Append `chunk` and return every line it completes, in order.
    pub fn feed(&mut self, chunk: &str) -> Vec<Line> {
        if chunk.is_empty() {
            return Vec::new();
        }

        // A delimiter completed by this chunk can start at most
        // `delimiter.len() - 1` bytes before the old end of the carry.
        let mut scan_from = self
            .carry
            .len()
            .saturating_sub(self.delimiter.len() - 1);
        while !self.carry.is_char_boundary(scan_from) {
            scan_from -= 1;
        }

        self.carry.push_str(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.carry[scan_from..].find(self.delimiter.as_str()) {
            let end = scan_from + pos + self.delimiter.len();
            lines.push(Line::new(self.carry[start..end].to_string()));
            start = end;
            scan_from = end;
        }

        if start > 0 {
            self.carry.drain(..start);
        }
        lines
    }

    /// Emit the remaining tail, if any, as the final line.
    ///
    /// The returned line has no delimiter. An empty carry yields `None`, so a
    /// stream ending in a delimiter does not produce an extra empty line.
    pub fn finish(&mut self) -> Option<Line> {
        if self.carry.is_empty() {
            None
        } else {
            Some(Line::new(std::mem::take(&mut self.carry)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(reassembler: &mut LineReassembler, chunks: &[&str]) -> Vec<String> {
        let mut out: Vec<String> = chunks
            .iter()
            .flat_map(|c| reassembler.feed(c))
            .map(Line::into_string)
            .collect();
        out.extend(reassembler.finish().map(Line::into_string));
        out
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut r = LineReassembler::default();
        assert_eq!(feed_all(&mut r, &["ab\ncd", "e\n"]), vec!["ab\n", "cde\n"]);
    }

    #[test]
    fn test_trailing_partial_line() {
        let mut r = LineReassembler::default();
        assert_eq!(feed_all(&mut r, &["x"]), vec!["x"]);
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut r = LineReassembler::default();
        let lines = r.feed("a\nb\nc\nd");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].as_str(), "c\n");
        assert_eq!(r.pending(), 1);
    }

    #[test]
    fn test_empty_chunk_produces_nothing() {
        let mut r = LineReassembler::default();
        assert!(r.feed("").is_empty());
        r.feed("abc");
        assert!(r.feed("").is_empty());
        assert_eq!(r.pending(), 3);
    }

    #[test]
    fn test_delimiter_only_chunk() {
        let mut r = LineReassembler::default();
        let lines: Vec<String> = r.feed("\n\n\n").into_iter().map(Line::into_string).collect();
        assert_eq!(lines, vec!["\n", "\n", "\n"]);
        assert!(r.finish().is_none());
    }

    #[test]
    fn test_no_duplicate_empty_line_at_end() {
        let mut r = LineReassembler::default();
        assert_eq!(feed_all(&mut r, &["a\n", "\n"]), vec!["a\n", "\n"]);
    }

    #[test]
    fn test_multi_byte_delimiter_split_across_chunks() {
        let mut r = LineReassembler::new("\r\n").unwrap();
        assert_eq!(
            feed_all(&mut r, &["one\r", "\ntwo\r", "\r\n", "three"]),
            vec!["one\r\n", "two\r\r\n", "three"]
        );
    }

    #[test]
    fn test_delimiter_split_over_three_chunks() {
        let mut r = LineReassembler::new("<|>").unwrap();
        assert_eq!(
            feed_all(&mut r, &["a<", "|", ">b<|", ">"]),
            vec!["a<|>", "b<|>"]
        );
    }

    #[test]
    fn test_lone_carriage_return_is_content() {
        let mut r = LineReassembler::new("\r\n").unwrap();
        assert_eq!(feed_all(&mut r, &["a\rb\r\n"]), vec!["a\rb\r\n"]);
    }

    #[test]
    fn test_self_overlapping_delimiter() {
        let mut r = LineReassembler::new("aa").unwrap();
        assert_eq!(feed_all(&mut r, &["a", "aa", "b"]), vec!["aa", "ab"]);
    }

    #[test]
    fn test_multi_byte_characters_near_scan_start() {
        let mut r = LineReassembler::new("--").unwrap();
        assert_eq!(
            feed_all(&mut r, &["é", "-", "-ü", "--"]),
            vec!["é--", "ü--"]
        );
    }

    #[test]
    fn test_long_line_over_many_chunks() {
        let mut r = LineReassembler::default();
        for _ in 0..1000 {
            assert!(r.feed("xyz").is_empty());
        }
        let lines = r.feed("\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_str().len(), 3001);
        assert_eq!(r.pending(), 0);
    }

    #[test]
    fn test_empty_delimiter_rejected() {
        assert_eq!(
            LineReassembler::new("").unwrap_err(),
            ConfigError::EmptyDelimiter
        );
    }

    #[test]
    fn test_finish_without_input() {
        let mut r = LineReassembler::default();
        assert!(r.finish().is_none());
    }
}
