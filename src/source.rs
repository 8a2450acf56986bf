//! Chunk sources.
//!
//! A source yields decoded text in bounded chunks and then signals end of
//! input with `Ok(None)`. Sources own their underlying handle, so dropping
//! one (on success, failure or cancellation) releases it.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use tracing::{debug, trace};

use crate::config::{Encoding, PipelineConfig};
use crate::error::SourceError;
use crate::record::Chunk;

/// A lazy, forward-only producer of chunks.
pub trait ChunkSource {
    /// Pull the next chunk, or `Ok(None)` once the input is exhausted.
    fn next_chunk(&mut self) -> Result<Option<Chunk>, SourceError>;
}

impl<S: ChunkSource + ?Sized> ChunkSource for &mut S {
    fn next_chunk(&mut self) -> Result<Option<Chunk>, SourceError> {
        (**self).next_chunk()
    }
}

impl<S: ChunkSource + ?Sized> ChunkSource for Box<S> {
    fn next_chunk(&mut self) -> Result<Option<Chunk>, SourceError> {
        (**self).next_chunk()
    }
}

// ---------------------------------------------------------------------------
// Incremental decoding
// ---------------------------------------------------------------------------

/// Decodes bytes to text across read boundaries.
///
/// An incomplete UTF-8 sequence at the end of one read is held in `pending`
/// and completed by the next.
#[derive(Debug)]
struct Decoder {
    encoding: Encoding,
    pending: Vec<u8>,
    /// Bytes decoded so far, not counting `pending`.
    offset: u64,
}

impl Decoder {
    fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            pending: Vec::new(),
            offset: 0,
        }
    }

    fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn decode(&mut self, bytes: &[u8]) -> Result<String, SourceError> {
        if self.encoding == Encoding::Latin1 {
            self.offset += bytes.len() as u64;
            return Ok(bytes.iter().map(|&b| char::from(b)).collect());
        }

        let data: Cow<'_, [u8]> = if self.pending.is_empty() {
            Cow::Borrowed(bytes)
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(bytes);
            Cow::Owned(joined)
        };

        let mut out = String::with_capacity(data.len());
        let mut rest: &[u8] = &data;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    self.offset += rest.len() as u64;
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    self.offset += valid as u64;

                    match e.error_len() {
                        // Incomplete sequence at the end; wait for more bytes.
                        None => {
                            self.pending = rest[valid..].to_vec();
                            break;
                        }
                        Some(_) if self.encoding == Encoding::Utf8 => {
                            return Err(SourceError::InvalidData {
                                encoding: self.encoding.to_string(),
                                offset: self.offset,
                            });
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.offset += len as u64;
                            rest = &rest[valid + len..];
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    /// Resolve whatever is left in `pending` at end of input.
    fn finish(&mut self) -> Result<Option<String>, SourceError> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        if self.encoding == Encoding::Utf8 {
            return Err(SourceError::Truncated {
                encoding: self.encoding.to_string(),
                offset: self.offset,
            });
        }
        self.offset += self.pending.len() as u64;
        self.pending.clear();
        Ok(Some(char::REPLACEMENT_CHARACTER.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Reads chunks of at most `high_water_mark` bytes from any reader.
///
/// The mark bounds both the raw bytes per read and the decoded chunk. Latin1
/// and lossy decoding can widen a read past the mark; the excess is held in
/// `spill` and served by the following calls before anything new is read.
/// A multi-byte character is never split, so with a mark smaller than one
/// character a chunk holds exactly that character.
pub struct ReaderSource<R> {
    reader: R,
    buf: Vec<u8>,
    decoder: Decoder,
    spill: String,
    bytes_read: u64,
    done: bool,
}

impl ReaderSource<File> {
    /// Open `path` for reading.
    pub fn open<P: AsRef<Path>>(path: P, config: &PipelineConfig) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), high_water_mark = config.high_water_mark, "opened source");
        Ok(Self::new(file, config))
    }
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R, config: &PipelineConfig) -> Self {
        Self {
            reader,
            buf: vec![0; config.high_water_mark.max(1)],
            decoder: Decoder::new(config.encoding),
            spill: String::new(),
            bytes_read: 0,
            done: false,
        }
    }

    /// Raw bytes consumed from the reader.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Split off the next chunk of at most one mark from `spill`.
    fn take_chunk(&mut self) -> Option<Chunk> {
        let first = self.spill.chars().next()?;
        let mut end = self.buf.len().min(self.spill.len());
        while !self.spill.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            end = first.len_utf8();
        }
        let rest = self.spill.split_off(end);
        Some(Chunk::from(std::mem::replace(&mut self.spill, rest)))
    }

    fn read_some(&mut self) -> Result<usize, SourceError> {
        // Leave room for held-back bytes so decoded chunks stay within the mark.
        let want = self
            .buf
            .len()
            .saturating_sub(self.decoder.pending_len())
            .max(1);
        loop {
            match self.reader.read(&mut self.buf[..want]) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(SourceError::Read {
                        offset: self.bytes_read,
                        source,
                    });
                }
            }
        }
    }
}

impl<R: Read> ChunkSource for ReaderSource<R> {
    fn next_chunk(&mut self) -> Result<Option<Chunk>, SourceError> {
        if let Some(chunk) = self.take_chunk() {
            return Ok(Some(chunk));
        }
        if self.done {
            return Ok(None);
        }
        loop {
            let n = self.read_some()?;
            if n == 0 {
                self.done = true;
                trace!(bytes_read = self.bytes_read, "end of input");
                if let Some(tail) = self.decoder.finish()? {
                    self.spill.push_str(&tail);
                }
                return Ok(self.take_chunk());
            }
            self.bytes_read += n as u64;
            let text = self.decoder.decode(&self.buf[..n])?;
            self.spill.push_str(&text);
            if let Some(chunk) = self.take_chunk() {
                return Ok(Some(chunk));
            }
        }
    }
}

/// Serves chunks from an in-memory sequence.
pub struct IterSource<I> {
    chunks: I,
}

impl<I> IterSource<I> {
    pub fn new<C>(chunks: C) -> Self
    where
        C: IntoIterator<IntoIter = I>,
    {
        Self {
            chunks: chunks.into_iter(),
        }
    }
}

impl<I, T> ChunkSource for IterSource<I>
where
    I: Iterator<Item = T>,
    T: Into<Chunk>,
{
    fn next_chunk(&mut self) -> Result<Option<Chunk>, SourceError> {
        Ok(self.chunks.next().map(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn config(high_water_mark: usize, encoding: Encoding) -> PipelineConfig {
        PipelineConfig::new()
            .with_high_water_mark(high_water_mark)
            .with_encoding(encoding)
    }

    fn drain<S: ChunkSource>(source: &mut S) -> Result<Vec<String>, SourceError> {
        let mut out = Vec::new();
        while let Some(chunk) = source.next_chunk()? {
            out.push(chunk.as_str().to_string());
        }
        Ok(out)
    }

    #[test]
    fn test_chunks_respect_high_water_mark() {
        let mut source = ReaderSource::new(Cursor::new("abcdefghij"), &config(4, Encoding::Utf8));
        let chunks = drain(&mut source).unwrap();
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
        assert_eq!(source.bytes_read(), 10);
    }

    #[test]
    fn test_end_of_input_is_sticky() {
        let mut source = ReaderSource::new(Cursor::new("a"), &config(16, Encoding::Utf8));
        assert!(source.next_chunk().unwrap().is_some());
        assert!(source.next_chunk().unwrap().is_none());
        assert!(source.next_chunk().unwrap().is_none());
    }

    #[test]
    fn test_empty_input() {
        let mut source = ReaderSource::new(Cursor::new(""), &config(16, Encoding::Utf8));
        assert!(source.next_chunk().unwrap().is_none());
    }

    #[test]
    fn test_multi_byte_char_split_across_reads() {
        // "é" is two bytes; the first 3-byte read ends after its lead byte.
        let mut source = ReaderSource::new(Cursor::new("abéc"), &config(3, Encoding::Utf8));
        let chunks = drain(&mut source).unwrap();
        assert_eq!(chunks, vec!["ab", "éc"]);
    }

    #[test]
    fn test_mark_smaller_than_char() {
        let mut source = ReaderSource::new(Cursor::new("€x"), &config(1, Encoding::Utf8));
        let chunks = drain(&mut source).unwrap();
        assert_eq!(chunks, vec!["€", "x"]);
    }

    #[test]
    fn test_strict_utf8_rejects_invalid_bytes() {
        let bytes: Vec<u8> = vec![b'o', b'k', 0xff, b'\n'];
        let mut source = ReaderSource::new(Cursor::new(bytes), &config(16, Encoding::Utf8));
        match source.next_chunk() {
            Err(SourceError::InvalidData { offset, .. }) => assert_eq!(offset, 2),
            other => panic!("expected InvalidData, got {other:?}"),
        }
    }

    #[test]
    fn test_strict_utf8_rejects_truncated_input() {
        let bytes: Vec<u8> = vec![b'a', 0xe2, 0x82];
        let mut source = ReaderSource::new(Cursor::new(bytes), &config(16, Encoding::Utf8));
        assert_eq!(source.next_chunk().unwrap().unwrap().as_str(), "a");
        assert!(matches!(
            source.next_chunk(),
            Err(SourceError::Truncated { offset: 1, .. })
        ));
    }

    #[test]
    fn test_lossy_utf8_replaces_invalid_bytes() {
        let bytes: Vec<u8> = vec![b'a', 0xff, b'b', 0xe2, 0x82];
        let mut source = ReaderSource::new(Cursor::new(bytes), &config(16, Encoding::Utf8Lossy));
        let chunks = drain(&mut source).unwrap();
        assert_eq!(chunks.concat(), "a\u{FFFD}b\u{FFFD}");
    }

    #[test]
    fn test_latin1_maps_bytes_to_chars() {
        let bytes: Vec<u8> = vec![b'c', 0xe9, b'\n'];
        let mut source = ReaderSource::new(Cursor::new(bytes), &config(16, Encoding::Latin1));
        assert_eq!(drain(&mut source).unwrap(), vec!["c\u{e9}\n"]);
    }

    fn max_chunk_len(bytes: Vec<u8>, high_water_mark: usize, encoding: Encoding) -> usize {
        let mut source = ReaderSource::new(Cursor::new(bytes), &config(high_water_mark, encoding));
        let chunks = drain(&mut source).unwrap();
        chunks.iter().map(String::len).max().unwrap_or(0)
    }

    #[test]
    fn test_latin1_widening_stays_within_mark() {
        let mut source =
            ReaderSource::new(Cursor::new(vec![0xe9; 8]), &config(4, Encoding::Latin1));
        let chunks = drain(&mut source).unwrap();
        assert!(chunks.iter().all(|c| c.len() <= 4));
        assert_eq!(chunks.concat(), "\u{e9}".repeat(8));
        assert_eq!(source.bytes_read(), 8);
    }

    #[test]
    fn test_lossy_replacement_stays_within_mark() {
        let mut source =
            ReaderSource::new(Cursor::new(vec![0xff; 8]), &config(4, Encoding::Utf8Lossy));
        let chunks = drain(&mut source).unwrap();
        // U+FFFD is three bytes, so each chunk holds one replacement.
        assert_eq!(chunks.len(), 8);
        assert!(chunks.iter().all(|c| c.as_str() == "\u{FFFD}"));
    }

    #[test]
    fn test_widened_chunks_bounded_for_any_mark() {
        let bytes: Vec<u8> = (0..64u8)
            .map(|i| if i % 3 == 0 { b'\n' } else { 0x80 | i })
            .collect();
        for mark in 3..12 {
            assert!(max_chunk_len(bytes.clone(), mark, Encoding::Latin1) <= mark);
            assert!(max_chunk_len(bytes.clone(), mark, Encoding::Utf8Lossy) <= mark);
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device error"))
        }
    }

    #[test]
    fn test_read_error_surfaces() {
        let mut source = ReaderSource::new(FailingReader, &config(16, Encoding::Utf8));
        assert!(matches!(
            source.next_chunk(),
            Err(SourceError::Read { offset: 0, .. })
        ));
    }

    struct InterruptOnce {
        interrupted: bool,
        inner: Cursor<&'static str>,
    }

    impl Read for InterruptOnce {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        let reader = InterruptOnce {
            interrupted: false,
            inner: Cursor::new("hi\n"),
        };
        let mut source = ReaderSource::new(reader, &config(16, Encoding::Utf8));
        assert_eq!(drain(&mut source).unwrap(), vec!["hi\n"]);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.log");
        match ReaderSource::open(&path, &PipelineConfig::default()) {
            Err(SourceError::Open { path: p, .. }) => assert_eq!(p, path),
            Err(other) => panic!("expected Open error, got {other:?}"),
            Ok(_) => panic!("expected Open error"),
        }
    }

    #[test]
    fn test_iter_source() {
        let mut source = IterSource::new(vec!["ab\ncd", "e\n"]);
        assert_eq!(drain(&mut source).unwrap(), vec!["ab\ncd", "e\n"]);
    }
}
