//! Pipeline configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Default number of bytes requested from the source per chunk.
pub const DEFAULT_HIGH_WATER_MARK: usize = 16384;

/// Default record delimiter.
pub const DEFAULT_DELIMITER: &str = "\n";

/// Text decoding applied to source bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// UTF-8; invalid or truncated sequences fail the run.
    #[default]
    Utf8,
    /// UTF-8; invalid sequences decode to U+FFFD.
    Utf8Lossy,
    /// ISO-8859-1; every byte is one character.
    Latin1,
}

impl Encoding {
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf8",
            Encoding::Utf8Lossy => "utf8-lossy",
            Encoding::Latin1 => "latin1",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "utf8-lossy" | "utf-8-lossy" => Ok(Encoding::Utf8Lossy),
            "latin1" | "iso-8859-1" | "binary" => Ok(Encoding::Latin1),
            _ => Err(ConfigError::UnknownEncoding(s.to_string())),
        }
    }
}

/// Options recognized by a pipeline run.
///
/// ```
/// use linestream_rs::{Encoding, PipelineConfig};
///
/// let config = PipelineConfig::new()
///     .with_high_water_mark(64)
///     .with_delimiter("\r\n")
///     .with_encoding(Encoding::Latin1);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum bytes requested from the source per chunk.
    pub high_water_mark: usize,
    pub encoding: Encoding,
    /// Record terminator searched for by the reassembler.
    pub delimiter: String,
    /// Limit applied to each source read and each sink commit.
    pub op_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            encoding: Encoding::default(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            op_timeout: None,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_high_water_mark(mut self, bytes: usize) -> Self {
        self.high_water_mark = bytes;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = Some(timeout);
        self
    }

    /// Check every option, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.high_water_mark == 0 {
            return Err(ConfigError::ZeroHighWaterMark);
        }
        if self.delimiter.is_empty() {
            return Err(ConfigError::EmptyDelimiter);
        }
        if self.op_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Expand `\n`, `\r`, `\t` and `\\` in a delimiter given on the command line.
pub fn parse_delimiter(text: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => return Err(ConfigError::InvalidEscape(format!("\\{other}"))),
            None => return Err(ConfigError::InvalidEscape("\\".to_string())),
        }
    }

    if out.is_empty() {
        return Err(ConfigError::EmptyDelimiter);
    }
    Ok(out)
}
