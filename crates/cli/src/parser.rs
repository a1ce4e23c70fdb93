//! Instance reader.
//!
//! The input is line based:
//!
//! ```text
//! container height: fixed 22      (or: free, or a bare 22)
//! rotations allowed: yes          (or a bare yes / no)
//! number of rectangles: 3         (or a bare 3)
//! 12 8
//! 10 9
//! 2 2
//! ```
//!
//! Header lines may carry a `label:` prefix; only the text after the last
//! colon is read. Blank lines are skipped. Rectangles are numbered in the
//! order they appear.

use rectpack_core::{Config, Instance};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading an instance or a configuration file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing {0} line")]
    MissingLine(&'static str),

    #[error("line {line}: invalid number '{value}'")]
    InvalidNumber { line: usize, value: String },

    #[error("line {line}: expected 'yes' or 'no', found '{value}'")]
    InvalidRotation { line: usize, value: String },

    #[error("expected {expected} rectangles, found {found}")]
    CountMismatch { expected: usize, found: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads instances in the line format described in the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceParser;

impl InstanceParser {
    /// Creates a parser.
    pub fn new() -> Self {
        Self
    }

    /// Parses an instance file.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Instance, ParseError> {
        let file = std::fs::File::open(path)?;
        self.parse_reader(BufReader::new(file))
    }

    /// Parses an instance from a string.
    pub fn parse_str(&self, input: &str) -> Result<Instance, ParseError> {
        self.parse_reader(input.as_bytes())
    }

    /// Parses an instance from any reader.
    pub fn parse_reader<R: Read>(&self, reader: R) -> Result<Instance, ParseError> {
        let mut lines = Vec::new();
        for (index, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                lines.push((index + 1, trimmed.to_string()));
            }
        }
        let mut lines = lines.into_iter();

        let (number, text) = lines.next().ok_or(ParseError::MissingLine("container height"))?;
        let fixed_height = parse_height(number, header_value(&text))?;

        let (number, text) = lines.next().ok_or(ParseError::MissingLine("rotations allowed"))?;
        let allow_rotation = parse_rotation(number, header_value(&text))?;

        let (number, text) = lines
            .next()
            .ok_or(ParseError::MissingLine("number of rectangles"))?;
        let count = parse_number::<usize>(number, header_value(&text))?;

        let mut instance = Instance::new(allow_rotation, fixed_height);
        for (number, text) in lines {
            let mut fields = text.split_whitespace();
            let width = parse_number(number, fields.next().unwrap_or(""))?;
            let height = parse_number(number, fields.next().unwrap_or(""))?;
            if let Some(extra) = fields.next() {
                return Err(ParseError::InvalidNumber {
                    line: number,
                    value: extra.to_string(),
                });
            }
            instance.add(width, height);
        }
        if instance.size() != count {
            return Err(ParseError::CountMismatch {
                expected: count,
                found: instance.size(),
            });
        }
        log::debug!(
            "parsed {} rectangles, height {}, rotation {}",
            count,
            fixed_height.map_or_else(|| "free".to_string(), |h| h.to_string()),
            if allow_rotation { "allowed" } else { "forbidden" }
        );
        Ok(instance.with_declared_count(count))
    }
}

/// Reads a JSON run configuration; missing fields take their defaults.
pub fn parse_config(json: &str) -> Result<Config, ParseError> {
    Ok(serde_json::from_str(json)?)
}

/// Reads a JSON run configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ParseError> {
    parse_config(&std::fs::read_to_string(path)?)
}

fn header_value(line: &str) -> &str {
    line.rsplit(':').next().unwrap_or(line).trim()
}

fn parse_number<T: std::str::FromStr>(line: usize, value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidNumber {
        line,
        value: value.to_string(),
    })
}

fn parse_height(line: usize, value: &str) -> Result<Option<u32>, ParseError> {
    let mut words = value.split_whitespace();
    match words.next() {
        Some(word) if word.eq_ignore_ascii_case("free") => Ok(None),
        Some(word) if word.eq_ignore_ascii_case("fixed") => {
            parse_number(line, words.next().unwrap_or("")).map(Some)
        }
        Some(word) => parse_number(line, word).map(Some),
        None => Err(ParseError::InvalidNumber {
            line,
            value: String::new(),
        }),
    }
}

fn parse_rotation(line: usize, value: &str) -> Result<bool, ParseError> {
    if value.eq_ignore_ascii_case("yes") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("no") {
        Ok(false)
    } else {
        Err(ParseError::InvalidRotation {
            line,
            value: value.to_string(),
        })
    }
}
