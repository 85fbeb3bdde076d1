// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Delimited Log Reader
//!
//! Reads process log rows from delimited text (CSV and friends) into
//! [`Sample`] values: one column carries the case identifier, a configured
//! set of columns carries the event attribute tuple.
//!
//! Quoted fields are handled RFC 4180 style: delimiters inside quotes do not
//! split, doubled quotes escape a literal quote. Column order in
//! `attribute_columns` is preserved in the resulting tuple.

use crate::core::error::{TfgenError, TfgenResult};
use crate::core::event::Sample;

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// Parsing options for delimited process logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogReaderConfig {
    /// Field separator.
    pub delimiter: char,
    /// Skip the first non-empty line.
    pub has_header: bool,
    /// Zero-based column holding the case identifier.
    pub case_column: usize,
    /// Zero-based columns forming the attribute tuple, in order.
    pub attribute_columns: Vec<usize>,
    /// Log and skip rows with missing columns instead of failing the read.
    pub skip_malformed: bool,
}

impl Default for LogReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: false,
            case_column: 0,
            attribute_columns: vec![1],
            skip_malformed: false,
        }
    }
}

/// Materializing reader for finite log files; see [`LogStream`] for the lazy
/// variant.
#[derive(Debug, Clone)]
pub struct LogReader {
    config: LogReaderConfig,
}

impl LogReader {
    pub fn new(config: LogReaderConfig) -> TfgenResult<Self> {
        if config.attribute_columns.is_empty() {
            return Err(TfgenError::configuration_with_parameter(
                "at least one attribute column is required",
                "attribute-columns",
            ));
        }
        Ok(Self { config })
    }

    /// Read a whole file into memory.
    pub fn read_path(&self, path: impl AsRef<Path>) -> TfgenResult<Vec<Sample>> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let samples = self.read_str(&text)?;
        log::info!(
            "[log_reader] read {} samples from {}",
            samples.len(),
            path.display()
        );
        Ok(samples)
    }

    /// Parse delimited text that is already in memory.
    pub fn read_str(&self, text: &str) -> TfgenResult<Vec<Sample>> {
        let mut samples = Vec::new();
        let mut header_pending = self.config.has_header;

        for (line_number, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            if header_pending {
                header_pending = false;
                continue;
            }

            let fields = split_delimited(line, self.config.delimiter);
            match row_to_sample(&self.config, &fields, line_number + 1) {
                Ok(sample) => samples.push(sample),
                Err(e) if self.config.skip_malformed => {
                    log::warn!("[log_reader] skipping malformed row: {e}");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(samples)
    }

    /// Open a file as a lazy sample iterator suitable for streaming ingestion.
    ///
    /// Unreadable or malformed lines are logged and skipped; a lazy stream
    /// has no way to surface per-row errors to the consumer.
    pub fn stream_path(&self, path: impl AsRef<Path>) -> TfgenResult<LogStream> {
        let file = File::open(path.as_ref())?;
        Ok(LogStream {
            lines: BufReader::new(file).lines(),
            config: self.config.clone(),
            header_pending: self.config.has_header,
            line_number: 0,
        })
    }

    pub fn config(&self) -> &LogReaderConfig {
        &self.config
    }
}

/// Lazy line-by-line sample iterator over an open log file.
#[derive(Debug)]
pub struct LogStream {
    lines: Lines<BufReader<File>>,
    config: LogReaderConfig,
    header_pending: bool,
    line_number: usize,
}

impl Iterator for LogStream {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("[log_reader] stopping stream on read error: {e}");
                    return None;
                }
            };
            self.line_number += 1;

            if line.trim().is_empty() {
                continue;
            }
            if self.header_pending {
                self.header_pending = false;
                continue;
            }

            let fields = split_delimited(&line, self.config.delimiter);
            match row_to_sample(&self.config, &fields, self.line_number) {
                Ok(sample) => return Some(sample),
                Err(e) => log::warn!("[log_reader] skipping malformed row: {e}"),
            }
        }
    }
}

/// Split one line on the delimiter, honoring double quotes.
fn split_delimited(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            c if c == delimiter && !in_quotes => {
                fields.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

fn row_to_sample(
    config: &LogReaderConfig,
    fields: &[String],
    line_number: usize,
) -> TfgenResult<Sample> {
    let case_id = fields.get(config.case_column).ok_or_else(|| {
        TfgenError::parse(format!(
            "line {line_number}: case column {} missing ({} fields)",
            config.case_column,
            fields.len()
        ))
    })?;

    let mut attributes = Vec::with_capacity(config.attribute_columns.len());
    for &column in &config.attribute_columns {
        let value = fields.get(column).ok_or_else(|| {
            TfgenError::parse(format!(
                "line {line_number}: attribute column {column} missing ({} fields)",
                fields.len()
            ))
        })?;
        attributes.push(value.clone());
    }

    Ok(Sample::new(case_id.clone(), attributes))
}
