//! Conversion report output in JSON and JSONL.
//!
//! The batch driver collects one record per source file; the CLI hands them
//! to an [`OutputWriter`] when `--report` is given.

use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::types::ConversionRecord;

/// Report format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// One JSON array holding every record
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl ReportFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Serializes conversion records as a JSON array or as JSON Lines.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: ReportFormat,
    pretty: bool,
    items_written: usize,
}

impl OutputWriter<BufWriter<File>> {
    /// Create (or truncate) a report file at `path`.
    pub fn create(path: &Path, format: ReportFormat, pretty: bool) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), format, pretty))
    }
}

impl<W: Write> OutputWriter<W> {
    /// Wrap an arbitrary writer. `pretty` only affects the JSON array format.
    pub fn new(writer: W, format: ReportFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write a single item on its own line.
    fn write_line<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        writeln!(self.writer)?;
        self.items_written += 1;
        Ok(())
    }

    /// Write a whole report.
    pub fn write_all<T: Serialize>(&mut self, items: &[T]) -> io::Result<()> {
        match self.format {
            ReportFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, items)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, items).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                self.items_written += items.len();
            }
            ReportFormat::JsonLines => {
                for item in items {
                    self.write_line(item)?;
                }
            }
        }
        Ok(())
    }

    /// Write the records of a finished batch and flush.
    pub fn write_report(&mut self, records: &[ConversionRecord]) -> io::Result<()> {
        self.write_all(records)?;
        self.flush()
    }

    /// Get the number of items written.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
