//! Streaming CSV ingestion for register submissions.
//!
//! A register is read as a sequence of bounded batches so memory stays flat
//! regardless of submission size. The source is restartable: each call to
//! [`CsvSource::batches`] re-opens the file and replays it from the first
//! record, which lets the engine run one pass per validation phase.

use std::io;
use std::path::{Path, PathBuf};

use polars::prelude::*;

use sblar_model::{Result, ValidationError};

/// Default number of records per batch.
pub const DEFAULT_BATCH_SIZE: usize = 50_000;

/// Default number of attempts when opening a source that fails transiently.
pub const DEFAULT_OPEN_RETRIES: u32 = 3;

/// How to handle catalogue fields absent from the source header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingColumnPolicy {
    /// Refuse the source.
    #[default]
    Reject,
    /// Materialize the column with blank values for every record.
    TreatAsBlank,
}

/// Reader tuning knobs.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Records per batch. Must be at least 1.
    pub batch_size: usize,
    pub missing_column_policy: MissingColumnPolicy,
    /// Attempts made when opening fails with a transient I/O error.
    pub open_retries: u32,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            missing_column_policy: MissingColumnPolicy::default(),
            open_retries: DEFAULT_OPEN_RETRIES,
        }
    }
}

impl ReaderOptions {
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_missing_column_policy(mut self, policy: MissingColumnPolicy) -> Self {
        self.missing_column_policy = policy;
        self
    }

    pub fn with_open_retries(mut self, retries: u32) -> Self {
        self.open_retries = retries;
        self
    }
}

/// One batch of records, positioned within the whole register.
#[derive(Debug)]
pub struct Batch {
    /// Zero-based batch ordinal.
    pub index: usize,
    /// Zero-based offset of this batch's first record within the register.
    pub row_start: u64,
    /// One string column per catalogue field, in field order.
    pub df: DataFrame,
}

impl Batch {
    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// One-based record number of the `idx`-th row of this batch.
    pub fn record_no(&self, idx: usize) -> u64 {
        self.row_start + idx as u64 + 1
    }

    /// Extract a column as owned strings, one per row.
    pub fn values(&self, field: &str) -> Result<Vec<String>> {
        let column = self.df.column(field).map_err(|e| {
            ValidationError::configuration(format!("column {field} missing from batch: {e}"))
        })?;
        let mut values = Vec::with_capacity(self.df.height());
        for idx in 0..self.df.height() {
            let value = column.get(idx).unwrap_or(AnyValue::Null);
            values.push(sblar_common::any_to_string(value));
        }
        Ok(values)
    }
}

/// A validated, restartable CSV register source.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    fields: Vec<String>,
    /// Per field: index of its source column, or `None` when the column is
    /// materialized as blank.
    column_map: Vec<Option<usize>>,
    options: ReaderOptions,
}

impl CsvSource {
    /// Open a source and validate its header against the expected fields.
    ///
    /// Expected fields missing from the header are handled per the missing
    /// column policy; header columns outside the expected set are ignored.
    pub fn open(path: &Path, expected_fields: &[String], options: ReaderOptions) -> Result<Self> {
        if options.batch_size == 0 {
            return Err(ValidationError::configuration("batch size must be at least 1"));
        }

        let mut reader = open_with_retry(path, options.open_retries)?;
        let headers = reader
            .headers()
            .map_err(|e| read_error(path, e))?
            .clone();

        let mut column_map = Vec::with_capacity(expected_fields.len());
        let mut missing = Vec::new();
        for field in expected_fields {
            let idx = headers.iter().position(|h| h.trim() == field);
            if idx.is_none() {
                missing.push(field.clone());
            }
            column_map.push(idx);
        }

        if !missing.is_empty() {
            match options.missing_column_policy {
                MissingColumnPolicy::Reject => {
                    return Err(ValidationError::source_read(
                        path.display().to_string(),
                        format!("missing required column(s): {}", missing.join(", ")),
                    ));
                }
                MissingColumnPolicy::TreatAsBlank => {
                    tracing::warn!(
                        path = %path.display(),
                        columns = missing.join(", "),
                        "missing columns treated as blank"
                    );
                }
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            fields: expected_fields.to_vec(),
            column_map,
            options,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Start (or restart) a pass over the register.
    pub fn batches(&self) -> Result<BatchIter<'_>> {
        let mut reader = open_with_retry(&self.path, self.options.open_retries)?;
        // Skip the header row so records() yields data records only.
        reader.headers().map_err(|e| read_error(&self.path, e))?;
        Ok(BatchIter {
            source: self,
            reader,
            next_index: 0,
            rows_read: 0,
            done: false,
        })
    }
}

/// Iterator over register batches. Fused: after an error or the final
/// partial batch it yields `None`.
pub struct BatchIter<'a> {
    source: &'a CsvSource,
    reader: csv::Reader<std::fs::File>,
    next_index: usize,
    rows_read: u64,
    done: bool,
}

impl BatchIter<'_> {
    fn read_batch(&mut self) -> Result<Option<Batch>> {
        let field_count = self.source.fields.len();
        let mut columns: Vec<Vec<String>> = vec![Vec::new(); field_count];

        let mut rows = 0usize;
        let mut record = csv::StringRecord::new();
        while rows < self.source.options.batch_size {
            let more = self
                .reader
                .read_record(&mut record)
                .map_err(|e| read_error(&self.source.path, e))?;
            if !more {
                break;
            }
            for (slot, column_idx) in self.source.column_map.iter().enumerate() {
                let value = column_idx
                    .and_then(|idx| record.get(idx))
                    .unwrap_or_default()
                    .trim();
                columns[slot].push(value.to_string());
            }
            rows += 1;
        }

        if rows == 0 {
            return Ok(None);
        }

        let series: Vec<Column> = self
            .source
            .fields
            .iter()
            .zip(columns)
            .map(|(field, values)| Series::new(field.as_str().into(), values).into())
            .collect();
        let df = DataFrame::new(series).map_err(|e| {
            ValidationError::source_read(self.source.path.display().to_string(), e)
        })?;

        let batch = Batch {
            index: self.next_index,
            row_start: self.rows_read,
            df,
        };
        self.next_index += 1;
        self.rows_read += rows as u64;
        tracing::debug!(
            batch = batch.index,
            rows,
            total = self.rows_read,
            "read register batch"
        );
        Ok(Some(batch))
    }
}

impl Iterator for BatchIter<'_> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_batch() {
            Ok(Some(batch)) => {
                if batch.height() < self.source.options.batch_size {
                    self.done = true;
                }
                Some(Ok(batch))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn open_with_retry(path: &Path, retries: u32) -> Result<csv::Reader<std::fs::File>> {
    let attempts = retries.max(1);
    let mut last: Option<csv::Error> = None;
    for attempt in 1..=attempts {
        match csv::ReaderBuilder::new().has_headers(true).from_path(path) {
            Ok(reader) => return Ok(reader),
            Err(e) => {
                if !is_transient(&e) {
                    return Err(read_error(path, e));
                }
                tracing::warn!(
                    path = %path.display(),
                    attempt,
                    error = %e,
                    "transient error opening source"
                );
                last = Some(e);
            }
        }
    }
    let message = last.map(|e| e.to_string()).unwrap_or_default();
    Err(ValidationError::UpstreamFetch {
        path: path.display().to_string(),
        attempts,
        message,
    })
}

/// Missing or unreadable files are permanent source faults; other I/O
/// errors (interrupted reads, exhausted descriptors) are worth retrying.
fn is_transient(error: &csv::Error) -> bool {
    match error.kind() {
        csv::ErrorKind::Io(io_err) => !matches!(
            io_err.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
        ),
        _ => false,
    }
}

fn read_error(path: &Path, error: csv::Error) -> ValidationError {
    ValidationError::source_read(path.display().to_string(), error)
}
