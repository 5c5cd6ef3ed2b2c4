use std::io::Read;

use csv::StringRecordsIntoIter;

use crate::detect::InputFormat;
use crate::errors::SchemaError;
use crate::model::TripRecord;

use super::schema::ColumnIndex;
use super::{index_columns, names_trip_column, record_from_row};

/// Rows per chunk when streaming large files.
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(true).trim(csv::Trim::Headers);
    builder
}

/// Parses an entire headered CSV document into trip records. A header with
/// no data rows is an empty batch.
pub fn parse_trip_csv(content: &str) -> Result<Vec<TripRecord>, SchemaError> {
    let mut reader = TripCsvReader::new(content.as_bytes(), DEFAULT_CHUNK_SIZE)?;
    let mut records = Vec::new();
    while let Some(chunk) = reader.next_chunk()? {
        records.extend(chunk);
    }
    Ok(records)
}

/// Streams trip records out of a CSV source in bounded chunks.
///
/// A malformed row fails the chunk it belongs to; rows already returned in
/// earlier chunks are unaffected.
pub struct TripCsvReader<R: Read> {
    columns: ColumnIndex,
    rows: StringRecordsIntoIter<R>,
    chunk_size: usize,
    rows_read: usize,
}

impl<R: Read> TripCsvReader<R> {
    pub fn new(source: R, chunk_size: usize) -> Result<Self, SchemaError> {
        let mut reader = reader_builder().from_reader(source);
        let header = reader.headers()?.clone();
        if !names_trip_column(&header) {
            return Err(SchemaError::FormatMismatch {
                parser: InputFormat::Csv.label(),
                reason: "header row does not name any trip column".to_string(),
            });
        }
        let columns = index_columns(&header)?;

        Ok(Self {
            columns,
            rows: reader.into_records(),
            chunk_size: chunk_size.max(1),
            rows_read: 0,
        })
    }

    /// Number of data rows consumed so far.
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Returns `Ok(None)` once the source is exhausted.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<TripRecord>>, SchemaError> {
        let mut chunk = Vec::with_capacity(self.chunk_size.min(DEFAULT_CHUNK_SIZE));

        while chunk.len() < self.chunk_size {
            let Some(row) = self.rows.next() else {
                break;
            };
            let row = row?;
            // header occupies line 1
            let line = row
                .position()
                .map(|pos| pos.line() as usize)
                .unwrap_or(self.rows_read + 2);
            chunk.push(record_from_row(&self.columns, &row, line)?);
            self.rows_read += 1;
        }

        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some(chunk))
        }
    }
}

impl<R: Read> Iterator for TripCsvReader<R> {
    type Item = Result<Vec<TripRecord>, SchemaError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}
