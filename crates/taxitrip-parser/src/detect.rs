use csv::StringRecord;

use crate::errors::{ParserAttempt, SchemaError};
use crate::formats::{names_trip_column, parse_trip_csv, parse_trip_json_lines};
use crate::model::TripRecord;

/// Layouts a trip file can arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    JsonLines,
    Csv,
}

impl InputFormat {
    pub fn label(self) -> &'static str {
        match self {
            InputFormat::JsonLines => "JSON_LINES",
            InputFormat::Csv => "CSV_TABLE",
        }
    }

    /// Decides the layout from the first non-blank line. `Ok(None)` means the
    /// input holds nothing but whitespace.
    pub fn detect(content: &str) -> Result<Option<Self>, SchemaError> {
        let Some(first) = content.lines().find(|line| !line.trim().is_empty()) else {
            return Ok(None);
        };

        let mut attempts = Vec::with_capacity(2);
        for format in [InputFormat::JsonLines, InputFormat::Csv] {
            match format.check_first_line(first) {
                Ok(()) => return Ok(Some(format)),
                Err(reason) => attempts.push(ParserAttempt::new(format.label(), reason)),
            }
        }
        Err(SchemaError::NoMatchingParser { attempts })
    }

    fn check_first_line(self, line: &str) -> Result<(), String> {
        match self {
            InputFormat::JsonLines => {
                if line.trim_start().starts_with('{') {
                    Ok(())
                } else {
                    Err("first non-blank line is not a JSON object".to_string())
                }
            }
            InputFormat::Csv => {
                let mut reader = csv::ReaderBuilder::new()
                    .has_headers(false)
                    .from_reader(line.as_bytes());
                let header: StringRecord = match reader.records().next() {
                    Some(Ok(record)) => record,
                    Some(Err(err)) => return Err(err.to_string()),
                    None => return Err("no header row".to_string()),
                };
                if names_trip_column(&header) {
                    Ok(())
                } else {
                    Err("header row does not name any trip column".to_string())
                }
            }
        }
    }
}

/// Parses CSV or JSON-lines text, whichever the content turns out to be.
/// Whitespace-only input is an empty batch.
pub fn parse_trip_file(content: &str) -> Result<Vec<TripRecord>, SchemaError> {
    match InputFormat::detect(content)? {
        Some(InputFormat::JsonLines) => parse_trip_json_lines(content),
        Some(InputFormat::Csv) => parse_trip_csv(content),
        None => Ok(Vec::new()),
    }
}
