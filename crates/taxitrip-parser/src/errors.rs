use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ParserAttempt {
    pub parser: &'static str,
    pub message: String,
}

impl ParserAttempt {
    pub fn new(parser: &'static str, message: impl Into<String>) -> Self {
        Self {
            parser,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParserAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.parser, self.message)
    }
}

/// Raised when raw input does not match the trip schema. Any schema error
/// aborts the batch it was found in.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{parser} format mismatch: {reason}")]
    FormatMismatch {
        parser: &'static str,
        reason: String,
    },

    #[error("required column '{column}' is missing from the header")]
    MissingColumn { column: &'static str },

    #[error("line {line}: required field '{field}' is missing")]
    MissingField { line: usize, field: &'static str },

    #[error("line {line}: field '{field}' has invalid value '{value}' (expected {expected})")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("line {line}: expected a JSON object")]
    NotAnObject { line: usize },

    #[error("CSV error: {source}")]
    Csv {
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: JSON error: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("no parser recognized this input; attempts: {attempts:?}")]
    NoMatchingParser { attempts: Vec<ParserAttempt> },
}

impl From<csv::Error> for SchemaError {
    fn from(source: csv::Error) -> Self {
        SchemaError::Csv { source }
    }
}
