mod detect;
pub mod errors;
pub mod formats;
pub mod model;

pub use detect::{parse_trip_file, InputFormat};
pub use errors::{ParserAttempt, SchemaError};
pub use formats::schema::{OPTIONAL_COLUMNS, REQUIRED_COLUMNS};
pub use formats::{parse_trip_csv, parse_trip_json_lines, TripCsvReader, DEFAULT_CHUNK_SIZE};
pub use model::TripRecord;

#[cfg(test)]
mod tests;
