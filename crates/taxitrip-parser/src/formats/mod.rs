mod common;
mod csv_table;
mod json_lines;
pub mod schema;

pub use csv_table::{parse_trip_csv, TripCsvReader, DEFAULT_CHUNK_SIZE};
pub use json_lines::parse_trip_json_lines;

pub(crate) use common::{
    index_columns, is_missing, names_trip_column, parse_timestamp, record_from_row,
};
