/// Columns every trip row must carry, in dataset order.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "vendor_id",
    "pickup_datetime",
    "dropoff_datetime",
    "passenger_count",
    "pickup_longitude",
    "pickup_latitude",
    "dropoff_longitude",
    "dropoff_latitude",
    "trip_duration",
];

pub const OPTIONAL_COLUMNS: [&str; 2] = ["id", "store_and_fwd_flag"];

pub(crate) const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// Position of each known column inside a header row.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ColumnIndex {
    pub required: [usize; 9],
    pub id: Option<usize>,
    pub store_and_fwd_flag: Option<usize>,
}
