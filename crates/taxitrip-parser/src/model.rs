use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One taxi ride as it appears in the raw dataset.
///
/// Timestamps are local New York wall-clock times without an offset, exactly as
/// the public trip-duration dataset publishes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub vendor_id: String,
    pub pickup_datetime: NaiveDateTime,
    pub dropoff_datetime: NaiveDateTime,
    pub passenger_count: i32,
    pub pickup_longitude: f64,
    pub pickup_latitude: f64,
    pub dropoff_longitude: f64,
    pub dropoff_latitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_and_fwd_flag: Option<String>,
    /// Seconds.
    pub trip_duration: i64,
}

impl TripRecord {
    pub fn pickup(&self) -> (f64, f64) {
        (self.pickup_latitude, self.pickup_longitude)
    }

    pub fn dropoff(&self) -> (f64, f64) {
        (self.dropoff_latitude, self.dropoff_longitude)
    }
}
