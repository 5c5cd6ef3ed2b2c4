use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::config::FeatureSettings;
use crate::error::ComputationError;
use crate::types::{EnrichedTrip, TemporalFields, TimeCategory, TripFeatures, TripRecord};

const EARTH_RADIUS_KM: f64 = 6371.0;
const KM_TO_MILES: f64 = 0.621371;
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Mean Earth radius in miles. Agrees with `6371 km * 0.621371` to within 0.05 %.
pub const EARTH_RADIUS_MILES: f64 = 3959.87433;

/// Derived columns appended to every retained record, in report order.
pub const FEATURES_ADDED: [&str; 8] = [
    "pickup_hour",
    "pickup_day",
    "pickup_month",
    "is_rush_hour",
    "is_weekend",
    "trip_distance",
    "average_speed",
    "time_category",
];

/// Great-circle distance in miles between two points given in degrees.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    central_angle(lat1, lon1, lat2, lon2) * EARTH_RADIUS_KM * KM_TO_MILES
}

/// Same as [`haversine_distance`] but scaled by [`EARTH_RADIUS_MILES`].
pub fn haversine_distance_with_mile_radius(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    central_angle(lat1, lon1, lat2, lon2) * EARTH_RADIUS_MILES
}

fn central_angle(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

pub fn derive_temporal_fields(pickup: NaiveDateTime) -> TemporalFields {
    TemporalFields {
        hour: pickup.hour(),
        day_name: pickup.format("%A").to_string(),
        month: pickup.month(),
        day_of_week: pickup.weekday().num_days_from_monday(),
    }
}

/// Boundary hours 6, 12 and 18 open the later bucket.
pub fn time_category(hour: u32) -> Result<TimeCategory, ComputationError> {
    match hour {
        0..=5 => Ok(TimeCategory::Night),
        6..=11 => Ok(TimeCategory::Morning),
        12..=17 => Ok(TimeCategory::Afternoon),
        18..=23 => Ok(TimeCategory::Evening),
        other => Err(ComputationError::HourOutOfRange(other)),
    }
}

/// Miles per hour. Fails for durations the validator would never let through.
pub fn average_speed(distance_miles: f64, duration_seconds: i64) -> Result<f64, ComputationError> {
    match duration_seconds {
        0 => Err(ComputationError::ZeroDuration),
        d if d < 0 => Err(ComputationError::NegativeDuration(d)),
        d => Ok(distance_miles / (d as f64 / SECONDS_PER_HOUR)),
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    settings: FeatureSettings,
}

impl FeatureEngineer {
    pub fn new(settings: FeatureSettings) -> Self {
        Self { settings }
    }

    pub fn is_rush_hour(&self, hour: u32) -> bool {
        self.settings.rush_hours.contains(&hour)
    }

    pub fn is_weekend(&self, day_of_week: u32) -> bool {
        self.settings.weekend_days.contains(&day_of_week)
    }

    pub fn derive(&self, record: &TripRecord) -> Result<TripFeatures, ComputationError> {
        let temporal = derive_temporal_fields(record.pickup_datetime);
        let trip_distance = haversine_distance(
            record.pickup_latitude,
            record.pickup_longitude,
            record.dropoff_latitude,
            record.dropoff_longitude,
        );
        let average_speed = average_speed(trip_distance, record.trip_duration)?;

        Ok(TripFeatures {
            is_rush_hour: self.is_rush_hour(temporal.hour),
            is_weekend: self.is_weekend(temporal.day_of_week),
            time_category: time_category(temporal.hour)?,
            pickup_hour: temporal.hour,
            pickup_day: temporal.day_name,
            pickup_month: temporal.month,
            pickup_dayofweek: temporal.day_of_week,
            trip_distance,
            average_speed,
        })
    }

    /// Appends the derived fields; the input record is carried over unchanged.
    pub fn engineer(&self, record: TripRecord) -> Result<EnrichedTrip, ComputationError> {
        let features = self.derive(&record)?;
        Ok(EnrichedTrip { record, features })
    }
}
