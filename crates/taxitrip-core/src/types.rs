// crates/taxitrip-core/src/types.rs

use std::fmt;

use serde::{Deserialize, Serialize};

pub use taxitrip_parser::TripRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeCategory {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl TimeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeCategory::Night => "Night",
            TimeCategory::Morning => "Morning",
            TimeCategory::Afternoon => "Afternoon",
            TimeCategory::Evening => "Evening",
        }
    }
}

impl fmt::Display for TimeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TimeCategory {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Night" => Ok(TimeCategory::Night),
            "Morning" => Ok(TimeCategory::Morning),
            "Afternoon" => Ok(TimeCategory::Afternoon),
            "Evening" => Ok(TimeCategory::Evening),
            other => Err(format!("unknown time category '{other}'")),
        }
    }
}

/// Calendar fields taken from the pickup timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalFields {
    pub hour: u32,
    /// English weekday name, e.g. "Friday".
    pub day_name: String,
    pub month: u32,
    /// Monday = 0 .. Sunday = 6.
    pub day_of_week: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripFeatures {
    pub pickup_hour: u32,
    pub pickup_day: String,
    pub pickup_month: u32,
    pub pickup_dayofweek: u32,
    pub is_rush_hour: bool,
    pub is_weekend: bool,
    /// Miles.
    pub trip_distance: f64,
    /// Miles per hour.
    pub average_speed: f64,
    pub time_category: TimeCategory,
}

/// A validated record with its derived fields appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTrip {
    #[serde(flatten)]
    pub record: TripRecord,
    #[serde(flatten)]
    pub features: TripFeatures,
}
