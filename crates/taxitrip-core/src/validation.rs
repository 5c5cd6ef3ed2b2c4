// crates/taxitrip-core/src/validation.rs

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ValidationRules;
use crate::types::TripRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    InvalidPassengers,
    InvalidDuration,
    InvalidCoordinates,
    InvalidTimestamps,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::InvalidPassengers => "invalid_passengers",
            RejectionReason::InvalidDuration => "invalid_duration",
            RejectionReason::InvalidCoordinates => "invalid_coordinates",
            RejectionReason::InvalidTimestamps => "invalid_timestamps",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted,
    /// Every failed predicate, in check order. Never empty.
    Rejected(Vec<RejectionReason>),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted)
    }

    pub fn reasons(&self) -> &[RejectionReason] {
        match self {
            ValidationOutcome::Accepted => &[],
            ValidationOutcome::Rejected(reasons) => reasons,
        }
    }

    fn from_reasons(reasons: Vec<RejectionReason>) -> Self {
        if reasons.is_empty() {
            ValidationOutcome::Accepted
        } else {
            ValidationOutcome::Rejected(reasons)
        }
    }
}

/// Per-predicate failure counts over a batch.
///
/// The `invalid_*` counters overlap: a record failing two predicates is counted
/// by both but removed once, so `final_count + total_removed == original_count`
/// always holds while the counters may sum past `total_removed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStats {
    pub original_count: usize,
    pub invalid_passengers: usize,
    pub invalid_duration: usize,
    pub invalid_coordinates: usize,
    pub final_count: usize,
    pub total_removed: usize,
}

impl ValidationStats {
    pub fn merge(&mut self, other: &ValidationStats) {
        self.original_count += other.original_count;
        self.invalid_passengers += other.invalid_passengers;
        self.invalid_duration += other.invalid_duration;
        self.invalid_coordinates += other.invalid_coordinates;
        self.final_count += other.final_count;
        self.total_removed += other.total_removed;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RangeRule<T> {
    pub min: T,
    pub max: T,
}

/// Human-readable description of the active rules.
#[derive(Debug, Clone, Serialize)]
pub struct RulesReport {
    pub latitude_range: RangeRule<f64>,
    pub longitude_range: RangeRule<f64>,
    pub trip_duration_seconds: RangeRule<i64>,
    pub passengers: RangeRule<i32>,
    pub speed_limit_mph: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    rules: ValidationRules,
}

impl Validator {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Both bounds inclusive.
    pub fn validate_coordinates(&self, lat: f64, lon: f64) -> bool {
        let (lat_min, lat_max) = self.rules.latitude_bounds;
        let (lon_min, lon_max) = self.rules.longitude_bounds;
        (lat_min..=lat_max).contains(&lat) && (lon_min..=lon_max).contains(&lon)
    }

    pub fn validate_trip_duration(&self, seconds: i64) -> bool {
        (self.rules.min_trip_duration_s..=self.rules.max_trip_duration_s).contains(&seconds)
    }

    pub fn validate_passenger_count(&self, count: i32) -> bool {
        let (min, max) = self.rules.passenger_range;
        (min..=max).contains(&count)
    }

    pub fn validate_timestamps(&self, pickup: NaiveDateTime, dropoff: NaiveDateTime) -> bool {
        pickup < dropoff
    }

    /// The bulk predicates: passengers, duration, pickup and dropoff coordinates.
    /// Timestamp ordering is not part of this check.
    pub fn check(&self, record: &TripRecord) -> ValidationOutcome {
        ValidationOutcome::from_reasons(self.bulk_reasons(record))
    }

    /// [`Validator::check`] plus pickup-before-dropoff ordering.
    pub fn check_strict(&self, record: &TripRecord) -> ValidationOutcome {
        let mut reasons = self.bulk_reasons(record);
        if !self.validate_timestamps(record.pickup_datetime, record.dropoff_datetime) {
            reasons.push(RejectionReason::InvalidTimestamps);
        }
        ValidationOutcome::from_reasons(reasons)
    }

    fn bulk_reasons(&self, record: &TripRecord) -> Vec<RejectionReason> {
        let mut reasons = Vec::new();
        if !self.validate_passenger_count(record.passenger_count) {
            reasons.push(RejectionReason::InvalidPassengers);
        }
        if !self.validate_trip_duration(record.trip_duration) {
            reasons.push(RejectionReason::InvalidDuration);
        }
        let pickup_ok = self.validate_coordinates(record.pickup_latitude, record.pickup_longitude);
        let dropoff_ok =
            self.validate_coordinates(record.dropoff_latitude, record.dropoff_longitude);
        if !(pickup_ok && dropoff_ok) {
            reasons.push(RejectionReason::InvalidCoordinates);
        }
        reasons
    }

    /// Keeps the records that pass every bulk predicate, in their original order.
    pub fn validate_dataset(&self, records: Vec<TripRecord>) -> (Vec<TripRecord>, ValidationStats) {
        let original_count = records.len();
        let mut stats = ValidationStats {
            original_count,
            ..ValidationStats::default()
        };

        let mut retained = Vec::with_capacity(original_count);
        for record in records {
            match self.check(&record) {
                ValidationOutcome::Accepted => retained.push(record),
                ValidationOutcome::Rejected(reasons) => {
                    for reason in &reasons {
                        match reason {
                            RejectionReason::InvalidPassengers => stats.invalid_passengers += 1,
                            RejectionReason::InvalidDuration => stats.invalid_duration += 1,
                            RejectionReason::InvalidCoordinates => stats.invalid_coordinates += 1,
                            RejectionReason::InvalidTimestamps => {}
                        }
                    }
                    debug!(?reasons, vendor_id = %record.vendor_id, "trip rejected");
                }
            }
        }

        stats.final_count = retained.len();
        stats.total_removed = original_count - retained.len();
        (retained, stats)
    }

    pub fn rules_report(&self) -> RulesReport {
        let rules = &self.rules;
        RulesReport {
            latitude_range: RangeRule {
                min: rules.latitude_bounds.0,
                max: rules.latitude_bounds.1,
            },
            longitude_range: RangeRule {
                min: rules.longitude_bounds.0,
                max: rules.longitude_bounds.1,
            },
            trip_duration_seconds: RangeRule {
                min: rules.min_trip_duration_s,
                max: rules.max_trip_duration_s,
            },
            passengers: RangeRule {
                min: rules.passenger_range.0,
                max: rules.passenger_range.1,
            },
            speed_limit_mph: rules.max_speed_mph,
        }
    }
}
