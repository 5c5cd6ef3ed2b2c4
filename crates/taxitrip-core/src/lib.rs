pub mod config;
pub mod db;
pub mod error;
pub mod exploration;
pub mod features;
pub mod outputs;
pub mod pipeline;
pub mod repository;
pub mod types;
pub mod validation;

pub use config::{DatabaseSettings, FeatureSettings, PipelineConfig, ValidationRules};
pub use error::{ComputationError, ConfigError, PipelineError};
pub use features::{haversine_distance, FeatureEngineer, EARTH_RADIUS_MILES, FEATURES_ADDED};
pub use pipeline::{Pipeline, ProcessingStats, SingleTripOutcome};
pub use types::{EnrichedTrip, TimeCategory, TripFeatures, TripRecord};
pub use validation::{RejectionReason, ValidationOutcome, ValidationStats, Validator};
