// crates/taxitrip-core/src/error.rs

use taxitrip_parser::SchemaError;
use thiserror::Error;

/// A derived field hit an undefined numeric case.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputationError {
    #[error("average speed is undefined for a zero-second trip")]
    ZeroDuration,

    #[error("average speed is undefined for a negative duration ({0} s)")]
    NegativeDuration(i64),

    #[error("hour {0} is outside 0..=23")]
    HourOutOfRange(u32),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("feature computation failed for record {index}: {source}")]
    Computation {
        index: usize,
        #[source]
        source: ComputationError,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
