use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::features::{FeatureEngineer, FEATURES_ADDED};
use crate::types::{EnrichedTrip, TripRecord};
use crate::validation::{RejectionReason, ValidationOutcome, ValidationStats, Validator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStats {
    #[serde(flatten)]
    pub validation: ValidationStats,
    pub features_added: Vec<String>,
}

/// Zero counts with the full feature list, the starting point for merging chunks.
impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new(ValidationStats::default())
    }
}

impl ProcessingStats {
    pub fn new(validation: ValidationStats) -> Self {
        Self {
            validation,
            features_added: FEATURES_ADDED.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Folds the stats of another chunk of the same input into this one.
    pub fn merge(&mut self, other: &ProcessingStats) {
        self.validation.merge(&other.validation);
        if self.features_added.is_empty() {
            self.features_added = other.features_added.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SingleTripOutcome {
    Enriched(Box<EnrichedTrip>),
    Rejected(Vec<RejectionReason>),
}

/// Validation followed by feature engineering over one in-memory batch.
///
/// Holds only configuration, so a single instance can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    validator: Validator,
    engineer: FeatureEngineer,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            validator: Validator::new(config.validation),
            engineer: FeatureEngineer::new(config.features),
        }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn engineer(&self) -> &FeatureEngineer {
        &self.engineer
    }

    /// Rule failures drop records and are counted; a feature computation failure
    /// aborts the whole batch.
    pub fn process(&self, records: Vec<TripRecord>) -> Result<(Vec<EnrichedTrip>, ProcessingStats)> {
        info!(records = records.len(), "Starting data processing");

        let (retained, validation) = self.validator.validate_dataset(records);
        info!(
            total_removed = validation.total_removed,
            final_count = validation.final_count,
            "Validation removed {} records",
            validation.total_removed
        );

        let enriched = retained
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                self.engineer
                    .engineer(record)
                    .map_err(|source| PipelineError::Computation { index, source })
            })
            .collect::<Result<Vec<_>>>()?;
        info!("Feature engineering completed");

        Ok((enriched, ProcessingStats::new(validation)))
    }

    /// Parses CSV or JSON-lines text and processes it. A schema error anywhere in
    /// the input aborts the batch before any rule is applied; input without data
    /// rows is an empty batch, as with `process(vec![])`.
    pub fn process_text(&self, content: &str) -> Result<(Vec<EnrichedTrip>, ProcessingStats)> {
        let records = taxitrip_parser::parse_trip_file(content)?;
        self.process(records)
    }

    /// Single-trip path: applies the strict checks, including timestamp ordering.
    pub fn process_single(&self, record: TripRecord) -> Result<SingleTripOutcome> {
        match self.validator.check_strict(&record) {
            ValidationOutcome::Accepted => {
                let enriched = self
                    .engineer
                    .engineer(record)
                    .map_err(|source| PipelineError::Computation { index: 0, source })?;
                Ok(SingleTripOutcome::Enriched(Box::new(enriched)))
            }
            ValidationOutcome::Rejected(reasons) => Ok(SingleTripOutcome::Rejected(reasons)),
        }
    }
}
