// =============================================================================
// Pipeline error taxonomy
// =============================================================================
//
// Only `Schema` aborts a run. Instrument-level variants are caught by the
// pipeline, logged, and recorded as failures while the other instruments carry
// on.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("missing required columns {missing:?} (available: {available:?})")]
    Schema {
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("{instrument_id}: empty price series")]
    EmptySeries { instrument_id: String },

    #[error("{instrument_id}: dates not strictly increasing at {date}")]
    NonMonotonicDates {
        instrument_id: String,
        date: NaiveDate,
    },

    #[error("{instrument_id}: invalid close {close} on {date}")]
    InvalidClose {
        instrument_id: String,
        date: NaiveDate,
        close: f64,
    },
}

impl PipelineError {
    /// Instrument the error is scoped to, `None` for run-wide errors.
    pub fn instrument_id(&self) -> Option<&str> {
        match self {
            Self::Schema { .. } => None,
            Self::EmptySeries { instrument_id }
            | Self::NonMonotonicDates { instrument_id, .. }
            | Self::InvalidClose { instrument_id, .. } => Some(instrument_id),
        }
    }
}
