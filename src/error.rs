//! Error and warning types for pipeline operations.
//!
//! Every fallible library operation returns [`PipelineError`]. Conditions that
//! must not abort an `apply` call are reported as [`RangeWarning`] values
//! instead and returned next to the transformed data.

use std::fmt;

use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building, fitting or applying a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad step configuration or a selector that resolves to nothing.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The reference data is unusable for a step.
    #[error("Step '{step}' could not be fit: {reason}")]
    Fit { step: String, reason: String },

    /// An input column a fitted step expects is missing or changed type.
    #[error("Step '{step}' expects column '{column}': {reason}")]
    SchemaMismatch {
        step: String,
        column: String,
        reason: String,
    },

    /// A column has zero spread in the reference data and cannot be scaled.
    #[error("Step '{step}': column '{column}' has zero standard deviation in the reference data")]
    DegenerateColumn { step: String, column: String },

    /// A transform received values outside its mathematical domain.
    #[error("Step '{step}': column '{column}' contains {count} value(s) outside the domain of the transform")]
    Domain {
        step: String,
        column: String,
        count: usize,
    },

    /// Fitted state was required but is not available.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub(crate) fn fit(step: &str, reason: impl Into<String>) -> Self {
        PipelineError::Fit {
            step: step.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing_column(step: &str, column: &str) -> Self {
        PipelineError::SchemaMismatch {
            step: step.to_string(),
            column: column.to_string(),
            reason: "column is missing from the input".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// What kind of out-of-range input triggered a warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Numeric values fell outside the range observed at fit time.
    Extrapolation {
        count: usize,
        fit_min: f64,
        fit_max: f64,
    },
    /// Categorical levels that were never seen at fit time.
    UnseenLevels { levels: Vec<String> },
}

/// A non-fatal apply-time condition. The apply call still completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeWarning {
    pub step: String,
    pub column: String,
    pub kind: WarningKind,
}

impl fmt::Display for RangeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarningKind::Extrapolation {
                count,
                fit_min,
                fit_max,
            } => write!(
                f,
                "Step '{}': {} value(s) of '{}' outside the fitted range [{}, {}]",
                self.step, count, self.column, fit_min, fit_max
            ),
            WarningKind::UnseenLevels { levels } => write!(
                f,
                "Step '{}': column '{}' has level(s) not seen at fit time: {}",
                self.step,
                self.column,
                levels.join(", ")
            ),
        }
    }
}
