//! Pooling of infrequent categorical levels
//!
//! Levels whose reference frequency falls below the threshold are merged into
//! a single catch-all level. Levels never seen at fit time are merged too.

use std::collections::{BTreeMap, HashSet};

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Apply, Fit, FitContext};
use crate::error::{PipelineError, RangeWarning, Result};
use crate::pipeline::dataset::{apply_nominal, fit_nominal, string_column, FrameEdit};
use crate::pipeline::selector::Selector;

/// Default minimum relative frequency for a level to be kept
pub const DEFAULT_THRESHOLD: f64 = 0.05;

/// Default name of the catch-all level
pub const DEFAULT_OTHER: &str = "other";

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_other() -> String {
    DEFAULT_OTHER.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RarePoolSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub columns: Selector,
    /// Below 1: minimum share of non-null rows. 1 or above: minimum row count.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_other")]
    pub other: String,
}

impl RarePoolSpec {
    pub fn new(columns: Selector) -> Self {
        Self {
            id: None,
            columns,
            threshold: DEFAULT_THRESHOLD,
            other: default_other(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn other(mut self, other: impl Into<String>) -> Self {
        self.other = other.into();
        self
    }

    fn keeps(&self, count: usize, total: usize) -> bool {
        if self.threshold < 1.0 {
            count as f64 / total as f64 >= self.threshold
        } else {
            count as f64 >= self.threshold
        }
    }
}

/// Retained and pooled levels of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PooledLevels {
    pub column: String,
    pub retained: Vec<String>,
    pub pooled: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedRarePool {
    pub id: String,
    pub other: String,
    pub levels: Vec<PooledLevels>,
}

impl Fit for RarePoolSpec {
    type Fitted = FittedRarePool;

    fn validate(&self, step: &str) -> Result<()> {
        if self.threshold <= 0.0 || !self.threshold.is_finite() {
            return Err(PipelineError::Configuration(format!(
                "Step '{}': threshold must be a positive number, got {}",
                step, self.threshold
            )));
        }
        if self.other.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "Step '{}': the pooled level name must not be empty",
                step
            )));
        }
        Ok(())
    }

    fn fit(&self, df: &DataFrame, ctx: &FitContext<'_>) -> Result<FittedRarePool> {
        let columns = self.columns.resolve(df, ctx.roles, ctx.step)?;
        let mut levels = Vec::with_capacity(columns.len());

        for column in columns {
            let values = fit_nominal(df, ctx.step, &column)?;

            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            for value in values.into_iter().flatten() {
                *counts.entry(value).or_insert(0) += 1;
            }
            let total: usize = counts.values().sum();

            let (retained, pooled): (Vec<_>, Vec<_>) = counts
                .into_iter()
                .partition(|(_, count)| self.keeps(*count, total));
            let retained: Vec<String> = retained.into_iter().map(|(level, _)| level).collect();
            let pooled: Vec<String> = pooled.into_iter().map(|(level, _)| level).collect();

            if retained.contains(&self.other) {
                return Err(PipelineError::Configuration(format!(
                    "Step '{}': column '{}' already has a frequent level named '{}'",
                    ctx.step, column, self.other
                )));
            }

            debug!(
                step = ctx.step,
                column = %column,
                retained = retained.len(),
                pooled = pooled.len(),
                "fitted rare-level pooling"
            );
            levels.push(PooledLevels {
                column,
                retained,
                pooled,
            });
        }

        Ok(FittedRarePool {
            id: ctx.step.to_string(),
            other: self.other.clone(),
            levels,
        })
    }
}

impl Apply for FittedRarePool {
    fn id(&self) -> &str {
        &self.id
    }

    fn inputs(&self) -> Vec<&str> {
        self.levels.iter().map(|l| l.column.as_str()).collect()
    }

    fn outputs(&self) -> Vec<&str> {
        Vec::new()
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self
            .levels
            .iter()
            .map(|l| {
                format!(
                    "{} (kept {}, pooled {} into '{}')",
                    l.column,
                    l.retained.len(),
                    l.pooled.len(),
                    self.other
                )
            })
            .collect();
        parts.join("; ")
    }

    fn apply(&self, df: &DataFrame, _warnings: &mut Vec<RangeWarning>) -> Result<DataFrame> {
        let mut edit = FrameEdit::new(df);

        for entry in &self.levels {
            let keep: HashSet<&str> = entry.retained.iter().map(|s| s.as_str()).collect();
            let pooled: Vec<Option<String>> = apply_nominal(df, &self.id, &entry.column)?
                .into_iter()
                .map(|v| {
                    v.map(|level| {
                        if keep.contains(level.as_str()) {
                            level
                        } else {
                            self.other.clone()
                        }
                    })
                })
                .collect();
            edit.replace(string_column(&entry.column, pooled));
        }

        edit.finish()
    }
}
