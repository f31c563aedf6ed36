//! Logarithmic transform of numeric columns
//!
//! `log_base(x + offset)` in place. The step learns nothing from the data
//! beyond the resolved columns, but the reference data is checked against the
//! domain at fit time so a bad recipe fails early.

use std::f64::consts::E;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Apply, Fit, FitContext};
use crate::error::{PipelineError, RangeWarning, Result};
use crate::pipeline::dataset::{apply_numeric, fit_numeric, float_column, FrameEdit};
use crate::pipeline::selector::Selector;

fn default_base() -> f64 {
    E
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub columns: Selector,
    #[serde(default = "default_base")]
    pub base: f64,
    /// Added to every value before taking the log
    #[serde(default)]
    pub offset: f64,
}

impl LogSpec {
    pub fn new(columns: Selector) -> Self {
        Self {
            id: None,
            columns,
            base: E,
            offset: 0.0,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn base(mut self, base: f64) -> Self {
        self.base = base;
        self
    }

    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedLog {
    pub id: String,
    pub columns: Vec<String>,
    pub base: f64,
    pub offset: f64,
}

impl FittedLog {
    fn log(&self, x: f64) -> f64 {
        let shifted = x + self.offset;
        if self.base == 10.0 {
            shifted.log10()
        } else if self.base == 2.0 {
            shifted.log2()
        } else if self.base == E {
            shifted.ln()
        } else {
            shifted.ln() / self.base.ln()
        }
    }
}

/// Count values whose shifted value is not strictly positive.
fn out_of_domain(values: &[Option<f64>], offset: f64) -> usize {
    values
        .iter()
        .flatten()
        .map(|x| x + offset)
        .filter(|shifted| *shifted <= 0.0 || shifted.is_nan())
        .count()
}

impl Fit for LogSpec {
    type Fitted = FittedLog;

    fn validate(&self, step: &str) -> Result<()> {
        if self.base <= 0.0 || self.base == 1.0 || !self.base.is_finite() {
            return Err(PipelineError::Configuration(format!(
                "Step '{}': log base must be positive and not 1, got {}",
                step, self.base
            )));
        }
        if !self.offset.is_finite() {
            return Err(PipelineError::Configuration(format!(
                "Step '{}': log offset must be finite",
                step
            )));
        }
        Ok(())
    }

    fn fit(&self, df: &DataFrame, ctx: &FitContext<'_>) -> Result<FittedLog> {
        let columns = self.columns.resolve(df, ctx.roles, ctx.step)?;

        for column in &columns {
            let values = fit_numeric(df, ctx.step, column)?;
            let count = out_of_domain(&values, self.offset);
            if count > 0 {
                return Err(PipelineError::Domain {
                    step: ctx.step.to_string(),
                    column: column.clone(),
                    count,
                });
            }
        }

        debug!(
            step = ctx.step,
            columns = columns.len(),
            base = self.base,
            offset = self.offset,
            "fitted log transform"
        );
        Ok(FittedLog {
            id: ctx.step.to_string(),
            columns,
            base: self.base,
            offset: self.offset,
        })
    }
}

impl Apply for FittedLog {
    fn id(&self) -> &str {
        &self.id
    }

    fn inputs(&self) -> Vec<&str> {
        self.columns.iter().map(|s| s.as_str()).collect()
    }

    fn outputs(&self) -> Vec<&str> {
        Vec::new()
    }

    fn describe(&self) -> String {
        let base = if self.base == E {
            "e".to_string()
        } else {
            format!("{}", self.base)
        };
        if self.offset == 0.0 {
            format!("{} (base {})", self.columns.join(", "), base)
        } else {
            format!(
                "{} (base {}, offset {})",
                self.columns.join(", "),
                base,
                self.offset
            )
        }
    }

    fn apply(&self, df: &DataFrame, _warnings: &mut Vec<RangeWarning>) -> Result<DataFrame> {
        let mut edit = FrameEdit::new(df);

        for column in &self.columns {
            let values = apply_numeric(df, &self.id, column)?;
            let count = out_of_domain(&values, self.offset);
            if count > 0 {
                return Err(PipelineError::Domain {
                    step: self.id.clone(),
                    column: column.clone(),
                    count,
                });
            }
            let logged: Vec<Option<f64>> = values
                .into_iter()
                .map(|v| v.map(|x| self.log(x)))
                .collect();
            edit.replace(float_column(column, logged));
        }

        edit.finish()
    }
}
