//! Centering and scaling of numeric columns
//!
//! Standard deviations use the sample convention (n - 1 denominator), so a
//! rescaled reference column has mean 0 and sample standard deviation 1.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{default_true, Apply, Fit, FitContext};
use crate::error::{PipelineError, RangeWarning, Result};
use crate::pipeline::dataset::{apply_numeric, fit_numeric, float_column, FrameEdit};
use crate::pipeline::selector::Selector;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescaleSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub columns: Selector,
    /// Subtract the reference mean
    #[serde(default = "default_true")]
    pub center: bool,
    /// Divide by the reference standard deviation
    #[serde(default = "default_true")]
    pub scale: bool,
}

impl RescaleSpec {
    pub fn new(columns: Selector) -> Self {
        Self {
            id: None,
            columns,
            center: true,
            scale: true,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn center_only(mut self) -> Self {
        self.center = true;
        self.scale = false;
        self
    }

    pub fn scale_only(mut self) -> Self {
        self.center = false;
        self.scale = true;
        self
    }
}

/// Reference statistics for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub column: String,
    pub mean: f64,
    pub sd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedRescale {
    pub id: String,
    pub center: bool,
    pub scale: bool,
    pub stats: Vec<ColumnStats>,
}

impl Fit for RescaleSpec {
    type Fitted = FittedRescale;

    fn validate(&self, step: &str) -> Result<()> {
        if !self.center && !self.scale {
            return Err(PipelineError::Configuration(format!(
                "Step '{}': rescale must center, scale, or both",
                step
            )));
        }
        Ok(())
    }

    fn fit(&self, df: &DataFrame, ctx: &FitContext<'_>) -> Result<FittedRescale> {
        let columns = self.columns.resolve(df, ctx.roles, ctx.step)?;
        let mut stats = Vec::with_capacity(columns.len());

        for column in columns {
            let values: Vec<f64> = fit_numeric(df, ctx.step, &column)?
                .into_iter()
                .flatten()
                .collect();
            let (mean, sd) = mean_and_sd(&values);

            if self.scale && (values.len() < 2 || sd == 0.0 || !sd.is_finite()) {
                return Err(PipelineError::DegenerateColumn {
                    step: ctx.step.to_string(),
                    column,
                });
            }

            debug!(step = ctx.step, column = %column, mean, sd, "fitted rescale");
            stats.push(ColumnStats { column, mean, sd });
        }

        Ok(FittedRescale {
            id: ctx.step.to_string(),
            center: self.center,
            scale: self.scale,
            stats,
        })
    }
}

impl Apply for FittedRescale {
    fn id(&self) -> &str {
        &self.id
    }

    fn inputs(&self) -> Vec<&str> {
        self.stats.iter().map(|s| s.column.as_str()).collect()
    }

    fn outputs(&self) -> Vec<&str> {
        Vec::new()
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self
            .stats
            .iter()
            .map(|s| format!("{} (mean {:.4}, sd {:.4})", s.column, s.mean, s.sd))
            .collect();
        parts.join("; ")
    }

    fn apply(&self, df: &DataFrame, _warnings: &mut Vec<RangeWarning>) -> Result<DataFrame> {
        let mut edit = FrameEdit::new(df);

        for stat in &self.stats {
            let shift = if self.center { stat.mean } else { 0.0 };
            let divisor = if self.scale { stat.sd } else { 1.0 };
            let scaled: Vec<Option<f64>> = apply_numeric(df, &self.id, &stat.column)?
                .into_iter()
                .map(|v| v.map(|x| (x - shift) / divisor))
                .collect();
            edit.replace(float_column(&stat.column, scaled));
        }

        edit.finish()
    }
}

/// Mean and sample standard deviation. The deviation is 0 for fewer than two values.
fn mean_and_sd(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let ss: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
    (mean, (ss / (n - 1.0)).sqrt())
}
