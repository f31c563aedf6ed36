//! Basis expansion of numeric columns
//!
//! A numeric column is replaced by a fixed set of derived columns: raw
//! polynomial powers or a natural cubic spline basis. Knots and the reference
//! range are learned at fit time; values outside that range are still
//! expanded, with a [`RangeWarning`] per affected column.

use std::collections::HashSet;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Apply, Fit, FitContext};
use crate::error::{PipelineError, RangeWarning, Result, WarningKind};
use crate::pipeline::dataset::{
    apply_numeric, fit_numeric, float_column, quantile, unique_name, FrameEdit,
};
use crate::pipeline::selector::Selector;

/// Family of basis functions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Basis {
    /// `x, x^2, ..., x^degree`
    Polynomial { degree: usize },
    /// Natural cubic spline with `deg_free` basis columns
    NaturalSpline { deg_free: usize },
}

impl Basis {
    fn width(&self) -> usize {
        match self {
            Basis::Polynomial { degree } => *degree,
            Basis::NaturalSpline { deg_free } => *deg_free,
        }
    }

    fn output_name(&self, column: &str, k: usize) -> String {
        match self {
            Basis::Polynomial { .. } => format!("{}_poly_{}", column, k),
            Basis::NaturalSpline { .. } => format!("{}_ns_{:02}", column, k),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub columns: Selector,
    pub basis: Basis,
}

impl BasisSpec {
    pub fn new(columns: Selector, basis: Basis) -> Self {
        Self {
            id: None,
            columns,
            basis,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Learned parameters for one expanded column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedColumn {
    pub column: String,
    pub fit_min: f64,
    pub fit_max: f64,
    /// Boundary and interior knots, ascending. Empty for polynomials.
    pub knots: Vec<f64>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedBasis {
    pub id: String,
    pub basis: Basis,
    pub columns: Vec<ExpandedColumn>,
}

impl Fit for BasisSpec {
    type Fitted = FittedBasis;

    fn validate(&self, step: &str) -> Result<()> {
        match self.basis {
            Basis::Polynomial { degree: 0 } => Err(PipelineError::Configuration(format!(
                "Step '{}': polynomial degree must be at least 1",
                step
            ))),
            Basis::NaturalSpline { deg_free: 0 } => Err(PipelineError::Configuration(format!(
                "Step '{}': spline degrees of freedom must be at least 1",
                step
            ))),
            _ => Ok(()),
        }
    }

    fn fit(&self, df: &DataFrame, ctx: &FitContext<'_>) -> Result<FittedBasis> {
        let columns = self.columns.resolve(df, ctx.roles, ctx.step)?;
        let mut taken: HashSet<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut expanded = Vec::with_capacity(columns.len());

        for column in columns {
            let mut values: Vec<f64> = fit_numeric(df, ctx.step, &column)?
                .into_iter()
                .flatten()
                .collect();
            values.sort_by(|a, b| a.total_cmp(b));
            let fit_min = values[0];
            let fit_max = values[values.len() - 1];

            let knots = match self.basis {
                Basis::Polynomial { .. } => Vec::new(),
                Basis::NaturalSpline { deg_free } => {
                    let knots: Vec<f64> = (0..=deg_free)
                        .map(|j| quantile(&values, j as f64 / deg_free as f64))
                        .collect();
                    if knots.windows(2).any(|w| w[1] <= w[0]) {
                        return Err(PipelineError::fit(
                            ctx.step,
                            format!(
                                "column '{}' has too few distinct values for {} spline knots",
                                column,
                                knots.len()
                            ),
                        ));
                    }
                    knots
                }
            };

            let outputs: Vec<String> = (1..=self.basis.width())
                .map(|k| {
                    let name = unique_name(&self.basis.output_name(&column, k), &taken);
                    taken.insert(name.clone());
                    name
                })
                .collect();

            debug!(
                step = ctx.step,
                column = %column,
                fit_min,
                fit_max,
                knots = knots.len(),
                "fitted basis expansion"
            );
            expanded.push(ExpandedColumn {
                column,
                fit_min,
                fit_max,
                knots,
                outputs,
            });
        }

        Ok(FittedBasis {
            id: ctx.step.to_string(),
            basis: self.basis,
            columns: expanded,
        })
    }
}

impl Apply for FittedBasis {
    fn id(&self) -> &str {
        &self.id
    }

    fn inputs(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.column.as_str()).collect()
    }

    fn outputs(&self) -> Vec<&str> {
        self.columns
            .iter()
            .flat_map(|c| c.outputs.iter().map(|s| s.as_str()))
            .collect()
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| match self.basis {
                Basis::Polynomial { degree } => format!("{} (degree {})", c.column, degree),
                Basis::NaturalSpline { deg_free } => {
                    let knots: Vec<String> = c.knots.iter().map(|k| format!("{:.4}", k)).collect();
                    format!("{} ({} df, knots [{}])", c.column, deg_free, knots.join(", "))
                }
            })
            .collect();
        parts.join("; ")
    }

    fn apply(&self, df: &DataFrame, warnings: &mut Vec<RangeWarning>) -> Result<DataFrame> {
        let mut edit = FrameEdit::new(df);

        for entry in &self.columns {
            let values = apply_numeric(df, &self.id, &entry.column)?;

            let outside = values
                .iter()
                .flatten()
                .filter(|x| **x < entry.fit_min || **x > entry.fit_max)
                .count();
            if outside > 0 {
                let warning = RangeWarning {
                    step: self.id.clone(),
                    column: entry.column.clone(),
                    kind: WarningKind::Extrapolation {
                        count: outside,
                        fit_min: entry.fit_min,
                        fit_max: entry.fit_max,
                    },
                };
                warn!("{}", warning);
                warnings.push(warning);
            }

            let mut basis_columns: Vec<Vec<Option<f64>>> =
                vec![Vec::with_capacity(values.len()); entry.outputs.len()];
            for value in &values {
                match value {
                    Some(x) => {
                        let row = match self.basis {
                            Basis::Polynomial { degree } => polynomial_row(*x, degree),
                            Basis::NaturalSpline { .. } => natural_spline_row(*x, &entry.knots),
                        };
                        for (column, v) in basis_columns.iter_mut().zip(row) {
                            column.push(Some(v));
                        }
                    }
                    None => basis_columns.iter_mut().for_each(|c| c.push(None)),
                }
            }

            edit.drop(&entry.column);
            for (name, column) in entry.outputs.iter().zip(basis_columns) {
                edit.append(&self.id, float_column(name, column))?;
            }
        }

        edit.finish()
    }
}

fn polynomial_row(x: f64, degree: usize) -> Vec<f64> {
    (1..=degree as i32).map(|k| x.powi(k)).collect()
}

/// Truncated power basis of a natural cubic spline.
///
/// With knots `k_0 < ... < k_{K-1}` the basis is `x` followed by
/// `d_j(x) - d_{K-2}(x)` for `j = 0..K-2`, where
/// `d_j(x) = ((x - k_j)^3_+ - (x - k_{K-1})^3_+) / (k_{K-1} - k_j)`.
/// The result is linear beyond the boundary knots.
fn natural_spline_row(x: f64, knots: &[f64]) -> Vec<f64> {
    let last = knots.len() - 1;
    let cube = |v: f64| if v > 0.0 { v * v * v } else { 0.0 };
    let d = |j: usize| (cube(x - knots[j]) - cube(x - knots[last])) / (knots[last] - knots[j]);

    let mut row = Vec::with_capacity(last);
    row.push(x);
    if last >= 2 {
        let tail = d(last - 1);
        for j in 0..last - 1 {
            row.push(d(j) - tail);
        }
    }
    row
}
