//! Pairwise interaction terms
//!
//! Appends the product of each (left, right) column pair. Nothing is learned
//! except the resolved pairs and their output names.

use std::collections::HashSet;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Apply, Fit, FitContext};
use crate::error::{PipelineError, RangeWarning, Result};
use crate::pipeline::dataset::{
    apply_numeric, float_column, unique_name, ColumnType, FrameEdit,
};
use crate::pipeline::selector::Selector;

/// Default separator between the two column names of a product
pub const DEFAULT_SEPARATOR: &str = "_x_";

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub left: Selector,
    pub right: Selector,
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl InteractSpec {
    pub fn new(left: Selector, right: Selector) -> Self {
        Self {
            id: None,
            left,
            right,
            separator: default_separator(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

/// One interaction column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub left: String,
    pub right: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedInteract {
    pub id: String,
    pub products: Vec<Product>,
}

impl Fit for InteractSpec {
    type Fitted = FittedInteract;

    fn validate(&self, step: &str) -> Result<()> {
        if self.separator.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "Step '{}': interaction separator must not be empty",
                step
            )));
        }
        Ok(())
    }

    fn fit(&self, df: &DataFrame, ctx: &FitContext<'_>) -> Result<FittedInteract> {
        let left = self.left.resolve(df, ctx.roles, ctx.step)?;
        let right = self.right.resolve(df, ctx.roles, ctx.step)?;

        for name in left.iter().chain(right.iter()) {
            let dtype = df.column(name)?.dtype();
            if ColumnType::of(dtype) != Some(ColumnType::Numeric) {
                return Err(PipelineError::fit(
                    ctx.step,
                    format!(
                        "column '{}' must be numeric to form interactions, found {}",
                        name, dtype
                    ),
                ));
            }
        }

        let mut taken: HashSet<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut products = Vec::new();

        for l in &left {
            for r in &right {
                if l == r {
                    continue;
                }
                let key = if l < r {
                    (l.clone(), r.clone())
                } else {
                    (r.clone(), l.clone())
                };
                if !seen.insert(key) {
                    continue;
                }
                let name = unique_name(&format!("{}{}{}", l, self.separator, r), &taken);
                taken.insert(name.clone());
                products.push(Product {
                    left: l.clone(),
                    right: r.clone(),
                    name,
                });
            }
        }

        if products.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "Step '{}': selectors {} and {} produce no pairs of distinct columns",
                ctx.step, self.left, self.right
            )));
        }

        debug!(step = ctx.step, products = products.len(), "fitted interactions");
        Ok(FittedInteract {
            id: ctx.step.to_string(),
            products,
        })
    }
}

impl Apply for FittedInteract {
    fn id(&self) -> &str {
        &self.id
    }

    fn inputs(&self) -> Vec<&str> {
        let mut inputs: Vec<&str> = Vec::new();
        for p in &self.products {
            for name in [p.left.as_str(), p.right.as_str()] {
                if !inputs.contains(&name) {
                    inputs.push(name);
                }
            }
        }
        inputs
    }

    fn outputs(&self) -> Vec<&str> {
        self.products.iter().map(|p| p.name.as_str()).collect()
    }

    fn describe(&self) -> String {
        format!("{} product column(s)", self.products.len())
    }

    fn apply(&self, df: &DataFrame, _warnings: &mut Vec<RangeWarning>) -> Result<DataFrame> {
        let mut edit = FrameEdit::new(df);

        for product in &self.products {
            let left = apply_numeric(df, &self.id, &product.left)?;
            let right = apply_numeric(df, &self.id, &product.right)?;
            let values: Vec<Option<f64>> = left
                .iter()
                .zip(right.iter())
                .map(|(l, r)| match (l, r) {
                    (Some(l), Some(r)) => Some(l * r),
                    _ => None,
                })
                .collect();
            edit.append(&self.id, float_column(&product.name, values))?;
        }

        edit.finish()
    }
}
