//! Dummy (indicator) encoding of nominal columns
//!
//! Each nominal column becomes one `f64` 0/1 column per non-baseline level.
//! The baseline is the first level in lexicographic order. Levels not seen at
//! fit time produce all-zero indicators and a [`RangeWarning`].

use std::collections::{BTreeSet, HashSet};

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Apply, Fit, FitContext};
use crate::error::{RangeWarning, Result, WarningKind};
use crate::pipeline::dataset::{
    apply_nominal, fit_nominal, float_column, sanitize_level, unique_name, FrameEdit,
};
use crate::pipeline::selector::Selector;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub columns: Selector,
    /// Emit an indicator for every level, baseline included
    #[serde(default)]
    pub one_hot: bool,
    /// Keep the original nominal column next to its indicators
    #[serde(default)]
    pub keep_original: bool,
}

impl EncodeSpec {
    pub fn new(columns: Selector) -> Self {
        Self {
            id: None,
            columns,
            one_hot: false,
            keep_original: false,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn one_hot(mut self, one_hot: bool) -> Self {
        self.one_hot = one_hot;
        self
    }

    pub fn keep_original(mut self, keep: bool) -> Self {
        self.keep_original = keep;
        self
    }
}

/// Output column for one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub level: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedColumn {
    pub column: String,
    /// All reference levels, sorted
    pub levels: Vec<String>,
    /// Level represented by all-zero indicators (absent for one-hot)
    pub baseline: Option<String>,
    pub indicators: Vec<Indicator>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedEncode {
    pub id: String,
    pub keep_original: bool,
    pub columns: Vec<EncodedColumn>,
}

impl Fit for EncodeSpec {
    type Fitted = FittedEncode;

    fn validate(&self, _step: &str) -> Result<()> {
        Ok(())
    }

    fn fit(&self, df: &DataFrame, ctx: &FitContext<'_>) -> Result<FittedEncode> {
        let columns = self.columns.resolve(df, ctx.roles, ctx.step)?;
        let mut taken: HashSet<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut encoded = Vec::with_capacity(columns.len());

        for column in columns {
            let levels: Vec<String> = fit_nominal(df, ctx.step, &column)?
                .into_iter()
                .flatten()
                .collect::<BTreeSet<String>>()
                .into_iter()
                .collect();

            let (baseline, indicator_levels) = if self.one_hot {
                (None, levels.as_slice())
            } else {
                (levels.first().cloned(), &levels[1..])
            };

            if indicator_levels.is_empty() {
                warn!(
                    step = ctx.step,
                    column = %column,
                    "column has a single level and produces no indicators"
                );
            }

            let mut indicators = Vec::with_capacity(indicator_levels.len());
            for level in indicator_levels {
                let name = unique_name(&format!("{}_{}", column, sanitize_level(level)), &taken);
                taken.insert(name.clone());
                indicators.push(Indicator {
                    level: level.clone(),
                    name,
                });
            }

            debug!(
                step = ctx.step,
                column = %column,
                levels = levels.len(),
                indicators = indicators.len(),
                "fitted encoding"
            );
            encoded.push(EncodedColumn {
                column,
                levels,
                baseline,
                indicators,
            });
        }

        Ok(FittedEncode {
            id: ctx.step.to_string(),
            keep_original: self.keep_original,
            columns: encoded,
        })
    }
}

impl Apply for FittedEncode {
    fn id(&self) -> &str {
        &self.id
    }

    fn inputs(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.column.as_str()).collect()
    }

    fn outputs(&self) -> Vec<&str> {
        self.columns
            .iter()
            .flat_map(|c| c.indicators.iter().map(|i| i.name.as_str()))
            .collect()
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| match &c.baseline {
                Some(baseline) => format!(
                    "{} ({} indicators, baseline '{}')",
                    c.column,
                    c.indicators.len(),
                    baseline
                ),
                None => format!("{} ({} indicators, one-hot)", c.column, c.indicators.len()),
            })
            .collect();
        parts.join("; ")
    }

    fn apply(&self, df: &DataFrame, warnings: &mut Vec<RangeWarning>) -> Result<DataFrame> {
        let mut edit = FrameEdit::new(df);

        for entry in &self.columns {
            let values = apply_nominal(df, &self.id, &entry.column)?;

            let known: HashSet<&str> = entry.levels.iter().map(|s| s.as_str()).collect();
            let unseen: BTreeSet<&str> = values
                .iter()
                .flatten()
                .map(|s| s.as_str())
                .filter(|s| !known.contains(s))
                .collect();
            if !unseen.is_empty() {
                let warning = RangeWarning {
                    step: self.id.clone(),
                    column: entry.column.clone(),
                    kind: WarningKind::UnseenLevels {
                        levels: unseen.iter().map(|s| s.to_string()).collect(),
                    },
                };
                warn!("{}", warning);
                warnings.push(warning);
            }

            for indicator in &entry.indicators {
                let flags: Vec<Option<f64>> = values
                    .iter()
                    .map(|v| {
                        v.as_ref()
                            .map(|level| if *level == indicator.level { 1.0 } else { 0.0 })
                    })
                    .collect();
                edit.append(&self.id, float_column(&indicator.name, flags))?;
            }

            if !self.keep_original {
                edit.drop(&entry.column);
            }
        }

        edit.finish()
    }
}
