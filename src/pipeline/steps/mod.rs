//! Pipeline steps
//!
//! Each step kind has an unfitted specification implementing [`Fit`] and a
//! fitted counterpart implementing [`Apply`]. Fitting never mutates the
//! specification; it produces a new immutable value holding the learned
//! parameters and the concrete column names the selector resolved to.
//!
//! [`StepSpec`] and [`FittedStep`] wrap the kinds so a pipeline can hold a
//! heterogeneous, serializable list of steps.

pub mod basis;
pub mod encode;
pub mod interact;
pub mod log;
pub mod rare_pool;
pub mod rescale;

pub use basis::{Basis, BasisSpec, ExpandedColumn, FittedBasis};
pub use encode::{EncodeSpec, EncodedColumn, FittedEncode, Indicator};
pub use interact::{FittedInteract, InteractSpec, Product};
pub use log::{FittedLog, LogSpec};
pub use rare_pool::{FittedRarePool, PooledLevels, RarePoolSpec};
pub use rescale::{ColumnStats, FittedRescale, RescaleSpec};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{RangeWarning, Result};
use crate::pipeline::selector::{Roles, Selector};

/// What a step sees while it is being fit.
#[derive(Debug, Clone, Copy)]
pub struct FitContext<'a> {
    /// Id of the step being fit, used in error messages and fitted output.
    pub step: &'a str,
    pub roles: &'a Roles,
}

/// Unfitted step: configuration only.
pub trait Fit {
    type Fitted: Apply;

    /// Check configuration that does not depend on data.
    fn validate(&self, step: &str) -> Result<()>;

    /// Learn parameters from the reference data seen by this step.
    fn fit(&self, df: &DataFrame, ctx: &FitContext<'_>) -> Result<Self::Fitted>;
}

/// Fitted step: a pure function of its input dataset.
pub trait Apply {
    fn id(&self) -> &str;

    /// Columns that must be present in any dataset this step is applied to.
    fn inputs(&self) -> Vec<&str>;

    /// Columns this step creates.
    fn outputs(&self) -> Vec<&str>;

    /// Short description of the learned parameters.
    fn describe(&self) -> String;

    fn apply(&self, df: &DataFrame, warnings: &mut Vec<RangeWarning>) -> Result<DataFrame>;
}

/// A step specification of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepSpec {
    Rescale(RescaleSpec),
    RarePool(RarePoolSpec),
    Encode(EncodeSpec),
    BasisExpand(BasisSpec),
    Interact(InteractSpec),
    Log(LogSpec),
}

impl StepSpec {
    pub fn rescale(columns: Selector) -> Self {
        StepSpec::Rescale(RescaleSpec::new(columns))
    }

    pub fn rare_pool(columns: Selector, threshold: f64) -> Self {
        StepSpec::RarePool(RarePoolSpec::new(columns).threshold(threshold))
    }

    pub fn encode(columns: Selector) -> Self {
        StepSpec::Encode(EncodeSpec::new(columns))
    }

    pub fn polynomial(columns: Selector, degree: usize) -> Self {
        StepSpec::BasisExpand(BasisSpec::new(columns, Basis::Polynomial { degree }))
    }

    pub fn natural_spline(columns: Selector, deg_free: usize) -> Self {
        StepSpec::BasisExpand(BasisSpec::new(columns, Basis::NaturalSpline { deg_free }))
    }

    pub fn interact(left: Selector, right: Selector) -> Self {
        StepSpec::Interact(InteractSpec::new(left, right))
    }

    pub fn log(columns: Selector, base: f64) -> Self {
        StepSpec::Log(LogSpec::new(columns).base(base))
    }

    /// Kind name used for generated step ids.
    pub fn kind_name(&self) -> &'static str {
        match self {
            StepSpec::Rescale(_) => "rescale",
            StepSpec::RarePool(_) => "rare_pool",
            StepSpec::Encode(_) => "encode",
            StepSpec::BasisExpand(_) => "basis_expand",
            StepSpec::Interact(_) => "interact",
            StepSpec::Log(_) => "log",
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            StepSpec::Rescale(s) => s.id.as_deref(),
            StepSpec::RarePool(s) => s.id.as_deref(),
            StepSpec::Encode(s) => s.id.as_deref(),
            StepSpec::BasisExpand(s) => s.id.as_deref(),
            StepSpec::Interact(s) => s.id.as_deref(),
            StepSpec::Log(s) => s.id.as_deref(),
        }
    }

    /// Set the id if none was given.
    pub(crate) fn ensure_id(&mut self, position: usize) {
        let generated = format!("{}_{}", self.kind_name(), position);
        let slot = match self {
            StepSpec::Rescale(s) => &mut s.id,
            StepSpec::RarePool(s) => &mut s.id,
            StepSpec::Encode(s) => &mut s.id,
            StepSpec::BasisExpand(s) => &mut s.id,
            StepSpec::Interact(s) => &mut s.id,
            StepSpec::Log(s) => &mut s.id,
        };
        if slot.is_none() {
            *slot = Some(generated);
        }
    }

    pub fn validate(&self, step: &str) -> Result<()> {
        match self {
            StepSpec::Rescale(s) => s.validate(step),
            StepSpec::RarePool(s) => s.validate(step),
            StepSpec::Encode(s) => s.validate(step),
            StepSpec::BasisExpand(s) => s.validate(step),
            StepSpec::Interact(s) => s.validate(step),
            StepSpec::Log(s) => s.validate(step),
        }
    }

    pub fn fit(&self, df: &DataFrame, ctx: &FitContext<'_>) -> Result<FittedStep> {
        let fitted = match self {
            StepSpec::Rescale(s) => FittedStep::Rescale(s.fit(df, ctx)?),
            StepSpec::RarePool(s) => FittedStep::RarePool(s.fit(df, ctx)?),
            StepSpec::Encode(s) => FittedStep::Encode(s.fit(df, ctx)?),
            StepSpec::BasisExpand(s) => FittedStep::BasisExpand(s.fit(df, ctx)?),
            StepSpec::Interact(s) => FittedStep::Interact(s.fit(df, ctx)?),
            StepSpec::Log(s) => FittedStep::Log(s.fit(df, ctx)?),
        };
        Ok(fitted)
    }
}

impl From<RescaleSpec> for StepSpec {
    fn from(spec: RescaleSpec) -> Self {
        StepSpec::Rescale(spec)
    }
}

impl From<RarePoolSpec> for StepSpec {
    fn from(spec: RarePoolSpec) -> Self {
        StepSpec::RarePool(spec)
    }
}

impl From<EncodeSpec> for StepSpec {
    fn from(spec: EncodeSpec) -> Self {
        StepSpec::Encode(spec)
    }
}

impl From<BasisSpec> for StepSpec {
    fn from(spec: BasisSpec) -> Self {
        StepSpec::BasisExpand(spec)
    }
}

impl From<InteractSpec> for StepSpec {
    fn from(spec: InteractSpec) -> Self {
        StepSpec::Interact(spec)
    }
}

impl From<LogSpec> for StepSpec {
    fn from(spec: LogSpec) -> Self {
        StepSpec::Log(spec)
    }
}

/// A fitted step of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedStep {
    Rescale(FittedRescale),
    RarePool(FittedRarePool),
    Encode(FittedEncode),
    BasisExpand(FittedBasis),
    Interact(FittedInteract),
    Log(FittedLog),
}

impl FittedStep {
    fn inner(&self) -> &dyn Apply {
        match self {
            FittedStep::Rescale(s) => s as &dyn Apply,
            FittedStep::RarePool(s) => s as &dyn Apply,
            FittedStep::Encode(s) => s as &dyn Apply,
            FittedStep::BasisExpand(s) => s as &dyn Apply,
            FittedStep::Interact(s) => s as &dyn Apply,
            FittedStep::Log(s) => s as &dyn Apply,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            FittedStep::Rescale(_) => "rescale",
            FittedStep::RarePool(_) => "rare_pool",
            FittedStep::Encode(_) => "encode",
            FittedStep::BasisExpand(_) => "basis_expand",
            FittedStep::Interact(_) => "interact",
            FittedStep::Log(_) => "log",
        }
    }
}

impl Apply for FittedStep {
    fn id(&self) -> &str {
        self.inner().id()
    }

    fn inputs(&self) -> Vec<&str> {
        self.inner().inputs()
    }

    fn outputs(&self) -> Vec<&str> {
        self.inner().outputs()
    }

    fn describe(&self) -> String {
        self.inner().describe()
    }

    fn apply(&self, df: &DataFrame, warnings: &mut Vec<RangeWarning>) -> Result<DataFrame> {
        self.inner().apply(df, warnings)
    }
}

pub(crate) fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_id_keeps_explicit_id() {
        let mut spec: StepSpec = RescaleSpec::new(Selector::name("x")).id("scale_x").into();
        spec.ensure_id(3);
        assert_eq!(spec.id(), Some("scale_x"));

        let mut spec = StepSpec::encode(Selector::name("n"));
        spec.ensure_id(2);
        assert_eq!(spec.id(), Some("encode_2"));
    }

    #[test]
    fn test_step_spec_json_tagging() {
        let json = r#"{"kind": "rare_pool", "columns": {"by_name": ["Neighborhood"]}, "threshold": 0.01}"#;
        let spec: StepSpec = serde_json::from_str(json).unwrap();
        match spec {
            StepSpec::RarePool(inner) => {
                assert_eq!(inner.threshold, 0.01);
                assert_eq!(inner.other, "other");
            }
            other => panic!("Expected RarePool, got {:?}", other),
        }
    }

    #[test]
    fn test_basis_json_tagging() {
        let json = r#"{"kind": "basis_expand", "columns": {"by_name": ["Latitude"]}, "basis": {"type": "natural_spline", "deg_free": 4}}"#;
        let spec: StepSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec, StepSpec::natural_spline(Selector::name("Latitude"), 4));
    }
}
