//! Pipeline assembly, fitting and application
//!
//! A [`Pipeline`] is an ordered list of step specifications. Fitting it on a
//! reference dataset produces a [`FittedPipeline`] in which every step was fit
//! on the output of the steps before it. The fitted pipeline is immutable and
//! can be applied to any number of new datasets.

use std::collections::HashSet;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, RangeWarning, Result};
use crate::pipeline::selector::{Role, Roles};
use crate::pipeline::steps::{Apply, FitContext, FittedStep, StepSpec};

/// Unfitted pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    roles: Roles,
    steps: Vec<StepSpec>,
    retain: bool,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            roles: Roles::new(),
            steps: Vec::new(),
            retain: true,
        }
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a role to a column.
    pub fn with_role(mut self, column: impl Into<String>, role: Role) -> Self {
        self.roles.assign(column, role);
        self
    }

    pub fn with_roles(mut self, roles: Roles) -> Self {
        self.roles = roles;
        self
    }

    /// Whether `fit` caches the transformed reference data.
    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    /// Append a step. Configuration is checked when the pipeline is fit.
    pub fn with(mut self, step: impl Into<StepSpec>) -> Self {
        let mut step = step.into();
        step.ensure_id(self.steps.len() + 1);
        self.steps.push(step);
        self
    }

    /// Append a step, checking its configuration immediately.
    pub fn add_step(&mut self, step: impl Into<StepSpec>) -> Result<()> {
        let mut step = step.into();
        step.ensure_id(self.steps.len() + 1);
        let id = step_id(&step);
        step.validate(id)?;
        if self.steps.iter().any(|s| s.id() == Some(id)) {
            return Err(PipelineError::Configuration(format!(
                "Duplicate step id '{}'",
                id
            )));
        }
        self.steps.push(step);
        Ok(())
    }

    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn retain(&self) -> bool {
        self.retain
    }

    /// Check every step configuration and that step ids are unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for step in &self.steps {
            let id = step_id(step);
            step.validate(id)?;
            if !seen.insert(id) {
                return Err(PipelineError::Configuration(format!(
                    "Duplicate step id '{}'",
                    id
                )));
            }
        }
        Ok(())
    }

    /// Learn every step's parameters from `reference`.
    pub fn fit(&self, reference: &DataFrame) -> Result<FittedPipeline> {
        if reference.height() == 0 {
            return Err(PipelineError::fit(
                "pipeline",
                "reference dataset has no rows",
            ));
        }
        self.validate()?;

        let mut current = reference.clone();
        let mut fitted = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let ctx = FitContext {
                step: step_id(step),
                roles: &self.roles,
            };
            let fitted_step = step.fit(&current, &ctx)?;

            let mut warnings = Vec::new();
            current = fitted_step.apply(&current, &mut warnings)?;
            debug!(
                step = fitted_step.id(),
                kind = fitted_step.kind_name(),
                columns = current.width(),
                "step fitted on reference data"
            );
            fitted.push(fitted_step);
        }

        info!(
            steps = fitted.len(),
            rows = reference.height(),
            columns = current.width(),
            "pipeline fitted"
        );

        let output_columns = current
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        Ok(FittedPipeline {
            roles: self.roles.clone(),
            steps: fitted,
            output_columns,
            reference_output: self.retain.then_some(current),
        })
    }
}

fn step_id(step: &StepSpec) -> &str {
    step.id().unwrap_or_else(|| step.kind_name())
}

/// Output of [`FittedPipeline::apply`].
#[derive(Debug, Clone)]
pub struct Transformed {
    pub frame: DataFrame,
    pub warnings: Vec<RangeWarning>,
}

/// Fitted pipeline: immutable, applicable to any dataset with the reference
/// schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPipeline {
    roles: Roles,
    steps: Vec<FittedStep>,
    output_columns: Vec<String>,
    #[serde(skip)]
    reference_output: Option<DataFrame>,
}

impl FittedPipeline {
    /// Run every fitted step in order on `df`.
    pub fn apply(&self, df: &DataFrame) -> Result<Transformed> {
        let mut current = df.clone();
        let mut warnings = Vec::new();

        for step in &self.steps {
            let present: HashSet<&str> = current
                .get_column_names()
                .iter()
                .map(|s| s.as_str())
                .collect();
            if let Some(missing) = step.inputs().into_iter().find(|c| !present.contains(c)) {
                return Err(PipelineError::missing_column(step.id(), missing));
            }
            current = step.apply(&current, &mut warnings)?;
        }

        if !warnings.is_empty() {
            warn!(count = warnings.len(), "apply finished with range warnings");
        }

        Ok(Transformed {
            frame: current,
            warnings,
        })
    }

    /// The transformed reference dataset, without recomputation.
    pub fn cached_reference_output(&self) -> Result<&DataFrame> {
        self.reference_output.as_ref().ok_or_else(|| {
            PipelineError::IllegalState(
                "no cached reference output: the pipeline was fit with retain disabled or loaded from an export"
                    .to_string(),
            )
        })
    }

    pub fn steps(&self) -> &[FittedStep] {
        &self.steps
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    /// Column names of the transformed reference dataset.
    pub fn output_columns(&self) -> &[String] {
        &self.output_columns
    }

    /// Output column with the given role. Columns created by steps are predictors.
    pub fn columns_with_role(&self, role: Role) -> Vec<&str> {
        self.output_columns
            .iter()
            .map(|s| s.as_str())
            .filter(|c| self.roles.role_of(c) == role)
            .collect()
    }

    /// Serialize the fitted parameters. The cached reference output is not included.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
