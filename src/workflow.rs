//! Preprocessing pipeline and model fitted as one unit
//!
//! A [`Workflow`] fits its pipeline on the training rows, trains the model on
//! the transformed training rows and applies the same fitted pipeline to any
//! data it predicts on. [`cross_validate`] repeats this independently for
//! every resampling fold.

use indicatif::ProgressBar;
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::model::{design_columns, design_matrix, outcome_values, FittedModel, Metrics, ModelSpec};
use crate::pipeline::recipe::{FittedPipeline, Pipeline};
use crate::pipeline::selector::Role;
use crate::resample::{take_rows, Fold};

#[derive(Debug, Clone)]
pub struct Workflow {
    pipeline: Pipeline,
    model: ModelSpec,
}

impl Workflow {
    pub fn new(pipeline: Pipeline, model: ModelSpec) -> Self {
        Self { pipeline, model }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn model(&self) -> ModelSpec {
        self.model
    }

    /// The single column with the outcome role.
    pub fn outcome(&self) -> Result<&str> {
        let outcomes = self.pipeline.roles().with_role(Role::Outcome);
        match outcomes.as_slice() {
            [outcome] => Ok(*outcome),
            [] => Err(PipelineError::Configuration(
                "Workflow needs a column with the outcome role".to_string(),
            )),
            many => Err(PipelineError::Configuration(format!(
                "Workflow needs exactly one outcome column, found {}",
                many.join(", ")
            ))),
        }
    }

    pub fn fit(&self, training: &DataFrame) -> Result<FittedWorkflow> {
        let outcome = self.outcome()?.to_string();
        let pipeline = self.pipeline.fit(training)?;

        let applied;
        let baked = match pipeline.cached_reference_output() {
            Ok(df) => df,
            Err(_) => {
                applied = pipeline.apply(training)?.frame;
                &applied
            }
        };

        let predictors = design_columns(baked, pipeline.roles())?;
        let x = design_matrix(baked, &predictors)?;
        let y = outcome_values(baked, &outcome)?;
        let model = self.model.fit(&x, &y)?;

        Ok(FittedWorkflow {
            pipeline,
            model,
            outcome,
            predictors,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedWorkflow {
    pipeline: FittedPipeline,
    model: FittedModel,
    outcome: String,
    predictors: Vec<String>,
}

/// Metrics plus the number of range warnings raised while preprocessing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub metrics: Metrics,
    pub warnings: usize,
}

impl FittedWorkflow {
    pub fn pipeline(&self) -> &FittedPipeline {
        &self.pipeline
    }

    pub fn model(&self) -> &FittedModel {
        &self.model
    }

    pub fn predictors(&self) -> &[String] {
        &self.predictors
    }

    pub fn predict(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let baked = self.pipeline.apply(df)?.frame;
        let x = design_matrix(&baked, &self.predictors)?;
        Ok(self.model.predict(&x))
    }

    pub fn evaluate(&self, df: &DataFrame) -> Result<Metrics> {
        Ok(self.assess(df)?.metrics)
    }

    pub fn assess(&self, df: &DataFrame) -> Result<Assessment> {
        let baked = self.pipeline.apply(df)?;
        let x = design_matrix(&baked.frame, &self.predictors)?;
        let y = outcome_values(&baked.frame, &self.outcome)?;
        let predictions = self.model.predict(&x);
        Ok(Assessment {
            metrics: Metrics::compute(&y, &predictions),
            warnings: baked.warnings.len(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold: usize,
    pub analysis_rows: usize,
    pub assessment_rows: usize,
    pub warnings: usize,
    pub metrics: Metrics,
}

/// Mean and standard error of one metric across folds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub std_err: f64,
}

impl MetricSummary {
    fn of(values: &[f64]) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std_err = if values.len() < 2 {
            f64::NAN
        } else {
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            (var / n).sqrt()
        };
        Self { mean, std_err }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvResult {
    pub model: String,
    pub folds: Vec<FoldResult>,
    pub rmse: MetricSummary,
    pub mae: MetricSummary,
    pub rsq: MetricSummary,
}

impl CvResult {
    fn new(model: String, folds: Vec<FoldResult>) -> Self {
        let collect = |f: fn(&Metrics) -> f64| -> Vec<f64> {
            folds.iter().map(|r| f(&r.metrics)).collect()
        };
        let rmse = MetricSummary::of(&collect(|m| m.rmse));
        let mae = MetricSummary::of(&collect(|m| m.mae));
        let rsq = MetricSummary::of(&collect(|m| m.rsq));
        Self {
            model,
            folds,
            rmse,
            mae,
            rsq,
        }
    }

    pub fn total_warnings(&self) -> usize {
        self.folds.iter().map(|f| f.warnings).sum()
    }
}

/// Fit and assess the workflow on every fold.
pub fn cross_validate(workflow: &Workflow, df: &DataFrame, folds: &[Fold]) -> Result<CvResult> {
    cross_validate_with_progress(workflow, df, folds, &ProgressBar::hidden())
}

/// [`cross_validate`], advancing `progress` once per finished fold.
pub fn cross_validate_with_progress(
    workflow: &Workflow,
    df: &DataFrame,
    folds: &[Fold],
    progress: &ProgressBar,
) -> Result<CvResult> {
    workflow.outcome()?;

    let results: Vec<FoldResult> = folds
        .par_iter()
        .map(|fold| {
            let analysis = take_rows(df, &fold.analysis)?;
            let assessment = take_rows(df, &fold.assessment)?;
            let fitted = workflow.fit(&analysis)?;
            let assessed = fitted.assess(&assessment)?;

            info!(
                fold = fold.id,
                rmse = assessed.metrics.rmse,
                rsq = assessed.metrics.rsq,
                warnings = assessed.warnings,
                "fold assessed"
            );
            progress.inc(1);

            Ok(FoldResult {
                fold: fold.id,
                analysis_rows: fold.analysis.len(),
                assessment_rows: fold.assessment.len(),
                warnings: assessed.warnings,
                metrics: assessed.metrics,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CvResult::new(workflow.model().to_string(), results))
}
