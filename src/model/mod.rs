//! Regression models trained on preprocessed data
//!
//! Models see a numeric design matrix built from every predictor column of
//! the transformed dataset and a single numeric outcome column.

pub mod knn;
pub mod linear;
pub mod metrics;

pub use knn::KnnModel;
pub use linear::LinearModel;
pub use metrics::Metrics;

use faer::Mat;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::pipeline::dataset::{apply_numeric, ColumnType};
use crate::pipeline::selector::{Role, Roles};

/// Which model to train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelSpec {
    Linear,
    Knn { neighbors: usize },
}

impl ModelSpec {
    pub fn fit(&self, x: &Mat<f64>, y: &[f64]) -> Result<FittedModel> {
        match *self {
            ModelSpec::Linear => Ok(FittedModel::Linear(LinearModel::fit(x, y)?)),
            ModelSpec::Knn { neighbors } => Ok(FittedModel::Knn(KnnModel::fit(x, y, neighbors)?)),
        }
    }
}

impl std::fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelSpec::Linear => write!(f, "linear regression"),
            ModelSpec::Knn { neighbors } => write!(f, "{}-nearest neighbours", neighbors),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FittedModel {
    Linear(LinearModel),
    Knn(KnnModel),
}

impl FittedModel {
    pub fn predict(&self, x: &Mat<f64>) -> Vec<f64> {
        match self {
            FittedModel::Linear(m) => m.predict(x),
            FittedModel::Knn(m) => m.predict(x),
        }
    }
}

/// Predictor columns usable as model inputs, in frame order.
///
/// Every predictor must be numeric by the time it reaches the model.
pub fn design_columns(df: &DataFrame, roles: &Roles) -> Result<Vec<String>> {
    let mut columns = Vec::new();
    for column in df.get_columns() {
        let name = column.name().as_str();
        if roles.role_of(name) != Role::Predictor {
            continue;
        }
        match ColumnType::of(column.dtype()) {
            Some(ColumnType::Numeric) => columns.push(name.to_string()),
            Some(ColumnType::Nominal) => {
                return Err(PipelineError::Configuration(format!(
                    "Predictor '{}' is nominal; add an encode step before modelling",
                    name
                )))
            }
            None => {
                return Err(PipelineError::Configuration(format!(
                    "Predictor '{}' has unsupported type {}",
                    name,
                    column.dtype()
                )))
            }
        }
    }

    if columns.is_empty() {
        return Err(PipelineError::Configuration(
            "No predictor columns remain after preprocessing".to_string(),
        ));
    }
    Ok(columns)
}

/// Read the named columns into an `n x p` matrix. Nulls are rejected.
pub fn design_matrix(df: &DataFrame, columns: &[String]) -> Result<Mat<f64>> {
    let mut x = Mat::<f64>::zeros(df.height(), columns.len());
    for (j, name) in columns.iter().enumerate() {
        let values = apply_numeric(df, "model", name)?;
        for (i, value) in values.into_iter().enumerate() {
            x[(i, j)] = value.ok_or_else(|| {
                PipelineError::fit(
                    "model",
                    format!("predictor '{}' contains null values", name),
                )
            })?;
        }
    }
    Ok(x)
}

/// Read the outcome column. Nulls are rejected.
pub fn outcome_values(df: &DataFrame, outcome: &str) -> Result<Vec<f64>> {
    apply_numeric(df, "model", outcome)?
        .into_iter()
        .map(|v| {
            v.ok_or_else(|| {
                PipelineError::fit(
                    "model",
                    format!("outcome '{}' contains null values", outcome),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> Roles {
        let mut roles = Roles::new();
        roles.assign("Sale_Price", Role::Outcome);
        roles.assign("PID", Role::Id);
        roles
    }

    #[test]
    fn test_design_columns_skip_outcome_and_id() {
        let df = df! {
            "PID" => [1i64, 2],
            "Gr_Liv_Area" => [1000.0f64, 1200.0],
            "Sale_Price" => [100.0f64, 120.0],
            "Year_Built" => [1990i32, 2005],
        }
        .unwrap();
        let columns = design_columns(&df, &roles()).unwrap();
        assert_eq!(columns, vec!["Gr_Liv_Area", "Year_Built"]);
    }

    #[test]
    fn test_nominal_predictor_is_configuration_error() {
        let df = df! {
            "Neighborhood" => ["NAmes", "Gilbert"],
            "Sale_Price" => [100.0f64, 120.0],
        }
        .unwrap();
        let err = design_columns(&df, &roles()).unwrap_err();
        assert!(err.to_string().contains("encode step"));
    }

    #[test]
    fn test_null_predictor_is_fit_error() {
        let df = df! { "x" => [Some(1.0f64), None] }.unwrap();
        let err = design_matrix(&df, &["x".to_string()]).unwrap_err();
        assert!(matches!(err, PipelineError::Fit { .. }));
    }

    #[test]
    fn test_model_spec_json() {
        let spec: ModelSpec = serde_json::from_str(r#"{"type": "knn", "neighbors": 5}"#).unwrap();
        assert_eq!(spec, ModelSpec::Knn { neighbors: 5 });
    }
}
