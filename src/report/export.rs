//! JSON export of fitted pipeline parameters and cross-validation results

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::pipeline::FittedPipeline;
use crate::workflow::CvResult;

/// Metadata about the run that produced an export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// prepflow version
    pub prepflow_version: String,
    /// Reference (training) data file
    pub reference_file: String,
    /// Rows in the reference data
    pub reference_rows: usize,
}

impl ExportMetadata {
    pub fn new(reference_file: &Path, reference_rows: usize) -> Self {
        Self {
            prepflow_version: env!("CARGO_PKG_VERSION").to_string(),
            reference_file: reference_file.display().to_string(),
            reference_rows,
        }
    }
}

/// Fitted parameters with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedParamsExport {
    pub metadata: ExportMetadata,
    pub pipeline: FittedPipeline,
}

/// Cross-validation results with metadata
#[derive(Debug, Clone, Serialize)]
pub struct CvExport<'a> {
    pub metadata: ExportMetadata,
    pub outcome: &'a str,
    pub results: &'a CvResult,
}

/// Write the fitted parameters of `pipeline` to a JSON file
pub fn export_fitted_params(
    pipeline: &FittedPipeline,
    metadata: ExportMetadata,
    output_path: &Path,
) -> Result<()> {
    let export = FittedParamsExport {
        metadata,
        pipeline: pipeline.clone(),
    };
    let json = serde_json::to_string_pretty(&export)
        .context("Failed to serialize fitted parameters to JSON")?;

    std::fs::write(output_path, json).with_context(|| {
        format!(
            "Failed to write fitted parameters to {}",
            output_path.display()
        )
    })?;

    Ok(())
}

/// Read a file written by [`export_fitted_params`].
///
/// The returned pipeline has no cached reference output.
pub fn load_fitted_params(path: &Path) -> Result<FittedParamsExport> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fitted parameters from {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Invalid fitted parameter file: {}", path.display()))
}

/// Write cross-validation results to a JSON file
pub fn export_cv_results(
    results: &CvResult,
    outcome: &str,
    metadata: ExportMetadata,
    output_path: &Path,
) -> Result<()> {
    let export = CvExport {
        metadata,
        outcome,
        results,
    };
    let json = serde_json::to_string_pretty(&export)
        .context("Failed to serialize cross-validation results to JSON")?;

    std::fs::write(output_path, json).with_context(|| {
        format!(
            "Failed to write cross-validation results to {}",
            output_path.display()
        )
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Pipeline, Selector, StepSpec};
    use polars::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_fitted_params_round_trip() {
        let df = df! {
            "Lot_Area" => [8000.0f64, 9000.0, 10000.0],
            "Street" => ["Pave", "Pave", "Grvl"],
        }
        .unwrap();
        let fitted = Pipeline::new()
            .with(StepSpec::rescale(Selector::name("Lot_Area")))
            .with(StepSpec::encode(Selector::name("Street")))
            .fit(&df)
            .unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("params.json");
        export_fitted_params(&fitted, ExportMetadata::new(Path::new("train.csv"), 3), &path)
            .unwrap();

        let loaded = load_fitted_params(&path).unwrap();
        assert_eq!(loaded.metadata.reference_rows, 3);
        assert_eq!(loaded.pipeline.steps(), fitted.steps());

        let reapplied = loaded.pipeline.apply(&df).unwrap();
        assert!(reapplied
            .frame
            .equals_missing(fitted.cached_reference_output().unwrap()));
    }
}
