//! Command-line argument definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::model::ModelSpec;

/// prepflow - Fit preprocessing recipes on training data and apply them anywhere
#[derive(Parser, Debug)]
#[command(name = "prepflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fit a recipe on training data and write the transformed data
    Bake(BakeArgs),

    /// Cross-validate a recipe together with a model
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
pub struct BakeArgs {
    /// Recipe file (JSON)
    #[arg(short, long)]
    pub recipe: PathBuf,

    /// Reference (training) data used to fit every step (CSV or Parquet)
    #[arg(short, long)]
    pub train: PathBuf,

    /// Data to transform with the fitted recipe.
    /// Defaults to the training data itself.
    #[arg(short, long)]
    pub new: Option<PathBuf>,

    /// Output file path (CSV or Parquet, determined by extension).
    /// Defaults to the transformed input with a '_baked' suffix (e.g., test.csv -> test_baked.csv).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the fitted step parameters to this JSON file
    #[arg(long)]
    pub export_params: Option<PathBuf>,

    /// Outcome column. Overrides the outcome role in the recipe.
    #[arg(long)]
    pub outcome: Option<String>,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

impl BakeArgs {
    /// The file that gets transformed
    pub fn input(&self) -> &Path {
        self.new.as_deref().unwrap_or(&self.train)
    }

    /// Output path, derived from the transformed input if not given
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| baked_output_path(self.input()))
    }
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Recipe file (JSON)
    #[arg(short, long)]
    pub recipe: PathBuf,

    /// Modelling data (CSV or Parquet)
    #[arg(short, long)]
    pub data: PathBuf,

    /// Model to train inside each fold. Defaults to the recipe's model, else linear.
    #[arg(short, long, value_enum)]
    pub model: Option<ModelKind>,

    /// Number of neighbours for the KNN model
    #[arg(short = 'k', long, default_value = "5", value_parser = validate_neighbors)]
    pub neighbors: usize,

    /// Number of cross-validation folds
    #[arg(short = 'v', long, default_value = "10", value_parser = validate_folds)]
    pub folds: usize,

    /// Seed for the split and fold assignment
    #[arg(short, long, default_value = "42")]
    pub seed: u64,

    /// Hold out a test set first, keeping this proportion for training (0-1 exclusive).
    /// The held-out rows are scored once by a final fit on the training rows.
    #[arg(long, value_parser = validate_holdout)]
    pub holdout: Option<f64>,

    /// Outcome column. Overrides the outcome role in the recipe.
    #[arg(long)]
    pub outcome: Option<String>,

    /// Write cross-validation results to this JSON file
    #[arg(long)]
    pub export_results: Option<PathBuf>,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

/// Model choice on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelKind {
    Linear,
    Knn,
}

impl ModelKind {
    pub fn to_spec(self, neighbors: usize) -> ModelSpec {
        match self {
            ModelKind::Linear => ModelSpec::Linear,
            ModelKind::Knn => ModelSpec::Knn { neighbors },
        }
    }
}

/// Output path next to `input` with a '_baked' suffix and the same extension.
pub fn baked_output_path(input: &Path) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("parquet");
    parent.join(format!("{}_baked.{}", stem, extension))
}

/// Convert the CLI schema length: 0 means full scan
pub fn schema_length(infer_schema_length: usize) -> Option<usize> {
    if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    }
}

/// Validator for the holdout proportion
fn validate_holdout(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!(
            "holdout must be between 0.0 and 1.0 (exclusive), got {}",
            value
        ))
    }
}

/// Validator for the number of folds
fn validate_folds(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid count", s))?;

    if value < 2 {
        Err(format!("folds must be at least 2, got {}", value))
    } else {
        Ok(value)
    }
}

/// Validator for the number of neighbours
fn validate_neighbors(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid count", s))?;

    if value == 0 {
        Err("neighbors must be at least 1".to_string())
    } else {
        Ok(value)
    }
}
