//! Column access helpers shared by the pipeline steps
//!
//! Steps read numeric columns as `f64` and nominal columns as strings,
//! whatever the physical polars dtype. Fit-time reads fail with
//! [`PipelineError::Fit`], apply-time reads with
//! [`PipelineError::SchemaMismatch`].

use std::collections::HashSet;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Logical column type used by selectors and steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Nominal,
}

impl ColumnType {
    /// Classify a polars dtype. Returns `None` for dtypes no step handles
    /// (dates, lists, structs, ...).
    pub fn of(dtype: &DataType) -> Option<Self> {
        if dtype.is_primitive_numeric() {
            Some(ColumnType::Numeric)
        } else if matches!(
            dtype,
            DataType::String | DataType::Categorical(..) | DataType::Enum(..) | DataType::Boolean
        ) {
            Some(ColumnType::Nominal)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Numeric => write!(f, "numeric"),
            ColumnType::Nominal => write!(f, "nominal"),
        }
    }
}

/// Read a column as `f64` values during fit.
///
/// Rejects non-numeric columns and NaN values.
pub fn fit_numeric(df: &DataFrame, step: &str, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::fit(step, format!("column '{}' not found", name)))?;

    if ColumnType::of(column.dtype()) != Some(ColumnType::Numeric) {
        return Err(PipelineError::fit(
            step,
            format!(
                "column '{}' must be numeric, found {}",
                name,
                column.dtype()
            ),
        ));
    }

    let values = column_to_f64_vec(column)?;
    if values.iter().flatten().any(|v| v.is_nan()) {
        return Err(PipelineError::fit(
            step,
            format!("column '{}' contains NaN values", name),
        ));
    }
    if values.iter().all(|v| v.is_none()) {
        return Err(PipelineError::fit(
            step,
            format!("column '{}' contains only null values", name),
        ));
    }

    Ok(values)
}

/// Read a column as `f64` values during apply.
pub fn apply_numeric(df: &DataFrame, step: &str, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::missing_column(step, name))?;

    if ColumnType::of(column.dtype()) != Some(ColumnType::Numeric) {
        return Err(PipelineError::SchemaMismatch {
            step: step.to_string(),
            column: name.to_string(),
            reason: format!("expected a numeric column, found {}", column.dtype()),
        });
    }

    column_to_f64_vec(column)
}

/// Read a column as string levels during fit.
pub fn fit_nominal(df: &DataFrame, step: &str, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::fit(step, format!("column '{}' not found", name)))?;

    if ColumnType::of(column.dtype()) != Some(ColumnType::Nominal) {
        return Err(PipelineError::fit(
            step,
            format!(
                "column '{}' must be nominal, found {}",
                name,
                column.dtype()
            ),
        ));
    }

    let values = column_to_string_vec(column)?;
    if values.iter().all(|v| v.is_none()) {
        return Err(PipelineError::fit(
            step,
            format!("column '{}' contains only null values", name),
        ));
    }

    Ok(values)
}

/// Read a column as string levels during apply.
pub fn apply_nominal(df: &DataFrame, step: &str, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::missing_column(step, name))?;

    if ColumnType::of(column.dtype()) != Some(ColumnType::Nominal) {
        return Err(PipelineError::SchemaMismatch {
            step: step.to_string(),
            column: name.to_string(),
            reason: format!("expected a nominal column, found {}", column.dtype()),
        });
    }

    column_to_string_vec(column)
}

fn column_to_f64_vec(column: &Column) -> Result<Vec<Option<f64>>> {
    let cast = column.cast(&DataType::Float64)?;
    Ok(cast.f64()?.iter().collect())
}

/// Convert a nominal column to a Vec of Option<String>
fn column_to_string_vec(column: &Column) -> Result<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match column.dtype() {
        DataType::String => column
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Boolean => column
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        _ => {
            let cast = column.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };

    Ok(values)
}

/// In-order edits to a frame's column list.
///
/// Replaced columns keep their position, appended columns go to the end.
#[derive(Debug)]
pub(crate) struct FrameEdit {
    columns: Vec<Column>,
}

impl FrameEdit {
    pub fn new(df: &DataFrame) -> Self {
        Self {
            columns: df.get_columns().to_vec(),
        }
    }

    pub fn replace(&mut self, column: Column) {
        match self
            .columns
            .iter()
            .position(|c| c.name().as_str() == column.name().as_str())
        {
            Some(idx) => self.columns[idx] = column,
            None => self.columns.push(column),
        }
    }

    pub fn drop(&mut self, name: &str) {
        self.columns.retain(|c| c.name().as_str() != name);
    }

    /// Add a generated column. Fails if the frame already holds that name.
    pub fn append(&mut self, step: &str, column: Column) -> Result<()> {
        if self.columns.iter().any(|c| c.name() == column.name()) {
            return Err(PipelineError::SchemaMismatch {
                step: step.to_string(),
                column: column.name().to_string(),
                reason: "generated column already exists in the input".to_string(),
            });
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn names(&self) -> HashSet<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn finish(self) -> Result<DataFrame> {
        Ok(DataFrame::new(self.columns)?)
    }
}

/// Build an `f64` column.
pub(crate) fn float_column(name: &str, values: Vec<Option<f64>>) -> Column {
    Column::new(name.into(), values)
}

/// Build a string column.
pub(crate) fn string_column(name: &str, values: Vec<Option<String>>) -> Column {
    Column::new(name.into(), values)
}

/// Pick `base`, or `base_2`, `base_3`, ... if it is already taken.
pub(crate) fn unique_name(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|i| format!("{}_{}", base, i))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Make a categorical level safe to embed in a column name.
pub(crate) fn sanitize_level(level: &str) -> String {
    let cleaned: String = level
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "blank".to_string()
    } else {
        cleaned
    }
}

/// Quantile with linear interpolation between order statistics.
///
/// `sorted` must be non-empty and ascending.
pub(crate) fn quantile(sorted: &[f64], prob: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * prob;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_classification() {
        assert_eq!(ColumnType::of(&DataType::Int32), Some(ColumnType::Numeric));
        assert_eq!(ColumnType::of(&DataType::Float64), Some(ColumnType::Numeric));
        assert_eq!(ColumnType::of(&DataType::String), Some(ColumnType::Nominal));
        assert_eq!(ColumnType::of(&DataType::Boolean), Some(ColumnType::Nominal));
        assert_eq!(ColumnType::of(&DataType::Date), None);
    }

    #[test]
    fn test_fit_numeric_casts_integers() {
        let df = df! { "x" => [1i32, 2, 3] }.unwrap();
        let values = fit_numeric(&df, "s", "x").unwrap();
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_fit_numeric_rejects_strings() {
        let df = df! { "x" => ["a", "b"] }.unwrap();
        let err = fit_numeric(&df, "s", "x").unwrap_err();
        assert!(matches!(err, PipelineError::Fit { .. }));
    }

    #[test]
    fn test_fit_numeric_rejects_nan() {
        let df = df! { "x" => [1.0f64, f64::NAN] }.unwrap();
        let err = fit_numeric(&df, "s", "x").unwrap_err();
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn test_apply_numeric_missing_column_is_schema_mismatch() {
        let df = df! { "x" => [1.0f64] }.unwrap();
        let err = apply_numeric(&df, "s", "y").unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_nominal_reads_booleans_as_strings() {
        let df = df! { "flag" => [true, false] }.unwrap();
        let values = fit_nominal(&df, "s", "flag").unwrap();
        assert_eq!(
            values,
            vec![Some("true".to_string()), Some("false".to_string())]
        );
    }

    #[test]
    fn test_frame_edit_keeps_positions() {
        let df = df! {
            "a" => [1.0f64, 2.0],
            "b" => [3.0f64, 4.0],
            "c" => [5.0f64, 6.0],
        }
        .unwrap();
        let mut edit = FrameEdit::new(&df);
        edit.replace(float_column("b", vec![Some(0.0), Some(0.0)]));
        edit.drop("a");
        edit.append("step_1", float_column("d", vec![Some(1.0), Some(1.0)]))
            .unwrap();
        let out = edit.finish().unwrap();

        let names: Vec<String> = out.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_frame_edit_rejects_existing_name() {
        let df = df! { "a" => [1.0f64, 2.0], "a_b" => [0.0f64, 1.0] }.unwrap();
        let mut edit = FrameEdit::new(&df);
        let err = edit
            .append("encode_1", float_column("a_b", vec![Some(1.0), Some(0.0)]))
            .unwrap_err();
        match err {
            PipelineError::SchemaMismatch { step, column, .. } => {
                assert_eq!(step, "encode_1");
                assert_eq!(column, "a_b");
            }
            other => panic!("Expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_unique_name_appends_suffix() {
        let taken: HashSet<String> = ["x_a", "x_a_2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(unique_name("x_b", &taken), "x_b");
        assert_eq!(unique_name("x_a", &taken), "x_a_3");
    }

    #[test]
    fn test_sanitize_level() {
        assert_eq!(sanitize_level("One Story"), "One_Story");
        assert_eq!(sanitize_level("1Fam"), "1Fam");
        assert_eq!(sanitize_level(""), "blank");
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile(&sorted, 0.5) - 2.5).abs() < 1e-12);
        assert_eq!(quantile(&sorted, 0.0), 1.0);
        assert_eq!(quantile(&sorted, 1.0), 4.0);
    }
}
