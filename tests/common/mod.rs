//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Small housing-style reference dataset
///
/// - `Sale_Price`: outcome, strictly positive
/// - `Gr_Liv_Area`: numeric predictor
/// - `Year_Built`: integer predictor
/// - `Neighborhood`: nominal, `Briardale` appears once (rare)
/// - `Bldg_Type`: nominal with three levels
pub fn create_housing_dataframe() -> DataFrame {
    df! {
        "Sale_Price" => [105000.0f64, 172000.0, 244000.0, 189900.0, 195500.0, 213500.0,
                         191500.0, 236500.0, 189000.0, 175900.0, 185000.0, 180400.0],
        "Gr_Liv_Area" => [896.0f64, 1329.0, 2110.0, 1629.0, 1604.0, 1338.0,
                          1280.0, 1616.0, 1804.0, 1655.0, 1187.0, 1465.0],
        "Year_Built" => [1961i64, 1958, 1968, 1997, 1998, 2001, 1992, 1995, 1999, 1993, 1992, 1998],
        "Neighborhood" => ["North_Ames", "North_Ames", "North_Ames", "Gilbert", "Gilbert", "Stone_Brook",
                           "Stone_Brook", "Stone_Brook", "Gilbert", "Gilbert", "Briardale", "North_Ames"],
        "Bldg_Type" => ["OneFam", "OneFam", "OneFam", "OneFam", "OneFam", "TwnhsE",
                        "TwnhsE", "TwnhsE", "OneFam", "OneFam", "Duplex", "OneFam"],
    }
    .unwrap()
}

/// New data with the housing schema, including a level never seen at fit time
/// and values outside the reference ranges.
pub fn create_new_housing_dataframe() -> DataFrame {
    df! {
        "Sale_Price" => [140000.0f64, 310000.0, 200000.0],
        "Gr_Liv_Area" => [700.0f64, 2600.0, 1500.0],
        "Year_Built" => [1950i64, 2008, 1990],
        "Neighborhood" => ["North_Ames", "Somerset", "Gilbert"],
        "Bldg_Type" => ["OneFam", "OneFam", "Twnhs"],
    }
    .unwrap()
}

/// Dataset whose outcome is an exact linear function of two predictors:
/// `y = 3 + 2 * x1 - 0.5 * x2`
pub fn create_linear_dataframe(rows: usize) -> DataFrame {
    let x1: Vec<f64> = (0..rows).map(|i| i as f64).collect();
    let x2: Vec<f64> = (0..rows).map(|i| ((i * 7) % 11) as f64).collect();
    let y: Vec<f64> = x1
        .iter()
        .zip(&x2)
        .map(|(a, b)| 3.0 + 2.0 * a - 0.5 * b)
        .collect();
    df! {
        "y" => y,
        "x1" => x1,
        "x2" => x2,
    }
    .unwrap()
}

/// Random numeric/nominal dataset for stress tests
pub fn create_large_test_dataframe(rows: usize, cols: usize) -> DataFrame {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    let mut rng = StdRng::seed_from_u64(7);
    let levels = ["a", "b", "c", "d", "e"];

    let mut columns: Vec<Column> = Vec::with_capacity(cols + 2);

    let outcome: Vec<f64> = (0..rows).map(|_| rng.gen_range(1.0..100.0)).collect();
    columns.push(Column::new("outcome".into(), outcome));

    let group: Vec<&str> = (0..rows).map(|_| levels[rng.gen_range(0..levels.len())]).collect();
    columns.push(Column::new("group".into(), group));

    for i in 0..cols {
        let values: Vec<f64> = (0..rows).map(|_| rng.gen::<f64>()).collect();
        columns.push(Column::new(format!("feature_{}", i).into(), values));
    }

    DataFrame::new(columns).unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Read a numeric column as plain values, panicking on nulls
pub fn values(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

/// Column names of a DataFrame as owned strings
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {} (+/- {}), got {}",
        expected,
        tol,
        actual
    );
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols = column_names(df);
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols = column_names(df);
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}
