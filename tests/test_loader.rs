//! Unit tests for dataset loading and saving

use prepflow::pipeline::{load_dataset, save_dataset};
use polars::prelude::*;
use std::io::Write;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_load_csv_file() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "a,b,c").unwrap();
    writeln!(file, "1,2,x").unwrap();
    writeln!(file, "4,5,y").unwrap();
    drop(file);

    let df = load_dataset(&csv_path, Some(100)).unwrap();

    assert_shape(&df, 2, 3);
    assert_eq!(df.get_column_names(), &["a", "b", "c"]);
    assert_eq!(df.column("c").unwrap().dtype(), &DataType::String);
}

#[test]
fn test_load_parquet_file() {
    let mut df = create_housing_dataframe();
    let (_temp_dir, parquet_path) = create_temp_parquet(&mut df);

    let loaded = load_dataset(&parquet_path, None).unwrap();

    assert_shape(&loaded, 12, 5);
    assert!(loaded.equals_missing(&df));
}

#[test]
fn test_full_scan_schema_inference() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("late_float.csv");

    // The float only shows up on the last row
    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "x").unwrap();
    for i in 0..50 {
        writeln!(file, "{}", i).unwrap();
    }
    writeln!(file, "0.5").unwrap();
    drop(file);

    let df = load_dataset(&csv_path, None).unwrap();
    assert_eq!(df.column("x").unwrap().dtype(), &DataType::Float64);
}

#[test]
fn test_save_parquet_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("baked.parquet");
    let mut df = create_new_housing_dataframe();

    save_dataset(&mut df, &path).unwrap();
    let loaded = load_dataset(&path, None).unwrap();
    assert!(loaded.equals_missing(&df));
}

#[test]
fn test_missing_file_errors() {
    let temp_dir = TempDir::new().unwrap();
    assert!(load_dataset(&temp_dir.path().join("absent.csv"), None).is_err());
}

#[test]
fn test_unsupported_output_format() {
    let temp_dir = TempDir::new().unwrap();
    let mut df = create_linear_dataframe(3);
    let err = save_dataset(&mut df, &temp_dir.path().join("out.json")).unwrap_err();
    assert!(err.to_string().contains("Unsupported output format"));
}
