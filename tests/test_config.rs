//! Tests for JSON recipe files

use prepflow::config::RecipeConfig;
use prepflow::model::ModelSpec;
use prepflow::pipeline::*;
use prepflow::workflow::Workflow;
use prepflow::PipelineError;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

use common::*;

const HOUSING_RECIPE: &str = r#"{
    "roles": { "Sale_Price": "outcome" },
    "steps": [
        { "kind": "log", "columns": { "by_name": ["Sale_Price"] }, "base": 10 },
        { "kind": "rare_pool", "columns": { "by_name": ["Neighborhood"] }, "threshold": 0.1 },
        {
            "kind": "encode",
            "id": "dummies",
            "columns": { "all": [ { "by_type": "nominal" }, { "by_role": "predictor" } ] }
        },
        { "kind": "rescale", "columns": { "by_name": ["Gr_Liv_Area", "Year_Built"] } },
        {
            "kind": "basis_expand",
            "columns": { "by_name": ["Gr_Liv_Area"] },
            "basis": { "type": "polynomial", "degree": 2 }
        },
        {
            "kind": "interact",
            "left": { "by_name": ["Year_Built"] },
            "right": { "by_prefix": "Bldg_Type_" },
            "separator": ":"
        }
    ],
    "model": { "type": "knn", "neighbors": 4 }
}"#;

fn write_recipe(contents: &str) -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("recipe.json");
    std::fs::write(&path, contents).unwrap();
    (temp_dir, path)
}

#[test]
fn test_recipe_file_builds_every_step_kind() {
    let (_temp_dir, path) = write_recipe(HOUSING_RECIPE);
    let config = RecipeConfig::from_path(&path).unwrap();

    assert_eq!(config.model, Some(ModelSpec::Knn { neighbors: 4 }));
    assert!(config.retain);

    let pipeline = config.to_pipeline().unwrap();
    let kinds: Vec<&str> = pipeline.steps().iter().map(|s| s.kind_name()).collect();
    assert_eq!(
        kinds,
        vec!["log", "rare_pool", "encode", "rescale", "basis_expand", "interact"]
    );
    let ids: Vec<&str> = pipeline.steps().iter().filter_map(|s| s.id()).collect();
    assert_eq!(
        ids,
        vec!["log_1", "rare_pool_2", "dummies", "rescale_4", "basis_expand_5", "interact_6"]
    );
}

#[test]
fn test_recipe_fits_housing_data() {
    let config = RecipeConfig::from_json(HOUSING_RECIPE).unwrap();
    let fitted = config
        .to_pipeline()
        .unwrap()
        .fit(&create_housing_dataframe())
        .unwrap();

    let out = fitted.cached_reference_output().unwrap();
    assert_has_columns(
        out,
        &[
            "Gr_Liv_Area_poly_1",
            "Gr_Liv_Area_poly_2",
            "Year_Built:Bldg_Type_OneFam",
            "Year_Built:Bldg_Type_TwnhsE",
            "Neighborhood_other",
        ],
    );
    assert_missing_columns(out, &["Gr_Liv_Area", "Neighborhood", "Bldg_Type"]);
    assert_eq!(fitted.columns_with_role(Role::Outcome), vec!["Sale_Price"]);
}

#[test]
fn test_recipe_model_drives_workflow() {
    let config = RecipeConfig::from_json(HOUSING_RECIPE).unwrap();
    let model = config.model.unwrap_or(ModelSpec::Linear);
    let workflow = Workflow::new(config.to_pipeline().unwrap(), model);

    assert_eq!(workflow.outcome().unwrap(), "Sale_Price");
    let fitted = workflow.fit(&create_housing_dataframe()).unwrap();
    let predictions = fitted.predict(&create_new_housing_dataframe()).unwrap();
    assert_eq!(predictions.len(), 3);
    assert!(predictions.iter().all(|p| p.is_finite()));
}

#[test]
fn test_set_outcome_overrides_recipe_role() {
    let mut config = RecipeConfig::from_json(HOUSING_RECIPE).unwrap();
    config.set_outcome("Gr_Liv_Area");

    let pipeline = config.to_pipeline().unwrap();
    assert_eq!(pipeline.roles().role_of("Gr_Liv_Area"), Role::Outcome);
    assert_eq!(pipeline.roles().role_of("Sale_Price"), Role::Predictor);
}

#[test]
fn test_retain_flag_is_read() {
    let json = r#"{
        "retain": false,
        "steps": [ { "kind": "rescale", "columns": { "by_type": "numeric" } } ]
    }"#;
    let fitted = RecipeConfig::from_json(json)
        .unwrap()
        .to_pipeline()
        .unwrap()
        .fit(&create_linear_dataframe(10))
        .unwrap();
    assert!(matches!(
        fitted.cached_reference_output(),
        Err(PipelineError::IllegalState(_))
    ));
}

#[test]
fn test_duplicate_ids_in_recipe_rejected() {
    let json = r#"{
        "steps": [
            { "kind": "rescale", "id": "prep", "columns": { "by_name": ["x1"] } },
            { "kind": "log", "id": "prep", "columns": { "by_name": ["x2"] } }
        ]
    }"#;
    let config = RecipeConfig::from_json(json).unwrap();
    assert!(matches!(
        config.to_pipeline(),
        Err(PipelineError::Configuration(_))
    ));
}

#[test]
fn test_selector_matching_nothing_fails_at_fit() {
    let json = r#"{
        "steps": [ { "kind": "encode", "columns": { "by_type": "nominal" } } ]
    }"#;
    let pipeline = RecipeConfig::from_json(json).unwrap().to_pipeline().unwrap();
    assert!(matches!(
        pipeline.fit(&create_linear_dataframe(10)),
        Err(PipelineError::Configuration(_))
    ));
}

#[test]
fn test_missing_recipe_file_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = RecipeConfig::from_path(&temp_dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, PipelineError::Io(_)));
}
