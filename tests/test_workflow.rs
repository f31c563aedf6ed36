//! Integration tests for workflows and cross-validation

use prepflow::model::{FittedModel, ModelSpec};
use prepflow::pipeline::steps::RarePoolSpec;
use prepflow::pipeline::*;
use prepflow::resample::{initial_split, take_rows, vfold};
use prepflow::workflow::{cross_validate, Workflow};
use prepflow::PipelineError;

#[path = "common/mod.rs"]
mod common;

use common::*;

fn linear_workflow() -> Workflow {
    let pipeline = Pipeline::new()
        .with_role("y", Role::Outcome)
        .with(StepSpec::rescale(Selector::numeric_predictors()));
    Workflow::new(pipeline, ModelSpec::Linear)
}

fn housing_workflow(model: ModelSpec) -> Workflow {
    let pipeline = Pipeline::new()
        .with_role("Sale_Price", Role::Outcome)
        .with(StepSpec::log(Selector::name("Sale_Price"), 10.0))
        .with(RarePoolSpec::new(Selector::name("Neighborhood")).threshold(0.1))
        .with(StepSpec::encode(Selector::nominal_predictors()))
        .with(StepSpec::rescale(Selector::names(["Gr_Liv_Area", "Year_Built"])));
    Workflow::new(pipeline, model)
}

#[test]
fn test_linear_workflow_recovers_exact_relationship() {
    let df = create_linear_dataframe(30);
    let fitted = linear_workflow().fit(&df).unwrap();
    assert_eq!(fitted.predictors(), &["x1".to_string(), "x2".to_string()]);

    let predictions = fitted.predict(&df).unwrap();
    for (p, y) in predictions.iter().zip(values(&df, "y")) {
        assert_close(*p, y, 1e-6);
    }

    match fitted.model() {
        FittedModel::Linear(model) => {
            // Predictors are centered, so the intercept is the fitted value at the means
            assert_close(model.intercept, 3.0 + 2.0 * 14.5 - 0.5 * mean_x2(&df), 1e-6)
        }
        other => panic!("Expected linear model, got {:?}", other),
    }
}

fn mean_x2(df: &polars::prelude::DataFrame) -> f64 {
    let x2 = values(df, "x2");
    x2.iter().sum::<f64>() / x2.len() as f64
}

#[test]
fn test_cross_validation_on_exact_data_has_zero_error() {
    let df = create_linear_dataframe(40);
    let folds = vfold(df.height(), 5, 42).unwrap();
    let results = cross_validate(&linear_workflow(), &df, &folds).unwrap();

    assert_eq!(results.folds.len(), 5);
    assert_eq!(results.model, "linear regression");
    for fold in &results.folds {
        assert_eq!(fold.analysis_rows + fold.assessment_rows, 40);
        assert_close(fold.metrics.rmse, 0.0, 1e-6);
        assert_close(fold.metrics.mae, 0.0, 1e-6);
    }
    assert_close(results.rmse.mean, 0.0, 1e-6);
    assert_close(results.rsq.mean, 1.0, 1e-6);
    assert_eq!(results.total_warnings(), 0);
}

#[test]
fn test_each_fold_fits_only_its_analysis_rows() {
    let df = create_linear_dataframe(20);
    let folds = vfold(df.height(), 4, 1).unwrap();
    let fold = &folds[0];

    let analysis = take_rows(&df, &fold.analysis).unwrap();
    let fitted = linear_workflow().fit(&analysis).unwrap();

    let step = &fitted.pipeline().steps()[0];
    let stats = match step {
        FittedStep::Rescale(rescale) => &rescale.stats,
        other => panic!("Expected rescale, got {:?}", other),
    };
    let x1 = stats.iter().find(|s| s.column == "x1").unwrap();

    let analysis_x1 = values(&analysis, "x1");
    let analysis_mean = analysis_x1.iter().sum::<f64>() / analysis_x1.len() as f64;
    assert_close(x1.mean, analysis_mean, 1e-12);
    assert_eq!(analysis_x1.len(), 15);
}

#[test]
fn test_knn_cross_validation_on_housing_data() {
    let df = create_housing_dataframe();
    let folds = vfold(df.height(), 3, 7).unwrap();
    let results = cross_validate(
        &housing_workflow(ModelSpec::Knn { neighbors: 3 }),
        &df,
        &folds,
    )
    .unwrap();

    assert_eq!(results.folds.len(), 3);
    assert_eq!(results.model, "3-nearest neighbours");
    let ids: Vec<usize> = results.folds.iter().map(|f| f.fold).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(results.rmse.mean.is_finite());
    assert!(results.mae.mean >= 0.0);
    assert!(results.rmse.std_err.is_finite());
}

#[test]
fn test_holdout_assessment_reports_warnings() {
    let df = create_housing_dataframe();
    let fitted = housing_workflow(ModelSpec::Knn { neighbors: 2 })
        .fit(&df)
        .unwrap();

    let assessed = fitted.assess(&create_new_housing_dataframe()).unwrap();
    // Twnhs was never seen by the encode step
    assert_eq!(assessed.warnings, 1);
    assert!(assessed.metrics.rmse.is_finite());
}

#[test]
fn test_split_then_fit_then_evaluate() {
    let df = create_linear_dataframe(30);
    let split = initial_split(df.height(), 0.8, 3).unwrap();
    let training = take_rows(&df, &split.training).unwrap();
    let testing = take_rows(&df, &split.testing).unwrap();

    let fitted = linear_workflow().fit(&training).unwrap();
    let metrics = fitted.evaluate(&testing).unwrap();
    assert_close(metrics.rmse, 0.0, 1e-6);
}

#[test]
fn test_workflow_without_outcome_is_configuration_error() {
    let df = create_linear_dataframe(10);
    let workflow = Workflow::new(
        Pipeline::new().with(StepSpec::rescale(Selector::name("x1"))),
        ModelSpec::Linear,
    );
    assert!(matches!(
        workflow.fit(&df),
        Err(PipelineError::Configuration(_))
    ));

    let folds = vfold(df.height(), 2, 0).unwrap();
    assert!(matches!(
        cross_validate(&workflow, &df, &folds),
        Err(PipelineError::Configuration(_))
    ));
}

#[test]
fn test_unencoded_nominal_predictor_is_rejected() {
    let df = create_housing_dataframe();
    let pipeline = Pipeline::new()
        .with_role("Sale_Price", Role::Outcome)
        .with(StepSpec::rescale(Selector::name("Gr_Liv_Area")));
    let err = Workflow::new(pipeline, ModelSpec::Linear)
        .fit(&df)
        .unwrap_err();
    match err {
        PipelineError::Configuration(message) => assert!(message.contains("encode")),
        other => panic!("Expected Configuration error, got {:?}", other),
    }
}
