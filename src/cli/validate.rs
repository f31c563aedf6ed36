//! `prepflow validate`: cross-validate a recipe with a model

use std::time::Instant;

use anyhow::{Context, Result};
use console::style;

use crate::cli::args::{schema_length, ValidateArgs};
use crate::config::RecipeConfig;
use crate::model::ModelSpec;
use crate::pipeline::load_dataset;
use crate::report::{display_cv_results, export_cv_results, ExportMetadata};
use crate::resample::{initial_split, take_rows, vfold};
use crate::utils::{
    create_fold_bar, create_spinner, finish_with_success, finish_with_warning, print_banner,
    print_completion, print_config, print_info, print_step_header, print_step_time,
    print_success, ConfigLine, FOLDER, FOLDS, MODEL, RECIPE, TARGET,
};
use crate::workflow::{cross_validate_with_progress, Workflow};

pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    print_banner(env!("CARGO_PKG_VERSION"));

    // Recipe and model
    let mut recipe = RecipeConfig::from_path(&args.recipe)
        .with_context(|| format!("Failed to load recipe: {}", args.recipe.display()))?;
    if let Some(outcome) = &args.outcome {
        recipe.set_outcome(outcome);
    }
    let model = match args.model {
        Some(kind) => kind.to_spec(args.neighbors),
        None => recipe.model.unwrap_or(ModelSpec::Linear),
    };
    let workflow = Workflow::new(recipe.to_pipeline()?, model);
    let outcome = workflow.outcome()?.to_string();

    let model_text = model.to_string();
    let folds_text = format!("{} (seed {})", args.folds, args.seed);
    print_config(&[
        ConfigLine::path(&RECIPE, "Recipe", &args.recipe),
        ConfigLine::path(&FOLDER, "Data", &args.data),
        ConfigLine::text(&TARGET, "Outcome", &outcome),
        ConfigLine::text(&MODEL, "Model", &model_text),
        ConfigLine::text(&FOLDS, "Folds", &folds_text),
    ]);

    // Data and optional holdout split
    print_step_header(1, "Load Data");
    let step_start = Instant::now();
    let spinner = create_spinner("Loading data...");
    let data = load_dataset(&args.data, schema_length(args.infer_schema_length))?;
    finish_with_success(
        &spinner,
        &format!("Loaded {} rows, {} columns", data.height(), data.width()),
    );

    let (training, testing) = match args.holdout {
        Some(prop) => {
            let split = initial_split(data.height(), prop, args.seed)?;
            print_info(&format!(
                "Holding out {} row(s) for testing, {} for training",
                split.testing.len(),
                split.training.len()
            ));
            (
                take_rows(&data, &split.training)?,
                Some(take_rows(&data, &split.testing)?),
            )
        }
        None => (data.clone(), None),
    };
    print_step_time(step_start.elapsed());

    // Resampling
    print_step_header(2, "Cross-Validation");
    let step_start = Instant::now();
    let folds = vfold(training.height(), args.folds, args.seed)?;
    let bar = create_fold_bar(folds.len() as u64);
    let results = cross_validate_with_progress(&workflow, &training, &folds, &bar)
        .context("Cross-validation failed")?;
    if results.total_warnings() == 0 {
        finish_with_success(&bar, "All folds assessed");
    } else {
        finish_with_warning(
            &bar,
            &format!(
                "All folds assessed ({} range warning(s))",
                results.total_warnings()
            ),
        );
    }
    display_cv_results(&results);
    print_step_time(step_start.elapsed());

    // Final fit scored on the held-out rows
    if let Some(testing) = &testing {
        print_step_header(3, "Test Set Assessment");
        let step_start = Instant::now();
        let spinner = create_spinner("Fitting on all training rows...");
        let fitted = workflow.fit(&training)?;
        let assessed = fitted.assess(testing)?;
        finish_with_success(&spinner, "Final fit assessed on held-out rows");
        println!(
            "      RMSE {}  MAE {}  R² {}",
            style(format!("{:.4}", assessed.metrics.rmse)).green().bold(),
            style(format!("{:.4}", assessed.metrics.mae)).green(),
            style(format!("{:.4}", assessed.metrics.rsq)).green()
        );
        if assessed.warnings > 0 {
            print_info(&format!(
                "{} range warning(s) while preprocessing the test rows",
                assessed.warnings
            ));
        }
        print_step_time(step_start.elapsed());
    }

    if let Some(path) = &args.export_results {
        export_cv_results(
            &results,
            &outcome,
            ExportMetadata::new(&args.data, training.height()),
            path,
        )?;
        print_success(&format!("Results written to {}", path.display()));
    }

    print_completion("prepflow validate complete!");
    Ok(())
}
