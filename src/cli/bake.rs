//! `prepflow bake`: fit a recipe and write transformed data

use std::time::Instant;

use anyhow::{Context, Result};

use crate::cli::args::{schema_length, BakeArgs};
use crate::config::RecipeConfig;
use crate::pipeline::{load_dataset, save_dataset};
use crate::report::{display_fitted_steps, export_fitted_params, BakeSummary, ExportMetadata};
use crate::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_count, print_info, print_step_header, print_step_time, print_success,
    print_warning, ConfigLine, FOLDER, RECIPE, SAVE, TARGET,
};

/// Warnings printed individually before the rest are summarised
const MAX_LISTED_WARNINGS: usize = 10;

pub fn run_bake(args: &BakeArgs) -> Result<()> {
    let output_path = args.output_path();

    print_banner(env!("CARGO_PKG_VERSION"));
    let mut lines = vec![
        ConfigLine::path(&RECIPE, "Recipe", &args.recipe),
        ConfigLine::path(&FOLDER, "Train", &args.train),
    ];
    if let Some(new) = &args.new {
        lines.push(ConfigLine::path(&FOLDER, "New", new));
    }
    if let Some(outcome) = &args.outcome {
        lines.push(ConfigLine::text(&TARGET, "Outcome", outcome));
    }
    lines.push(ConfigLine::path(&SAVE, "Output", &output_path));
    print_config(&lines);

    // Step 1: recipe
    print_step_header(1, "Load Recipe");
    let step_start = Instant::now();
    let mut recipe = RecipeConfig::from_path(&args.recipe)
        .with_context(|| format!("Failed to load recipe: {}", args.recipe.display()))?;
    if let Some(outcome) = &args.outcome {
        recipe.set_outcome(outcome);
    }
    let pipeline = recipe.to_pipeline()?;
    print_count("step(s) in recipe", pipeline.steps().len(), None);
    print_step_time(step_start.elapsed());

    // Step 2: fit on the reference data
    print_step_header(2, "Fit Recipe");
    let step_start = Instant::now();
    let spinner = create_spinner("Loading training data...");
    let train = load_dataset(&args.train, schema_length(args.infer_schema_length))?;
    let mut summary = BakeSummary::new(train.height(), train.width());
    spinner.set_message("Fitting steps...");
    let fitted = pipeline
        .fit(&train)
        .with_context(|| format!("Failed to fit recipe on {}", args.train.display()))?;
    finish_with_success(
        &spinner,
        &format!("Fitted {} step(s) on {} rows", fitted.steps().len(), train.height()),
    );
    display_fitted_steps(&fitted);
    print_step_time(step_start.elapsed());

    // Step 3: apply
    print_step_header(3, "Apply Recipe");
    let step_start = Instant::now();
    let (mut baked, warnings) = match &args.new {
        Some(new) => {
            let spinner = create_spinner("Applying fitted steps...");
            let new_data = load_dataset(new, schema_length(args.infer_schema_length))?;
            let transformed = fitted
                .apply(&new_data)
                .with_context(|| format!("Failed to apply recipe to {}", new.display()))?;
            if transformed.warnings.is_empty() {
                finish_with_success(&spinner, "Applied to new data");
            } else {
                finish_with_warning(&spinner, "Applied to new data with range warnings");
            }
            (transformed.frame, transformed.warnings)
        }
        None => match fitted.cached_reference_output() {
            Ok(cached) => {
                print_info("No new data given; using the cached training output");
                (cached.clone(), Vec::new())
            }
            Err(_) => {
                print_info("No new data given and retain is off; re-applying to training data");
                let transformed = fitted
                    .apply(&train)
                    .with_context(|| format!("Failed to apply recipe to {}", args.train.display()))?;
                (transformed.frame, transformed.warnings)
            }
        },
    };
    for warning in warnings.iter().take(MAX_LISTED_WARNINGS) {
        print_warning(&warning.to_string());
    }
    if warnings.len() > MAX_LISTED_WARNINGS {
        print_info(&format!(
            "{} more warning(s) not shown",
            warnings.len() - MAX_LISTED_WARNINGS
        ));
    }
    summary.set_output(baked.height(), baked.width(), warnings.len());
    print_step_time(step_start.elapsed());

    // Step 4: save
    print_step_header(4, "Save Results");
    let step_start = Instant::now();
    let spinner = create_spinner("Writing output file...");
    save_dataset(&mut baked, &output_path)?;
    finish_with_success(&spinner, &format!("Saved to {}", output_path.display()));

    if let Some(params_path) = &args.export_params {
        export_fitted_params(
            &fitted,
            ExportMetadata::new(&args.train, train.height()),
            params_path,
        )?;
        print_success(&format!("Fitted parameters written to {}", params_path.display()));
    }
    print_step_time(step_start.elapsed());

    summary.display();
    print_completion("prepflow bake complete!");

    Ok(())
}
