//! Terminal summaries of fitted pipelines and cross-validation runs

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::{Apply, FittedPipeline};
use crate::workflow::{CvResult, MetricSummary};

/// Summary of a bake run
#[derive(Debug, Default)]
pub struct BakeSummary {
    pub reference_rows: usize,
    pub input_columns: usize,
    pub output_rows: usize,
    pub output_columns: usize,
    pub warnings: usize,
}

impl BakeSummary {
    pub fn new(reference_rows: usize, input_columns: usize) -> Self {
        Self {
            reference_rows,
            input_columns,
            ..Default::default()
        }
    }

    pub fn set_output(&mut self, rows: usize, columns: usize, warnings: usize) {
        self.output_rows = rows;
        self.output_columns = columns;
        self.warnings = warnings;
    }

    pub fn display(&self) {
        print_section("📋", "BAKE SUMMARY");

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![
            Cell::new("📁 Reference Rows"),
            Cell::new(self.reference_rows),
        ]);
        table.add_row(vec![
            Cell::new("📥 Input Columns"),
            Cell::new(self.input_columns),
        ]);
        table.add_row(vec![
            Cell::new("📤 Output Columns"),
            Cell::new(self.output_columns)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![
            Cell::new("🧾 Output Rows"),
            Cell::new(self.output_rows),
        ]);
        table.add_row(vec![
            Cell::new("⚠️  Range Warnings"),
            Cell::new(self.warnings).fg(if self.warnings == 0 {
                Color::White
            } else {
                Color::Yellow
            }),
        ]);

        print_indented(&table);
    }
}

/// Table of fitted steps and their learned parameters
pub fn display_fitted_steps(pipeline: &FittedPipeline) {
    print_section("🧪", "FITTED STEPS");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Step").add_attribute(Attribute::Bold),
        Cell::new("Kind").add_attribute(Attribute::Bold),
        Cell::new("New Columns").add_attribute(Attribute::Bold),
        Cell::new("Parameters").add_attribute(Attribute::Bold),
    ]);

    for (i, step) in pipeline.steps().iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(step.id()).fg(Color::Cyan),
            Cell::new(step.kind_name()),
            Cell::new(step.outputs().len()),
            Cell::new(truncate(&step.describe(), 70)),
        ]);
    }

    print_indented(&table);
}

/// Per-fold and aggregate cross-validation metrics
pub fn display_cv_results(result: &CvResult) {
    print_section("📈", "CROSS-VALIDATION RESULTS");
    println!("      Model: {}", style(&result.model).cyan());
    println!();

    let mut folds = Table::new();
    folds.load_preset(UTF8_FULL_CONDENSED);
    folds.set_header(vec![
        Cell::new("Fold").add_attribute(Attribute::Bold),
        Cell::new("Analysis").add_attribute(Attribute::Bold),
        Cell::new("Assessment").add_attribute(Attribute::Bold),
        Cell::new("RMSE").add_attribute(Attribute::Bold),
        Cell::new("MAE").add_attribute(Attribute::Bold),
        Cell::new("R²").add_attribute(Attribute::Bold),
        Cell::new("Warnings").add_attribute(Attribute::Bold),
    ]);
    for fold in &result.folds {
        folds.add_row(vec![
            Cell::new(format!("Fold{:02}", fold.fold)),
            Cell::new(fold.analysis_rows),
            Cell::new(fold.assessment_rows),
            Cell::new(format!("{:.4}", fold.metrics.rmse)),
            Cell::new(format!("{:.4}", fold.metrics.mae)),
            Cell::new(format!("{:.4}", fold.metrics.rsq)),
            Cell::new(fold.warnings).fg(if fold.warnings == 0 {
                Color::White
            } else {
                Color::Yellow
            }),
        ]);
    }
    print_indented(&folds);
    println!();

    let mut summary = Table::new();
    summary.load_preset(UTF8_FULL_CONDENSED);
    summary.set_header(vec![
        Cell::new("Metric").add_attribute(Attribute::Bold),
        Cell::new("Mean").add_attribute(Attribute::Bold),
        Cell::new("Std. Error").add_attribute(Attribute::Bold),
    ]);
    for (name, metric) in [
        ("RMSE", &result.rmse),
        ("MAE", &result.mae),
        ("R²", &result.rsq),
    ] {
        summary.add_row(metric_row(name, metric));
    }
    print_indented(&summary);
}

fn metric_row(name: &str, metric: &MetricSummary) -> Vec<Cell> {
    vec![
        Cell::new(name),
        Cell::new(format!("{:.4}", metric.mean))
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        Cell::new(format!("{:.4}", metric.std_err)),
    ]
}

fn print_section(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", head)
    }
}
