//! Command implementation for the NDAX decoder CLI
//!
//! Sets up logging, runs the decode pipeline behind a spinner, prints a
//! coloured summary with the step, cycle and recipe tables, and exports the
//! tables when an export directory is given.

use crate::app::adapters::frame::{
    cycles_frame, format_ranges, recipe_frame, records_frame, steps_frame, write_csv,
    write_parquet,
};
use crate::app::services::recipe_classifier::RecipeReport;
use crate::cli::args::{Args, ExportFormat};
use crate::pipeline::{DecodedTest, NdaxDecoder};
use anyhow::{Context, Result};
use colored::*;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use polars::prelude::DataFrame;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// What a CLI run produced
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub records: usize,
    pub steps: usize,
    pub cycles: usize,
    pub recipes: usize,
    pub passed: bool,
    /// Files written, with their sizes in bytes
    pub exported: Vec<(PathBuf, u64)>,
    pub processing_time: Duration,
}

impl RunSummary {
    /// Format a byte count in human-readable units
    pub fn format_size(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
        let mut size = bytes as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", bytes, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

/// Decode the archive named in `args` and report on it
///
/// 1. Set up logging and check the arguments
/// 2. Decode behind a spinner
/// 3. Summarise steps, cycles and recipes
/// 4. Print the report and export tables when asked
pub fn run(args: Args) -> Result<RunSummary> {
    let start_time = Instant::now();

    setup_logging(&args)?;
    debug!("Command line arguments: {:?}", args);
    args.validate()?;

    let decoder = NdaxDecoder::new(args.to_config())?;

    let spinner = spinner(&format!("Decoding {}", args.file.display()));
    let test = decoder
        .decode_file(&args.file)
        .with_context(|| format!("Failed to decode {}", args.file.display()));
    spinner.finish_and_clear();
    let test = test?;

    let steps = decoder.steps(&test);
    let cycles = decoder.cycles(&test);
    let recipes = decoder.recipes(&test);
    info!(
        "Summarised {} steps, {} cycles, {} recipes",
        steps.len(),
        cycles.len(),
        recipes.recipe_count()
    );

    let mut summary = RunSummary {
        records: test.records.len(),
        steps: steps.len(),
        cycles: cycles.len(),
        recipes: recipes.recipe_count(),
        passed: test.validation.passed,
        ..Default::default()
    };

    let mut step_table = steps_frame(&steps)?;
    let mut cycle_table = cycles_frame(&cycles)?;
    let mut recipe_table = recipe_frame(&recipes)?;

    print_report(&test, &recipes);
    println!("\n{}", "Cycles".bright_yellow().bold());
    println!("{}", cycle_table);
    println!("\n{}", "Steps".bright_yellow().bold());
    println!("{}", step_table);

    if let Some(dir) = &args.export_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
        let mut record_table = records_frame(&test.records, args.naming)?;
        let stem = args.export_stem();

        for (name, table) in [
            ("records", &mut record_table),
            ("steps", &mut step_table),
            ("cycles", &mut cycle_table),
            ("recipes", &mut recipe_table),
        ] {
            let path = dir.join(format!("{}_{}.{}", stem, name, args.format.extension()));
            export(table, &path, args.format)?;
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            summary.exported.push((path, size));
        }
    }

    summary.processing_time = start_time.elapsed();
    print_footer(&summary);
    Ok(summary)
}

/// Set up structured logging on stderr
fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ndax_decoder={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .context("Failed to initialise logging")?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn export(table: &mut DataFrame, path: &Path, format: ExportFormat) -> Result<()> {
    match format {
        ExportFormat::Parquet => write_parquet(table, path)?,
        ExportFormat::Csv => write_csv(table, path)?,
    }
    Ok(())
}

fn print_report(test: &DecodedTest, recipes: &RecipeReport) {
    println!("\n{}", "NDAX Decode Complete".bright_green().bold());
    println!("{}", "=".repeat(40).bright_black());
    println!("  {} {}", "Archive:".bright_cyan(), test.source.display());
    println!("  {} {}", "Format:".bright_cyan(), test.format);
    println!(
        "  {} {}",
        "Barcode:".bright_cyan(),
        test.metadata.barcode.as_deref().unwrap_or("-")
    );
    println!(
        "  {} {}",
        "Process:".bright_cyan(),
        test.metadata.process_name.as_deref().unwrap_or("-")
    );
    println!(
        "  {} {}",
        "Started:".bright_cyan(),
        test.metadata.start_time.as_deref().unwrap_or("-")
    );
    println!(
        "  {} {} over {} cycles",
        "Records:".bright_cyan(),
        test.records.len().to_string().bright_white().bold(),
        test.cycle_count()
    );
    println!("  {} {}", "Decode:".bright_cyan(), test.stats.summary());
    if let Some(fabrication) = &test.fabrication {
        println!("  {} {}", "Fabrication:".bright_cyan(), fabrication.summary());
    }

    let verdict = if test.validation.passed {
        "PASSED".bright_green().bold()
    } else {
        "FAILED".bright_red().bold()
    };
    println!("  {} {}", "Validation:".bright_cyan(), verdict);
    if let Some(failure) = &test.validation.failure {
        println!("    {}", failure.to_string().red());
    }
    if test.validation.flagged_rows() > 0 {
        println!(
            "    {} {} rows flagged by the continuity pre-pass",
            "!".yellow(),
            test.validation.flagged_rows()
        );
    }
    if !test.dropped_cycles.is_empty() {
        println!(
            "    {} dropped cycles next to index gaps: {:?}",
            "!".yellow(),
            test.dropped_cycles
        );
    }

    println!("\n{}", "Recipes".bright_yellow().bold());
    for (name, ranges) in &recipes.ranges {
        println!("  {} cycles {}", name.bright_white(), format_ranges(ranges));
    }
}

fn print_footer(summary: &RunSummary) {
    if !summary.exported.is_empty() {
        println!("\n{}", "Exported".bright_yellow().bold());
        for (path, size) in &summary.exported {
            println!(
                "  {} ({})",
                path.display(),
                RunSummary::format_size(*size)
            );
        }
    }
    println!(
        "\n{} {}",
        "Processing time:".bright_cyan(),
        HumanDuration(summary.processing_time)
    );
}
