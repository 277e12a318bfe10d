//! Command implementations for the geocode batcher CLI
//!
//! This module contains the run workflow, dry-run reporting, logging setup
//! and the final summary output.

use crate::app::services::geocode_client::GoogleGeocoder;
use crate::app::services::pipeline::{Pipeline, RunPlan, RunSummary};
use crate::cli::args::{Args, SummaryFormat};
use crate::{Error, Result};
use anyhow::Context;
use colored::*;
use serde::Serialize;
use tracing::{debug, info, warn};

/// What a command invocation produced
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Planned(RunPlan),
    Completed(RunSummary),
}

/// Main command runner
///
/// 1. Set up logging and validate arguments
/// 2. Build the run and geocoder configurations
/// 3. Either plan (dry run) or execute the pipeline
/// 4. Report the result in the requested format
pub async fn run(args: Args) -> anyhow::Result<RunOutcome> {
    setup_logging(&args)?;

    info!("Starting geocode batcher");
    debug!("Command line arguments: {:?}", args);

    args.validate().context("Invalid arguments")?;
    let config = args.to_run_config();
    let geocoder_config = args.to_geocoder_config();
    debug!("Run configuration: {:?}", config);

    let geocoder =
        GoogleGeocoder::new(geocoder_config).context("Failed to initialize geocoding client")?;
    if !geocoder.has_usable_key() {
        warn!("No usable API key configured; every record will be marked as key missing");
    }

    let pipeline = Pipeline::new(&config, geocoder);

    if args.dry_run {
        info!("Performing dry run - no files will be written");
        let plan = pipeline
            .plan()
            .with_context(|| format!("Dry run failed for {}", config.input_path.display()))?;
        report(&plan, args.summary_format, print_plan)?;
        return Ok(RunOutcome::Planned(plan));
    }

    let summary = pipeline
        .run()
        .await
        .with_context(|| format!("Geocoding run failed for {}", config.input_path.display()))?;
    report(&summary, args.summary_format, print_summary)?;
    Ok(RunOutcome::Completed(summary))
}

/// Set up structured logging on stderr
fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("geocode_batcher={}", log_level)));

    let result = if args.quiet {
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
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    result.map_err(|e| Error::configuration(format!("Failed to initialize logging: {}", e)))?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

fn report<T: Serialize>(value: &T, format: SummaryFormat, human: fn(&T)) -> Result<()> {
    match format {
        SummaryFormat::Human => human(value),
        SummaryFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn print_plan(plan: &RunPlan) {
    println!("\n{}", "Dry Run".bright_green().bold());
    println!(
        "  {} {}",
        "Output file:".bright_cyan(),
        plan.output_path.display().to_string().bright_white()
    );
    if plan.appends_to_existing {
        println!(
            "  {} {}",
            "Existing output:".bright_yellow(),
            "rows would be appended without a header".bright_yellow()
        );
    }
    println!(
        "  {} {}",
        "Output columns:".bright_cyan(),
        plan.output_columns.join(", ").bright_white()
    );
    println!(
        "  {} {}",
        "Records in input:".bright_cyan(),
        plan.total_records.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Records to process:".bright_cyan(),
        plan.eligible_records.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Maximum lookups:".bright_cyan(),
        plan.max_lookups.to_string().bright_white().bold()
    );
}

fn print_summary(summary: &RunSummary) {
    let outcomes = &summary.outcomes;

    println!("\n{}", "Geocoding Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        summary.elapsed_ms.to_string().bright_white()
    );
    println!(
        "  {} {}{}",
        "Output file:".bright_cyan(),
        summary.output_path.display().to_string().bright_white(),
        if summary.appended_to_existing {
            " (appended)"
        } else {
            ""
        }
    );
    println!(
        "  {} {}",
        "Records written:".bright_cyan(),
        summary.records_written.to_string().bright_white().bold()
    );
    if summary.records_skipped_before_start > 0 {
        println!(
            "  {} {}",
            "Skipped before start:".bright_cyan(),
            summary.records_skipped_before_start.to_string().bright_white()
        );
    }
    println!(
        "  {} {}",
        "Geocoded:".bright_cyan(),
        outcomes.success.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Empty addresses:".bright_cyan(),
        outcomes.empty_address.to_string().bright_white()
    );
    if outcomes.skipped_by_ceiling > 0 {
        println!(
            "  {} {}",
            "Skipped after ceiling:".bright_cyan(),
            outcomes.skipped_by_ceiling.to_string().bright_white()
        );
    }
    if outcomes.key_missing > 0 {
        println!(
            "  {} {}",
            "API key missing:".bright_red(),
            outcomes.key_missing.to_string().bright_red().bold()
        );
    }
    if outcomes.failures() > 0 {
        println!(
            "  {} {} (not found {}, rate limited {}, API error {}, request failed {})",
            "Failed lookups:".bright_red(),
            outcomes.failures().to_string().bright_red().bold(),
            outcomes.not_found,
            outcomes.rate_limited,
            outcomes.api_error,
            outcomes.transport_error
        );
    }
    if summary.batches_lost > 0 {
        println!(
            "  {} {}",
            "Batches lost:".bright_red(),
            summary.batches_lost.to_string().bright_red().bold()
        );
    }
    if let Some(log_path) = &summary.log_path {
        println!(
            "  {} {} ({} entries)",
            "Diagnostics log:".bright_cyan(),
            log_path.display().to_string().bright_white(),
            summary.log_entries
        );
    }
    if summary.stopped_at_ceiling {
        if let Some(next) = summary.next_from_row() {
            println!(
                "  {} --from-row {}",
                "Record ceiling reached, continue with:".bright_yellow(),
                next.to_string().bright_white().bold()
            );
        }
    }
}
