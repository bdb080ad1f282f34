mod cli;
mod logging;
mod prompt;
mod reporter;

use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use colored::*;
use dotenv::dotenv;
use mirror_sync::{
    AppConfig, FileLogSink, MemoryLogSink, PassReport, Reconciler, Scheduler, SyncSettings,
};
use reporter::CliReporter;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let config = match mirror_sync::config::load_configuration(&args.overrides()) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    match args.command.unwrap_or(Commands::Run) {
        Commands::Run => run_periodic(config),
        Commands::Once => run_once(config),
        Commands::Plan => run_plan(config),
        Commands::PrintConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn settings(mut config: AppConfig, want_interval: bool) -> SyncSettings {
    if let Err(err) = prompt::fill_missing(&mut config, want_interval) {
        error!("Error reading input: {}", err);
        process::exit(1);
    }
    match config.resolve(want_interval) {
        Ok(settings) => settings,
        Err(err) => {
            error!("{}", err);
            process::exit(1);
        }
    }
}

fn open_reconciler(settings: &SyncSettings) -> anyhow::Result<Reconciler> {
    let sink = FileLogSink::open(&settings.log_file)
        .with_context(|| format!("cannot open log file {}", settings.log_file.display()))?;
    Ok(Reconciler::new(
        &settings.source,
        &settings.replica,
        Arc::new(sink),
    ))
}

fn run_periodic(config: AppConfig) -> anyhow::Result<()> {
    let settings = settings(config, true);
    let reconciler = Arc::new(open_reconciler(&settings)?);

    let handle = Scheduler::new(reconciler, settings.interval).start(Arc::new(CliReporter::new()));
    info!(
        "Periodic synchronization started every {}s. Press Enter to stop.",
        settings.interval.as_secs()
    );

    prompt::wait_for_enter()?;
    info!("Stopping, waiting for the current pass to finish...");
    let passes = handle.stop();

    info!(
        "Periodic synchronization stopped after {} passes.",
        format!("{}", passes).green()
    );
    Ok(())
}

fn run_once(config: AppConfig) -> anyhow::Result<()> {
    let settings = settings(config, false);
    let reconciler = open_reconciler(&settings)?;

    let report = reconciler.reconcile(&CliReporter::new())?;
    print_summary(&report);

    if !report.is_clean() {
        process::exit(2);
    }
    Ok(())
}

fn run_plan(config: AppConfig) -> anyhow::Result<()> {
    let settings = settings(config, false);
    // Dry run: the action log is not opened.
    let reconciler = Reconciler::new(
        &settings.source,
        &settings.replica,
        Arc::new(MemoryLogSink::new()),
    );

    let plan = reconciler.plan()?;
    if plan.is_empty() {
        println!("{}", "Replica is up to date".green());
        return Ok(());
    }
    for action in plan.iter() {
        println!("{}", action);
    }
    println!("{} actions planned", format!("{}", plan.len()).cyan());
    Ok(())
}

fn print_summary(report: &PassReport) {
    info!(
        "Pass finished in {}: {} actions ({} copies), {} failed",
        format!("{:.2}s", report.duration.as_secs_f64()).green(),
        format!("{}", report.applied()).cyan(),
        format!("{}", report.copies()).cyan(),
        if report.is_clean() {
            format!("{}", report.failed()).green()
        } else {
            format!("{}", report.failed()).red()
        },
    );
    for failure in &report.failures {
        error!("{}", failure.message);
    }
}
