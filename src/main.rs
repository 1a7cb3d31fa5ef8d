use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::error;

use tracking_reconciler::{
    reconcile_files, write_tracking_workbook, OutcomeReport, ReconcileConfig,
};

#[derive(Parser)]
#[command(
    name = "tracking-reconciler",
    about = "Write billing extract totals into the measurement tracking workbook."
)]
struct Args {
    /// Billing extract (.xlsx, .xls, .ods or .csv).
    #[arg(long, required_unless_present = "print_config_schema")]
    billing: Option<PathBuf>,

    /// Tracking workbook to update. It is read, never modified in place.
    #[arg(long, required_unless_present = "print_config_schema")]
    tracking: Option<PathBuf>,

    /// Where the updated tracking workbook is written.
    #[arg(long, default_value = "ACOMPANHAMENTO_MEDICOES_ATUALIZADO.xlsx")]
    output: PathBuf,

    /// JSON configuration overriding column names, header labels and date formats.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write the outcome report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print the JSON Schema of the configuration file and exit.
    #[arg(long)]
    print_config_schema: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    if args.print_config_schema {
        println!("{}", ReconcileConfig::schema_as_json()?);
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => ReconcileConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ReconcileConfig::default(),
    };

    let billing = args.billing.context("--billing is required")?;
    let tracking = args.tracking.context("--tracking is required")?;

    let output = reconcile_files(&billing, &tracking, &config).context("Reconciliation aborted")?;

    write_tracking_workbook(&output.workbook, &args.output, &config)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    if let Some(path) = &args.report {
        write_report(&output.report, path)?;
    }

    println!("{}", output.report);
    println!("Updated workbook written to {}", args.output.display());
    Ok(())
}

fn write_report(report: &OutcomeReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write report {}", path.display()))
}
