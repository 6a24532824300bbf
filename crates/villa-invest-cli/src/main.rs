mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::export::ExportArgs;
use commands::financing::{ScheduleArgs, SchemesArgs};
use commands::project::EvaluateArgs;
use commands::scenarios::{CompareArgs, RoiChartArgs, SensitivityArgs, SweepArgs};

/// Villa development investment calculator
#[derive(Parser)]
#[command(
    name = "villa",
    version,
    about = "Villa development investment calculator",
    long_about = "Evaluates a vacation-villa development project with decimal precision: \
                  construction cost, operating profit, loan amortization, subsidy bounds, \
                  NPV, IRR, ROI and payback, plus parameter sweeps, sensitivity grids \
                  and scenario comparison."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a project (metrics, loan schedule, cash flows)
    Evaluate(EvaluateArgs),
    /// Build a monthly loan amortization schedule
    Schedule(ScheduleArgs),
    /// Compare the repayment schemes for the project loan
    Schemes(SchemesArgs),
    /// Re-evaluate the project across values of one parameter
    Sweep(SweepArgs),
    /// ROI at each villa count (chart data)
    RoiChart(RoiChartArgs),
    /// Two-variable sensitivity grid on one metric
    Sensitivity(SensitivityArgs),
    /// Compare two scenarios side by side
    Compare(CompareArgs),
    /// Write parameters, metrics, loan schedule and chart data as CSV files
    Export(ExportArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
    Text,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Evaluate(args) => commands::project::run_evaluate(args),
        Commands::Schedule(args) => commands::financing::run_schedule(args),
        Commands::Schemes(args) => commands::financing::run_schemes(args),
        Commands::Sweep(args) => commands::scenarios::run_sweep(args),
        Commands::RoiChart(args) => commands::scenarios::run_roi_chart(args),
        Commands::Sensitivity(args) => commands::scenarios::run_sensitivity(args),
        Commands::Compare(args) => commands::scenarios::run_compare(args),
        Commands::Export(args) => commands::export::run_export(args),
        Commands::Version => {
            println!("villa {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
