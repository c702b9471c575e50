pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use labprice_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing::Level;

#[derive(Debug, Parser)]
#[command(
    name = "labprice",
    about = "Lab test pricing CLI",
    long_about = "Resolve, explain, and lint pricing specs for billable lab units.",
    after_help = "Examples:\n  labprice resolve --spec tsh.json --param AGE=42\n  labprice price --unit panel.json --overrides overrides.json --referrer clinic-a\n  labprice check --spec tsh.json --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Resolve a pricing spec against parameter values")]
    Resolve {
        #[arg(long, help = "Path to a pricing spec JSON file")]
        spec: PathBuf,
        #[arg(long = "param", value_name = "NAME=VALUE", help = "Parameter value, repeatable")]
        params: Vec<String>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Price a billable unit through the referrer override cascade")]
    Price {
        #[arg(long, help = "Path to a billable unit JSON file")]
        unit: PathBuf,
        #[arg(long, help = "Path to a JSON array of price overrides")]
        overrides: Option<PathBuf>,
        #[arg(long, help = "Referrer whose overrides apply")]
        referrer: Option<String>,
        #[arg(long = "param", value_name = "NAME=VALUE", help = "Parameter value, repeatable")]
        params: Vec<String>,
        #[arg(long, help = "Reject units whose base pricing fails validation")]
        strict: bool,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Print the human-readable explanation of a pricing spec")]
    Explain {
        #[arg(long, help = "Path to a pricing spec JSON file")]
        spec: PathBuf,
    },
    #[command(about = "Validate a pricing spec and list authoring issues")]
    Check {
        #[arg(long, help = "Path to a pricing spec JSON file")]
        spec: PathBuf,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Err(error) = init_logging() {
        eprintln!("logging disabled: {error:#}");
    }

    let result = match cli.command {
        Command::Resolve { spec, params, json } => commands::resolve::run(&spec, &params, json),
        Command::Price { unit, overrides, referrer, params, strict, json } => {
            commands::price::run(commands::price::PriceArgs {
                unit_path: &unit,
                overrides_path: overrides.as_deref(),
                referrer: referrer.as_deref(),
                parameter_pairs: &params,
                strict,
                json_output: json,
            })
        }
        Command::Explain { spec } => commands::explain::run(&spec),
        Command::Check { spec, json } => commands::check::run(&spec, json),
        Command::Config => commands::CommandResult::text(0, commands::config::run()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Installs the stderr subscriber so stdout stays reserved for command output.
fn init_logging() -> anyhow::Result<()> {
    let config = AppConfig::load(LoadOptions::default()).context("loading logging configuration")?;
    let level: Level = config
        .logging
        .level
        .trim()
        .parse()
        .map_err(|_| anyhow!("unsupported log level `{}`", config.logging.level))?;

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(level);

    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|error| anyhow!("could not install tracing subscriber: {error}"))
}
