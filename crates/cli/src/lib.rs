pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use pricewise_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use pricewise_core::RoundingMode;
use rust_decimal::Decimal;

use crate::commands::distribution::MarginTaxOverride;

#[derive(Debug, Parser)]
#[command(
    name = "pricewise",
    about = "Pricewise quote pricing CLI",
    long_about = "Price quote snapshots, compute final totals, and inspect pricing configuration.",
    after_help = "Examples:\n  pricewise price quote.json\n  pricewise final-total quote.json\n  pricewise distribution quote.json D-1 --margin 30\n  pricewise --display-scale 4 price quote.json\n  pricewise config"
)]
pub struct Cli {
    #[arg(long = "config", global = true, help = "Config file to load; it must exist")]
    config_path: Option<PathBuf>,
    #[arg(long, global = true, help = "Decimal places for displayed amounts")]
    display_scale: Option<u32>,
    #[arg(long, global = true, help = "Display rounding: half_up, half_even or truncate")]
    rounding: Option<RoundingMode>,
    #[arg(long, global = true, help = "Log level: trace, debug, info, warn or error")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Log format: compact, pretty or json")]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Flags win over env and file values.
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config_path.clone(),
            require_file: self.config_path.is_some(),
            overrides: ConfigOverrides {
                display_scale: self.display_scale,
                rounding: self.rounding,
                log_level: self.log_level.clone(),
                log_format: self.log_format,
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Compute the full price summary of a quote snapshot")]
    Price {
        #[arg(help = "Path to the quote snapshot JSON file")]
        file: PathBuf,
        #[arg(long, help = "Emit unrounded values instead of the configured display scale")]
        raw: bool,
    },
    #[command(about = "Compute only the quote total and final total price")]
    FinalTotal {
        #[arg(help = "Path to the quote snapshot JSON file")]
        file: PathBuf,
    },
    #[command(about = "Price one distributor sub-quote, optionally with a margin/tax what-if")]
    Distribution {
        #[arg(help = "Path to the quote snapshot JSON file")]
        file: PathBuf,
        #[arg(help = "Distribution identifier")]
        id: String,
        #[arg(long, help = "Margin percentage to price with instead of the stored one")]
        margin: Option<Decimal>,
        #[arg(long, help = "Tax amount to price with instead of the stored one")]
        tax: Option<Decimal>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    if let Ok(config) = AppConfig::load(options.clone()) {
        if let Err(error) = init_logging(&config) {
            eprintln!("{error}");
        }
    }

    let result = match cli.command {
        Command::Price { file, raw } => commands::price::run(&options, &file, raw),
        Command::FinalTotal { file } => commands::final_total::run(&options, &file),
        Command::Distribution { file, id, margin, tax } => commands::distribution::run(
            &options,
            &file,
            &id,
            MarginTaxOverride { margin_value: margin, tax_value: tax },
        ),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(&options) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr; stdout carries only the command payload.
pub fn init_logging(config: &AppConfig) -> Result<()> {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|error| anyhow!("failed to initialize logging: {error}"))
}
