use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use shopledger::app::{self, ReportOptions};
use shopledger::clock::SystemClock;
use shopledger::config::{default_config_path, ResolvedConfig};
use shopledger::ledger::{window::custom_window, WindowPreset};
use shopledger::source::{HttpPaymentLookup, JsonFileSource, PaymentLookup};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "shopledger")]
#[command(about = "Financial reconciliation and reporting for a repair workshop")]
struct Cli {
    /// Path to config file (defaults to ./shopledger.toml, then the user data dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct WindowArgs {
    /// Window: all, week, month, quarter, year, or <N>d
    #[arg(short, long)]
    window: Option<String>,

    /// Start date (YYYY-MM-DD or RFC3339); overrides --window
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD or RFC3339), inclusive; overrides --window
    #[arg(long)]
    end: Option<String>,
}

impl WindowArgs {
    fn preset(&self, config: &ResolvedConfig) -> Result<WindowPreset> {
        if self.start.is_some() || self.end.is_some() {
            let window = custom_window(self.start.as_deref(), self.end.as_deref(), config.timezone)?;
            return Ok(WindowPreset::Custom(window));
        }
        match &self.window {
            Some(w) => WindowPreset::parse(w),
            None => Ok(WindowPreset::TrailingDays(config.reporting.trailing_days)),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Show current configuration
    Config,

    /// KPIs, monthly trend and grouped tables as JSON
    Report {
        #[command(flatten)]
        window: WindowArgs,

        /// Skip the comparison with the prior window
        #[arg(long)]
        no_compare: bool,

        /// Number of top clients/categories to list
        #[arg(long)]
        top: Option<usize>,
    },

    /// Transaction ledger (newest first) as JSON
    Ledger {
        #[command(flatten)]
        window: WindowArgs,
    },
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = ResolvedConfig::load_or_default(&config_path)?;
    debug!(config = %config_path.display(), data_dir = %config.data_dir.display(), "config loaded");

    let source = JsonFileSource::new(&config.data_dir);
    let clock = SystemClock;

    let http_lookup;
    let payments: &dyn PaymentLookup = match &config.payments.base_url {
        Some(base_url) => {
            debug!(%base_url, "using HTTP payment lookup");
            http_lookup = HttpPaymentLookup::new(base_url.clone());
            &http_lookup
        }
        None => &source,
    };

    match cli.command {
        Command::Config => print_json(&app::config_output(&config_path, &config))?,
        Command::Report {
            window,
            no_compare,
            top,
        } => {
            let mut opts = ReportOptions::from_config(&config);
            opts.window = window.preset(&config)?;
            opts.compare = !no_compare;
            if let Some(top) = top {
                opts.top = top;
            }
            let output = app::financial_report(&source, payments, &config, &clock, &opts).await?;
            print_json(&output)?;
        }
        Command::Ledger { window } => {
            let preset = window.preset(&config)?;
            let output =
                app::transaction_ledger_report(&source, payments, &config, &clock, preset).await?;
            print_json(&output)?;
        }
    }

    Ok(())
}
