//! # wisata
//!
//! Command line front end for the visitor dataset and its forecasts.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wisata_forecast::config::EngineConfig;
use wisata_forecast::data::{DatasetStore, Series};
use wisata_forecast::error::Result;
use wisata_forecast::models::ModelOrder;
use wisata_forecast::pipeline::{ForecastPipeline, ForecastReport};
use wisata_forecast::upload::UploadedTable;

#[derive(Parser)]
#[command(name = "wisata")]
#[command(about = "Monthly visitor dataset and ARIMA forecasts", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dataset CSV, overrides the configuration
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the stored records
    List,

    /// Add a month, e.g. `add 2023-04 1.200`
    Add {
        /// Month as YYYY-MM
        period: String,
        /// Visitor count; `.` and `,` are grouping separators
        value: String,
    },

    /// Delete the record at a 1-based position
    Delete {
        #[arg(allow_hyphen_values = true)]
        position: String,
    },

    /// Forecast the stored dataset
    Forecast {
        /// Model order as p,d,q
        #[arg(long, default_value = "1,1,2")]
        order: ModelOrder,

        /// Number of months to forecast
        #[arg(short, long, allow_negative_numbers = true)]
        steps: i64,

        /// Directory for the diagnostic plots
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Forecast an uploaded CSV with a `Jumlah` column
    Upload {
        file: PathBuf,

        /// Number of months to forecast
        #[arg(short, long, allow_negative_numbers = true)]
        steps: i64,

        /// Directory for the diagnostic plots
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct Listing<'a> {
    path: String,
    records: &'a Series,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wisata=info,wisata_forecast=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let kind = err.kind();
            eprintln!("error[{:?}]: {}", kind, err);
            ExitCode::from(kind.exit_code().clamp(1, 255) as u8)
        }
    }
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    let mut config = config.with_env_overrides()?;
    if let Some(dataset) = &cli.dataset {
        config.dataset_path = dataset.clone();
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let store = DatasetStore::open(&config.dataset_path);

    match cli.command {
        Commands::List => {
            let series = store.load_required()?;
            print_json(&Listing {
                path: config.dataset_path.display().to_string(),
                records: &series,
            })
        }
        Commands::Add { period, value } => print_json(&store.add(&period, &value)?),
        Commands::Delete { position } => print_json(&store.delete_at(&position)?),
        Commands::Forecast { order, steps, out } => {
            let report = ForecastPipeline::new(config).run_manual(&store, order, steps)?;
            finish(&report, out.as_deref())
        }
        Commands::Upload { file, steps, out } => {
            let table = UploadedTable::from_path(&file)?;
            let report = ForecastPipeline::new(config).run_upload(&table, steps)?;
            finish(&report, out.as_deref())
        }
    }
}

fn finish(report: &ForecastReport, out: Option<&Path>) -> Result<()> {
    if let Some(dir) = out {
        fs::create_dir_all(dir)?;
        for (name, artifact) in report.plots.iter() {
            let path = dir.join(format!("{}.{}", name, artifact.extension()));
            fs::write(&path, &artifact.bytes)?;
            info!(path = %path.display(), bytes = artifact.len(), "plot written");
        }
    }
    print_json(report)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
