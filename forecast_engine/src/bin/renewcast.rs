//! Renewable potential forecasting CLI
//!
//! Commands:
//! - forecast: Forecast every location for each configured horizon
//! - evaluate: Score the ensemble and its components on held-out history
//! - rank: Rank locations per province and horizon from a forecast table

use clap::{Parser, Subcommand};
use forecast_engine::batch::{
    evaluate_locations, forecast_locations, forecast_rows_to_dataframe, rank_top_locations,
    rankings_to_dataframe, read_forecast_rows,
};
use forecast_engine::config::EngineConfig;
use forecast_engine::data::DataLoader;
use forecast_engine::error::Result;
use forecast_engine::utils::write_csv;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "renewcast")]
#[command(about = "Hybrid renewable potential forecasting per location")]
struct Cli {
    /// JSON engine configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast every location for each configured horizon
    Forecast {
        /// Daily per-location history CSV
        #[arg(short, long)]
        input: PathBuf,
        /// Forecast table to write
        #[arg(short, long, default_value = "data/forecast_results.csv")]
        output: PathBuf,
        /// Use horizon-adaptive ensemble weights
        #[arg(long)]
        adaptive: bool,
    },
    /// Score the ensemble and its components on held-out history
    Evaluate {
        /// Daily per-location history CSV
        #[arg(short, long)]
        input: PathBuf,
        /// Held-out days per location
        #[arg(short, long)]
        test_days: Option<usize>,
        /// Evaluation table to write
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rank locations per province and horizon
    Rank {
        /// Forecast table written by `forecast`
        #[arg(short, long, default_value = "data/forecast_results.csv")]
        input: PathBuf,
        /// Ranking table to write
        #[arg(short, long, default_value = "data/top_ranked_cities.csv")]
        output: PathBuf,
        /// Locations kept per province and horizon
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_json_file(path),
        None => Ok(EngineConfig::default()),
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Forecast {
            input,
            output,
            adaptive,
        } => {
            config.ensemble.adaptive |= adaptive;
            let locations = DataLoader::from_csv(&input, &config.target_column)?;
            info!(locations = locations.len(), "Loaded history");

            let rows = forecast_locations(&locations, &config);
            let mut df = forecast_rows_to_dataframe(&rows)?;
            ensure_parent(&output)?;
            write_csv(&mut df, &output)?;
            println!("Wrote {} forecast rows to {}", rows.len(), output.display());
        }
        Commands::Evaluate {
            input,
            test_days,
            output,
        } => {
            if let Some(days) = test_days {
                config.test_days = days;
                config.validate()?;
            }
            let locations = DataLoader::from_csv(&input, &config.target_column)?;
            let evaluations = evaluate_locations(&locations, &config);

            let mut tables = Vec::with_capacity(evaluations.len());
            for evaluation in &evaluations {
                println!("{}\n{}", evaluation.location, evaluation.report);

                let mut df = evaluation.report.to_dataframe()?;
                let height = df.height();
                df.with_column(Series::new(
                    "province",
                    vec![evaluation.location.province.as_str(); height],
                ))?;
                df.with_column(Series::new(
                    "city",
                    vec![evaluation.location.city.as_str(); height],
                ))?;
                tables.push(df);
            }

            if let Some(output) = output {
                if let Some((first, rest)) = tables.split_first() {
                    let mut combined = first.clone();
                    for df in rest {
                        combined.vstack_mut(df)?;
                    }
                    ensure_parent(&output)?;
                    write_csv(&mut combined, &output)?;
                    println!("Wrote evaluation table to {}", output.display());
                }
            }
        }
        Commands::Rank {
            input,
            output,
            top_n,
        } => {
            if let Some(n) = top_n {
                config.top_n = n;
                config.validate()?;
            }
            let rows = read_forecast_rows(&input)?;
            let ranked = rank_top_locations(&rows, config.top_n);

            let mut df = rankings_to_dataframe(&ranked)?;
            println!("{}", df);
            ensure_parent(&output)?;
            write_csv(&mut df, &output)?;
            println!("Wrote {} ranked rows to {}", ranked.len(), output.display());
        }
    }

    Ok(())
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    run(Cli::parse())?;
    Ok(())
}
