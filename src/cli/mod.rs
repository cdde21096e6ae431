pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "shelfscan")]
#[command(about = "Scrapes branded product listings from grocery storefronts", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/shelfscan/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for CSV snapshots, overriding the config file
    #[arg(short, long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scrape one retailer, or all of them in sequence
    Run {
        /// Retailer name (e.g. blinkit); omit to run every retailer
        retailer: Option<String>,
    },
    /// List configured retailers and their latest snapshots
    List,
    /// Print the path of a retailer's most recent snapshot
    Latest {
        retailer: String,
    },
    /// Compare a retailer's latest snapshot against benchmark prices
    Report {
        retailer: String,
    },
    /// Write the benchmark comparison to a CSV file
    Export {
        retailer: String,

        /// Output path (default: <output dir>/export_with_benchmarks_<retailer>.csv)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run every retailer repeatedly until interrupted
    Schedule {
        /// Interval between runs (e.g., "1h", "30m", "6h", "1d")
        #[arg(short, long, default_value = "6h")]
        interval: String,

        /// Skip the run on start
        #[arg(long)]
        no_initial_run: bool,
    },
}
