use std::path::PathBuf;

use clap::{Parser, Subcommand};
use export_insights::dashboard::Tab;

/// Browse the statistics of a personal data export
#[derive(Parser)]
#[command(name = "insights")]
#[command(about = "Load a data export (.zip or .json) and print dashboard statistics", long_about = None)]
pub struct Cli {
    /// Dashboard config file (TOML). Defaults to config.toml in the user config dir.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print one dashboard tab, or every tab
    Show {
        /// Export file (.zip or .json)
        file: PathBuf,
        /// overview, media, engagement, followers, following or contacts
        #[arg(short, long)]
        tab: Option<Tab>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List archive entries and mark the one that would be loaded
    Entries {
        file: PathBuf,
    },
    /// Print the daily timeline and hour/weekday histograms
    Activity {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
}
