//! Command-line interface definitions for the archive harvester.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every option is optional: anything left unset falls back to the YAML
//! configuration file (when one is given) and then to the built-in defaults.

use crate::config::FailurePolicy;
use crate::models::Period;
use clap::Parser;

/// Command-line arguments for the archive harvester.
///
/// # Examples
///
/// ```sh
/// # Crawl January 2022 through the current month into the working directory
/// archive_harvester
///
/// # Crawl one year into ./out and stop at the first failed month
/// archive_harvester --start 2023-01 --end 2023-12 -o ./out --on-period-failure abort
///
/// # Load selectors and timings from a file
/// archive_harvester --config harvest.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML configuration file
    #[arg(short, long, env = "HARVEST_CONFIG")]
    pub config: Option<String>,

    /// Directory that receives articles.html and articles.json
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// First archive month to crawl (YYYY-MM)
    #[arg(long)]
    pub start: Option<Period>,

    /// Last archive month to crawl (YYYY-MM); defaults to the current month
    #[arg(long)]
    pub end: Option<Period>,

    /// Archive root; month pages live at {base-url}/{year}/{month}
    #[arg(long)]
    pub base_url: Option<String>,

    /// What to do when a month cannot be crawled
    #[arg(long, value_enum)]
    pub on_period_failure: Option<FailurePolicy>,

    /// Maximum load-more clicks per month before the month is abandoned
    #[arg(long)]
    pub max_expansions: Option<usize>,

    /// Keep every record even when several share a URL
    #[arg(long)]
    pub keep_duplicates: bool,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headful: bool,
}
