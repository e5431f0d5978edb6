//! Command-line flags. Anything given here wins over `pagepress.ron`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use pagepress_logging::LogDestination;

pub const DEFAULT_SETTINGS_FILE: &str = "pagepress.ron";

/// Save a web page as a PDF document.
#[derive(Parser, Debug)]
#[command(name = "pagepress")]
#[command(author, version, about)]
pub struct Args {
    /// Page to convert (http:// or https://)
    pub url: String,

    /// Name of the saved document (default: WebPage_DD_MM_YYYY.pdf)
    #[arg(short = 'o', long)]
    pub file_name: Option<String>,

    /// Sub-path of shared storage to save into (default: Download/PagePress)
    #[arg(short = 'p', long)]
    pub storage_path: Option<String>,

    /// Root of shared storage used by the media store
    #[arg(long)]
    pub shared_root: Option<PathBuf>,

    /// Downloads directory used by legacy storage
    #[arg(long)]
    pub downloads_root: Option<PathBuf>,

    /// Platform level; below 29 the legacy file-system regime is used
    #[arg(long)]
    pub platform_level: Option<u32>,

    /// User agent sent with the page request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Fetch timeout in milliseconds
    #[arg(short = 't', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Settings file
    #[arg(short = 'c', long, default_value = DEFAULT_SETTINGS_FILE)]
    pub config: PathBuf,

    /// Where log output goes
    #[arg(long, value_enum)]
    pub log: Option<LogTarget>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    File,
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}
