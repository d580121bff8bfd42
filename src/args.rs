use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::paths::CONFIG_DIR_ENV;
use crate::resolve::Overrides;

#[derive(Parser, Debug)]
#[command(name = "gs-write")]
#[command(about = "Write CSV from standard input to a new Google Spreadsheet")]
#[command(
    long_about = "Write CSV from standard input to a new Google Spreadsheet and print its URL.\n\n\
                  Examples:\n  \
                  cat report.csv | gs-write --title \"Monthly Report\"\n  \
                  cat data.csv | gs-write --freeze-rows 1 --filter-header-row 1"
)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Title of the spreadsheet (default: generated from the current time)
    #[arg(long, value_name = "TITLE", default_value = "")]
    pub title: String,

    /// Number of rows to freeze (overrides config file)
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub freeze_rows: Option<i64>,

    /// Number of columns to freeze (overrides config file)
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub freeze_cols: Option<i64>,

    /// Header row for the basic filter, 0 disables it (overrides config file)
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub filter_header_row: Option<i64>,

    /// Log level
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Directory holding auth.json and config.toml
    #[arg(long, global = true, value_name = "DIR", env = CONFIG_DIR_ENV)]
    pub config_dir: Option<PathBuf>,
}

impl Args {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            freeze_rows: self.freeze_rows,
            freeze_cols: self.freeze_cols,
            filter_header_row: self.filter_header_row,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Authenticate with the Google Sheets API
    Auth {
        /// Path to credentials.json (default: paste it on standard input)
        #[arg(long, value_name = "PATH")]
        credentials: Option<PathBuf>,
    },
    /// Manage settings (freeze.rows, freeze.cols, filter.header_row)
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show settings and credentials with secrets masked
    Info,
    /// Show version and build information
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// List all settings with their effective values
    List,
    /// Print the effective value of a setting
    Get { key: String },
    /// Set a setting to a non-negative integer
    Set {
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Remove a setting, reverting to the default
    Unset { key: String },
}
