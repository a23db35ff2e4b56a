use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ledger_engine::DEFAULT_LEDGER_FILENAME;

#[derive(Parser, Debug)]
#[command(name = "ledger")]
#[command(about = "Inspect and maintain the article processing ledger", long_about = None)]
pub struct Cli {
    /// Path of the ledger document
    #[arg(long, env = "ARTICLE_LEDGER_PATH", default_value = DEFAULT_LEDGER_FILENAME)]
    pub ledger: PathBuf,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print entry counts and lifetime counters as JSON
    Stats,
    /// Remove entries not processed within the given number of days
    Cleanup {
        #[arg(long = "older-than", value_name = "DAYS")]
        older_than: u32,
    },
    /// Print the stored state of one item
    Show { key: String },
    /// Forget one item so it is processed again on the next run
    Remove { key: String },
    /// List the keys whose last attempt failed
    Errors,
}
