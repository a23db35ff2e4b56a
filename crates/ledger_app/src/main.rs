mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use ledger_engine::{EntryStatus, LedgerManager, ManagerSettings};
use ledger_logging::LogDestination;
use log::LevelFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = match cli.log_file.clone() {
        Some(path) => LogDestination::Both(path),
        None => LogDestination::Terminal,
    };
    ledger_logging::initialize(destination, level);

    let manager = LedgerManager::open(ManagerSettings::at(&cli.ledger));

    match cli.command {
        Commands::Stats => {
            let stats = manager.statistics();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Cleanup { older_than } => {
            let removed = manager
                .cleanup(older_than)
                .with_context(|| format!("cleaning up {}", cli.ledger.display()))?;
            println!("removed {removed} entries older than {older_than} days");
        }
        Commands::Show { key } => match manager.get_state(&key) {
            Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
            None => println!("{key} is not in the ledger"),
        },
        Commands::Remove { key } => {
            let known = manager.is_processed(&key);
            manager
                .remove(&key)
                .with_context(|| format!("removing {key} from {}", cli.ledger.display()))?;
            if known {
                println!("removed {key}");
            } else {
                println!("{key} was not in the ledger");
            }
        }
        Commands::Errors => {
            for key in manager.entries_with_status(EntryStatus::Error) {
                let message = manager
                    .get_state(&key)
                    .and_then(|state| state.error().map(str::to_string))
                    .unwrap_or_default();
                println!("{key}\t{message}");
            }
        }
    }

    Ok(())
}
