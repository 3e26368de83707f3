//! ezballot: command-line front end for the vote ledger.
//!
//! Bootstraps a ledger from a genesis file, signs and submits commands with
//! local ed25519 keys, and reads candidates, results and the audit trail back
//! out of the persisted snapshot.

mod commands;
mod config;
mod store;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

use config::CliConfig;
use ezballot_core::{Address, Command};

#[derive(Parser)]
#[command(name = "ezballot")]
#[command(about = "Single-election vote ledger with admin-gated voting window")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "ezballot.toml")]
    config: PathBuf,

    /// Ledger state file (overrides the config file)
    #[arg(short, long)]
    state: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a signing key and print its address
    Keygen {
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Print the address of a signing key
    Address {
        #[arg(short, long)]
        key: PathBuf,
    },
    /// Create the ledger from a genesis file
    Init {
        #[arg(short, long)]
        genesis: PathBuf,

        /// Replace an existing ledger
        #[arg(long)]
        force: bool,
    },
    /// Open the voting window (admin)
    Start {
        #[arg(short, long)]
        key: PathBuf,
    },
    /// Close the voting window for good (admin)
    End {
        #[arg(short, long)]
        key: PathBuf,
    },
    /// Cast a vote for a candidate index
    Vote {
        candidate: u64,

        #[arg(short, long)]
        key: PathBuf,
    },
    /// List candidates and their counts
    Candidates,
    /// Show the tally and the current leader
    Results,
    /// Show election state, and eligibility for one identity
    Status {
        #[arg(short, long, conflicts_with = "key")]
        address: Option<Address>,

        #[arg(short, long)]
        key: Option<PathBuf>,
    },
    /// Print the audit trail and state hash
    Audit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_error) = match CliConfig::load(&cli.config) {
        Ok(config) => (config, None),
        Err(e) => (CliConfig::default(), Some(e)),
    };

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { config.log_level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "ezballot_core={log_level},ezballot={log_level},warn"
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(e) = config_error {
        if cli.config.exists() {
            warn!("Failed to load config {}: {e}, using defaults", cli.config.display());
        }
    }

    let state_path = cli.state.unwrap_or(config.state_path);

    match cli.command {
        Commands::Keygen { out } => commands::keygen(&out).map(drop)?,
        Commands::Address { key } => commands::address(&key).map(drop)?,
        Commands::Init { genesis, force } => commands::init(&genesis, &state_path, force)?,
        Commands::Start { key } => {
            commands::submit(&state_path, &key, Command::StartVoting).await?
        }
        Commands::End { key } => commands::submit(&state_path, &key, Command::EndVoting).await?,
        Commands::Vote { candidate, key } => {
            commands::submit(&state_path, &key, Command::Vote { candidate }).await?
        }
        Commands::Candidates => commands::candidates(&state_path).await?,
        Commands::Results => commands::results(&state_path).await?,
        Commands::Status { address, key } => {
            let who = match (address, key) {
                (Some(address), _) => Some(address),
                (None, Some(key)) => Some(
                    commands::resolve_address(&key)
                        .context("cannot resolve --key to an address")?,
                ),
                (None, None) => None,
            };
            commands::status(&state_path, who).await?
        }
        Commands::Audit => commands::audit(&state_path).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn vote_parses_index_and_key() {
        let cli = Cli::parse_from(["ezballot", "vote", "2", "--key", "voter.key"]);
        match cli.command {
            Commands::Vote { candidate, key } => {
                assert_eq!(candidate, 2);
                assert_eq!(key, PathBuf::from("voter.key"));
            }
            _ => panic!("expected vote"),
        }
    }

    #[test]
    fn status_accepts_key_instead_of_address() {
        let cli = Cli::parse_from(["ezballot", "status", "--key", "voter.key"]);
        match cli.command {
            Commands::Status { address, key } => {
                assert!(address.is_none());
                assert_eq!(key, Some(PathBuf::from("voter.key")));
            }
            _ => panic!("expected status"),
        }
    }

    #[test]
    fn status_parses_address() {
        let cli = Cli::parse_from([
            "ezballot",
            "--state",
            "election.json",
            "status",
            "--address",
            "0x0101010101010101010101010101010101010101",
        ]);
        assert_eq!(cli.state, Some(PathBuf::from("election.json")));
        match cli.command {
            Commands::Status { address, key } => {
                assert_eq!(address, Some(Address([1; 20])));
                assert!(key.is_none());
            }
            _ => panic!("expected status"),
        }
    }
}
