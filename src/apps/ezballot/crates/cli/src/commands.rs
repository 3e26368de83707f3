//! Subcommand handlers.

use anyhow::{bail, Context, Result};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use std::path::Path;
use tracing::{info, warn};

use ezballot_core::{Address, Command, LedgerService, SignedCommand};

use crate::{config, store};

pub fn keygen(out: &Path) -> Result<Address> {
    let key = SigningKey::generate(&mut OsRng);
    store::save_key(out, &key)?;

    let address = Address::from_public_key(&key.verifying_key());
    info!(%address, path = %out.display(), "generated key");
    println!("{address}");
    Ok(address)
}

pub fn address(key_path: &Path) -> Result<Address> {
    let address = resolve_address(key_path)?;
    println!("{address}");
    Ok(address)
}

/// The address owned by the key at `key_path`.
pub fn resolve_address(key_path: &Path) -> Result<Address> {
    let key = store::load_key(key_path)?;
    Ok(Address::from_public_key(&key.verifying_key()))
}

pub fn init(genesis_path: &Path, state_path: &Path, force: bool) -> Result<()> {
    let mut lock = store::state_lock(state_path)?;
    let _guard = lock.write().context("failed to lock ledger state")?;

    if state_path.exists() && !force {
        bail!(
            "{} already holds a ledger; pass --force to replace it",
            state_path.display()
        );
    }

    let genesis = config::load_genesis(genesis_path)?;
    let ledger = genesis.build().context("genesis rejected")?;
    store::save_ledger(state_path, &ledger.snapshot())?;

    println!(
        "initialized {} with {} candidates and {} eligible voters (admin {})",
        state_path.display(),
        ledger.candidates_count(),
        ledger.voters_count(),
        ledger.admin()
    );
    Ok(())
}

/// Sign `command` with the key at `key_path`, apply it and persist the result.
///
/// The state file is only rewritten when the ledger accepts the command. The
/// state lock is held from load to save, so concurrent submits serialize.
pub async fn submit(state_path: &Path, key_path: &Path, command: Command) -> Result<()> {
    let key = store::load_key(key_path)?;
    let signed = SignedCommand::new(command, &key)?;

    let mut lock = store::state_lock(state_path)?;
    let _guard = lock.write().context("failed to lock ledger state")?;
    let service = LedgerService::new(store::load_ledger(state_path)?);

    let event = match service.submit(&signed).await {
        Ok(event) => event,
        Err(err) if err.is_rejection() => {
            warn!(category = err.category(), "{} rejected", signed.command);
            return Err(anyhow::Error::new(err)
                .context(format!("{} rejected by the ledger", signed.command)));
        }
        Err(err) => {
            return Err(anyhow::Error::new(err)
                .context(format!("failed to apply {}", signed.command)));
        }
    };

    store::save_ledger(state_path, &service.snapshot().await)?;
    println!("{event}");
    Ok(())
}

pub async fn candidates(state_path: &Path) -> Result<()> {
    let service = LedgerService::new(store::load_ledger(state_path)?);

    println!("{:>4}  {:<24} {:>8}", "id", "name", "votes");
    for candidate in service.candidates().await {
        println!(
            "{:>4}  {:<24} {:>8}",
            candidate.id, candidate.name, candidate.vote_count
        );
    }
    println!("{} candidates", service.candidates_count().await);
    Ok(())
}

pub async fn results(state_path: &Path) -> Result<()> {
    let service = LedgerService::new(store::load_ledger(state_path)?);
    let state = service.election_state().await;
    let candidates = service.candidates().await;
    let total: u64 = service.tally().await.iter().sum();

    println!("election {state}, {total} votes cast");
    for candidate in &candidates {
        let share = if total == 0 {
            0.0
        } else {
            candidate.vote_count as f64 * 100.0 / total as f64
        };
        println!(
            "{:>4}  {:<24} {:>8} {:>6.1}%",
            candidate.id, candidate.name, candidate.vote_count, share
        );
    }

    let leaders = service.leaders().await;
    match leaders.as_slice() {
        [] => println!("no votes yet"),
        [winner] => println!("leading: {}", winner.name),
        tied => {
            let names: Vec<&str> = tied.iter().map(|c| c.name.as_str()).collect();
            println!("tied: {}", names.join(", "));
        }
    }
    Ok(())
}

pub async fn status(state_path: &Path, who: Option<Address>) -> Result<()> {
    let service = LedgerService::new(store::load_ledger(state_path)?);

    println!("state: {}", service.election_state().await);
    println!("admin: {}", service.admin().await);

    if let Some(address) = who {
        let status = service.voter_status(&address).await;
        println!("voter: {}", status.address);
        println!("  eligible:  {}", status.eligible);
        println!("  has voted: {}", status.has_voted);
    }
    Ok(())
}

pub async fn audit(state_path: &Path) -> Result<()> {
    let service = LedgerService::new(store::load_ledger(state_path)?);

    for event in service.history().await {
        println!("{event}");
    }
    println!("state hash: {}", service.state_hash().await?);
    Ok(())
}
