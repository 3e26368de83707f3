//! On-disk state: the ledger snapshot and signing keys.

use anyhow::{bail, Context, Result};
use ed25519_dalek::SigningKey;
use fd_lock::RwLock;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use ezballot_core::{Ledger, LedgerSnapshot};

/// Load and validate the ledger stored at `path`.
pub fn load_ledger(path: &Path) -> Result<Ledger> {
    let content = std::fs::read_to_string(path).with_context(|| {
        format!(
            "failed to read ledger state {} (run `ezballot init` first)",
            path.display()
        )
    })?;
    let snapshot: LedgerSnapshot = serde_json::from_str(&content)
        .with_context(|| format!("invalid ledger state in {}", path.display()))?;
    let ledger = Ledger::from_snapshot(snapshot)
        .with_context(|| format!("refusing to load {}", path.display()))?;

    debug!(path = %path.display(), events = ledger.history().len(), "ledger loaded");
    Ok(ledger)
}

/// Write the snapshot to a fresh temp file next to `path` and move it into place,
/// so a crash never leaves half a file.
pub fn save_ledger(path: &Path, snapshot: &LedgerSnapshot) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, snapshot)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .with_context(|| format!("failed to replace {}", path.display()))?;

    debug!(path = %path.display(), "ledger saved");
    Ok(())
}

/// Advisory lock for the ledger at `path`, kept in a sidecar `<state>.lock` file.
///
/// Hold the write guard across load, apply and save so concurrent processes
/// never overwrite each other's accepted commands.
pub fn state_lock(path: &Path) -> Result<RwLock<File>> {
    let lock_path = lock_path(path);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .with_context(|| format!("failed to open lock file {}", lock_path.display()))?;
    Ok(RwLock::new(file))
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Write a fresh signing key as hex. Never overwrites an existing file.
pub fn save_key(path: &Path, key: &SigningKey) -> Result<()> {
    if path.exists() {
        bail!("refusing to overwrite existing key file {}", path.display());
    }
    std::fs::write(path, hex::encode(key.to_bytes()))
        .with_context(|| format!("failed to write key file {}", path.display()))?;
    Ok(())
}

pub fn load_key(path: &Path) -> Result<SigningKey> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    let mut bytes = [0u8; 32];
    hex::decode_to_slice(content.trim(), &mut bytes)
        .with_context(|| format!("key file {} is not 32 hex-encoded bytes", path.display()))?;
    Ok(SigningKey::from_bytes(&bytes))
}
