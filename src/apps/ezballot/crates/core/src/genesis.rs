//! Bootstrap configuration.
//!
//! The genesis config is everything a ledger needs before it exists:
//! - The admin address
//! - Candidate names, in ballot order
//! - The eligible electorate

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Address, Error, Ledger};

/// Parameters for creating a ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// The only identity allowed to start and end voting.
    pub admin: Address,
    /// Candidate names; index in this list becomes the candidate id.
    pub candidates: Vec<String>,
    /// Addresses allowed to vote. May be empty.
    #[serde(default)]
    pub eligible_voters: Vec<Address>,
}

impl GenesisConfig {
    /// Create the ledger described by this config.
    pub fn build(&self) -> Result<Ledger, Error> {
        let ledger = Ledger::new(
            self.candidates.iter().cloned(),
            self.eligible_voters.iter().copied(),
            self.admin,
        )?;

        info!(
            admin = %self.admin,
            candidates = ?self.candidates,
            "genesis applied"
        );

        Ok(ledger)
    }
}
