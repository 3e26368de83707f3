//! Shared, serialized access to a ledger.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{
    Address, Candidate, Command, ElectionState, Error, Hash, Ledger, LedgerEvent, LedgerSnapshot,
    SignedCommand, VoterStatus,
};

/// Cloneable handle to one ledger.
///
/// Each mutation holds the write lock for its whole check-and-apply, so
/// mutations are totally ordered and readers only ever see committed state.
#[derive(Clone)]
pub struct LedgerService {
    ledger: Arc<RwLock<Ledger>>,
}

impl LedgerService {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
        }
    }

    /// Run a command for an already-authenticated caller.
    pub async fn execute(&self, caller: &Address, command: &Command) -> Result<LedgerEvent, Error> {
        let mut ledger = self.ledger.write().await;
        ledger.execute(caller, command)
    }

    /// Verify a signed command and run it for its signer.
    pub async fn submit(&self, signed: &SignedCommand) -> Result<LedgerEvent, Error> {
        let caller = signed.sender().map_err(|e| {
            warn!(command = %signed.command, "dropping command: {e}");
            e
        })?;
        debug!(%caller, command = %signed.command, "command received");
        self.execute(&caller, &signed.command).await
    }

    pub async fn candidates(&self) -> Vec<Candidate> {
        self.ledger.read().await.candidates().to_vec()
    }

    pub async fn candidates_count(&self) -> usize {
        self.ledger.read().await.candidates_count()
    }

    pub async fn voter_status(&self, address: &Address) -> VoterStatus {
        self.ledger.read().await.voter_status(address)
    }

    pub async fn election_state(&self) -> ElectionState {
        self.ledger.read().await.election_state()
    }

    pub async fn admin(&self) -> Address {
        *self.ledger.read().await.admin()
    }

    pub async fn tally(&self) -> Vec<u64> {
        self.ledger.read().await.tally()
    }

    pub async fn leaders(&self) -> Vec<Candidate> {
        self.ledger
            .read()
            .await
            .leaders()
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn history(&self) -> Vec<LedgerEvent> {
        self.ledger.read().await.history().to_vec()
    }

    pub async fn state_hash(&self) -> Result<Hash, Error> {
        self.ledger.read().await.state_hash()
    }

    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.ledger.read().await.snapshot()
    }
}
