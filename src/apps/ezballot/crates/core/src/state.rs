//! Ledger data model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{Address, LedgerEvent};

/// Index of a candidate, assigned sequentially from 0 at registration.
pub type CandidateId = u64;

/// A registered candidate and its running tally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub vote_count: u64,
}

/// Per-identity facts held by the ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    /// Set at construction, never changed.
    pub eligible: bool,
    /// Flips to true on the first accepted vote, then stays true.
    pub has_voted: bool,
}

/// Lifecycle phase of the election.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionState {
    #[default]
    Inactive,
    Active,
    Ended,
}

impl ElectionState {
    /// The only state reachable from this one, if any.
    pub fn next(self) -> Option<ElectionState> {
        match self {
            ElectionState::Inactive => Some(ElectionState::Active),
            ElectionState::Active => Some(ElectionState::Ended),
            ElectionState::Ended => None,
        }
    }

    pub fn can_transition_to(self, target: ElectionState) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for ElectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElectionState::Inactive => "inactive",
            ElectionState::Active => "active",
            ElectionState::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// Answer to an eligibility / has-voted query for one identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterStatus {
    pub address: Address,
    pub eligible: bool,
    pub has_voted: bool,
}

/// The persisted form of a ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub admin: Address,
    pub state: ElectionState,
    pub candidates: Vec<Candidate>,
    pub voters: BTreeMap<Address, VoterRecord>,
    pub history: Vec<LedgerEvent>,
}
