//! Audit trail of accepted mutations.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Address, CandidateId};

/// One accepted mutation, numbered in the order it was applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub seq: u64,
    pub kind: EventKind,
}

/// What the mutation did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    VotingStarted { by: Address },
    VotingEnded { by: Address },
    VoteCast { voter: Address, candidate: CandidateId },
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::VotingStarted { by } => write!(f, "voting started by {by}"),
            EventKind::VotingEnded { by } => write!(f, "voting ended by {by}"),
            EventKind::VoteCast { voter, candidate } => {
                write!(f, "{voter} voted for candidate {candidate}")
            }
        }
    }
}

impl fmt::Display for LedgerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.seq, self.kind)
    }
}
