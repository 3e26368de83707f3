//! Error types for ezballot-core.

use thiserror::Error;

use crate::{CandidateId, ElectionState};

/// Core errors.
///
/// The first six variants are ledger rule rejections; every one of them is
/// returned before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Caller is not the administrator.
    #[error("only the admin can perform this action")]
    Unauthorized,

    /// Requested lifecycle transition is not legal from the current state.
    #[error("cannot move election from {from} to {to}")]
    InvalidStateTransition {
        from: ElectionState,
        to: ElectionState,
    },

    /// Vote attempted outside the voting window.
    #[error("voting is not active")]
    VotingNotActive,

    /// Caller has no eligible voter record.
    #[error("you are not an eligible voter")]
    NotEligible,

    /// Caller already cast a vote.
    #[error("you have already voted")]
    AlreadyVoted,

    /// Candidate index outside the registered range.
    #[error("invalid candidate ID: {0}")]
    InvalidCandidate(CandidateId),

    /// Ledger constructed without candidates.
    #[error("at least one candidate is required")]
    NoCandidates,

    /// Candidate name is empty or whitespace.
    #[error("candidate name at position {index} is empty")]
    EmptyCandidateName { index: usize },

    /// Signature does not verify against the embedded key.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Address text is not `0x` followed by 40 hex digits.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Restored snapshot breaks a ledger invariant.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

impl Error {
    /// Whether this is a ledger rule rejection rather than an input or encoding failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized
                | Self::InvalidStateTransition { .. }
                | Self::VotingNotActive
                | Self::NotEligible
                | Self::AlreadyVoted
                | Self::InvalidCandidate(_)
        )
    }

    /// Get the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::InvalidStateTransition { .. } => "invalid_state_transition",
            Self::VotingNotActive => "voting_not_active",
            Self::NotEligible => "not_eligible",
            Self::AlreadyVoted => "already_voted",
            Self::InvalidCandidate(_) => "invalid_candidate",
            Self::NoCandidates | Self::EmptyCandidateName { .. } => "construction",
            Self::InvalidSignature(_) => "signature",
            Self::InvalidAddress(_) => "address",
            Self::Serialization(_) => "serialization",
            Self::CorruptSnapshot(_) => "snapshot",
        }
    }
}

impl From<ciborium::ser::Error<std::io::Error>> for Error {
    fn from(e: ciborium::ser::Error<std::io::Error>) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
