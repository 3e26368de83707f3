//! ezballot-core: Core types and state machine for a single-election vote ledger.
//!
//! The ledger registers candidates and eligible voters at construction, lets a
//! single administrator open and close the voting window, accepts one vote per
//! eligible voter and keeps an auditable tally:
//!
//! ```text
//! Inactive --start_voting(admin)--> Active --end_voting(admin)--> Ended
//! ```
//!
//! - `Ledger`: the state machine itself
//! - `Command` / `SignedCommand`: state-changing calls, optionally authenticated
//! - `LedgerService`: shared handle that serializes mutations

mod address;
mod command;
mod error;
mod event;
mod hash;
mod ledger;
mod service;
mod state;
pub mod genesis;

pub use address::Address;
pub use command::{Command, SignedCommand};
pub use error::Error;
pub use event::{EventKind, LedgerEvent};
pub use genesis::GenesisConfig;
pub use hash::Hash;
pub use ledger::Ledger;
pub use service::LedgerService;
pub use state::{Candidate, CandidateId, ElectionState, LedgerSnapshot, VoterRecord, VoterStatus};

/// Re-export for convenience
pub use ed25519_dalek::SigningKey;
