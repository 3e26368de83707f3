//! State-changing calls and their signed envelope.
//!
//! A `SignedCommand` proves which identity issued a command: the caller
//! address is derived from the embedded ed25519 key, and the signature covers
//! ```text
//! SignedCommand {
//!   command      : Command
//!   public_key   : [u8; 32]
//!   signature    : [u8; 64]   // over CBOR(command, public_key, timestamp_ms)
//!   timestamp_ms : u64
//! }
//! ```

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Address, CandidateId, Error};

/// The state-changing operations of the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    StartVoting,
    EndVoting,
    Vote { candidate: CandidateId },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::StartVoting => f.write_str("start_voting"),
            Command::EndVoting => f.write_str("end_voting"),
            Command::Vote { candidate } => write!(f, "vote({candidate})"),
        }
    }
}

/// A command signed by the identity that issues it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedCommand {
    pub command: Command,

    /// Ed25519 verifying key of the issuer.
    pub public_key: [u8; 32],

    /// Ed25519 signature over the command content.
    pub signature: Vec<u8>,

    /// Unix timestamp in milliseconds.
    pub timestamp_ms: u64,
}

impl SignedCommand {
    /// Create a command and sign it.
    pub fn new(command: Command, signing_key: &SigningKey) -> Result<Self, Error> {
        let timestamp_ms = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();

        let mut signed = Self {
            command,
            public_key: signing_key.verifying_key().to_bytes(),
            signature: Vec::new(),
            timestamp_ms,
        };

        let content = signed.signable_content()?;
        signed.signature = signing_key.sign(&content).to_bytes().to_vec();

        Ok(signed)
    }

    /// Get the content to be signed (everything but the signature).
    fn signable_content(&self) -> Result<Vec<u8>, Error> {
        let signable = SignableCommand {
            command: &self.command,
            public_key: &self.public_key,
            timestamp_ms: self.timestamp_ms,
        };

        let mut buf = Vec::new();
        ciborium::into_writer(&signable, &mut buf)?;
        Ok(buf)
    }

    /// Verify the signature and return the issuing address.
    pub fn sender(&self) -> Result<Address, Error> {
        let public_key = VerifyingKey::from_bytes(&self.public_key)
            .map_err(|e| Error::InvalidSignature(format!("malformed public key: {e}")))?;

        let sig_bytes: [u8; 64] = self
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| Error::InvalidSignature(format!("expected 64 bytes, got {}", self.signature.len())))?;
        let signature = Signature::from_bytes(&sig_bytes);

        let content = self.signable_content()?;
        public_key
            .verify(&content, &signature)
            .map_err(|e| Error::InvalidSignature(e.to_string()))?;

        Ok(Address::from_public_key(&public_key))
    }
}

/// Helper struct for signing (excludes the signature).
#[derive(Serialize)]
struct SignableCommand<'a> {
    command: &'a Command,
    public_key: &'a [u8; 32],
    timestamp_ms: u64,
}
