//! The vote ledger: owns candidates, voter records, the election state and the tally.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::{
    Address, Candidate, CandidateId, Command, ElectionState, Error, EventKind, Hash, LedgerEvent,
    LedgerSnapshot, VoterRecord, VoterStatus,
};

/// A single election instance.
///
/// Every mutating operation checks all of its preconditions before writing
/// anything, so a rejected call leaves the ledger exactly as it was.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ledger {
    admin: Address,
    state: ElectionState,
    candidates: Vec<Candidate>,
    voters: BTreeMap<Address, VoterRecord>,
    history: Vec<LedgerEvent>,
}

impl Ledger {
    /// Create a ledger in the `Inactive` state.
    ///
    /// Candidates are registered in input order with indices from 0. Every
    /// listed voter becomes eligible; duplicate addresses collapse into one
    /// record.
    pub fn new<N, S, V>(candidate_names: N, eligible_voters: V, admin: Address) -> Result<Self, Error>
    where
        N: IntoIterator<Item = S>,
        S: Into<String>,
        V: IntoIterator<Item = Address>,
    {
        let mut candidates = Vec::new();
        for (index, name) in candidate_names.into_iter().enumerate() {
            let name = name.into().trim().to_string();
            if name.is_empty() {
                return Err(Error::EmptyCandidateName { index });
            }
            candidates.push(Candidate {
                id: index as CandidateId,
                name,
                vote_count: 0,
            });
        }

        if candidates.is_empty() {
            return Err(Error::NoCandidates);
        }

        let voters: BTreeMap<Address, VoterRecord> = eligible_voters
            .into_iter()
            .map(|address| {
                let record = VoterRecord {
                    eligible: true,
                    has_voted: false,
                };
                (address, record)
            })
            .collect();

        info!(
            %admin,
            candidates = candidates.len(),
            voters = voters.len(),
            "ledger created"
        );

        Ok(Self {
            admin,
            state: ElectionState::Inactive,
            candidates,
            voters,
            history: Vec::new(),
        })
    }

    /// Rebuild a ledger from its persisted form, refusing snapshots that break an invariant.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self, Error> {
        let ledger = Self {
            admin: snapshot.admin,
            state: snapshot.state,
            candidates: snapshot.candidates,
            voters: snapshot.voters,
            history: snapshot.history,
        };
        ledger.verify_invariants()?;
        Ok(ledger)
    }

    /// Copy out the persisted form.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            admin: self.admin,
            state: self.state,
            candidates: self.candidates.clone(),
            voters: self.voters.clone(),
            history: self.history.clone(),
        }
    }

    /// BLAKE3 hash over the CBOR encoding of the snapshot.
    pub fn state_hash(&self) -> Result<Hash, Error> {
        Hash::of_value(&self.snapshot())
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Dispatch a command on behalf of `caller`.
    pub fn execute(&mut self, caller: &Address, command: &Command) -> Result<LedgerEvent, Error> {
        match command {
            Command::StartVoting => self.start_voting(caller),
            Command::EndVoting => self.end_voting(caller),
            Command::Vote { candidate } => self.vote(*candidate, caller),
        }
    }

    /// Open the voting window. Admin only, from `Inactive`.
    pub fn start_voting(&mut self, caller: &Address) -> Result<LedgerEvent, Error> {
        self.transition(
            caller,
            ElectionState::Active,
            EventKind::VotingStarted { by: *caller },
        )
    }

    /// Close the voting window for good. Admin only, from `Active`.
    pub fn end_voting(&mut self, caller: &Address) -> Result<LedgerEvent, Error> {
        self.transition(
            caller,
            ElectionState::Ended,
            EventKind::VotingEnded { by: *caller },
        )
    }

    fn transition(
        &mut self,
        caller: &Address,
        target: ElectionState,
        kind: EventKind,
    ) -> Result<LedgerEvent, Error> {
        if caller != &self.admin {
            return Err(rejected(Error::Unauthorized, caller));
        }

        if !self.state.can_transition_to(target) {
            let err = Error::InvalidStateTransition {
                from: self.state,
                to: target,
            };
            return Err(rejected(err, caller));
        }

        info!(from = %self.state, to = %target, "election state changed");
        self.state = target;
        Ok(self.record(kind))
    }

    /// Cast `caller`'s single vote for `candidate`.
    ///
    /// Preconditions are checked in a fixed order so the reported error is
    /// reproducible: voting window, eligibility, prior vote, candidate index.
    pub fn vote(&mut self, candidate: CandidateId, caller: &Address) -> Result<LedgerEvent, Error> {
        if self.state != ElectionState::Active {
            return Err(rejected(Error::VotingNotActive, caller));
        }

        let record = match self.voters.get_mut(caller) {
            Some(record) if record.eligible => record,
            _ => return Err(rejected(Error::NotEligible, caller)),
        };

        if record.has_voted {
            return Err(rejected(Error::AlreadyVoted, caller));
        }

        let index = match usize::try_from(candidate) {
            Ok(index) if index < self.candidates.len() => index,
            _ => return Err(rejected(Error::InvalidCandidate(candidate), caller)),
        };

        // All checks passed: commit both writes together.
        record.has_voted = true;
        self.candidates[index].vote_count += 1;

        debug!(voter = %caller, candidate, "vote accepted");
        Ok(self.record(EventKind::VoteCast {
            voter: *caller,
            candidate,
        }))
    }

    fn record(&mut self, kind: EventKind) -> LedgerEvent {
        let event = LedgerEvent {
            seq: self.history.len() as u64,
            kind,
        };
        self.history.push(event.clone());
        event
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// All candidates in registration order.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidates_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        usize::try_from(id).ok().and_then(|index| self.candidates.get(index))
    }

    /// Unknown identities are simply not eligible.
    pub fn is_eligible(&self, address: &Address) -> bool {
        self.voters.get(address).is_some_and(|record| record.eligible)
    }

    /// Unknown identities have not voted.
    pub fn has_voted(&self, address: &Address) -> bool {
        self.voters.get(address).is_some_and(|record| record.has_voted)
    }

    pub fn voter_status(&self, address: &Address) -> VoterStatus {
        let record = self.voters.get(address).copied().unwrap_or_default();
        VoterStatus {
            address: *address,
            eligible: record.eligible,
            has_voted: record.has_voted,
        }
    }

    /// Number of registered voter records.
    pub fn voters_count(&self) -> usize {
        self.voters.len()
    }

    pub fn election_state(&self) -> ElectionState {
        self.state
    }

    pub fn is_voting_active(&self) -> bool {
        self.state == ElectionState::Active
    }

    pub fn admin(&self) -> &Address {
        &self.admin
    }

    /// Vote counts in candidate order.
    pub fn tally(&self) -> Vec<u64> {
        self.candidates.iter().map(|c| c.vote_count).collect()
    }

    pub fn total_votes(&self) -> u64 {
        self.candidates.iter().map(|c| c.vote_count).sum()
    }

    /// Candidates sharing the highest count. Empty until the first vote lands.
    pub fn leaders(&self) -> Vec<&Candidate> {
        let top = self
            .candidates
            .iter()
            .map(|c| c.vote_count)
            .max()
            .unwrap_or(0);
        if top == 0 {
            return Vec::new();
        }
        self.candidates
            .iter()
            .filter(|c| c.vote_count == top)
            .collect()
    }

    /// Accepted mutations, oldest first.
    pub fn history(&self) -> &[LedgerEvent] {
        &self.history
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    /// Check every structural invariant of the ledger.
    pub fn verify_invariants(&self) -> Result<(), Error> {
        let corrupt = |msg: String| Err(Error::CorruptSnapshot(msg));

        if self.candidates.is_empty() {
            return corrupt("no candidates".into());
        }
        for (index, candidate) in self.candidates.iter().enumerate() {
            if candidate.id != index as CandidateId {
                return corrupt(format!(
                    "candidate at position {index} has id {}",
                    candidate.id
                ));
            }
            if candidate.name.trim().is_empty() {
                return corrupt(format!("candidate {index} has an empty name"));
            }
        }

        if let Some((address, _)) = self
            .voters
            .iter()
            .find(|(_, record)| record.has_voted && !record.eligible)
        {
            return corrupt(format!("{address} voted without being eligible"));
        }

        let voted = self.voters.values().filter(|r| r.has_voted).count() as u64;
        let total = self.total_votes();
        if voted != total {
            return corrupt(format!("tally sums to {total} but {voted} voters have voted"));
        }
        if self.state == ElectionState::Inactive && total > 0 {
            return corrupt("votes recorded before voting started".into());
        }

        self.verify_history()
    }

    fn verify_history(&self) -> Result<(), Error> {
        let corrupt = |msg: String| Err(Error::CorruptSnapshot(msg));

        let mut counts = vec![0u64; self.candidates.len()];
        let mut voters = BTreeSet::new();
        let mut replayed = ElectionState::Inactive;

        for (index, event) in self.history.iter().enumerate() {
            if event.seq != index as u64 {
                return corrupt(format!("event at position {index} has seq {}", event.seq));
            }
            match &event.kind {
                EventKind::VotingStarted { by } | EventKind::VotingEnded { by } => {
                    if by != &self.admin {
                        return corrupt(format!("transition #{} issued by non-admin {by}", event.seq));
                    }
                    let target = match event.kind {
                        EventKind::VotingStarted { .. } => ElectionState::Active,
                        _ => ElectionState::Ended,
                    };
                    if !replayed.can_transition_to(target) {
                        return corrupt(format!("illegal transition at #{}", event.seq));
                    }
                    replayed = target;
                }
                EventKind::VoteCast { voter, candidate } => {
                    if replayed != ElectionState::Active {
                        return corrupt(format!("vote #{} cast outside the voting window", event.seq));
                    }
                    let slot = usize::try_from(*candidate)
                        .ok()
                        .and_then(|i| counts.get_mut(i));
                    match slot {
                        Some(count) => *count += 1,
                        None => return corrupt(format!("vote #{} for unknown candidate", event.seq)),
                    }
                    if !voters.insert(*voter) || !self.has_voted(voter) {
                        return corrupt(format!("vote #{} by {voter} does not match voter records", event.seq));
                    }
                }
            }
        }

        if replayed != self.state {
            return corrupt(format!("history ends in {replayed} but state is {}", self.state));
        }
        if counts != self.tally() {
            return corrupt("tally does not match recorded votes".into());
        }
        Ok(())
    }
}

fn rejected(err: Error, caller: &Address) -> Error {
    debug!(%caller, category = err.category(), "rejected: {err}");
    err
}
