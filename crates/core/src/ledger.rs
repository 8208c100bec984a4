//! The election ledger: owner, phase, registries, tallies and event log.
//!
//! Every mutating call follows the same shape: validate against the current
//! state, seal the log entry, then apply. Nothing is written until every
//! check (including sealing) has passed, so a rejected call leaves the
//! ledger exactly as it was.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::event::{genesis_hash, verify_chain};
use crate::{
    Candidate, CandidateId, CandidateRegistry, Clock, ElectionPhase, ElectionResults, Error,
    Event, EventLog, Hash, Identity, LedgerConfig, LogEntry, OwnerGate, SystemClock,
    VoterRecord, VoterRegistry, Winner,
};

/// Result of a successful mutation together with the entry it logged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt<T> {
    pub output: T,
    pub entry: LogEntry,
}

/// A registered caller's own ballot. Zero/empty until they vote.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyVote {
    pub has_voted: bool,
    pub candidate_id: CandidateId,
    pub name: String,
    pub party: String,
    pub timestamp: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionStatus {
    pub phase: ElectionPhase,
    pub candidate_count: u64,
    pub total_votes: u64,
    pub voter_count: u64,
}

/// The authoritative election state.
pub struct Ledger {
    owner: OwnerGate,
    phase: ElectionPhase,
    candidates: CandidateRegistry,
    voters: VoterRegistry,
    /// Always equal to the sum of candidate tallies.
    total_votes: u64,
    log: EventLog,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
}

impl Ledger {
    /// Create a ledger owned by `owner`, using wall-clock time and default
    /// configuration.
    pub fn new(owner: Identity) -> Self {
        Self::with_clock(owner, Arc::new(SystemClock), LedgerConfig::default())
    }

    pub fn with_clock(owner: Identity, clock: Arc<dyn Clock>, config: LedgerConfig) -> Self {
        let genesis = genesis_hash(&owner);
        Self {
            owner: OwnerGate::new(owner),
            phase: ElectionPhase::NotStarted,
            candidates: CandidateRegistry::new(),
            voters: VoterRegistry::new(),
            total_votes: 0,
            log: EventLog::new(genesis, config.event_buffer),
            clock,
            config,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn owner(&self) -> &Identity {
        self.owner.owner()
    }

    pub fn phase(&self) -> ElectionPhase {
        self.phase
    }

    /// Fails with `Unauthorized` unless `caller` currently owns the ledger.
    pub fn ensure_owner(&self, caller: &Identity) -> Result<(), Error> {
        self.owner.ensure(caller)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn candidate_count(&self) -> u64 {
        self.candidates.len()
    }

    pub fn total_votes(&self) -> u64 {
        self.total_votes
    }

    pub fn get_candidate(&self, id: CandidateId) -> Result<&Candidate, Error> {
        self.candidates.get(id)
    }

    pub fn all_candidate_ids(&self) -> Vec<CandidateId> {
        self.candidates.ids()
    }

    pub fn voter_info(&self, identity: &Identity) -> VoterRecord {
        self.voters.get(identity)
    }

    /// The identity authorized at `index`, in authorization order.
    pub fn voter_at(&self, index: u64) -> Option<&Identity> {
        self.voters.voter_at(index)
    }

    pub fn voters(&self) -> &[Identity] {
        self.voters.voters()
    }

    /// The caller's own ballot. Requires the caller to be registered.
    pub fn my_vote(&self, caller: &Identity) -> Result<MyVote, Error> {
        let record = self.voters.check_registered(caller)?;
        if !record.has_voted {
            return Ok(MyVote::default());
        }
        let candidate = self.candidates.get(record.voted_candidate_id)?;
        Ok(MyVote {
            has_voted: true,
            candidate_id: candidate.id,
            name: candidate.name.clone(),
            party: candidate.party.clone(),
            timestamp: record.timestamp,
        })
    }

    pub fn status(&self) -> ElectionStatus {
        ElectionStatus {
            phase: self.phase,
            candidate_count: self.candidates.len(),
            total_votes: self.total_votes,
            voter_count: self.voters.len(),
        }
    }

    /// Per-candidate tallies. Only once the election has ended.
    pub fn results(&self) -> Result<ElectionResults, Error> {
        self.phase.ensure_ended()?;
        Ok(ElectionResults::tally(&self.candidates, self.total_votes))
    }

    /// Winning candidate, lowest id on ties; sentinel if nobody got a vote.
    pub fn winner(&self) -> Result<Winner, Error> {
        self.phase.ensure_ended()?;
        Ok(Winner::resolve(&self.candidates))
    }

    pub fn events(&self) -> &[LogEntry] {
        self.log.entries()
    }

    pub fn events_since(&self, offset: u64) -> &[LogEntry] {
        self.log.since(offset)
    }

    /// Parent hash of the first log entry, derived from the creating owner.
    pub fn genesis(&self) -> Hash {
        self.log.genesis()
    }

    pub fn log_head(&self) -> Hash {
        self.log.head()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.log.subscribe()
    }

    pub fn verify_log(&self) -> Result<(), Error> {
        self.log.verify()
    }

    /// Counters agree with the registries and the log is intact.
    pub fn is_consistent(&self) -> bool {
        self.total_votes == self.candidates.tally_sum()
            && self.candidates.ids().iter().enumerate().all(|(i, id)| {
                self.candidates
                    .get(*id)
                    .map(|c| c.id == i as u64 + 1)
                    .unwrap_or(false)
            })
            && self.log.verify().is_ok()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn register_candidate(
        &mut self,
        caller: &Identity,
        name: &str,
        party: &str,
        description: &str,
    ) -> Result<Receipt<CandidateId>, Error> {
        let max_len = self.config.max_field_len;
        self.apply_register(caller, name, party, description, max_len)
            .inspect_err(|err| log_rejection("register_candidate", caller, err))
    }

    pub fn authorize_voter(
        &mut self,
        caller: &Identity,
        voter: &Identity,
    ) -> Result<Receipt<()>, Error> {
        self.apply_authorize(caller, voter)
            .inspect_err(|err| log_rejection("authorize_voter", caller, err))
    }

    pub fn start_election(&mut self, caller: &Identity) -> Result<Receipt<()>, Error> {
        self.apply_start(caller)
            .inspect_err(|err| log_rejection("start_election", caller, err))
    }

    pub fn end_election(&mut self, caller: &Identity) -> Result<Receipt<()>, Error> {
        self.apply_end(caller)
            .inspect_err(|err| log_rejection("end_election", caller, err))
    }

    /// Cast the caller's single ballot, stamped with the ledger clock.
    pub fn vote(
        &mut self,
        caller: &Identity,
        candidate_id: CandidateId,
    ) -> Result<Receipt<()>, Error> {
        let timestamp = self.clock.now_millis();
        self.apply_vote(caller, candidate_id, timestamp)
            .inspect_err(|err| log_rejection("vote", caller, err))
    }

    /// Hand ownership to `new_owner`. Returns the previous owner.
    pub fn transfer_ownership(
        &mut self,
        caller: &Identity,
        new_owner: &Identity,
    ) -> Result<Receipt<Identity>, Error> {
        self.apply_transfer(caller, new_owner)
            .inspect_err(|err| log_rejection("transfer_ownership", caller, err))
    }

    fn apply_register(
        &mut self,
        caller: &Identity,
        name: &str,
        party: &str,
        description: &str,
        max_len: usize,
    ) -> Result<Receipt<CandidateId>, Error> {
        self.owner.ensure(caller)?;
        self.phase.ensure_not_started()?;
        let new = self.candidates.prepare(name, party, description, max_len)?;
        let entry = self.log.prepare(Event::CandidateRegistered {
            id: new.id,
            name: new.name.clone(),
            party: new.party.clone(),
            description: new.description.clone(),
        })?;

        let id = self.candidates.insert(new).id;
        let entry = self.log.commit(entry).clone();
        debug!(candidate_id = id, index = entry.index, "candidate registered");
        Ok(Receipt { output: id, entry })
    }

    fn apply_authorize(&mut self, caller: &Identity, voter: &Identity) -> Result<Receipt<()>, Error> {
        self.owner.ensure(caller)?;
        self.voters.check_authorize(voter)?;
        let entry = self.log.prepare(Event::VoterAuthorized {
            voter: voter.clone(),
        })?;

        self.voters.authorize(voter.clone());
        let entry = self.log.commit(entry).clone();
        debug!(voter = %voter, index = entry.index, "voter authorized");
        Ok(Receipt { output: (), entry })
    }

    fn apply_start(&mut self, caller: &Identity) -> Result<Receipt<()>, Error> {
        self.owner.ensure(caller)?;
        let next = self.phase.start(!self.candidates.is_empty())?;
        let entry = self.log.prepare(Event::ElectionStarted)?;

        self.phase = next;
        let entry = self.log.commit(entry).clone();
        info!(
            candidates = self.candidates.len(),
            voters = self.voters.len(),
            "election started"
        );
        Ok(Receipt { output: (), entry })
    }

    fn apply_end(&mut self, caller: &Identity) -> Result<Receipt<()>, Error> {
        self.owner.ensure(caller)?;
        let next = self.phase.end()?;
        let entry = self.log.prepare(Event::ElectionEnded)?;

        self.phase = next;
        let entry = self.log.commit(entry).clone();
        info!(total_votes = self.total_votes, "election ended");
        Ok(Receipt { output: (), entry })
    }

    fn apply_vote(
        &mut self,
        caller: &Identity,
        candidate_id: CandidateId,
        timestamp: u64,
    ) -> Result<Receipt<()>, Error> {
        // Order fixes which error a multiply-invalid call reports.
        let record = self.voters.check_registered(caller)?;
        self.phase.ensure_active()?;
        if record.has_voted {
            return Err(Error::AlreadyVoted);
        }
        if !self.candidates.contains(candidate_id) {
            return Err(Error::InvalidCandidate(candidate_id));
        }
        let entry = self.log.prepare(Event::VoteCast {
            voter: caller.clone(),
            candidate_id,
            timestamp,
        })?;

        self.candidates.record_vote(candidate_id)?;
        self.total_votes += 1;
        self.voters.record_vote(caller, candidate_id, timestamp);
        let entry = self.log.commit(entry).clone();
        debug!(voter = %caller, candidate_id, index = entry.index, "vote cast");
        Ok(Receipt { output: (), entry })
    }

    fn apply_transfer(
        &mut self,
        caller: &Identity,
        new_owner: &Identity,
    ) -> Result<Receipt<Identity>, Error> {
        self.owner.check_transfer(caller, new_owner)?;
        let entry = self.log.prepare(Event::OwnershipTransferred {
            previous_owner: caller.clone(),
            new_owner: new_owner.clone(),
        })?;

        let previous = self.owner.replace(new_owner.clone());
        let entry = self.log.commit(entry).clone();
        info!(previous = %previous, new_owner = %new_owner, "ownership transferred");
        Ok(Receipt {
            output: previous,
            entry,
        })
    }

    // =========================================================================
    // Replay
    // =========================================================================

    /// Rebuild a ledger from its log.
    ///
    /// The chain is verified against the genesis hash of `initial_owner`,
    /// then every event is re-executed through the guarded operations and
    /// the regenerated entry must equal the supplied one. Any mismatch
    /// reports `TamperedLog` at that index. Candidate field length is a
    /// write-time limit and is not re-applied, so a log stays valid under a
    /// smaller `max_field_len`.
    pub fn replay(
        initial_owner: Identity,
        entries: &[LogEntry],
        clock: Arc<dyn Clock>,
        config: LedgerConfig,
    ) -> Result<Self, Error> {
        verify_chain(genesis_hash(&initial_owner), entries)?;
        let mut ledger = Self::with_clock(initial_owner, clock, config);

        for entry in entries {
            let owner = ledger.owner().clone();
            let produced = match &entry.event {
                Event::CandidateRegistered {
                    name,
                    party,
                    description,
                    ..
                } => ledger
                    .apply_register(&owner, name, party, description, usize::MAX)
                    .map(|r| r.entry),
                Event::VoterAuthorized { voter } => {
                    ledger.apply_authorize(&owner, voter).map(|r| r.entry)
                }
                Event::ElectionStarted => ledger.apply_start(&owner).map(|r| r.entry),
                Event::ElectionEnded => ledger.apply_end(&owner).map(|r| r.entry),
                Event::VoteCast {
                    voter,
                    candidate_id,
                    timestamp,
                } => ledger
                    .apply_vote(voter, *candidate_id, *timestamp)
                    .map(|r| r.entry),
                Event::OwnershipTransferred {
                    previous_owner,
                    new_owner,
                } => ledger
                    .apply_transfer(previous_owner, new_owner)
                    .map(|r| r.entry),
            };

            match produced {
                Ok(regenerated) if regenerated == *entry => {}
                _ => {
                    warn!(index = entry.index, event = entry.event.name(), "replay diverged");
                    return Err(Error::TamperedLog { index: entry.index });
                }
            }
        }

        debug!(entries = entries.len(), head = %ledger.log_head(), "ledger replayed");
        Ok(ledger)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("owner", self.owner())
            .field("phase", &self.phase)
            .field("candidates", &self.candidates.len())
            .field("voters", &self.voters.len())
            .field("total_votes", &self.total_votes)
            .field("log_len", &self.log.len())
            .finish()
    }
}

fn log_rejection(op: &'static str, caller: &Identity, err: &Error) {
    match err {
        Error::Unauthorized | Error::AlreadyVoted | Error::AlreadyAuthorized => {
            warn!(op, caller = %caller, error = %err, "call rejected");
        }
        _ => {
            debug!(op, caller = %caller, error = %err, "call rejected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;

    fn id(s: &str) -> Identity {
        Identity::new(s).unwrap()
    }

    fn ledger() -> (Ledger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let ledger = Ledger::with_clock(id("owner"), clock.clone(), LedgerConfig::default());
        (ledger, clock)
    }

    fn active_ledger() -> Ledger {
        let (mut l, _) = ledger();
        let owner = id("owner");
        l.register_candidate(&owner, "A", "Party A", "Desc A").unwrap();
        l.register_candidate(&owner, "B", "Party B", "Desc B").unwrap();
        l.authorize_voter(&owner, &id("v1")).unwrap();
        l.start_election(&owner).unwrap();
        l
    }

    #[test]
    fn fresh_ledger() {
        let (l, _) = ledger();
        assert_eq!(l.owner(), &id("owner"));
        assert_eq!(l.phase(), ElectionPhase::NotStarted);
        assert_eq!(l.candidate_count(), 0);
        assert_eq!(l.total_votes(), 0);
        assert!(l.events().is_empty());
        assert!(l.is_consistent());
    }

    #[test]
    fn receipt_carries_logged_entry() {
        let (mut l, _) = ledger();
        let receipt = l
            .register_candidate(&id("owner"), "Samadhan", "Party A", "For the people")
            .unwrap();
        assert_eq!(receipt.output, 1);
        assert_eq!(receipt.entry.index, 0);
        assert_eq!(l.events(), &[receipt.entry.clone()]);
        assert_eq!(l.log_head(), receipt.entry.hash);
    }

    #[test]
    fn vote_validation_order() {
        let mut l = active_ledger();
        // unregistered beats everything
        assert_eq!(l.vote(&id("ghost"), 99), Err(Error::Unauthorized));
        // invalid candidate only once the other checks pass
        assert_eq!(l.vote(&id("v1"), 99), Err(Error::InvalidCandidate(99)));
        l.vote(&id("v1"), 1).unwrap();
        // already voted beats invalid candidate
        assert_eq!(l.vote(&id("v1"), 99), Err(Error::AlreadyVoted));

        l.end_election(&id("owner")).unwrap();
        // not active beats already voted
        assert_eq!(l.vote(&id("v1"), 1), Err(Error::NotActive));
    }

    #[test]
    fn vote_uses_clock() {
        let (mut l, clock) = ledger();
        let owner = id("owner");
        l.register_candidate(&owner, "A", "P", "D").unwrap();
        l.authorize_voter(&owner, &id("v1")).unwrap();
        l.start_election(&owner).unwrap();
        clock.set(1_700_000_123_456);

        let receipt = l.vote(&id("v1"), 1).unwrap();
        assert_eq!(
            receipt.entry.event,
            Event::VoteCast {
                voter: id("v1"),
                candidate_id: 1,
                timestamp: 1_700_000_123_456,
            }
        );
        assert_eq!(l.voter_info(&id("v1")).timestamp, 1_700_000_123_456);
        assert_eq!(l.my_vote(&id("v1")).unwrap().timestamp, 1_700_000_123_456);
    }

    #[test]
    fn failed_calls_log_nothing() {
        let mut l = active_ledger();
        let before = l.events().len();
        let _ = l.register_candidate(&id("owner"), "Late", "P", "D");
        let _ = l.start_election(&id("owner"));
        let _ = l.vote(&id("ghost"), 1);
        let _ = l.transfer_ownership(&id("owner"), &id("owner"));
        assert_eq!(l.events().len(), before);
        assert!(l.is_consistent());
    }

    #[test]
    fn replay_rebuilds_state() {
        let mut l = active_ledger();
        l.vote(&id("v1"), 2).unwrap();
        l.transfer_ownership(&id("owner"), &id("heir")).unwrap();
        l.end_election(&id("heir")).unwrap();

        let rebuilt = Ledger::replay(
            id("owner"),
            l.events(),
            Arc::new(ManualClock::new(0)),
            LedgerConfig::default(),
        )
        .unwrap();

        assert_eq!(rebuilt.status(), l.status());
        assert_eq!(rebuilt.owner(), &id("heir"));
        assert_eq!(rebuilt.log_head(), l.log_head());
        assert_eq!(rebuilt.winner().unwrap().id, 2);
    }

    #[test]
    fn replay_rejects_wrong_owner() {
        let l = active_ledger();

        let err = Ledger::replay(
            id("impostor"),
            l.events(),
            Arc::new(ManualClock::new(0)),
            LedgerConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, Error::TamperedLog { index: 0 });
    }

    #[test]
    fn replay_ignores_smaller_field_limit() {
        let (mut l, _) = ledger();
        let long_name = "N".repeat(100);
        l.register_candidate(&id("owner"), &long_name, "P", "D").unwrap();

        let strict = LedgerConfig {
            max_field_len: 8,
            ..LedgerConfig::default()
        };
        let rebuilt =
            Ledger::replay(id("owner"), l.events(), Arc::new(ManualClock::new(0)), strict).unwrap();
        assert_eq!(rebuilt.get_candidate(1).unwrap().name, long_name);
        // the smaller limit still applies to new registrations
        let mut rebuilt = rebuilt;
        assert!(matches!(
            rebuilt.register_candidate(&id("owner"), &long_name, "P", "D"),
            Err(Error::InvalidInput { field: "name", .. })
        ));
    }

    #[test]
    fn replay_rejects_rehashed_double_vote() {
        let mut l = active_ledger();
        l.vote(&id("v1"), 1).unwrap();

        // Forge a second vote and re-seal it so the chain itself is valid.
        let mut entries = l.events().to_vec();
        let last = entries[entries.len() - 1].clone();
        let forged = LogEntry::seal(last.index + 1, last.hash, last.event.clone()).unwrap();
        entries.push(forged);
        verify_chain(l.genesis(), &entries).unwrap();

        let err = Ledger::replay(
            id("owner"),
            &entries,
            Arc::new(ManualClock::new(0)),
            LedgerConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, Error::TamperedLog { index: last.index + 1 });
    }
}
