//! Thread-safe handle over a single ledger.
//!
//! Mutations take the write lock for the whole validate-seal-apply step, so
//! no two of them interleave. Queries share the read lock and always see a
//! fully applied state.

use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

use crate::{
    Candidate, CandidateId, ElectionResults, ElectionStatus, Error, Identity, Ledger, LogEntry,
    MyVote, Receipt, VoterRecord, Winner,
};

#[derive(Clone, Debug)]
pub struct SharedLedger {
    inner: Arc<RwLock<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// Run `f` with a consistent, read-only view of the ledger.
    pub fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        let guard = self
            .inner
            .read()
            .expect("ledger lock must not be poisoned");
        f(&guard)
    }

    /// Run `f` with exclusive access to the ledger.
    pub fn write<R>(&self, f: impl FnOnce(&mut Ledger) -> R) -> R {
        let mut guard = self
            .inner
            .write()
            .expect("ledger lock must not be poisoned");
        f(&mut guard)
    }

    pub fn register_candidate(
        &self,
        caller: &Identity,
        name: &str,
        party: &str,
        description: &str,
    ) -> Result<Receipt<CandidateId>, Error> {
        self.write(|l| l.register_candidate(caller, name, party, description))
    }

    pub fn authorize_voter(&self, caller: &Identity, voter: &Identity) -> Result<Receipt<()>, Error> {
        self.write(|l| l.authorize_voter(caller, voter))
    }

    pub fn start_election(&self, caller: &Identity) -> Result<Receipt<()>, Error> {
        self.write(|l| l.start_election(caller))
    }

    pub fn end_election(&self, caller: &Identity) -> Result<Receipt<()>, Error> {
        self.write(|l| l.end_election(caller))
    }

    pub fn vote(&self, caller: &Identity, candidate_id: CandidateId) -> Result<Receipt<()>, Error> {
        self.write(|l| l.vote(caller, candidate_id))
    }

    pub fn transfer_ownership(
        &self,
        caller: &Identity,
        new_owner: &Identity,
    ) -> Result<Receipt<Identity>, Error> {
        self.write(|l| l.transfer_ownership(caller, new_owner))
    }

    pub fn get_candidate(&self, id: CandidateId) -> Result<Candidate, Error> {
        self.read(|l| l.get_candidate(id).cloned())
    }

    pub fn all_candidate_ids(&self) -> Vec<CandidateId> {
        self.read(|l| l.all_candidate_ids())
    }

    pub fn voter_info(&self, identity: &Identity) -> VoterRecord {
        self.read(|l| l.voter_info(identity))
    }

    pub fn my_vote(&self, caller: &Identity) -> Result<MyVote, Error> {
        self.read(|l| l.my_vote(caller))
    }

    pub fn status(&self) -> ElectionStatus {
        self.read(|l| l.status())
    }

    pub fn results(&self) -> Result<ElectionResults, Error> {
        self.read(|l| l.results())
    }

    pub fn winner(&self) -> Result<Winner, Error> {
        self.read(|l| l.winner())
    }

    pub fn events_since(&self, offset: u64) -> Vec<LogEntry> {
        self.read(|l| l.events_since(offset).to_vec())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.read(|l| l.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn id(s: &str) -> Identity {
        Identity::new(s).unwrap()
    }

    #[test]
    fn concurrent_voters_each_count_once() {
        let owner = id("owner");
        let shared = SharedLedger::new(Ledger::new(owner.clone()));
        shared.register_candidate(&owner, "A", "P", "D").unwrap();
        shared.register_candidate(&owner, "B", "P", "D").unwrap();
        let voters: Vec<Identity> = (0..16).map(|i| id(&format!("voter-{i}"))).collect();
        for voter in &voters {
            shared.authorize_voter(&owner, voter).unwrap();
        }
        shared.start_election(&owner).unwrap();

        let handles: Vec<_> = voters
            .iter()
            .enumerate()
            .map(|(i, voter)| {
                let shared = shared.clone();
                let voter = voter.clone();
                thread::spawn(move || {
                    // every voter tries twice; only the first may land
                    let candidate = (i % 2) as u64 + 1;
                    let first = shared.vote(&voter, candidate);
                    let second = shared.vote(&voter, candidate);
                    (first.is_ok(), second)
                })
            })
            .collect();

        for handle in handles {
            let (first_ok, second) = handle.join().unwrap();
            assert!(first_ok);
            assert_eq!(second, Err(Error::AlreadyVoted));
        }

        assert_eq!(shared.status().total_votes, 16);
        shared.end_election(&owner).unwrap();
        assert_eq!(shared.results().unwrap().votes, vec![8, 8]);
        assert!(shared.read(|l| l.is_consistent()));
    }

    #[test]
    fn readers_see_committed_entries_only() {
        let owner = id("owner");
        let shared = SharedLedger::new(Ledger::new(owner.clone()));
        let mut rx = shared.subscribe();

        shared.register_candidate(&owner, "A", "P", "D").unwrap();
        assert!(shared.register_candidate(&id("x"), "B", "P", "D").is_err());

        assert_eq!(shared.events_since(0).len(), 1);
        assert_eq!(rx.try_recv().unwrap().index, 0);
        assert!(rx.try_recv().is_err());
    }
}
