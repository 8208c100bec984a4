//! Append-only, hash-chained event log.
//!
//! Each successful mutation appends exactly one [`LogEntry`]. Entries link
//! to their predecessor by hash, so any edited, dropped or reordered entry
//! is detected by [`verify_chain`]. The first entry links to a genesis hash
//! derived from the creating owner, which ties the log to that owner.
//!
//! Observers can pull (`since`) or subscribe to a broadcast of committed
//! entries.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{CandidateId, Error, Hash, Identity};

/// A state change recorded in the log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    CandidateRegistered {
        id: CandidateId,
        name: String,
        party: String,
        description: String,
    },
    VoterAuthorized {
        voter: Identity,
    },
    ElectionStarted,
    ElectionEnded,
    VoteCast {
        voter: Identity,
        candidate_id: CandidateId,
        timestamp: u64,
    },
    OwnershipTransferred {
        previous_owner: Identity,
        new_owner: Identity,
    },
}

impl Event {
    /// Operation name, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Event::CandidateRegistered { .. } => "candidate_registered",
            Event::VoterAuthorized { .. } => "voter_authorized",
            Event::ElectionStarted => "election_started",
            Event::ElectionEnded => "election_ended",
            Event::VoteCast { .. } => "vote_cast",
            Event::OwnershipTransferred { .. } => "ownership_transferred",
        }
    }
}

/// An immutable, sealed log entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Position in the log, starting at 0.
    pub index: u64,
    pub event: Event,
    /// Hash of the previous entry, the genesis hash for the first.
    pub prev: Hash,
    pub hash: Hash,
}

impl LogEntry {
    /// Seal `event` at `index` on top of `prev`.
    pub fn seal(index: u64, prev: Hash, event: Event) -> Result<Self, Error> {
        let hash = Self::compute_hash(index, &prev, &event)?;
        Ok(Self {
            index,
            event,
            prev,
            hash,
        })
    }

    fn compute_hash(index: u64, prev: &Hash, event: &Event) -> Result<Hash, Error> {
        Hash::of_value(&SealedContent { index, prev, event })
    }

    /// True if the stored hash matches the entry content.
    pub fn is_intact(&self) -> bool {
        Self::compute_hash(self.index, &self.prev, &self.event)
            .map(|hash| hash == self.hash)
            .unwrap_or(false)
    }
}

#[derive(Serialize)]
struct SealedContent<'a> {
    index: u64,
    prev: &'a Hash,
    event: &'a Event,
}

/// Parent hash of the first entry of a ledger created by `owner`.
pub fn genesis_hash(owner: &Identity) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"ezelect/genesis/v1\0");
    hasher.update(owner.as_str().as_bytes());
    Hash(*hasher.finalize().as_bytes())
}

/// Check that `entries` form an unbroken chain starting from `genesis`.
pub fn verify_chain(genesis: Hash, entries: &[LogEntry]) -> Result<(), Error> {
    let mut prev = genesis;
    for (position, entry) in entries.iter().enumerate() {
        let expected_index = position as u64;
        if entry.index != expected_index || entry.prev != prev || !entry.is_intact() {
            return Err(Error::TamperedLog {
                index: expected_index,
            });
        }
        prev = entry.hash;
    }
    Ok(())
}

/// The ledger's event log.
#[derive(Debug)]
pub struct EventLog {
    genesis: Hash,
    entries: Vec<LogEntry>,
    subscribers: broadcast::Sender<LogEntry>,
}

impl EventLog {
    /// Create an empty log rooted at `genesis` whose subscription channel
    /// buffers `capacity` entries per receiver.
    pub fn new(genesis: Hash, capacity: usize) -> Self {
        Self {
            genesis,
            entries: Vec::new(),
            subscribers: broadcast::channel(capacity.max(1)).0,
        }
    }

    pub fn len(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn genesis(&self) -> Hash {
        self.genesis
    }

    /// Hash of the newest entry, the genesis hash when empty.
    pub fn head(&self) -> Hash {
        self.entries.last().map(|e| e.hash).unwrap_or(self.genesis)
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries at positions `offset..`. Empty if `offset` is past the end.
    pub fn since(&self, offset: u64) -> &[LogEntry] {
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.entries.len());
        &self.entries[start..]
    }

    /// Receive every entry committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.subscribers.subscribe()
    }

    /// Seal the next entry without appending it.
    pub(crate) fn prepare(&self, event: Event) -> Result<LogEntry, Error> {
        LogEntry::seal(self.len(), self.head(), event)
    }

    /// Append an entry produced by [`EventLog::prepare`] on the current head.
    pub(crate) fn commit(&mut self, entry: LogEntry) -> &LogEntry {
        debug_assert_eq!(entry.index, self.len());
        debug_assert_eq!(entry.prev, self.head());
        // send only fails when nobody is subscribed
        let _ = self.subscribers.send(entry.clone());
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn verify(&self) -> Result<(), Error> {
        verify_chain(self.genesis, &self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voter(s: &str) -> Identity {
        Identity::new(s).unwrap()
    }

    fn sample_log() -> EventLog {
        let mut log = EventLog::new(genesis_hash(&voter("owner")), 16);
        for event in [
            Event::CandidateRegistered {
                id: 1,
                name: "A".into(),
                party: "P".into(),
                description: "D".into(),
            },
            Event::VoterAuthorized { voter: voter("v1") },
            Event::ElectionStarted,
        ] {
            let entry = log.prepare(event).unwrap();
            log.commit(entry);
        }
        log
    }

    #[test]
    fn entries_are_chained() {
        let log = sample_log();
        let entries = log.entries();
        assert_eq!(entries[0].prev, genesis_hash(&voter("owner")));
        assert_eq!(entries[1].prev, entries[0].hash);
        assert_eq!(entries[2].prev, entries[1].hash);
        assert_eq!(log.head(), entries[2].hash);
        log.verify().unwrap();
    }

    #[test]
    fn edited_entry_detected() {
        let log = sample_log();
        let mut entries = log.entries().to_vec();
        entries[1].event = Event::VoterAuthorized { voter: voter("mallory") };
        assert_eq!(
            verify_chain(log.genesis(), &entries),
            Err(Error::TamperedLog { index: 1 })
        );
    }

    #[test]
    fn dropped_entry_detected() {
        let log = sample_log();
        let mut entries = log.entries().to_vec();
        entries.remove(0);
        assert_eq!(
            verify_chain(log.genesis(), &entries),
            Err(Error::TamperedLog { index: 0 })
        );
    }

    #[test]
    fn chain_is_rooted_at_its_owner() {
        let log = sample_log();
        assert_ne!(genesis_hash(&voter("owner")), genesis_hash(&voter("mallory")));
        assert_eq!(
            verify_chain(genesis_hash(&voter("mallory")), log.entries()),
            Err(Error::TamperedLog { index: 0 })
        );
        assert_eq!(EventLog::new(log.genesis(), 1).head(), log.genesis());
    }

    #[test]
    fn since_offsets() {
        let log = sample_log();
        assert_eq!(log.since(0).len(), 3);
        assert_eq!(log.since(2)[0].event, Event::ElectionStarted);
        assert!(log.since(3).is_empty());
        assert!(log.since(u64::MAX).is_empty());
    }

    #[test]
    fn subscribers_see_commits_in_order() {
        let mut log = EventLog::new(genesis_hash(&voter("owner")), 4);
        let mut rx = log.subscribe();
        let entry = log.prepare(Event::ElectionStarted).unwrap();
        log.commit(entry);
        let entry = log.prepare(Event::ElectionEnded).unwrap();
        log.commit(entry);

        assert_eq!(rx.try_recv().unwrap().event, Event::ElectionStarted);
        assert_eq!(rx.try_recv().unwrap().event, Event::ElectionEnded);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn event_json_is_tagged() {
        let json = serde_json::to_value(Event::VoteCast {
            voter: voter("v1"),
            candidate_id: 2,
            timestamp: 7,
        })
        .unwrap();
        assert_eq!(json["type"], "VoteCast");
        assert_eq!(json["candidate_id"], 2);
    }
}
