//! Voter registry: per-identity authorization and vote status.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{CandidateId, Error, Identity};

/// A voter's record. Unknown identities read as the default record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub is_registered: bool,
    pub has_voted: bool,
    /// 0 until the voter has voted.
    pub voted_candidate_id: CandidateId,
    /// Unix milliseconds of the vote, 0 until the voter has voted.
    pub timestamp: u64,
}

#[derive(Clone, Debug, Default)]
pub struct VoterRegistry {
    records: BTreeMap<Identity, VoterRecord>,
    /// Identities in authorization order.
    order: Vec<Identity>,
}

impl VoterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current record for `identity`, or the default if never authorized.
    pub fn get(&self, identity: &Identity) -> VoterRecord {
        self.records.get(identity).copied().unwrap_or_default()
    }

    pub fn is_registered(&self, identity: &Identity) -> bool {
        self.get(identity).is_registered
    }

    /// Number of authorized voters.
    pub fn len(&self) -> u64 {
        self.order.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The identity authorized at `index` (0-based).
    pub fn voter_at(&self, index: u64) -> Option<&Identity> {
        usize::try_from(index).ok().and_then(|i| self.order.get(i))
    }

    pub fn voters(&self) -> &[Identity] {
        &self.order
    }

    pub(crate) fn check_authorize(&self, identity: &Identity) -> Result<(), Error> {
        if self.is_registered(identity) {
            Err(Error::AlreadyAuthorized)
        } else {
            Ok(())
        }
    }

    pub(crate) fn authorize(&mut self, identity: Identity) {
        self.records.insert(
            identity.clone(),
            VoterRecord {
                is_registered: true,
                ..VoterRecord::default()
            },
        );
        self.order.push(identity);
    }

    /// Check that `identity` may vote: registered, then not yet voted.
    /// Phase is checked by the caller between the two.
    pub(crate) fn check_registered(&self, identity: &Identity) -> Result<VoterRecord, Error> {
        let record = self.get(identity);
        if record.is_registered {
            Ok(record)
        } else {
            Err(Error::Unauthorized)
        }
    }

    pub(crate) fn record_vote(&mut self, identity: &Identity, candidate: CandidateId, timestamp: u64) {
        if let Some(record) = self.records.get_mut(identity) {
            debug_assert!(record.is_registered && !record.has_voted);
            record.has_voted = true;
            record.voted_candidate_id = candidate;
            record.timestamp = timestamp;
        }
    }
}
