//! Post-election tallies and winner resolution.

use serde::{Deserialize, Serialize};

use crate::{CandidateId, CandidateRegistry};

/// Per-candidate tallies in ascending id order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub candidate_ids: Vec<CandidateId>,
    pub votes: Vec<u64>,
    pub total_votes: u64,
}

impl ElectionResults {
    pub(crate) fn tally(candidates: &CandidateRegistry, total_votes: u64) -> Self {
        let (candidate_ids, votes) = candidates.iter().map(|c| (c.id, c.vote_count)).unzip();
        Self {
            candidate_ids,
            votes,
            total_votes,
        }
    }
}

/// The winning candidate, or the "no winner" sentinel with `id == 0`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub id: CandidateId,
    pub name: String,
    pub party: String,
    pub vote_count: u64,
}

impl Winner {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        self.id == 0
    }

    /// Scan candidates in ascending id order; ties go to the lowest id.
    /// No candidates, or no votes at all, yields the sentinel.
    pub(crate) fn resolve(candidates: &CandidateRegistry) -> Self {
        let mut best: Option<&crate::Candidate> = None;
        for candidate in candidates.iter() {
            let leads = match best {
                Some(current) => candidate.vote_count > current.vote_count,
                None => candidate.vote_count > 0,
            };
            if leads {
                best = Some(candidate);
            }
        }

        match best {
            Some(c) => Self {
                id: c.id,
                name: c.name.clone(),
                party: c.party.clone(),
                vote_count: c.vote_count,
            },
            None => Self::none(),
        }
    }
}
