//! Candidate registry: append-only, sequentially numbered from 1.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Candidate identifier. Valid ids are `1..=candidate_count`; 0 means none.
pub type CandidateId = u64;

/// A registered candidate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub party: String,
    pub description: String,
    pub vote_count: u64,
}

/// Fields of a candidate that passed validation but is not yet stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NewCandidate {
    pub id: CandidateId,
    pub name: String,
    pub party: String,
    pub description: String,
}

#[derive(Clone, Debug, Default)]
pub struct CandidateRegistry {
    /// `candidates[i].id == i + 1`.
    candidates: Vec<Candidate>,
}

impl CandidateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> u64 {
        self.candidates.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Look up a candidate, failing with `InvalidCandidate` outside
    /// `[1, len]`.
    pub fn get(&self, id: CandidateId) -> Result<&Candidate, Error> {
        self.index_of(id)
            .and_then(|i| self.candidates.get(i))
            .ok_or(Error::InvalidCandidate(id))
    }

    pub fn contains(&self, id: CandidateId) -> bool {
        self.index_of(id).is_some()
    }

    /// Ids in registration order, `[1..=len]`.
    pub fn ids(&self) -> Vec<CandidateId> {
        (1..=self.len()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    /// Sum of all per-candidate tallies.
    pub fn tally_sum(&self) -> u64 {
        self.candidates.iter().map(|c| c.vote_count).sum()
    }

    /// Validate fields and assign the next id, without storing anything.
    pub(crate) fn prepare(
        &self,
        name: &str,
        party: &str,
        description: &str,
        max_len: usize,
    ) -> Result<NewCandidate, Error> {
        Ok(NewCandidate {
            id: self.len() + 1,
            name: validate_field("name", name, max_len)?,
            party: validate_field("party", party, max_len)?,
            description: validate_field("description", description, max_len)?,
        })
    }

    pub(crate) fn insert(&mut self, new: NewCandidate) -> &Candidate {
        debug_assert_eq!(new.id, self.len() + 1);
        self.candidates.push(Candidate {
            id: new.id,
            name: new.name,
            party: new.party,
            description: new.description,
            vote_count: 0,
        });
        &self.candidates[self.candidates.len() - 1]
    }

    /// Add one vote. The id must already have been checked.
    pub(crate) fn record_vote(&mut self, id: CandidateId) -> Result<(), Error> {
        let index = self.index_of(id).ok_or(Error::InvalidCandidate(id))?;
        self.candidates[index].vote_count += 1;
        Ok(())
    }

    fn index_of(&self, id: CandidateId) -> Option<usize> {
        if id == 0 || id > self.len() {
            None
        } else {
            Some((id - 1) as usize)
        }
    }
}

fn validate_field(field: &'static str, value: &str, max_len: usize) -> Result<String, Error> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::invalid_input(field, "must not be empty"));
    }
    if value.chars().count() > max_len {
        return Err(Error::invalid_input(
            field,
            format!("longer than {} characters", max_len),
        ));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(reg: &mut CandidateRegistry, name: &str) -> CandidateId {
        let new = reg.prepare(name, "Party", "Desc", 64).unwrap();
        reg.insert(new).id
    }

    #[test]
    fn ids_are_sequential_from_one() {
        let mut reg = CandidateRegistry::new();
        assert_eq!(register(&mut reg, "A"), 1);
        assert_eq!(register(&mut reg, "B"), 2);
        assert_eq!(register(&mut reg, "C"), 3);
        assert_eq!(reg.ids(), vec![1, 2, 3]);
        assert_eq!(reg.get(2).unwrap().name, "B");
    }

    #[test]
    fn out_of_range_lookup() {
        let mut reg = CandidateRegistry::new();
        register(&mut reg, "A");
        assert_eq!(reg.get(0), Err(Error::InvalidCandidate(0)));
        assert_eq!(reg.get(2), Err(Error::InvalidCandidate(2)));
        assert_eq!(reg.get(999), Err(Error::InvalidCandidate(999)));
    }

    #[test]
    fn fields_are_trimmed_and_required() {
        let reg = CandidateRegistry::new();
        let new = reg.prepare("  Aman ", "Party C", "For Justice", 64).unwrap();
        assert_eq!(new.name, "Aman");

        let err = reg.prepare("Aman", "  ", "x", 64).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { field: "party", .. }));

        let err = reg.prepare("Aman", "P", "", 64).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { field: "description", .. }));
    }

    #[test]
    fn field_length_is_bounded() {
        let reg = CandidateRegistry::new();
        assert!(reg.prepare(&"x".repeat(8), "P", "D", 8).is_ok());
        let err = reg.prepare(&"x".repeat(9), "P", "D", 8).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { field: "name", .. }));
    }

    #[test]
    fn prepare_does_not_store() {
        let reg = CandidateRegistry::new();
        reg.prepare("A", "P", "D", 64).unwrap();
        assert!(reg.is_empty());
    }

    #[test]
    fn votes_accumulate() {
        let mut reg = CandidateRegistry::new();
        register(&mut reg, "A");
        register(&mut reg, "B");
        reg.record_vote(2).unwrap();
        reg.record_vote(2).unwrap();
        reg.record_vote(1).unwrap();
        assert_eq!(reg.get(2).unwrap().vote_count, 2);
        assert_eq!(reg.tally_sum(), 3);
        assert_eq!(reg.record_vote(3), Err(Error::InvalidCandidate(3)));
    }
}
