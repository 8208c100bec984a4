//! Error types for ezelect-core.
//!
//! Every rejected call returns one of these and leaves the ledger untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::CandidateId;

/// Core errors.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Caller is not the owner, or not a registered voter.
    #[error("caller is not authorized for this operation")]
    Unauthorized,

    /// Voter identity was already authorized.
    #[error("voter already authorized")]
    AlreadyAuthorized,

    /// The election has already left the NotStarted phase.
    #[error("election already started")]
    AlreadyStarted,

    /// Voter already cast a ballot.
    #[error("voter already voted")]
    AlreadyVoted,

    /// The election is not in the Active phase.
    #[error("election not active")]
    NotActive,

    /// Cannot start an election without candidates.
    #[error("no candidates registered")]
    NoCandidates,

    /// Candidate id outside `[1, candidate_count]`.
    #[error("invalid candidate: {0}")]
    InvalidCandidate(CandidateId),

    /// Empty or malformed field.
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        field: &'static str,
        reason: String,
    },

    /// Null identity, or a transfer to the current owner.
    #[error("invalid identity")]
    InvalidIdentity,

    /// Results are only available once the election has ended.
    #[error("election not ended")]
    ElectionNotEnded,

    /// Encoding failure while sealing a log entry.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Log entry does not match its chain or cannot be replayed.
    #[error("event log tampered at entry {index}")]
    TamperedLog { index: u64 },
}

/// Payload-free discriminant of [`Error`], for collaborators that only
/// need to branch on the reason.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Unauthorized,
    AlreadyAuthorized,
    AlreadyStarted,
    AlreadyVoted,
    NotActive,
    NoCandidates,
    InvalidCandidate,
    InvalidInput,
    InvalidIdentity,
    ElectionNotEnded,
    Serialization,
    TamperedLog,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Unauthorized => ErrorKind::Unauthorized,
            Error::AlreadyAuthorized => ErrorKind::AlreadyAuthorized,
            Error::AlreadyStarted => ErrorKind::AlreadyStarted,
            Error::AlreadyVoted => ErrorKind::AlreadyVoted,
            Error::NotActive => ErrorKind::NotActive,
            Error::NoCandidates => ErrorKind::NoCandidates,
            Error::InvalidCandidate(_) => ErrorKind::InvalidCandidate,
            Error::InvalidInput { .. } => ErrorKind::InvalidInput,
            Error::InvalidIdentity => ErrorKind::InvalidIdentity,
            Error::ElectionNotEnded => ErrorKind::ElectionNotEnded,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::TamperedLog { .. } => ErrorKind::TamperedLog,
        }
    }

    pub(crate) fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

impl From<ciborium::ser::Error<std::io::Error>> for Error {
    fn from(e: ciborium::ser::Error<std::io::Error>) -> Self {
        Error::Serialization(e.to_string())
    }
}
