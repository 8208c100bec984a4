//! Election lifecycle: NotStarted -> Active -> Ended.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElectionPhase {
    #[default]
    NotStarted,
    Active,
    Ended,
}

impl ElectionPhase {
    /// Stable numeric code: 0, 1, 2.
    pub fn code(self) -> u8 {
        match self {
            ElectionPhase::NotStarted => 0,
            ElectionPhase::Active => 1,
            ElectionPhase::Ended => 2,
        }
    }

    /// Next phase when starting. `has_candidates` gates the transition.
    pub(crate) fn start(self, has_candidates: bool) -> Result<Self, Error> {
        match self {
            ElectionPhase::NotStarted if has_candidates => Ok(ElectionPhase::Active),
            ElectionPhase::NotStarted => Err(Error::NoCandidates),
            _ => Err(Error::AlreadyStarted),
        }
    }

    pub(crate) fn end(self) -> Result<Self, Error> {
        match self {
            ElectionPhase::Active => Ok(ElectionPhase::Ended),
            _ => Err(Error::NotActive),
        }
    }

    pub(crate) fn ensure_not_started(self) -> Result<(), Error> {
        match self {
            ElectionPhase::NotStarted => Ok(()),
            _ => Err(Error::AlreadyStarted),
        }
    }

    pub(crate) fn ensure_active(self) -> Result<(), Error> {
        match self {
            ElectionPhase::Active => Ok(()),
            _ => Err(Error::NotActive),
        }
    }

    pub(crate) fn ensure_ended(self) -> Result<(), Error> {
        match self {
            ElectionPhase::Ended => Ok(()),
            _ => Err(Error::ElectionNotEnded),
        }
    }
}

impl fmt::Display for ElectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElectionPhase::NotStarted => "not_started",
            ElectionPhase::Active => "active",
            ElectionPhase::Ended => "ended",
        };
        f.write_str(name)
    }
}
