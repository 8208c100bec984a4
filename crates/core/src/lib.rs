//! ezelect-core: the authoritative election ledger.
//!
//! A single [`Ledger`] tracks candidates, voter eligibility and cast votes.
//! Callers always pass their [`Identity`] explicitly; every mutation either
//! applies completely and appends one hash-chained [`LogEntry`], or fails
//! with a typed [`Error`] and changes nothing.
//!
//! - `OwnerGate`: admin-only operations and ownership transfer
//! - `CandidateRegistry` / `VoterRegistry`: who can be voted for, who may vote
//! - `ElectionPhase`: NotStarted -> Active -> Ended
//! - `EventLog`: tamper-evident record of every successful mutation
//! - `SharedLedger`: lock-guarded handle for concurrent callers

mod candidate;
mod clock;
mod config;
mod error;
mod event;
mod hash;
mod identity;
mod ledger;
mod phase;
mod results;
mod shared;
mod voter;

pub use candidate::{Candidate, CandidateId, CandidateRegistry};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DEFAULT_EVENT_BUFFER, DEFAULT_MAX_FIELD_LEN, LedgerConfig};
pub use error::{Error, ErrorKind};
pub use event::{Event, EventLog, LogEntry, genesis_hash, verify_chain};
pub use hash::Hash;
pub use identity::{Identity, OwnerGate};
pub use ledger::{ElectionStatus, Ledger, MyVote, Receipt};
pub use phase::ElectionPhase;
pub use results::{ElectionResults, Winner};
pub use shared::SharedLedger;
pub use voter::{VoterRecord, VoterRegistry};

/// Re-export for convenience
pub use ed25519_dalek::VerifyingKey;
