//! Call scripts: a JSON list of ledger calls, each with an explicit caller.
//!
//! ```json
//! {
//!   "owner": "alice",
//!   "calls": [
//!     { "op": "register_candidate", "caller": "alice", "name": "Samadhan",
//!       "party": "Party A", "description": "For the people" },
//!     { "op": "authorize_voter", "caller": "alice", "voter": "bob" },
//!     { "op": "start_election", "caller": "alice" },
//!     { "op": "vote", "caller": "bob", "candidate_id": 1 },
//!     { "op": "end_election", "caller": "alice" },
//!     { "op": "get_winner" }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use ezelect_core::{
    CandidateId, ElectionResults, ElectionStatus, Error, ErrorKind, Identity, Ledger, LogEntry,
    Winner,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Script {
    /// Identity that owns the ledger at creation.
    pub owner: Identity,
    #[serde(default)]
    pub calls: Vec<Call>,
}

impl Script {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing script {}", path.display()))
    }
}

/// One ledger operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Call {
    RegisterCandidate {
        caller: Identity,
        name: String,
        party: String,
        description: String,
    },
    AuthorizeVoter {
        caller: Identity,
        voter: Identity,
    },
    StartElection {
        caller: Identity,
    },
    EndElection {
        caller: Identity,
    },
    Vote {
        caller: Identity,
        candidate_id: CandidateId,
    },
    /// Raw string so an empty target is reported as a rejected call, after
    /// the caller has been checked.
    TransferOwnership {
        caller: Identity,
        new_owner: String,
    },
    GetCandidate {
        id: CandidateId,
    },
    GetAllCandidateIds,
    GetVoterInfo {
        voter: Identity,
    },
    GetMyVote {
        caller: Identity,
    },
    GetElectionStatus,
    GetResults,
    GetWinner,
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::RegisterCandidate { .. } => "register_candidate",
            Call::AuthorizeVoter { .. } => "authorize_voter",
            Call::StartElection { .. } => "start_election",
            Call::EndElection { .. } => "end_election",
            Call::Vote { .. } => "vote",
            Call::TransferOwnership { .. } => "transfer_ownership",
            Call::GetCandidate { .. } => "get_candidate",
            Call::GetAllCandidateIds => "get_all_candidate_ids",
            Call::GetVoterInfo { .. } => "get_voter_info",
            Call::GetMyVote { .. } => "get_my_vote",
            Call::GetElectionStatus => "get_election_status",
            Call::GetResults => "get_results",
            Call::GetWinner => "get_winner",
        }
    }

    /// Execute against `ledger`. The outer error is only for encoding
    /// failures; ledger rejections come back as `Ok(Err(..))`.
    fn execute(&self, ledger: &mut Ledger) -> Result<Result<Value, Error>> {
        let outcome = match self {
            Call::RegisterCandidate {
                caller,
                name,
                party,
                description,
            } => ledger
                .register_candidate(caller, name, party, description)
                .map(|r| serde_json::to_value(r.output)),
            Call::AuthorizeVoter { caller, voter } => ledger
                .authorize_voter(caller, voter)
                .map(|_| Ok(Value::Null)),
            Call::StartElection { caller } => {
                ledger.start_election(caller).map(|_| Ok(Value::Null))
            }
            Call::EndElection { caller } => ledger.end_election(caller).map(|_| Ok(Value::Null)),
            Call::Vote {
                caller,
                candidate_id,
            } => ledger.vote(caller, *candidate_id).map(|_| Ok(Value::Null)),
            Call::TransferOwnership { caller, new_owner } => ledger
                .ensure_owner(caller)
                .and_then(|()| Identity::new(new_owner.as_str()))
                .and_then(|new_owner| ledger.transfer_ownership(caller, &new_owner))
                .map(|r| serde_json::to_value(r.output)),
            Call::GetCandidate { id } => ledger.get_candidate(*id).map(serde_json::to_value),
            Call::GetAllCandidateIds => Ok(serde_json::to_value(ledger.all_candidate_ids())),
            Call::GetVoterInfo { voter } => Ok(serde_json::to_value(ledger.voter_info(voter))),
            Call::GetMyVote { caller } => ledger.my_vote(caller).map(serde_json::to_value),
            Call::GetElectionStatus => Ok(serde_json::to_value(ledger.status())),
            Call::GetResults => ledger.results().map(serde_json::to_value),
            Call::GetWinner => ledger.winner().map(serde_json::to_value),
        };

        match outcome {
            Ok(value) => Ok(Ok(value?)),
            Err(err) => Ok(Err(err)),
        }
    }
}

/// What happened to one call.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Ok { value: Value },
    Rejected { error: ErrorKind, message: String },
}

#[derive(Clone, Debug, Serialize)]
pub struct CallOutcome {
    pub step: usize,
    pub op: &'static str,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Summary printed after a script run.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub calls: Vec<CallOutcome>,
    pub owner: Identity,
    pub status: ElectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ElectionResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
    pub log_len: usize,
    pub log_head: String,
}

impl Report {
    pub fn rejected(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c.outcome, Outcome::Rejected { .. }))
            .count()
    }
}

/// Apply every call in order. Rejected calls are recorded and the run
/// continues.
pub fn run(ledger: &mut Ledger, script: &Script) -> Result<Report> {
    let mut calls = Vec::with_capacity(script.calls.len());

    for (step, call) in script.calls.iter().enumerate() {
        let outcome = match call.execute(ledger)? {
            Ok(value) => Outcome::Ok { value },
            Err(err) => {
                debug!(step, op = call.name(), error = %err, "call rejected");
                Outcome::Rejected {
                    error: err.kind(),
                    message: err.to_string(),
                }
            }
        };
        calls.push(CallOutcome {
            step,
            op: call.name(),
            outcome,
        });
    }

    let report = Report {
        calls,
        owner: ledger.owner().clone(),
        status: ledger.status(),
        results: ledger.results().ok(),
        winner: ledger.winner().ok(),
        log_len: ledger.events().len(),
        log_head: ledger.log_head().to_hex(),
    };
    info!(
        calls = report.calls.len(),
        rejected = report.rejected(),
        phase = %report.status.phase,
        "script finished"
    );
    Ok(report)
}

pub fn write_log<P: AsRef<Path>>(entries: &[LogEntry], path: P) -> Result<()> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, content).with_context(|| format!("writing log {}", path.display()))
}

pub fn read_log<P: AsRef<Path>>(path: P) -> Result<Vec<LogEntry>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading log {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing log {}", path.display()))
}
