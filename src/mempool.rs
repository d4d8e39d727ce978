//! The validation backend the coordinator calls into. The core itself never
//! validates a transaction - it hands candidates to whatever mempool
//! implementation the embedder supplies and reacts to the verdict.

use std::fmt;

use crate::types::{GenericTxid, Outpoint, Transaction};

/// Why a candidate transaction was not accepted, or that it was.
///
/// Mirrors the shape of the teacher's hand-rolled error enums
/// (`network::errors::PeerError`) rather than `std::error::Error`: these are
/// classification outcomes the coordinator branches on, not failures that
/// propagate with `?`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxValidationResult {
    /// Accepted into the mempool.
    Accepted,
    /// Missing one or more inputs; a candidate for the orphanage.
    MissingInputs,
    /// Rejected for carrying witness data the relay policy forbids here.
    WitnessStripped,
    /// One or more inputs already spent by a non-standard transaction.
    InputsNotStandard,
    /// Failed validation on its own, independent of package context.
    SingleFailure,
    /// Violates a consensus rule; never valid regardless of context.
    Consensus,
    /// Violates a consensus rule that changed recently; may become valid
    /// again after a reorg, so it is eligible for reconsideration.
    RecentConsensusChange,
    /// Fails a mempool acceptance policy (fees, size, etc), not consensus.
    NotStandard,
    /// Spends an output that does not yet exist at the chain's current tip.
    PrematureSpend,
    /// Witness data does not match what the wtxid commits to.
    WitnessMutated,
    /// Conflicts with a transaction already in the mempool.
    Conflict,
    /// Rejected by mempool-wide policy (e.g. package limits).
    MempoolPolicy,
    /// Rejected for a reason the core does not classify further.
    Unknown,
    /// Placeholder state before any validation has run.
    Unset,
    /// No mempool backend is configured; nothing was validated.
    NoMempool,
}

impl TxValidationResult {
    /// Whether this outcome means the transaction is fundamentally invalid -
    /// a rejection that should populate `recent_rejects` and never be
    /// retried against this peer.
    pub fn is_final_rejection(&self) -> bool {
        matches!(
            self,
            TxValidationResult::Consensus
                | TxValidationResult::WitnessMutated
                | TxValidationResult::NotStandard
                | TxValidationResult::InputsNotStandard
                | TxValidationResult::WitnessStripped
        )
    }

    /// Whether this outcome should still be reconsidered later (e.g. once a
    /// sibling transaction in the same package lands), rather than banned
    /// from retry outright.
    pub fn is_reconsiderable(&self) -> bool {
        matches!(
            self,
            TxValidationResult::RecentConsensusChange | TxValidationResult::SingleFailure
        )
    }
}

impl fmt::Display for TxValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxValidationResult::Accepted => "accepted",
            TxValidationResult::MissingInputs => "missing inputs",
            TxValidationResult::WitnessStripped => "witness stripped",
            TxValidationResult::InputsNotStandard => "inputs not standard",
            TxValidationResult::SingleFailure => "single failure",
            TxValidationResult::Consensus => "consensus violation",
            TxValidationResult::RecentConsensusChange => "recent consensus change",
            TxValidationResult::NotStandard => "not standard",
            TxValidationResult::PrematureSpend => "premature spend",
            TxValidationResult::WitnessMutated => "witness mutated",
            TxValidationResult::Conflict => "conflict",
            TxValidationResult::MempoolPolicy => "mempool policy",
            TxValidationResult::Unknown => "unknown",
            TxValidationResult::Unset => "unset",
            TxValidationResult::NoMempool => "no mempool backend",
        };
        f.write_str(s)
    }
}

/// The outcome of submitting one transaction for acceptance, plus whatever
/// downstream transactions became acceptable as a side effect (e.g. a
/// package submission that also frees a previously-orphaned child).
#[derive(Clone, Debug)]
pub struct MempoolAcceptResult {
    pub result: TxValidationResult,
    /// Present when `result` is `Conflict`: the conflicting mempool entry.
    pub conflicting_tx: Option<Transaction>,
    /// Transactions this acceptance additionally validated (package children).
    pub also_accepted: Vec<Transaction>,
}

impl MempoolAcceptResult {
    pub fn single(result: TxValidationResult) -> Self {
        MempoolAcceptResult {
            result,
            conflicting_tx: None,
            also_accepted: Vec::new(),
        }
    }

    pub fn conflict(with: Transaction) -> Self {
        MempoolAcceptResult {
            result: TxValidationResult::Conflict,
            conflicting_tx: Some(with),
            also_accepted: Vec::new(),
        }
    }
}

/// The validation backend. Grounded on the shape of the teacher's own
/// thin traits at its service boundaries (e.g. `ckb_network::ProtocolContext`):
/// a small set of methods the core calls into, with every validation detail
/// left to the implementation.
pub trait Mempool {
    /// Whether a transaction identified by `gtxid` is already accepted.
    ///
    /// Takes the tagged [`GenericTxid`] rather than a bare hash so an
    /// implementation backed by separate txid/wtxid indices looks the hash
    /// up in the table it actually lives in, instead of the caller coercing
    /// the hash into the wrong namespace before asking.
    fn exists(&self, gtxid: GenericTxid) -> bool;

    /// If an existing mempool entry spends `outpoint`, return it (RBF
    /// conflict detection).
    fn get_conflict_tx(&self, outpoint: Outpoint) -> Option<Transaction>;

    /// Attempt to validate and accept `tx`.
    fn submit(&mut self, tx: &Transaction) -> MempoolAcceptResult;
}
