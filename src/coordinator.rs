//! Component E: the top-level state machine tying announcements, validation
//! outcomes, block events, and peer disconnects together.
//!
//! Grounded on the teacher's `NetworkState`/`PeerRegistry` pairing: one
//! struct owning the peer map and every subordinate table, guarded by a
//! single lock (`parking_lot::Mutex`, same as the teacher's `RwLock` usage
//! in `network_state.rs`) so that an event handler's updates are atomic with
//! respect to every other thread calling in. No nested locks are ever taken;
//! external collaborators (`Mempool`, the networking layer) are reached via
//! arguments passed into a call, never stored behind this lock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use parking_lot::Mutex;
use rand::Rng;

use crate::config::Config;
use crate::mempool::{Mempool, TxValidationResult};
use crate::orphan_resolution::OrphanResolutionTracker;
use crate::orphanage::Orphanage;
use crate::request_tracker::RequestTracker;
use crate::rolling_bloom_filter::RollingBloomFilter;
use crate::types::{GenericTxid, Hash256, Peer, PeerInfo, Transaction, Txid, Wtxid};

/// An outbound request the networking layer should send on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutboundRequest {
    /// Ask for a transaction by its announced identifier.
    Tx(GenericTxid),
    /// Ask a package-relay-capable peer for ancestor-package info.
    PackageInfo(Wtxid),
}

struct Inner {
    config: Config,
    peers: std::collections::HashMap<Peer, PeerInfo>,
    wtxid_relay_peers: u32,
    package_relay_peers: u32,
    request_tracker: RequestTracker,
    orphanage: Orphanage,
    orphan_resolution: OrphanResolutionTracker,
    recent_rejects: RollingBloomFilter,
    recent_confirmed: RollingBloomFilter,
    recent_rejects_reconsiderable: RollingBloomFilter,
    current_tip: Option<Hash256>,
}

impl Inner {
    /// Whether `gtxid` is already known, checking every sub-store under the
    /// same hash namespace (txid or wtxid) the peer actually announced
    /// rather than reinterpreting it. Only the orphan-store lookup is
    /// entitled to coerce via `hash_as_wtxid()` (the orphanage is keyed by
    /// wtxid regardless of how a tx was announced, per types.rs); the
    /// rolling filters and the mempool are asked about `gtxid` as-is so an
    /// implementation backed by separate txid/wtxid indices looks the hash
    /// up in the table it actually lives in.
    fn already_have(&self, gtxid: GenericTxid, mempool: &dyn Mempool) -> bool {
        self.orphanage.have_tx(gtxid.hash_as_wtxid())
            || self.recent_confirmed.contains(&gtxid.raw_hash())
            || self.recent_rejects.contains(&gtxid.raw_hash())
            || mempool.exists(gtxid)
    }

    /// The standard delay discipline of spec.md section 4.B/4.E, shared by
    /// both the normal-request path and the orphan-resolution path (spec.md
    /// section 4.E's `received_inv` contract requires both to schedule under
    /// "the same delay discipline as below").
    fn request_delay(&self, peer: Peer, info: PeerInfo, gtxid: GenericTxid) -> Duration {
        let mut delay = Duration::ZERO;
        if !info.preferred {
            delay += self.config.non_preferred_delay;
        }
        if !gtxid.is_wtxid() && self.wtxid_relay_peers > 0 {
            delay += self.config.txid_relay_delay;
        }
        let overloaded =
            !info.relay_permissions && self.request_tracker.count_in_flight(peer) >= self.config.max_peer_in_flight;
        if overloaded {
            delay += self.config.overloaded_delay;
        }
        delay
    }

    fn active_peer_count(&self) -> u32 {
        self.peers.len() as u32
    }
}

/// Owns every subordinate component (A-D) and arbitrates between them.
/// Cheaply cloneable handles are not provided - wrap in `Arc` at the call
/// site the way the networking layer shares any other central table.
pub struct TxDownloadManager {
    inner: Mutex<Inner>,
}

impl TxDownloadManager {
    pub fn new(config: Config) -> Self {
        let inner = Inner {
            orphanage: Orphanage::new(config.max_orphan_txs, config.reserved_peer_weight),
            request_tracker: RequestTracker::new(config.max_peer_announcements),
            orphan_resolution: OrphanResolutionTracker::new(config.orphan_ancestor_getdata_interval),
            recent_rejects: RollingBloomFilter::new(config.recent_rejects_params),
            recent_confirmed: RollingBloomFilter::new(config.recent_confirmed_params),
            recent_rejects_reconsiderable: RollingBloomFilter::new(config.recent_rejects_reconsiderable_params),
            peers: std::collections::HashMap::new(),
            wtxid_relay_peers: 0,
            package_relay_peers: 0,
            current_tip: None,
            config,
        };
        TxDownloadManager { inner: Mutex::new(inner) }
    }

    /// Whether `gtxid` is already known: stored as an orphan, recently
    /// confirmed, recently rejected, or present in `mempool`. One of the
    /// coordinator's top-level responsibilities per its own contract.
    pub fn already_have(&self, gtxid: GenericTxid, mempool: &dyn Mempool) -> bool {
        let inner = self.inner.lock();
        inner.already_have(gtxid, mempool)
    }

    pub fn connected_peer(&self, peer: Peer, info: PeerInfo) {
        let mut inner = self.inner.lock();
        if info.wtxid_relay {
            inner.wtxid_relay_peers += 1;
        }
        if info.package_relay {
            inner.package_relay_peers += 1;
        }
        inner.peers.insert(peer, info);
    }

    pub fn disconnected_peer(&self, peer: Peer) {
        let mut inner = self.inner.lock();
        inner.orphanage.erase_for_peer(peer);
        inner.request_tracker.disconnected(peer);
        inner.orphan_resolution.disconnected(peer);
        if let Some(info) = inner.peers.remove(&peer) {
            if info.wtxid_relay {
                inner.wtxid_relay_peers = inner.wtxid_relay_peers.saturating_sub(1);
            }
            if info.package_relay {
                inner.package_relay_peers = inner.package_relay_peers.saturating_sub(1);
            }
        }
    }

    /// A peer announced `gtxid`. `mempool` is consulted only for the
    /// already-have check; the tx download manager never holds a reference
    /// to it across calls.
    pub fn received_inv(&self, peer: Peer, gtxid: GenericTxid, now: Instant, mempool: &dyn Mempool) {
        let mut inner = self.inner.lock();
        let Some(&info) = inner.peers.get(&peer) else {
            debug!("received_inv from unknown peer {peer:?}");
            return;
        };

        let wtxid_guess = gtxid.hash_as_wtxid();
        if inner.orphanage.have_tx(wtxid_guess) {
            let delay = inner.request_delay(peer, info, gtxid);
            inner.orphanage.add_announcer(wtxid_guess, peer);
            inner.orphan_resolution.add_candidate(peer, wtxid_guess, now + delay);
            return;
        }

        if inner.already_have(gtxid, mempool) {
            return;
        }

        let delay = inner.request_delay(peer, info, gtxid);
        inner
            .request_tracker
            .received_inv(peer, gtxid, info.preferred, now + delay, info.relay_permissions);
    }

    /// Drains due orphan-resolution and normal-request work for `peer`,
    /// marking everything returned as in-flight.
    pub fn get_requests_to_send(&self, peer: Peer, now: Instant) -> Vec<OutboundRequest> {
        let mut inner = self.inner.lock();
        let mut out = Vec::new();
        let Some(&info) = inner.peers.get(&peer) else {
            return out;
        };

        let (resolution_ready, _resolution_expired) = inner.orphan_resolution.get_requestable(peer, now);
        for wtxid in resolution_ready {
            inner.orphan_resolution.requested(peer, wtxid, now);
            if info.package_relay {
                out.push(OutboundRequest::PackageInfo(wtxid));
            } else if let Some(tx) = inner.orphanage.get_tx(wtxid) {
                for parent_txid in tx.unique_parent_txids() {
                    inner.request_tracker.received_inv(
                        peer,
                        GenericTxid::Txid(parent_txid),
                        info.preferred,
                        now,
                        info.relay_permissions,
                    );
                }
            }
        }

        let (tx_ready, _tx_expired) = inner
            .request_tracker
            .get_requestable(peer, now, inner.config.max_peer_in_flight);
        let deadline = now + inner.config.getdata_tx_interval;
        for invitation in tx_ready {
            inner.request_tracker.requested(peer, invitation.hash, deadline);
            out.push(OutboundRequest::Tx(invitation.hash));
        }

        out
    }

    /// A transaction arrived from `peer`. Returns whether it was already
    /// known (caller should skip re-validating it).
    pub fn received_tx(&self, peer: Peer, tx: &Transaction, mempool: &dyn Mempool) -> bool {
        let mut inner = self.inner.lock();
        inner.request_tracker.received_response(peer, GenericTxid::Txid(tx.txid()));
        inner.request_tracker.received_response(peer, GenericTxid::Wtxid(tx.wtxid()));
        inner.already_have(GenericTxid::Wtxid(tx.wtxid()), mempool)
    }

    pub fn received_notfound(&self, peer: Peer, requests: &[OutboundRequest]) {
        let mut inner = self.inner.lock();
        for request in requests {
            match *request {
                OutboundRequest::Tx(gtxid) => {
                    inner.request_tracker.received_response(peer, gtxid);
                }
                OutboundRequest::PackageInfo(wtxid) => {
                    inner.orphan_resolution.received_response(peer, wtxid);
                }
            }
        }
    }

    /// The validator accepted `tx` into the mempool.
    pub fn mempool_accepted_tx(&self, tx: &Transaction, rng: &mut impl Rng) {
        let mut inner = self.inner.lock();
        inner.orphanage.add_children_to_work_set(tx, rng);
        inner.request_tracker.forget(GenericTxid::Txid(tx.txid()));
        inner.request_tracker.forget(GenericTxid::Wtxid(tx.wtxid()));
        inner.orphanage.erase_tx(tx.wtxid());
        inner.orphan_resolution.forget(tx.wtxid());
    }

    /// The validator rejected `tx`. Returns `true` if the caller should treat
    /// `tx` as a new orphan candidate (only for a `MissingInputs` verdict
    /// whose parents are not themselves recently rejected).
    pub fn mempool_rejected_tx(&self, tx: &Transaction, result: TxValidationResult) -> bool {
        let mut inner = self.inner.lock();
        let wtxid = tx.wtxid();
        let mut becomes_orphan_candidate = false;

        match result {
            TxValidationResult::MissingInputs => {
                let any_parent_rejected = tx
                    .unique_parent_txids()
                    .iter()
                    .any(|parent| inner.recent_rejects.contains(&parent.0));
                if any_parent_rejected {
                    inner.recent_rejects.insert(&tx.txid().0);
                    inner.recent_rejects.insert(&wtxid.0);
                } else {
                    becomes_orphan_candidate = true;
                }
            }
            TxValidationResult::WitnessStripped => {}
            TxValidationResult::InputsNotStandard => {
                inner.recent_rejects.insert(&tx.txid().0);
            }
            TxValidationResult::SingleFailure => {
                inner.recent_rejects_reconsiderable.insert(&wtxid.0);
            }
            TxValidationResult::Consensus
            | TxValidationResult::RecentConsensusChange
            | TxValidationResult::NotStandard
            | TxValidationResult::PrematureSpend
            | TxValidationResult::WitnessMutated
            | TxValidationResult::Conflict
            | TxValidationResult::MempoolPolicy => {
                inner.recent_rejects.insert(&wtxid.0);
            }
            TxValidationResult::Unknown => {}
            TxValidationResult::Unset | TxValidationResult::NoMempool | TxValidationResult::Accepted => {
                debug_assert!(false, "mempool_rejected_tx called with {result}");
            }
        }

        if !becomes_orphan_candidate {
            inner.request_tracker.forget(GenericTxid::Wtxid(wtxid));
            inner.orphanage.erase_tx(wtxid);
        }

        becomes_orphan_candidate
    }

    pub fn block_connected(&self, block: &[Transaction], new_tip: Hash256) {
        let mut inner = self.inner.lock();
        inner.orphanage.erase_for_block(block);
        for tx in block {
            inner.request_tracker.forget(GenericTxid::Txid(tx.txid()));
            inner.request_tracker.forget(GenericTxid::Wtxid(tx.wtxid()));
            inner.recent_confirmed.insert(&tx.txid().0);
            inner.recent_confirmed.insert(&tx.wtxid().0);
            inner.orphan_resolution.forget(tx.wtxid());
        }
        if inner.current_tip != Some(new_tip) {
            inner.recent_rejects.reset();
        }
        inner.current_tip = Some(new_tip);
    }

    /// Pull the next orphan the validation layer should retry for `peer`,
    /// if one was queued by a prior [`Self::mempool_accepted_tx`] call.
    pub fn get_tx_to_reconsider(&self, peer: Peer) -> Option<std::sync::Arc<Transaction>> {
        let mut inner = self.inner.lock();
        inner.orphanage.get_tx_to_reconsider(peer)
    }

    pub fn have_tx_to_reconsider(&self, peer: Peer) -> bool {
        let inner = self.inner.lock();
        inner.orphanage.have_tx_to_reconsider(peer)
    }

    pub fn block_disconnected(&self) {
        let mut inner = self.inner.lock();
        inner.recent_confirmed.reset();
    }

    /// `tx` has no known parent yet. Returns whether it was newly added to
    /// the orphanage (it may have been immediately evicted by
    /// `limit_orphans`) and the deduplicated, not-already-known parent txids
    /// the caller should go fetch.
    pub fn new_orphan_tx(
        &self,
        tx: Transaction,
        peer: Peer,
        now: Instant,
        mempool: &dyn Mempool,
    ) -> (bool, Vec<Txid>) {
        let mut inner = self.inner.lock();
        let parent_txids: Vec<Txid> = tx
            .unique_parent_txids()
            .into_iter()
            .filter(|&txid| !mempool.exists(GenericTxid::Txid(txid)))
            .collect();

        let wtxid = tx.wtxid();
        let txid = tx.txid();
        let active_peers = inner.active_peer_count();
        let newly_added = inner.orphanage.add_tx(tx, peer);
        inner.orphanage.limit_orphans(active_peers);

        if inner.orphanage.have_tx(wtxid) {
            inner.orphan_resolution.add_candidate(peer, wtxid, now);
            let mut other_peers = inner.request_tracker.candidate_peers(GenericTxid::Txid(txid));
            other_peers.extend(inner.request_tracker.candidate_peers(GenericTxid::Wtxid(wtxid)));
            other_peers.sort();
            other_peers.dedup();
            for other in other_peers {
                if other != peer {
                    inner.orphan_resolution.add_candidate(other, wtxid, now);
                }
            }
        }

        (newly_added, parent_txids)
    }
}
