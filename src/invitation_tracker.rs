//! Generic candidate -> requested -> completed scheduler underlying both the
//! request tracker (component B) and the orphan resolution tracker
//! (component D). See SPEC_FULL.md section 9 for why these two share a core:
//! the source keeps one per-peer/per-hash bookkeeping discipline and
//! instantiates it for two different semantic purposes.
//!
//! This module is intentionally policy-free on delay computation and
//! per-peer announcement caps - those live in the wrapping
//! `request_tracker`/`orphan_resolution` modules, which carry their own
//! spec-mandated contracts. The one piece of ordering it does own is
//! cross-peer winner selection: when several peers hold a candidate
//! invitation for the same hash, only the best-ranked one (preferred first,
//! earliest `request_time` next) is ever handed back as requestable, since
//! that comparison has to range over every peer holding the hash, not just
//! the one peer a given `ready_candidates` call is asking about.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

use crate::types::Peer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Candidate,
    Requested,
    Completed,
}

#[derive(Clone, Debug)]
pub(crate) struct Invitation<H> {
    pub peer: Peer,
    pub hash: H,
    pub preferred: bool,
    pub request_time: Instant,
    pub state: State,
    pub deadline: Option<Instant>,
}

/// Per-`(peer, hash)` bookkeeping, plus the indices needed to answer
/// "who, if anyone, currently has an in-flight request for this hash".
pub(crate) struct InvitationTracker<H> {
    by_key: HashMap<(Peer, H), Invitation<H>>,
    in_flight_by_hash: HashMap<H, Peer>,
    peers_by_hash: HashMap<H, Vec<Peer>>,
    count_by_peer: HashMap<Peer, u32>,
    in_flight_count_by_peer: HashMap<Peer, u32>,
}

impl<H: Copy + Eq + Hash> Default for InvitationTracker<H> {
    fn default() -> Self {
        InvitationTracker {
            by_key: HashMap::new(),
            in_flight_by_hash: HashMap::new(),
            peers_by_hash: HashMap::new(),
            count_by_peer: HashMap::new(),
            in_flight_count_by_peer: HashMap::new(),
        }
    }
}

impl<H: Copy + Eq + Hash> InvitationTracker<H> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Idempotently record `(peer, hash)`. Returns `false` (no-op) if already
    /// present - the earlier `request_time` and the first `preferred` value
    /// win, matching spec.md's "keep the earlier time and the prior preferred
    /// flag" contract.
    pub(crate) fn insert(&mut self, peer: Peer, hash: H, preferred: bool, request_time: Instant) -> bool {
        if self.by_key.contains_key(&(peer, hash)) {
            return false;
        }
        self.by_key.insert(
            (peer, hash),
            Invitation {
                peer,
                hash,
                preferred,
                request_time,
                state: State::Candidate,
                deadline: None,
            },
        );
        self.peers_by_hash.entry(hash).or_default().push(peer);
        *self.count_by_peer.entry(peer).or_insert(0) += 1;
        true
    }

    pub(crate) fn contains(&self, peer: Peer, hash: H) -> bool {
        self.by_key.contains_key(&(peer, hash))
    }

    pub(crate) fn get(&self, peer: Peer, hash: H) -> Option<&Invitation<H>> {
        self.by_key.get(&(peer, hash))
    }

    /// Candidate invitations for `peer` whose `request_time <= now`, whose
    /// hash has no other in-flight request right now, and for which `peer`
    /// is the best-ranked candidate for that hash among every peer
    /// currently eligible to request it - not merely the earliest one to
    /// ask. Two peers racing the same hash never both come back ready; only
    /// the winner of `best_peer_for_hash` does.
    pub(crate) fn ready_candidates(&self, peer: Peer, now: Instant) -> Vec<Invitation<H>> {
        self.by_key
            .values()
            .filter(|inv| {
                inv.peer == peer
                    && inv.state == State::Candidate
                    && inv.request_time <= now
                    && self.in_flight_by_hash.get(&inv.hash).is_none()
                    && self.best_peer_for_hash(inv.hash, now) == Some(peer)
            })
            .cloned()
            .collect()
    }

    /// Among every peer holding a `Candidate` invitation for `hash` with
    /// `request_time <= now`, the one spec.md section 4.B says should win:
    /// preferred peers first, ties broken by earliest `request_time`. A
    /// final tie-break on `Peer` itself makes the choice deterministic when
    /// preference and request_time are both equal, so exactly one peer ever
    /// wins a given hash at a given instant.
    fn best_peer_for_hash(&self, hash: H, now: Instant) -> Option<Peer> {
        self.peers_by_hash
            .get(&hash)
            .into_iter()
            .flatten()
            .filter_map(|&candidate_peer| {
                let inv = self.by_key.get(&(candidate_peer, hash))?;
                (inv.state == State::Candidate && inv.request_time <= now).then_some(inv)
            })
            .min_by_key(|inv| (!inv.preferred, inv.request_time, inv.peer))
            .map(|inv| inv.peer)
    }

    /// In-flight invitations for `peer` whose deadline has passed. Transitions
    /// them to `Completed` so the hash becomes requestable again elsewhere.
    pub(crate) fn expire(&mut self, peer: Peer, now: Instant) -> Vec<H> {
        let expired_hashes: Vec<H> = self
            .by_key
            .values()
            .filter(|inv| {
                inv.peer == peer
                    && inv.state == State::Requested
                    && inv.deadline.map(|d| d <= now).unwrap_or(false)
            })
            .map(|inv| inv.hash)
            .collect();
        for hash in &expired_hashes {
            self.mark_completed(peer, *hash);
        }
        expired_hashes
    }

    pub(crate) fn mark_requested(&mut self, peer: Peer, hash: H, deadline: Instant) -> bool {
        if let Some(inv) = self.by_key.get_mut(&(peer, hash)) {
            if inv.state != State::Candidate {
                return false;
            }
            inv.state = State::Requested;
            inv.deadline = Some(deadline);
            self.in_flight_by_hash.insert(hash, peer);
            *self.in_flight_count_by_peer.entry(peer).or_insert(0) += 1;
            true
        } else {
            false
        }
    }

    /// Mark the invitation completed (response received, or timed out).
    /// Remains present (suppressing re-requests of this exact pair) until
    /// `forget`.
    pub(crate) fn mark_completed(&mut self, peer: Peer, hash: H) -> bool {
        if let Some(inv) = self.by_key.get_mut(&(peer, hash)) {
            let was_requested = inv.state == State::Requested;
            inv.state = State::Completed;
            inv.deadline = None;
            if was_requested {
                if self.in_flight_by_hash.get(&hash) == Some(&peer) {
                    self.in_flight_by_hash.remove(&hash);
                }
                if let Some(count) = self.in_flight_count_by_peer.get_mut(&peer) {
                    *count = count.saturating_sub(1);
                }
            }
            true
        } else {
            false
        }
    }

    /// Fully remove the `(peer, hash)` pair, regardless of state.
    pub(crate) fn remove_pair(&mut self, peer: Peer, hash: H) -> bool {
        if let Some(inv) = self.by_key.remove(&(peer, hash)) {
            if inv.state == State::Requested && self.in_flight_by_hash.get(&hash) == Some(&peer) {
                self.in_flight_by_hash.remove(&hash);
            }
            if let Some(list) = self.peers_by_hash.get_mut(&hash) {
                list.retain(|p| *p != peer);
                if list.is_empty() {
                    self.peers_by_hash.remove(&hash);
                }
            }
            if let Some(count) = self.count_by_peer.get_mut(&peer) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.count_by_peer.remove(&peer);
                }
            }
            if inv.state == State::Requested {
                if let Some(count) = self.in_flight_count_by_peer.get_mut(&peer) {
                    *count = count.saturating_sub(1);
                }
            }
            true
        } else {
            false
        }
    }

    /// Remove every invitation for `hash` across all peers.
    pub(crate) fn forget_hash(&mut self, hash: H) -> usize {
        let peers = self.peers_by_hash.remove(&hash).unwrap_or_default();
        let mut removed = 0;
        for peer in peers {
            if self.by_key.remove(&(peer, hash)).is_some() {
                removed += 1;
                if let Some(count) = self.count_by_peer.get_mut(&peer) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        self.count_by_peer.remove(&peer);
                    }
                }
            }
        }
        self.in_flight_by_hash.remove(&hash);
        removed
    }

    /// Remove every invitation made by `peer` (disconnect).
    pub(crate) fn forget_peer(&mut self, peer: Peer) {
        let hashes: Vec<H> = self
            .by_key
            .keys()
            .filter(|(p, _)| *p == peer)
            .map(|(_, h)| *h)
            .collect();
        for hash in hashes {
            self.by_key.remove(&(peer, hash));
            if self.in_flight_by_hash.get(&hash) == Some(&peer) {
                self.in_flight_by_hash.remove(&hash);
            }
            if let Some(list) = self.peers_by_hash.get_mut(&hash) {
                list.retain(|p| *p != peer);
                if list.is_empty() {
                    self.peers_by_hash.remove(&hash);
                }
            }
        }
        self.count_by_peer.remove(&peer);
        self.in_flight_count_by_peer.remove(&peer);
    }

    /// Peers holding a `Candidate` invitation for `hash`, in no particular order.
    pub(crate) fn candidate_peers(&self, hash: H) -> Vec<Peer> {
        self.peers_by_hash
            .get(&hash)
            .into_iter()
            .flatten()
            .filter(|&&peer| {
                self.by_key
                    .get(&(peer, hash))
                    .map(|inv| inv.state == State::Candidate)
                    .unwrap_or(false)
            })
            .copied()
            .collect()
    }

    pub(crate) fn count(&self, peer: Peer) -> u32 {
        self.count_by_peer.get(&peer).copied().unwrap_or(0)
    }

    pub(crate) fn count_in_flight(&self, peer: Peer) -> u32 {
        self.in_flight_count_by_peer.get(&peer).copied().unwrap_or(0)
    }

    pub(crate) fn size(&self) -> usize {
        self.by_key.len()
    }
}
