//! Component C: a bounded, multi-indexed store of unvalidated transactions
//! whose parents are not yet known, with per-peer DoS-fair eviction.
//!
//! Grounded on the multi-index discipline spec.md section 9 calls for (a
//! unique index by `(wtxid, peer)`, an ordered index by
//! `(peer, reconsider, sequence)`) and on the teacher's
//! `peer_store/score.rs` + `peer_registry::try_evict_inbound_peer`, which
//! score and evict peers the same shape way this evicts announcements: rank
//! by how far over its fair share a peer is, pop the worst, repeat.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use log::{debug, warn};
use rand::Rng;

use crate::types::{Outpoint, Peer, Transaction, Wtxid, MAX_STANDARD_TX_WEIGHT};

#[derive(Clone, Copy, Debug)]
struct Announcement {
    sequence: u64,
    reconsider: bool,
}

#[derive(Clone, Copy, Debug, Default)]
struct PeerAggregate {
    bytes_used: u64,
    announcement_count: u32,
}

/// Worst-peer ranking for eviction: the larger of the peer's
/// announcement-count ratio and weight ratio against its fair share, with
/// ties broken toward the axis with the smaller denominator (biasing
/// eviction toward announcement-spammers over weight-spammers of equal
/// relative pressure, per spec.md section 4.C).
#[derive(Clone, Copy, Debug, PartialEq)]
struct DosScore {
    peer: Peer,
    ratio: f64,
    denom: u64,
}

impl Eq for DosScore {}

impl PartialOrd for DosScore {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DosScore {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ratio
            .partial_cmp(&other.ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| other.denom.cmp(&self.denom))
    }
}

fn ratio_of(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        if numerator == 0 {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Default hard cap on total announcement rows across all peers.
pub const DEFAULT_MAX_GLOBAL_ANNOUNCEMENTS: u32 = 100;
/// Default weight each active peer's orphan slot reserves.
pub const DEFAULT_RESERVED_PEER_WEIGHT: u64 = 404_000;

pub struct Orphanage {
    max_global_announcements: u32,
    reserved_peer_weight: u64,

    // (wtxid, peer) -> announcement. Unique index.
    announcements: HashMap<(Wtxid, Peer), Announcement>,
    // (peer, reconsider, sequence) -> (wtxid). Ordered index.
    by_peer_order: BTreeMap<(Peer, bool, u64), Wtxid>,

    txs: HashMap<Wtxid, Arc<Transaction>>,
    announcers: HashMap<Wtxid, HashSet<Peer>>,
    outpoints: HashMap<Outpoint, HashSet<Wtxid>>,

    peer_aggregates: HashMap<Peer, PeerAggregate>,

    unique_orphan_bytes: u64,
    next_sequence: u64,
}

impl Orphanage {
    pub fn new(max_global_announcements: u32, reserved_peer_weight: u64) -> Self {
        Orphanage {
            max_global_announcements,
            reserved_peer_weight,
            announcements: HashMap::new(),
            by_peer_order: BTreeMap::new(),
            txs: HashMap::new(),
            announcers: HashMap::new(),
            outpoints: HashMap::new(),
            peer_aggregates: HashMap::new(),
            unique_orphan_bytes: 0,
            next_sequence: 0,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_GLOBAL_ANNOUNCEMENTS, DEFAULT_RESERVED_PEER_WEIGHT)
    }

    fn next_sequence(&mut self) -> u64 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }

    fn insert_announcement(&mut self, wtxid: Wtxid, peer: Peer, reconsider: bool) -> u64 {
        let sequence = self.next_sequence();
        self.announcements
            .insert((wtxid, peer), Announcement { sequence, reconsider });
        self.by_peer_order.insert((peer, reconsider, sequence), wtxid);
        self.announcers.entry(wtxid).or_default().insert(peer);
        sequence
    }

    fn bump_peer_aggregate(&mut self, peer: Peer, weight: u64) {
        let agg = self.peer_aggregates.entry(peer).or_default();
        agg.announcement_count += 1;
        agg.bytes_used += weight;
    }

    fn shrink_peer_aggregate(&mut self, peer: Peer, weight: u64) {
        if let Some(agg) = self.peer_aggregates.get_mut(&peer) {
            agg.announcement_count = agg.announcement_count.saturating_sub(1);
            agg.bytes_used = agg.bytes_used.saturating_sub(weight);
            if agg.announcement_count == 0 {
                self.peer_aggregates.remove(&peer);
            }
        }
    }

    /// Record `peer`'s claim to `tx`. Returns `true` if this is the first
    /// announcer of a brand-new wtxid, `false` if an additional announcer was
    /// added to an already-stored orphan, and `false` without effect if the
    /// transaction is oversized or `(wtxid, peer)` was already present.
    pub fn add_tx(&mut self, tx: Transaction, peer: Peer) -> bool {
        let wtxid = tx.wtxid();
        if tx.weight() > MAX_STANDARD_TX_WEIGHT {
            return false;
        }
        if self.announcements.contains_key(&(wtxid, peer)) {
            return false;
        }
        let weight = tx.weight();
        let is_new = !self.txs.contains_key(&wtxid);
        if is_new {
            for &input in tx.inputs() {
                self.outpoints.entry(input).or_default().insert(wtxid);
            }
            self.unique_orphan_bytes += weight;
            self.txs.insert(wtxid, Arc::new(tx));
        }
        self.insert_announcement(wtxid, peer, false);
        self.bump_peer_aggregate(peer, weight);
        debug!("orphanage: add_tx wtxid={wtxid:?} peer={peer:?} new={is_new}");
        is_new
    }

    /// Add `peer` as an additional announcer of an already-stored `wtxid`.
    pub fn add_announcer(&mut self, wtxid: Wtxid, peer: Peer) -> bool {
        let Some(tx) = self.txs.get(&wtxid) else {
            return false;
        };
        if self.announcements.contains_key(&(wtxid, peer)) {
            return false;
        }
        let weight = tx.weight();
        self.insert_announcement(wtxid, peer, false);
        self.bump_peer_aggregate(peer, weight);
        true
    }

    fn remove_announcement(&mut self, wtxid: Wtxid, peer: Peer) -> Option<Announcement> {
        let announcement = self.announcements.remove(&(wtxid, peer))?;
        self.by_peer_order
            .remove(&(peer, announcement.reconsider, announcement.sequence));
        if let Some(set) = self.announcers.get_mut(&wtxid) {
            set.remove(&peer);
        }
        let weight = self.txs.get(&wtxid).map(|t| t.weight()).unwrap_or(0);
        self.shrink_peer_aggregate(peer, weight);
        Some(announcement)
    }

    /// Remove every announcement for `wtxid`. Returns the number of unique
    /// wtxids erased (0 or 1).
    pub fn erase_tx(&mut self, wtxid: Wtxid) -> u32 {
        let Some(announcers) = self.announcers.remove(&wtxid) else {
            return 0;
        };
        for peer in announcers {
            self.remove_announcement(wtxid, peer);
        }
        if let Some(tx) = self.txs.remove(&wtxid) {
            for &input in tx.inputs() {
                if let Some(set) = self.outpoints.get_mut(&input) {
                    set.remove(&wtxid);
                    if set.is_empty() {
                        self.outpoints.remove(&input);
                    }
                }
            }
            self.unique_orphan_bytes = self.unique_orphan_bytes.saturating_sub(tx.weight());
        }
        1
    }

    /// Remove every announcement made by `peer`. A wtxid whose last announcer
    /// disconnects is fully removed; otherwise only this announcement drops.
    pub fn erase_for_peer(&mut self, peer: Peer) {
        let wtxids: Vec<Wtxid> = self
            .announcements
            .keys()
            .filter(|(_, p)| *p == peer)
            .map(|(w, _)| *w)
            .collect();
        for wtxid in wtxids {
            self.remove_announcement(wtxid, peer);
            let last_announcer_gone = self
                .announcers
                .get(&wtxid)
                .map(|set| set.is_empty())
                .unwrap_or(true);
            if last_announcer_gone {
                self.announcers.remove(&wtxid);
                if let Some(tx) = self.txs.remove(&wtxid) {
                    for &input in tx.inputs() {
                        if let Some(set) = self.outpoints.get_mut(&input) {
                            set.remove(&wtxid);
                            if set.is_empty() {
                                self.outpoints.remove(&input);
                            }
                        }
                    }
                    self.unique_orphan_bytes = self.unique_orphan_bytes.saturating_sub(tx.weight());
                }
            }
        }
        self.peer_aggregates.remove(&peer);
    }

    /// For every outpoint spent by any transaction in `block`, remove every
    /// orphan that spends it. Returns the number of unique wtxids removed.
    pub fn erase_for_block(&mut self, block: &[Transaction]) -> u32 {
        let mut conflicting = HashSet::new();
        for tx in block {
            for &input in tx.inputs() {
                if let Some(set) = self.outpoints.get(&input) {
                    conflicting.extend(set.iter().copied());
                }
            }
        }
        let mut erased = 0;
        for wtxid in conflicting {
            erased += self.erase_tx(wtxid);
        }
        erased
    }

    pub fn have_tx(&self, wtxid: Wtxid) -> bool {
        self.txs.contains_key(&wtxid)
    }

    pub fn have_tx_from_peer(&self, wtxid: Wtxid, peer: Peer) -> bool {
        self.announcements.contains_key(&(wtxid, peer))
    }

    pub fn get_tx(&self, wtxid: Wtxid) -> Option<Arc<Transaction>> {
        self.txs.get(&wtxid).cloned()
    }

    /// For each output of `parent_tx`, find orphans spending it and mark one
    /// randomly-chosen announcer's invitation `reconsider = true`. The random
    /// choice prevents a malicious announcer from blocking reconsideration by
    /// disconnecting right after being chosen (spec.md section 4.C).
    pub fn add_children_to_work_set(&mut self, parent_tx: &Transaction, rng: &mut impl Rng) {
        let parent_txid = parent_tx.txid();
        for index in 0..parent_tx.num_outputs() {
            let outpoint = Outpoint { txid: parent_txid, index };
            let Some(wtxids) = self.outpoints.get(&outpoint).cloned() else {
                continue;
            };
            for wtxid in wtxids {
                let Some(announcers) = self.announcers.get(&wtxid) else {
                    continue;
                };
                let mut candidates: Vec<Peer> = announcers.iter().copied().collect();
                if candidates.is_empty() {
                    continue;
                }
                candidates.sort_by_key(|p| p.0);
                let chosen = candidates[rng.gen_range(0..candidates.len())];
                self.set_reconsider(wtxid, chosen, true);
            }
        }
    }

    fn set_reconsider(&mut self, wtxid: Wtxid, peer: Peer, reconsider: bool) -> bool {
        let Some(announcement) = self.announcements.get_mut(&(wtxid, peer)) else {
            return false;
        };
        if announcement.reconsider == reconsider {
            return true;
        }
        let old_key = (peer, announcement.reconsider, announcement.sequence);
        announcement.reconsider = reconsider;
        let sequence = announcement.sequence;
        self.by_peer_order.remove(&old_key);
        self.by_peer_order.insert((peer, reconsider, sequence), wtxid);
        true
    }

    /// The lowest-sequence announcement for `peer` with `reconsider = true`;
    /// flips it back to `false` and returns the transaction.
    pub fn get_tx_to_reconsider(&mut self, peer: Peer) -> Option<Arc<Transaction>> {
        let key = self
            .by_peer_order
            .range((peer, true, 0)..=(peer, true, u64::MAX))
            .next()
            .map(|(&k, &w)| (k, w));
        let ((_, _, _), wtxid) = key?;
        self.set_reconsider(wtxid, peer, false);
        self.txs.get(&wtxid).cloned()
    }

    pub fn have_tx_to_reconsider(&self, peer: Peer) -> bool {
        self.by_peer_order
            .range((peer, true, 0)..=(peer, true, u64::MAX))
            .next()
            .is_some()
    }

    /// For each output of `parent_tx`, orphans spending it where `peer` is
    /// among the announcers, most-recent first, deduplicated.
    pub fn get_children_from_same_peer(&self, parent_tx: &Transaction, peer: Peer) -> Vec<Arc<Transaction>> {
        let parent_txid = parent_tx.txid();
        let mut found: Vec<(u64, Wtxid)> = Vec::new();
        let mut seen = HashSet::new();
        for index in 0..parent_tx.num_outputs() {
            let outpoint = Outpoint { txid: parent_txid, index };
            let Some(wtxids) = self.outpoints.get(&outpoint) else {
                continue;
            };
            for &wtxid in wtxids {
                if !seen.insert(wtxid) {
                    continue;
                }
                if let Some(announcement) = self.announcements.get(&(wtxid, peer)) {
                    found.push((announcement.sequence, wtxid));
                }
            }
        }
        found.sort_by(|a, b| b.0.cmp(&a.0));
        found
            .into_iter()
            .filter_map(|(_, wtxid)| self.txs.get(&wtxid).cloned())
            .collect()
    }

    fn oldest_non_reconsider(&self, peer: Peer) -> Option<Wtxid> {
        self.by_peer_order
            .range((peer, false, 0)..=(peer, false, u64::MAX))
            .next()
            .map(|(_, &wtxid)| wtxid)
    }

    fn dos_score(&self, peer: Peer, max_peer_announcements: u32, max_peer_weight: u64) -> DosScore {
        let agg = self.peer_aggregates.get(&peer).copied().unwrap_or_default();
        let count_ratio = ratio_of(agg.announcement_count as u64, max_peer_announcements as u64);
        let weight_ratio = ratio_of(agg.bytes_used, max_peer_weight);
        if count_ratio >= weight_ratio {
            DosScore {
                peer,
                ratio: count_ratio,
                denom: max_peer_announcements as u64,
            }
        } else {
            DosScore {
                peer,
                ratio: weight_ratio,
                denom: max_peer_weight,
            }
        }
    }

    /// Evict announcements until both global bounds are satisfied, or until
    /// every remaining offending peer has nothing left that's safe to evict
    /// (every one of its announcements is marked `reconsider = true`).
    pub fn limit_orphans(&mut self, active_peers: u32) {
        let active = active_peers.max(1);
        let max_peer_announcements = self.max_global_announcements / active;
        let max_peer_weight = self.reserved_peer_weight;
        let max_global_weight = self.reserved_peer_weight.saturating_mul(active as u64);

        let mut exhausted: HashSet<Peer> = HashSet::new();
        loop {
            let over_count = self.announcements.len() as u32 > self.max_global_announcements;
            let over_weight = self.unique_orphan_bytes > max_global_weight;
            if !over_count && !over_weight {
                break;
            }

            let worst = self
                .peer_aggregates
                .keys()
                .filter(|p| !exhausted.contains(p))
                .map(|&p| self.dos_score(p, max_peer_announcements, max_peer_weight))
                .max();
            let Some(worst) = worst else {
                break;
            };
            debug_assert!(
                worst.ratio > 1.0,
                "limit_orphans popped a peer under its fair share while a global limit was exceeded"
            );

            match self.oldest_non_reconsider(worst.peer) {
                Some(wtxid) => {
                    warn!("orphanage: evicting wtxid={wtxid:?} from peer={:?} (dos_score={})", worst.peer, worst.ratio);
                    self.remove_announcement(wtxid, worst.peer);
                    let last_announcer_gone = self
                        .announcers
                        .get(&wtxid)
                        .map(|set| set.is_empty())
                        .unwrap_or(true);
                    if last_announcer_gone {
                        self.announcers.remove(&wtxid);
                        if let Some(tx) = self.txs.remove(&wtxid) {
                            for &input in tx.inputs() {
                                if let Some(set) = self.outpoints.get_mut(&input) {
                                    set.remove(&wtxid);
                                    if set.is_empty() {
                                        self.outpoints.remove(&input);
                                    }
                                }
                            }
                            self.unique_orphan_bytes = self.unique_orphan_bytes.saturating_sub(tx.weight());
                        }
                    }
                }
                None => {
                    exhausted.insert(worst.peer);
                }
            }
        }
    }

    pub fn unique_orphan_count(&self) -> usize {
        self.txs.len()
    }

    pub fn announcement_count(&self) -> usize {
        self.announcements.len()
    }

    pub fn unique_orphan_bytes(&self) -> u64 {
        self.unique_orphan_bytes
    }

    pub fn peer_announcement_count(&self, peer: Peer) -> u32 {
        self.peer_aggregates
            .get(&peer)
            .map(|a| a.announcement_count)
            .unwrap_or(0)
    }

    /// Verifies every invariant listed in spec.md section 3/5. Intended for
    /// use from tests only.
    pub fn sanity_check(&self) {
        assert!(self.announcements.len() >= self.txs.len());

        let mut recomputed_counts: HashMap<Peer, u32> = HashMap::new();
        let mut recomputed_bytes: HashMap<Peer, u64> = HashMap::new();
        for ((wtxid, peer), _ann) in &self.announcements {
            *recomputed_counts.entry(*peer).or_insert(0) += 1;
            let weight = self.txs.get(wtxid).map(|t| t.weight()).unwrap_or(0);
            *recomputed_bytes.entry(*peer).or_insert(0) += weight;
        }
        assert_eq!(recomputed_counts.len(), self.peer_aggregates.len());
        for (peer, agg) in &self.peer_aggregates {
            assert_eq!(agg.announcement_count, *recomputed_counts.get(peer).unwrap_or(&0));
            assert_eq!(agg.bytes_used, *recomputed_bytes.get(peer).unwrap_or(&0));
            assert!(agg.announcement_count > 0);
        }

        let recomputed_global_bytes: u64 = self.txs.values().map(|t| t.weight()).sum();
        assert_eq!(recomputed_global_bytes, self.unique_orphan_bytes);

        for tx in self.txs.values() {
            for &input in tx.inputs() {
                assert!(self
                    .outpoints
                    .get(&input)
                    .map(|set| set.contains(&tx.wtxid()))
                    .unwrap_or(false));
            }
        }
        for (outpoint, wtxids) in &self.outpoints {
            for wtxid in wtxids {
                let tx = self.txs.get(wtxid).expect("outpoint index references live tx");
                assert!(tx.inputs().contains(outpoint));
            }
        }

        assert_eq!(self.by_peer_order.len(), self.announcements.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Txid;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn txid(n: u8) -> Txid {
        let mut bytes = [0u8; 32];
        bytes[0] = n;
        Txid::from_bytes(bytes)
    }

    fn wtxid(n: u8) -> Wtxid {
        let mut bytes = [0u8; 32];
        bytes[0] = n;
        Wtxid::from_bytes(bytes)
    }

    fn make_tx(id: u8, parent: u8, weight: u64) -> Transaction {
        Transaction::new(
            txid(id),
            wtxid(id),
            2,
            vec![Outpoint { txid: txid(parent), index: 0 }],
            1,
            weight,
        )
    }

    #[test]
    fn add_tx_reports_first_vs_additional_announcer() {
        let mut store = Orphanage::with_defaults();
        assert!(store.add_tx(make_tx(1, 0, 1000), Peer(1)));
        assert!(!store.add_tx(make_tx(1, 0, 1000), Peer(2)));
        assert!(store.have_tx_from_peer(wtxid(1), Peer(1)));
        assert!(store.have_tx_from_peer(wtxid(1), Peer(2)));
        assert_eq!(store.unique_orphan_count(), 1);
        store.sanity_check();
    }

    #[test]
    fn add_tx_rejects_oversized_transaction() {
        let mut store = Orphanage::with_defaults();
        assert!(!store.add_tx(make_tx(1, 0, MAX_STANDARD_TX_WEIGHT + 1), Peer(1)));
        assert!(!store.have_tx(wtxid(1)));
    }

    #[test]
    fn add_tx_is_idempotent_per_peer() {
        let mut store = Orphanage::with_defaults();
        store.add_tx(make_tx(1, 0, 1000), Peer(1));
        assert!(!store.add_tx(make_tx(1, 0, 1000), Peer(1)));
        assert_eq!(store.peer_announcement_count(Peer(1)), 1);
    }

    #[test]
    fn erase_tx_round_trips_unique_count() {
        let mut store = Orphanage::with_defaults();
        store.add_tx(make_tx(1, 0, 1000), Peer(1));
        let before = store.unique_orphan_count();
        assert_eq!(store.erase_tx(wtxid(1)), 1);
        assert_eq!(store.unique_orphan_count(), before - 1);
        store.sanity_check();
    }

    #[test]
    fn erase_for_peer_only_removes_that_peer() {
        let mut store = Orphanage::with_defaults();
        store.add_tx(make_tx(1, 0, 1000), Peer(1));
        store.add_announcer(wtxid(1), Peer(2));
        store.erase_for_peer(Peer(1));
        assert_eq!(store.peer_announcement_count(Peer(1)), 0);
        assert!(store.have_tx(wtxid(1)));
        assert!(store.have_tx_from_peer(wtxid(1), Peer(2)));
        store.sanity_check();
    }

    #[test]
    fn erase_for_peer_fully_removes_last_announcer() {
        let mut store = Orphanage::with_defaults();
        store.add_tx(make_tx(1, 0, 1000), Peer(1));
        store.erase_for_peer(Peer(1));
        assert!(!store.have_tx(wtxid(1)));
        store.sanity_check();
    }

    #[test]
    fn erase_for_block_removes_conflicting_orphans() {
        let mut store = Orphanage::with_defaults();
        store.add_tx(make_tx(1, 9, 1000), Peer(1));
        let block = vec![Transaction::new(
            txid(200),
            wtxid(200),
            2,
            vec![Outpoint { txid: txid(9), index: 0 }],
            1,
            500,
        )];
        assert_eq!(store.erase_for_block(&block), 1);
        assert!(!store.have_tx(wtxid(1)));
    }

    #[test]
    fn reconsider_flag_is_peer_isolated() {
        let mut store = Orphanage::with_defaults();
        store.add_tx(make_tx(1, 9, 1000), Peer(2));
        store.add_announcer(wtxid(1), Peer(3));
        let mut rng = StdRng::seed_from_u64(0);
        let parent = make_tx(9, 0, 1000);
        store.add_children_to_work_set(&parent, &mut rng);

        let chosen_has_reconsider = store.have_tx_to_reconsider(Peer(2)) || store.have_tx_to_reconsider(Peer(3));
        assert!(chosen_has_reconsider);
        assert!(!(store.have_tx_to_reconsider(Peer(2)) && store.have_tx_to_reconsider(Peer(3))));
    }

    #[test]
    fn get_tx_to_reconsider_is_idempotent() {
        let mut store = Orphanage::with_defaults();
        store.add_tx(make_tx(1, 9, 1000), Peer(2));
        let mut rng = StdRng::seed_from_u64(1);
        let parent = make_tx(9, 0, 1000);
        store.add_children_to_work_set(&parent, &mut rng);
        assert!(store.get_tx_to_reconsider(Peer(2)).is_some());
        assert!(store.get_tx_to_reconsider(Peer(2)).is_none());
    }

    #[test]
    fn reconsider_announcements_are_protected_from_eviction() {
        let mut store = Orphanage::new(1, 10_000_000);
        store.add_tx(make_tx(1, 9, 1000), Peer(1));
        let mut rng = StdRng::seed_from_u64(0);
        let parent = make_tx(9, 0, 1000);
        store.add_children_to_work_set(&parent, &mut rng);
        store.add_tx(make_tx(2, 8, 1000), Peer(1));

        store.limit_orphans(1);
        // wtxid(1) is protected (reconsider=true); only wtxid(2) is evictable,
        // so the global cap of 1 cannot be fully restored here.
        assert!(store.have_tx(wtxid(1)));
    }

    #[test]
    fn fair_peer_never_loses_orphans_to_a_flooding_peer() {
        let mut store = Orphanage::new(100, 404_000);
        for i in 0..10u8 {
            store.add_tx(make_tx(i, 100 + i, 40_000), Peer(1));
        }
        for peer in 2..11u64 {
            for i in 0..20u8 {
                let id = peer as u8 * 20 + i;
                store.add_tx(make_tx(id, 200 + i, 1), Peer(peer));
            }
        }
        store.limit_orphans(10);
        for i in 0..10u8 {
            assert!(
                store.have_tx_from_peer(wtxid(i), Peer(1)),
                "fair peer 1's orphan {i} was evicted"
            );
        }
        store.sanity_check();
    }

    #[test]
    fn get_children_from_same_peer_orders_most_recent_first() {
        let mut store = Orphanage::with_defaults();
        store.add_tx(make_tx(1, 9, 1000), Peer(1));
        store.add_tx(make_tx(2, 9, 1000), Peer(1));
        let parent = make_tx(9, 0, 1000);
        let children = store.get_children_from_same_peer(&parent, Peer(1));
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].wtxid(), wtxid(2));
        assert_eq!(children[1].wtxid(), wtxid(1));
    }
}
