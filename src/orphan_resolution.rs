//! Component D: tracking which peer we've asked to supply an orphan's
//! parents or ancestor package.
//!
//! Same scheduling discipline as [`crate::request_tracker::RequestTracker`]
//! (both sit on [`crate::invitation_tracker::InvitationTracker`]), but
//! simpler: no preferred-peer ordering (resolution requests aren't raced the
//! way initial tx requests are) and a fixed deadline. On response or
//! timeout the `(wtxid, peer)` pair is dissociated outright rather than kept
//! around as `Completed` - there is no value in suppressing a future
//! resolution attempt against the same peer once this one has concluded.

use std::time::{Duration, Instant};

use crate::invitation_tracker::InvitationTracker;
use crate::types::{Peer, Wtxid};

pub struct OrphanResolutionTracker {
    tracker: InvitationTracker<Wtxid>,
    interval: Duration,
}

impl OrphanResolutionTracker {
    pub fn new(interval: Duration) -> Self {
        OrphanResolutionTracker {
            tracker: InvitationTracker::new(),
            interval,
        }
    }

    /// Register `peer` as a candidate to supply `wtxid`'s parents.
    pub fn add_candidate(&mut self, peer: Peer, wtxid: Wtxid, now: Instant) {
        self.tracker.insert(peer, wtxid, false, now);
    }

    /// Wtxids ready to request from `peer`, and wtxids whose deadline has
    /// passed (dissociated immediately, unlike the request tracker's
    /// `Completed` state).
    pub fn get_requestable(&mut self, peer: Peer, now: Instant) -> (Vec<Wtxid>, Vec<Wtxid>) {
        let expired = self.tracker.expire(peer, now);
        for wtxid in &expired {
            self.tracker.remove_pair(peer, *wtxid);
        }
        let ready = self
            .tracker
            .ready_candidates(peer, now)
            .into_iter()
            .map(|inv| inv.hash)
            .collect();
        (ready, expired)
    }

    /// Mark the selected invitation in-flight until `now + interval`.
    pub fn requested(&mut self, peer: Peer, wtxid: Wtxid, now: Instant) -> bool {
        self.tracker.mark_requested(peer, wtxid, now + self.interval)
    }

    /// A response (parents, ancestor package, or notfound) arrived: dissociate.
    pub fn received_response(&mut self, peer: Peer, wtxid: Wtxid) -> bool {
        self.tracker.remove_pair(peer, wtxid)
    }

    /// Remove every invitation for this wtxid (the orphan left the store).
    pub fn forget(&mut self, wtxid: Wtxid) -> usize {
        self.tracker.forget_hash(wtxid)
    }

    pub fn disconnected(&mut self, peer: Peer) {
        self.tracker.forget_peer(peer);
    }

    pub fn size(&self) -> usize {
        self.tracker.size()
    }
}
