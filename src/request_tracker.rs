//! Component B: scheduling which peer to ask for which transaction, and when.
//!
//! Built on [`crate::invitation_tracker::InvitationTracker`] (see that
//! module's doc comment for why B and D share a core) with the
//! preferred-peer-first, per-peer-announcement-cap policy spec.md section
//! 4.B describes.

use std::time::Instant;

use log::debug;

use crate::invitation_tracker::{Invitation, InvitationTracker};
use crate::types::{GenericTxid, Peer};

pub(crate) type RequestedInvitation = Invitation<GenericTxid>;

pub struct RequestTracker {
    tracker: InvitationTracker<GenericTxid>,
    max_peer_announcements: u32,
}

impl RequestTracker {
    pub fn new(max_peer_announcements: u32) -> Self {
        RequestTracker {
            tracker: InvitationTracker::new(),
            max_peer_announcements,
        }
    }

    /// Idempotently record that `peer` has announced `gtxid`.
    ///
    /// Drops silently if `peer` lacks relay permission and is already at
    /// `max_peer_announcements` candidate invitations.
    pub fn received_inv(
        &mut self,
        peer: Peer,
        gtxid: GenericTxid,
        preferred: bool,
        earliest_request_time: Instant,
        has_relay_permission: bool,
    ) {
        if self.tracker.contains(peer, gtxid) {
            return;
        }
        if !has_relay_permission && self.tracker.count(peer) >= self.max_peer_announcements {
            debug!("dropping announcement from peer {peer:?}: at max_peer_announcements");
            return;
        }
        self.tracker.insert(peer, gtxid, preferred, earliest_request_time);
    }

    /// Invitations ready to request from `peer` right now, and invitations
    /// whose deadline has passed (now `Completed`, freeing the hash up for
    /// other peers).
    pub fn get_requestable(
        &mut self,
        peer: Peer,
        now: Instant,
        max_peer_in_flight: u32,
    ) -> (Vec<RequestedInvitation>, Vec<(Peer, GenericTxid)>) {
        let expired_hashes = self.tracker.expire(peer, now);
        let expired = expired_hashes.into_iter().map(|h| (peer, h)).collect();

        // `ready_candidates` has already resolved, per hash, which peer wins
        // the cross-peer preferred/earliest-time race; everything it returns
        // for `peer` is a hash `peer` is entitled to request. This sort only
        // orders *this peer's own* winners so that, when there are more than
        // the in-flight budget allows, the ones spec.md section 4.B would
        // rank highest are kept rather than an arbitrary subset.
        let budget = max_peer_in_flight.saturating_sub(self.tracker.count_in_flight(peer));
        let mut ready = self.tracker.ready_candidates(peer, now);
        ready.sort_by(|a, b| {
            b.preferred
                .cmp(&a.preferred)
                .then(a.request_time.cmp(&b.request_time))
        });
        ready.truncate(budget as usize);
        (ready, expired)
    }

    /// Mark the selected invitation in-flight until `deadline`.
    pub fn requested(&mut self, peer: Peer, hash: GenericTxid, deadline: Instant) -> bool {
        self.tracker.mark_requested(peer, hash, deadline)
    }

    /// Mark the invitation completed; any other peer's candidate for the same
    /// hash becomes eligible.
    pub fn received_response(&mut self, peer: Peer, hash: GenericTxid) -> bool {
        self.tracker.mark_completed(peer, hash)
    }

    /// Remove every invitation for this hash across all peers.
    pub fn forget(&mut self, hash: GenericTxid) -> usize {
        self.tracker.forget_hash(hash)
    }

    /// A peer disconnected: drop every invitation it holds.
    pub fn disconnected(&mut self, peer: Peer) {
        self.tracker.forget_peer(peer);
    }

    pub fn count(&self, peer: Peer) -> u32 {
        self.tracker.count(peer)
    }

    pub fn count_in_flight(&self, peer: Peer) -> u32 {
        self.tracker.count_in_flight(peer)
    }

    pub fn size(&self) -> usize {
        self.tracker.size()
    }

    /// Peers currently holding a not-yet-requested candidate invitation for `hash`.
    pub fn candidate_peers(&self, hash: GenericTxid) -> Vec<Peer> {
        self.tracker.candidate_peers(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Txid;
    use std::time::Duration;

    fn txid(n: u8) -> GenericTxid {
        let mut bytes = [0u8; 32];
        bytes[0] = n;
        GenericTxid::Txid(Txid::from_bytes(bytes))
    }

    #[test]
    fn preferred_peer_sorts_first_on_tie() {
        let mut rt = RequestTracker::new(5000);
        let now = Instant::now();
        rt.received_inv(Peer(1), txid(1), false, now, false);
        rt.received_inv(Peer(2), txid(1), true, now, false);
        let (ready, _) = rt.get_requestable(Peer(2), now, 100);
        assert_eq!(ready.len(), 1);
        assert!(ready[0].preferred);
    }

    #[test]
    fn overloaded_peer_announcements_dropped_without_relay_permission() {
        let mut rt = RequestTracker::new(2);
        let now = Instant::now();
        rt.received_inv(Peer(1), txid(1), false, now, false);
        rt.received_inv(Peer(1), txid(2), false, now, false);
        rt.received_inv(Peer(1), txid(3), false, now, false);
        assert_eq!(rt.count(Peer(1)), 2);
    }

    #[test]
    fn relay_permission_bypasses_announcement_cap() {
        let mut rt = RequestTracker::new(1);
        let now = Instant::now();
        rt.received_inv(Peer(1), txid(1), false, now, true);
        rt.received_inv(Peer(1), txid(2), false, now, true);
        assert_eq!(rt.count(Peer(1)), 2);
    }

    #[test]
    fn expired_in_flight_frees_hash_for_other_peers() {
        let mut rt = RequestTracker::new(5000);
        let now = Instant::now();
        rt.received_inv(Peer(1), txid(1), false, now, false);
        rt.received_inv(Peer(2), txid(1), false, now, false);
        let (ready, _) = rt.get_requestable(Peer(1), now, 100);
        rt.requested(Peer(1), ready[0].hash, now + Duration::from_secs(60));
        let (ready2, _) = rt.get_requestable(Peer(2), now, 100);
        assert!(ready2.is_empty());

        let later = now + Duration::from_secs(61);
        let (_, expired) = rt.get_requestable(Peer(1), later, 100);
        assert_eq!(expired, vec![(Peer(1), txid(1))]);
        let (ready3, _) = rt.get_requestable(Peer(2), later, 100);
        assert_eq!(ready3.len(), 1);
    }

    #[test]
    fn in_flight_budget_limits_ready_list() {
        let mut rt = RequestTracker::new(5000);
        let now = Instant::now();
        for i in 0..5u8 {
            rt.received_inv(Peer(1), txid(i), false, now, false);
        }
        let (ready, _) = rt.get_requestable(Peer(1), now, 3);
        assert_eq!(ready.len(), 3);
    }
}
