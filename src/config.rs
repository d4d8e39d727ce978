//! Tunables for every subcomponent, collected in one place the way the
//! teacher's `NetworkConfig` collects connection-slot and timing tunables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Parameters for a [`crate::rolling_bloom_filter::RollingBloomFilter`]: nominal
/// capacity and target false-positive rate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RollingFilterParams {
    pub capacity: u32,
    pub false_positive_rate: f64,
}

impl RollingFilterParams {
    pub const fn new(capacity: u32, false_positive_rate: f64) -> Self {
        RollingFilterParams {
            capacity,
            false_positive_rate,
        }
    }
}

/// Every tunable named in spec.md section 6, with the documented defaults.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Hard cap on unique orphans (`MAX_GLOBAL_ANNOUNCEMENTS` is derived per-peer
    /// from this together with the active peer count; this field is the
    /// coordinator-level knob, the orphanage itself takes the derived values).
    pub max_orphan_txs: u32,
    /// Weight reserved for each active peer's orphan slot.
    pub reserved_peer_weight: u64,
    /// Cap on announcements (invitations) a peer may have outstanding at once.
    pub max_peer_announcements: u32,
    /// Cap on simultaneous in-flight requests to one peer.
    pub max_peer_in_flight: u32,
    /// Extra delay applied when an announcement is txid-typed while wtxid-relay
    /// peers exist.
    pub txid_relay_delay: Duration,
    /// Extra delay applied to a non-preferred peer's announcement.
    pub non_preferred_delay: Duration,
    /// Extra delay applied when the announcing peer is already overloaded.
    pub overloaded_delay: Duration,
    /// Deadline for a normal transaction request.
    pub getdata_tx_interval: Duration,
    /// Deadline for an orphan ancestor / parent request.
    pub orphan_ancestor_getdata_interval: Duration,
    /// Rolling filter for recently rejected transactions.
    pub recent_rejects_params: RollingFilterParams,
    /// Rolling filter for recently confirmed transactions.
    pub recent_confirmed_params: RollingFilterParams,
    /// Rolling filter for rejects that should still be reconsidered if a
    /// package arrives that resolves the earlier single failure.
    pub recent_rejects_reconsiderable_params: RollingFilterParams,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_orphan_txs: 100,
            reserved_peer_weight: 404_000,
            max_peer_announcements: 5_000,
            max_peer_in_flight: 100,
            txid_relay_delay: Duration::from_secs(2),
            non_preferred_delay: Duration::from_secs(2),
            overloaded_delay: Duration::from_secs(2),
            getdata_tx_interval: Duration::from_secs(60),
            orphan_ancestor_getdata_interval: Duration::from_secs(60),
            recent_rejects_params: RollingFilterParams::new(120_000, 0.000_001),
            recent_confirmed_params: RollingFilterParams::new(48_000, 0.000_001),
            recent_rejects_reconsiderable_params: RollingFilterParams::new(120_000, 0.000_001),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }
}
