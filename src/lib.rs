//! Peer-to-peer transaction download scheduling and orphan management.
//!
//! This crate is a pure in-memory state machine: it decides which peer to
//! ask for which transaction and when, holds unvalidated orphans under a
//! bounded, per-peer DoS-fair eviction policy, and reacts to validation
//! outcomes, block (dis)connections, and peer disconnects. It does not
//! validate transactions, serialize wire messages, or talk to the network
//! itself - those are the embedder's job, reached through the [`mempool`]
//! trait and the [`coordinator::OutboundRequest`] values this crate hands
//! back.
//!
//! Entry point: [`coordinator::TxDownloadManager`].

mod config;
mod coordinator;
mod invitation_tracker;
mod mempool;
mod orphan_resolution;
mod orphanage;
mod request_tracker;
mod rolling_bloom_filter;
mod types;

pub use config::{Config, RollingFilterParams};
pub use coordinator::{OutboundRequest, TxDownloadManager};
pub use mempool::{Mempool, MempoolAcceptResult, TxValidationResult};
pub use rolling_bloom_filter::RollingBloomFilter;
pub use types::{
    GenericTxid, Hash256, Outpoint, Peer, PeerInfo, Transaction, Txid, Wtxid, MAX_STANDARD_TX_WEIGHT,
};
