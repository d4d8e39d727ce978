//! Core identifiers and the transaction record shared by every component.

use std::fmt;

/// Hard cap on standard transaction weight (4x non-witness bytes + witness bytes).
pub const MAX_STANDARD_TX_WEIGHT: u64 = 400_000;

/// A 256-bit hash. Used as the backing representation for both [`Txid`] and [`Wtxid`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash256(pub [u8; 32]);

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter().rev().take(4) {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..")
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Hash256(bytes)
    }
}

macro_rules! hash_newtype {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub Hash256);

        impl $name {
            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                $name(Hash256(bytes))
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &(self.0).0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0)
            }
        }
    };
}

hash_newtype!(Txid);
hash_newtype!(Wtxid);

/// A tagged transaction identifier: either the non-witness id or the witness id.
///
/// Announcements on the wire carry one or the other depending on whether the peer
/// negotiated wtxid relay (BIP 339); the tracker never needs to know which, only
/// that the two hash namespaces must not collide when used as map keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum GenericTxid {
    Txid(Txid),
    Wtxid(Wtxid),
}

impl GenericTxid {
    pub fn is_wtxid(&self) -> bool {
        matches!(self, GenericTxid::Wtxid(_))
    }

    /// The underlying 256-bit value, irrespective of tag.
    pub fn raw_hash(&self) -> Hash256 {
        match self {
            GenericTxid::Txid(t) => t.0,
            GenericTxid::Wtxid(w) => w.0,
        }
    }

    /// Reinterpret this id's hash as a [`Wtxid`] for orphan-store lookups.
    ///
    /// The orphanage is keyed by wtxid. A peer that only relays by txid can still
    /// be the one supplying parents for an already-known orphan: if the orphan has
    /// no witness data its txid and wtxid coincide, so the lookup succeeds; if it
    /// does have witness data the lookup simply misses, which only costs a
    /// redundant request rather than a correctness violation.
    pub fn hash_as_wtxid(&self) -> Wtxid {
        Wtxid(self.raw_hash())
    }
}

impl From<Txid> for GenericTxid {
    fn from(t: Txid) -> Self {
        GenericTxid::Txid(t)
    }
}

impl From<Wtxid> for GenericTxid {
    fn from(w: Wtxid) -> Self {
        GenericTxid::Wtxid(w)
    }
}

/// An opaque peer identifier, assigned by the networking layer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Peer(pub u64);

/// A specific output of a specific transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Outpoint {
    pub txid: Txid,
    pub index: u32,
}

/// An immutable transaction record.
///
/// The core never inspects script or amount data - only the shape needed to
/// route orphans (inputs' outpoints, output count) and to bound memory use
/// (weight).
#[derive(Clone, Debug)]
pub struct Transaction {
    txid: Txid,
    wtxid: Wtxid,
    version: i32,
    inputs: Vec<Outpoint>,
    num_outputs: u32,
    weight: u64,
}

impl Transaction {
    pub fn new(
        txid: Txid,
        wtxid: Wtxid,
        version: i32,
        inputs: Vec<Outpoint>,
        num_outputs: u32,
        weight: u64,
    ) -> Self {
        Transaction {
            txid,
            wtxid,
            version,
            inputs,
            num_outputs,
            weight,
        }
    }

    pub fn txid(&self) -> Txid {
        self.txid
    }

    pub fn wtxid(&self) -> Wtxid {
        self.wtxid
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn inputs(&self) -> &[Outpoint] {
        &self.inputs
    }

    pub fn num_outputs(&self) -> u32 {
        self.num_outputs
    }

    pub fn weight(&self) -> u64 {
        self.weight
    }

    /// Parent txids referenced by this transaction's inputs, deduplicated.
    pub fn unique_parent_txids(&self) -> Vec<Txid> {
        let mut seen = std::collections::HashSet::with_capacity(self.inputs.len());
        let mut out = Vec::new();
        for input in &self.inputs {
            if seen.insert(input.txid) {
                out.push(input.txid);
            }
        }
        out
    }
}

/// Per-peer connection attributes, fixed at connect time.
#[derive(Clone, Copy, Debug)]
pub struct PeerInfo {
    /// Marked for priority request routing (typically outbound or permissioned).
    pub preferred: bool,
    /// Exempt from per-peer announcement/DoS limits.
    pub relay_permissions: bool,
    /// Negotiated wtxid relay (BIP 339).
    pub wtxid_relay: bool,
    /// Negotiated package relay for orphan ancestor resolution.
    pub package_relay: bool,
}
