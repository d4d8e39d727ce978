//! Integration tests for the six end-to-end scenarios driving the download
//! coordinator through its public API exactly as a networking layer would.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use tx_download::{
    Config, GenericTxid, Hash256, Mempool, MempoolAcceptResult, Outpoint, OutboundRequest, Peer,
    PeerInfo, Transaction, TxDownloadManager, TxValidationResult, Txid, Wtxid,
};

struct FakeMempool {
    known: HashSet<Wtxid>,
}

impl FakeMempool {
    fn new() -> Self {
        FakeMempool { known: HashSet::new() }
    }
}

impl Mempool for FakeMempool {
    fn exists(&self, gtxid: GenericTxid) -> bool {
        self.known.contains(&gtxid.hash_as_wtxid())
    }
    fn get_conflict_tx(&self, _outpoint: Outpoint) -> Option<Transaction> {
        None
    }
    fn submit(&mut self, _tx: &Transaction) -> MempoolAcceptResult {
        MempoolAcceptResult::single(TxValidationResult::Accepted)
    }
}

fn hash_from(n: u8) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[0] = n;
    bytes
}

fn txid(n: u8) -> Txid {
    Txid::from_bytes(hash_from(n))
}

fn wtxid(n: u8) -> Wtxid {
    Wtxid::from_bytes(hash_from(n))
}

fn preferred_wtxid_relay_peer() -> PeerInfo {
    PeerInfo {
        preferred: true,
        relay_permissions: false,
        wtxid_relay: true,
        package_relay: false,
    }
}

#[test]
fn scenario_1_basic_orphan_lifecycle() {
    let mgr = TxDownloadManager::new(Config::default());
    let mempool = FakeMempool::new();
    let now = Instant::now();

    mgr.connected_peer(Peer(1), preferred_wtxid_relay_peer());
    mgr.received_inv(Peer(1), GenericTxid::Wtxid(wtxid(0xAA)), now, &mempool);

    let tx = Transaction::new(
        txid(0xAA),
        wtxid(0xAA),
        2,
        vec![Outpoint { txid: txid(0xBB), index: 0 }],
        1,
        1_000,
    );

    let should_orphan = mgr.mempool_rejected_tx(&tx, TxValidationResult::MissingInputs);
    assert!(should_orphan);

    let (newly_added, parents) = mgr.new_orphan_tx(tx, Peer(1), now, &mempool);
    assert!(newly_added);
    assert_eq!(parents, vec![txid(0xBB)]);

    let sent = mgr.get_requests_to_send(Peer(1), now + Duration::from_secs(61));
    // peer 1 is wtxid-relay and not package-relay: resolution work converts
    // into an individual parent-txid request.
    assert!(sent
        .iter()
        .any(|r| matches!(r, OutboundRequest::Tx(GenericTxid::Txid(t)) if *t == txid(0xBB))));
}

#[test]
fn scenario_2_accepted_parent_flips_reconsider_once() {
    let mgr = TxDownloadManager::new(Config::default());
    let mempool = FakeMempool::new();
    let now = Instant::now();
    mgr.connected_peer(Peer(1), preferred_wtxid_relay_peer());

    let parent = Transaction::new(txid(0xBB), wtxid(0xBB), 2, vec![], 1, 1_000);
    let orphan = Transaction::new(
        txid(0xAA),
        wtxid(0xAA),
        2,
        vec![Outpoint { txid: txid(0xBB), index: 0 }],
        1,
        1_000,
    );
    mgr.new_orphan_tx(orphan, Peer(1), now, &mempool);

    let mut rng = StdRng::seed_from_u64(1);
    mgr.mempool_accepted_tx(&parent, &mut rng);

    assert!(mgr.have_tx_to_reconsider(Peer(1)));
    assert!(mgr.get_tx_to_reconsider(Peer(1)).is_some());
    assert!(!mgr.have_tx_to_reconsider(Peer(1)));
    assert!(mgr.get_tx_to_reconsider(Peer(1)).is_none());
}

#[test]
fn scenario_3_dos_eviction_fairness() {
    let mut config = Config::default();
    config.max_orphan_txs = 100;
    config.reserved_peer_weight = 404_000;
    let mgr = TxDownloadManager::new(config);
    let mempool = FakeMempool::new();
    let now = Instant::now();

    for peer_idx in 1..=10u64 {
        mgr.connected_peer(Peer(peer_idx), preferred_wtxid_relay_peer());
    }

    for i in 0..10u8 {
        let tx = Transaction::new(
            txid(i),
            wtxid(i),
            2,
            vec![Outpoint { txid: txid(100 + i), index: 0 }],
            1,
            40_000,
        );
        mgr.new_orphan_tx(tx, Peer(1), now, &mempool);
    }

    for peer_idx in 2..=10u64 {
        for i in 0..20u8 {
            let id = (peer_idx as u8) * 20 + i;
            let tx = Transaction::new(
                txid(id),
                wtxid(id),
                2,
                vec![Outpoint { txid: txid(200u8.wrapping_add(i)), index: 0 }],
                1,
                1,
            );
            mgr.new_orphan_tx(tx, Peer(peer_idx), now, &mempool);
        }
    }

    for i in 0..10u8 {
        assert!(
            mgr.already_have(GenericTxid::Wtxid(wtxid(i)), &mempool),
            "peer 1's orphan {i} should have survived the flood"
        );
    }
}

#[test]
fn scenario_4_reconsider_is_peer_isolated() {
    let mgr = TxDownloadManager::new(Config::default());
    let mempool = FakeMempool::new();
    let now = Instant::now();
    mgr.connected_peer(Peer(2), preferred_wtxid_relay_peer());
    mgr.connected_peer(Peer(3), preferred_wtxid_relay_peer());

    let orphan = Transaction::new(
        txid(0xAA),
        wtxid(0xAA),
        2,
        vec![Outpoint { txid: txid(0xBB), index: 0 }],
        1,
        1_000,
    );
    mgr.new_orphan_tx(orphan, Peer(2), now, &mempool);
    mgr.received_inv(Peer(3), GenericTxid::Wtxid(wtxid(0xAA)), now, &mempool);

    let parent = Transaction::new(txid(0xBB), wtxid(0xBB), 2, vec![], 1, 1_000);
    let mut rng = StdRng::seed_from_u64(42);
    mgr.mempool_accepted_tx(&parent, &mut rng);

    // Exactly one of the two announcers was chosen; isolation means the
    // other peer never sees a reconsideration candidate for this wtxid.
    let chosen_count =
        [Peer(2), Peer(3)].iter().filter(|&&p| mgr.have_tx_to_reconsider(p)).count();
    assert_eq!(chosen_count, 1);
}

#[test]
fn scenario_5_request_scheduling_with_overload_delay() {
    let mgr = TxDownloadManager::new(Config::default());
    let mempool = FakeMempool::new();
    let now = Instant::now();
    mgr.connected_peer(
        Peer(1),
        PeerInfo {
            preferred: false,
            relay_permissions: false,
            wtxid_relay: false,
            package_relay: false,
        },
    );

    // Saturate the peer's in-flight budget (100) so the next announcement
    // picks up the +2s overloaded delay on top of the +2s non-preferred one.
    for i in 0..100u16 {
        let bytes = {
            let mut b = [0u8; 32];
            b[0] = (i & 0xff) as u8;
            b[1] = (i >> 8) as u8;
            b
        };
        mgr.received_inv(Peer(1), GenericTxid::Txid(Txid::from_bytes(bytes)), now, &mempool);
    }
    mgr.get_requests_to_send(Peer(1), now); // moves all 100 candidates in-flight

    // Computed while still overloaded: +2s non-preferred, +2s overloaded.
    mgr.received_inv(Peer(1), GenericTxid::Txid(txid(210)), now, &mempool);

    // Responses arrive for the 100 saturating requests, freeing the budget
    // before the deadline check below.
    for i in 0..100u16 {
        let mut bytes = [0u8; 32];
        bytes[0] = (i & 0xff) as u8;
        bytes[1] = (i >> 8) as u8;
        let responded = Transaction::new(Txid::from_bytes(bytes), Wtxid::from_bytes(bytes), 2, vec![], 1, 500);
        mgr.received_tx(Peer(1), &responded, &mempool);
    }

    let at_3s = mgr.get_requests_to_send(Peer(1), now + Duration::from_secs(3));
    assert!(
        !at_3s
            .iter()
            .any(|r| matches!(r, OutboundRequest::Tx(GenericTxid::Txid(t)) if *t == txid(210))),
        "overloaded + non-preferred delay (4s) should postpone the request past t=3s"
    );

    let at_5s = mgr.get_requests_to_send(Peer(1), now + Duration::from_secs(5));
    assert!(at_5s
        .iter()
        .any(|r| matches!(r, OutboundRequest::Tx(GenericTxid::Txid(t)) if *t == txid(210))));
}

#[test]
fn scenario_6_reorg_resets_reject_filter_not_confirmed_filter() {
    let mgr = TxDownloadManager::new(Config::default());
    let mempool = FakeMempool::new();
    let now = Instant::now();
    mgr.connected_peer(Peer(1), preferred_wtxid_relay_peer());

    let rejected = Transaction::new(txid(0xDD), wtxid(0xDD), 2, vec![], 1, 500);
    mgr.mempool_rejected_tx(&rejected, TxValidationResult::Consensus);

    // received_inv for the same tx while still rejected: dropped silently,
    // no outbound request appears.
    mgr.received_inv(Peer(1), GenericTxid::Wtxid(wtxid(0xDD)), now, &mempool);
    let before_reorg = mgr.get_requests_to_send(Peer(1), now + Duration::from_secs(5));
    assert!(!before_reorg
        .iter()
        .any(|r| matches!(r, OutboundRequest::Tx(g) if *g == GenericTxid::Wtxid(wtxid(0xDD)))));

    mgr.block_connected(&[], Hash256::from([1u8; 32]));
    mgr.block_connected(&[], Hash256::from([2u8; 32]));

    mgr.received_inv(Peer(1), GenericTxid::Wtxid(wtxid(0xDD)), now, &mempool);
    let after_reorg = mgr.get_requests_to_send(Peer(1), now + Duration::from_secs(5));
    assert!(after_reorg
        .iter()
        .any(|r| matches!(r, OutboundRequest::Tx(g) if *g == GenericTxid::Wtxid(wtxid(0xDD)))));
}
