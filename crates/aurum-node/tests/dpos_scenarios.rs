// End-to-end scenarios for the DPoS engine: schedule agreement between
// independent nodes, strict append semantics, fork choice, and the
// vote-ledger lifecycle.

use aurum_consensus::{
    BlockSigner, ConsensusError, DelegateScheduler, ValidatorRegistry,
};
use aurum_core::{Block, Chain, ChainError, PendingPool, Transaction, GENESIS_TIMESTAMP};
use aurum_node::{ChainNode, Ed25519Signer, NodeConfig};

struct NullSigner;

impl BlockSigner for NullSigner {
    fn sign(&self, message: &[u8]) -> Vec<u8> {
        message.to_vec()
    }
}

fn node_config(validator: &str) -> NodeConfig {
    NodeConfig {
        validator: validator.to_string(),
        block_time_ms: 1_000,
        epoch_length: 10,
        delegate_count: 3,
        ..Default::default()
    }
}

#[test]
fn genesis_chain_is_valid_and_identical_everywhere() {
    let a = ChainNode::new(node_config("a"));
    let b = ChainNode::new(node_config("b"));

    let genesis_a = a.latest_block().unwrap();
    let genesis_b = b.latest_block().unwrap();
    assert_eq!(genesis_a, genesis_b);
    assert_eq!(genesis_a.index, 0);
    assert!(Chain::is_valid_chain(&[genesis_a]));
}

#[test]
fn top_staked_delegate_becomes_active_rest_standby() {
    let mut registry = ValidatorRegistry::new();
    registry.register_vote("a", 20_000);
    registry.register_vote("b", 15_000);

    let mut scheduler = DelegateScheduler::new(1, 1_000);
    scheduler.update_delegates(&registry);

    assert_eq!(scheduler.active(), ["a".to_string()]);
    assert_eq!(scheduler.standby(), ["b".to_string()]);
}

#[test]
fn two_nodes_at_same_height_agree_on_the_schedule() {
    let votes: &[(&str, u64)] = &[
        ("delegate-a", 90_000),
        ("delegate-b", 80_000),
        ("delegate-c", 70_000),
    ];

    let build = |validator: &str| {
        let node = ChainNode::new(node_config(validator));
        for (addr, stake) in votes {
            node.register_vote(addr, *stake);
        }
        node.refresh_schedule().unwrap();
        node
    };
    let left = build("delegate-a");
    let right = build("delegate-b");

    // drive both chains to height 5 with identical externally-received
    // blocks, rotating the scheduled producer slot by slot
    let mut now = GENESIS_TIMESTAMP;
    for height in 1..=5u64 {
        now += 1_000;
        let tip = left.latest_block().unwrap();
        let producer = left.scheduled_producer_at(now).unwrap();
        assert_eq!(right.scheduled_producer_at(now).unwrap(), producer);

        let block = Block::new(height, now, vec![], tip.hash, producer, 1);
        left.receive_block(block.clone()).unwrap();
        right.receive_block(block).unwrap();
    }

    assert_eq!(left.height(), 5);
    assert_eq!(right.height(), 5);

    left.refresh_schedule().unwrap();
    right.refresh_schedule().unwrap();
    assert_eq!(left.producer_schedule(), right.producer_schedule());
    assert!(!left.producer_schedule().is_empty());
}

#[test]
fn append_with_mismatched_previous_hash_is_rejected() {
    let mut chain = Chain::new(1_000, 50, 1_000);
    let mut pool = PendingPool::default();

    let block = Block::new(
        1,
        GENESIS_TIMESTAMP + 1_000,
        vec![],
        "a".repeat(64),
        "v1".to_string(),
        1,
    );
    let err = chain.append(block, &mut pool).unwrap_err();
    assert!(matches!(err, ChainError::InvalidPreviousHash { .. }));
    assert_eq!(chain.height(), 0);
}

#[test]
fn removing_all_stake_deletes_the_ledger_entry() {
    let mut registry = ValidatorRegistry::new();
    registry.register_vote("a", 12_345);
    registry.remove_vote("a", 12_345);
    assert!(!registry.contains("a"));
    assert_eq!(registry.len(), 0);
}

#[test]
fn reward_halves_at_each_halving_interval() {
    let config = NodeConfig {
        validator: "v1".to_string(),
        block_time_ms: 1_000,
        block_reward: 64,
        halving_interval: 2,
        epoch_length: 100,
        ..Default::default()
    };
    let node = ChainNode::new(config);
    node.register_delegate("v1", 20_000).unwrap();
    node.refresh_schedule().unwrap();

    assert_eq!(node.current_block_reward(), 64);

    let mut now = GENESIS_TIMESTAMP;
    for _ in 0..4 {
        now += 1_000;
        node.produce_if_scheduled(now, &NullSigner)
            .unwrap()
            .expect("solo delegate should hold every slot");
    }
    // height 4, halving_interval 2 -> 64 / 2^2
    assert_eq!(node.height(), 4);
    assert_eq!(node.current_block_reward(), 16);
}

#[test]
fn longer_fork_wins_and_height_never_decreases() {
    let node = ChainNode::new(node_config("v1"));
    node.register_delegate("v1", 20_000).unwrap();
    node.refresh_schedule().unwrap();

    let mut now = GENESIS_TIMESTAMP;
    for _ in 0..2 {
        now += 1_000;
        node.produce_if_scheduled(now, &NullSigner).unwrap().unwrap();
    }
    assert_eq!(node.height(), 2);

    // competing chain of height 4 from the same genesis
    let mut candidate = vec![Block::genesis()];
    for height in 1..=4u64 {
        let tip = candidate.last().unwrap();
        candidate.push(Block::new(
            height,
            tip.timestamp + 1_000,
            vec![],
            tip.hash.clone(),
            "peer".to_string(),
            1,
        ));
    }

    let accepted_height = node.receive_chain(candidate).unwrap();
    assert_eq!(accepted_height, 4);
    assert_eq!(node.height(), 4);

    // a shorter chain can never roll the node back
    let stale = vec![Block::genesis()];
    assert!(matches!(
        node.receive_chain(stale),
        Err(ConsensusError::ChainNotLonger { .. })
    ));
    assert_eq!(node.height(), 4);
}

#[test]
fn produced_blocks_carry_verifiable_signatures() {
    let signer = Ed25519Signer::from_seed([42u8; 32]);
    let config = node_config(signer.address());
    let node = ChainNode::new(config);
    node.register_delegate(signer.address(), 20_000).unwrap();
    node.refresh_schedule().unwrap();

    let block = node
        .produce_if_scheduled(GENESIS_TIMESTAMP + 1_000, &signer)
        .unwrap()
        .unwrap();

    assert!(aurum_node::verify_signature(
        &block.validator,
        block.hash.as_bytes(),
        &block.signature,
    ));
}

#[test]
fn pending_transactions_flow_through_production() {
    let node = ChainNode::new(node_config("v1"));
    node.register_delegate("v1", 20_000).unwrap();
    node.refresh_schedule().unwrap();

    node.submit_transaction(Transaction::new("alice", "bob", 5, 1)).unwrap();
    node.submit_transaction(Transaction::new("carol", "dave", 9, 2)).unwrap();
    assert_eq!(node.pending_count(), 2);

    assert!(matches!(
        node.submit_transaction(Transaction::new("", "bob", 5, 3)),
        Err(ChainError::InvalidTransaction { .. })
    ));

    let block = node
        .produce_if_scheduled(GENESIS_TIMESTAMP + 1_000, &NullSigner)
        .unwrap()
        .unwrap();
    assert_eq!(block.transactions.len(), 2);
    assert_eq!(node.pending_count(), 0);
}
