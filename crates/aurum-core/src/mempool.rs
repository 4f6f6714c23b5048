use crate::block::Block;
use crate::error::ChainError;
use crate::transaction::Transaction;
use std::collections::{HashMap, HashSet, VecDeque};

/// Default cap on queued transactions.
pub const DEFAULT_MAX_PENDING: usize = 10_000;

/// The pending pool stores not-yet-included transactions keyed by their
/// content hash. Insertion order is preserved for FIFO-biased inclusion;
/// the order itself is not consensus-critical.
pub struct PendingPool {
    /// FIFO of transaction hashes in arrival order
    order: VecDeque<String>,
    /// Transactions keyed by content hash
    txs: HashMap<String, Transaction>,
    /// Maximum pool size to prevent unbounded growth
    max_size: usize,
}

impl PendingPool {
    /// Initialize an empty pool with the given capacity bound.
    pub fn new(max_size: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(max_size.min(1024)),
            txs: HashMap::new(),
            max_size,
        }
    }

    /// Queue a transaction after admission checks.
    ///
    /// Rejects transactions with missing parties or a non-positive amount,
    /// duplicates of an already-queued hash, and anything past capacity.
    pub fn submit(&mut self, tx: Transaction) -> Result<(), ChainError> {
        tx.validate()?;

        if self.txs.contains_key(&tx.hash) {
            log::warn!("duplicate transaction rejected: {}", tx.hash);
            return Err(ChainError::InvalidTransaction {
                reason: format!("duplicate transaction {}", tx.hash),
            });
        }

        if self.txs.len() >= self.max_size {
            log::warn!(
                "pending pool at capacity ({}), rejecting transaction {}",
                self.max_size,
                tx.hash
            );
            return Err(ChainError::InvalidTransaction {
                reason: "pending pool at capacity".to_string(),
            });
        }

        self.order.push_back(tx.hash.clone());
        self.txs.insert(tx.hash.clone(), tx);
        log::debug!("transaction queued, pool size {}/{}", self.txs.len(), self.max_size);
        Ok(())
    }

    /// Snapshot up to `limit` transactions in FIFO order for block assembly.
    /// The pool is not drained here; pruning happens after a successful append.
    pub fn take_for_block(&self, limit: usize) -> Vec<Transaction> {
        self.order
            .iter()
            .filter_map(|hash| self.txs.get(hash))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Drop every transaction included in the given block, matched by hash.
    pub fn prune_included(&mut self, block: &Block) {
        for tx in &block.transactions {
            self.txs.remove(&tx.hash);
        }
        self.order.retain(|hash| self.txs.contains_key(hash));
    }

    /// After a reorg: keep only transactions absent from the accepted chain.
    pub fn retain_not_in_chain(&mut self, blocks: &[Block]) {
        let included: HashSet<&str> = blocks
            .iter()
            .flat_map(|b| b.transactions.iter())
            .map(|tx| tx.hash.as_str())
            .collect();
        self.txs.retain(|hash, _| !included.contains(hash.as_str()));
        self.order.retain(|hash| self.txs.contains_key(hash));
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.txs.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }
}

impl Default for PendingPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING)
    }
}
