use crate::block::{Block, GENESIS_DIFFICULTY};
use crate::error::ChainError;
use crate::mempool::PendingPool;
use log::{debug, info, warn};

/// Minimum difficulty floor after downward adjustment.
const MIN_DIFFICULTY: u32 = 1;

/// Halving exponent cap; beyond this the reward is zero for u64 amounts.
const MAX_HALVINGS: u64 = 64;

/// The ordered chain of blocks rooted at genesis, plus the protocol
/// parameters that govern difficulty telemetry and reward issuance.
///
/// SAFETY INVARIANT: for every i > 0,
/// `blocks[i].previous_hash == blocks[i-1].hash` and `blocks[i]` is
/// structurally valid. Blocks are append-only; the chain is only ever
/// mutated by `append` and wholesale replacement during a reorg.
pub struct Chain {
    blocks: Vec<Block>,
    difficulty: u32,
    /// Target spacing between blocks, milliseconds
    block_time_ms: u64,
    /// Base issuance per block before halving
    block_reward: u64,
    /// Blocks between reward halvings
    halving_interval: u64,
}

impl Chain {
    /// Initialize a chain containing only the genesis block.
    pub fn new(block_time_ms: u64, block_reward: u64, halving_interval: u64) -> Self {
        Self {
            blocks: vec![Block::genesis()],
            difficulty: GENESIS_DIFFICULTY,
            block_time_ms,
            block_reward,
            halving_interval,
        }
    }

    /// The chain tip. `EmptyChain` indicates corrupted initialization and
    /// should never occur post-init.
    pub fn latest(&self) -> Result<&Block, ChainError> {
        self.blocks.last().ok_or(ChainError::EmptyChain)
    }

    /// Height of the tip (genesis is height 0).
    pub fn height(&self) -> u64 {
        self.blocks.len().saturating_sub(1) as u64
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn block_time_ms(&self) -> u64 {
        self.block_time_ms
    }

    /// Append a block to the tip.
    ///
    /// Strict admission: the block must be structurally valid, carry
    /// `index == tip.index + 1`, chain from the tip's hash, not move time
    /// backwards, and its stamped hash must match the canonical encoding.
    /// On success, every included transaction is pruned from the pending
    /// pool by content hash and difficulty is re-adjusted.
    pub fn append(&mut self, block: Block, pool: &mut PendingPool) -> Result<(), ChainError> {
        let tip = self.latest()?;

        if !block.is_structurally_valid() {
            return Err(ChainError::InvalidBlock {
                index: block.index,
                reason: "structural validation failed".to_string(),
            });
        }
        if block.index != tip.index + 1 {
            return Err(ChainError::InvalidIndex {
                tip: tip.index,
                got: block.index,
            });
        }
        if block.previous_hash != tip.hash {
            return Err(ChainError::InvalidPreviousHash {
                index: block.index,
                expected: tip.hash.clone(),
                got: block.previous_hash.clone(),
            });
        }
        if block.timestamp < tip.timestamp {
            return Err(ChainError::InvalidBlock {
                index: block.index,
                reason: format!(
                    "timestamp {} precedes parent timestamp {}",
                    block.timestamp, tip.timestamp
                ),
            });
        }
        let expected_hash = block.compute_hash();
        if block.hash != expected_hash {
            return Err(ChainError::InvalidBlock {
                index: block.index,
                reason: format!("hash mismatch: expected {}", expected_hash),
            });
        }

        info!(
            "appending block {} by {} with {} transaction(s)",
            block.index,
            block.validator,
            block.transactions.len()
        );
        pool.prune_included(&block);
        self.blocks.push(block);
        self.adjust_difficulty();
        Ok(())
    }

    /// Re-adjust difficulty from the spacing of the last two blocks.
    ///
    /// Elapsed under half the target raises difficulty by one; elapsed over
    /// twice the target lowers it by one, floored at `MIN_DIFFICULTY`.
    /// DPoS admission never gates on this value; it is kept as protocol
    /// telemetry for hybrid deployments.
    fn adjust_difficulty(&mut self) {
        let n = self.blocks.len();
        if n < 2 {
            return;
        }
        let elapsed = self.blocks[n - 1]
            .timestamp
            .saturating_sub(self.blocks[n - 2].timestamp);

        if elapsed * 2 < self.block_time_ms {
            self.difficulty += 1;
            debug!("difficulty raised to {} (elapsed {} ms)", self.difficulty, elapsed);
        } else if elapsed > self.block_time_ms * 2 && self.difficulty > MIN_DIFFICULTY {
            self.difficulty -= 1;
            debug!("difficulty lowered to {} (elapsed {} ms)", self.difficulty, elapsed);
        }
    }

    /// Current issuance: `block_reward / 2^min(height / halving_interval, 64)`.
    pub fn current_block_reward(&self) -> u64 {
        let halvings = (self.height() / self.halving_interval).min(MAX_HALVINGS);
        if halvings >= 64 {
            return 0;
        }
        self.block_reward >> halvings
    }

    /// Validate a candidate chain: structural validity, stamped-hash
    /// integrity, computed-hash linkage, and timestamp monotonicity for
    /// every block past the first. Signature and transaction semantics are
    /// delegated to the execution layer.
    pub fn is_valid_chain(blocks: &[Block]) -> bool {
        if blocks.is_empty() {
            return false;
        }
        for i in 1..blocks.len() {
            let block = &blocks[i];
            if !block.is_structurally_valid() {
                warn!("candidate block {} failed structural validation", block.index);
                return false;
            }
            if block.hash != block.compute_hash() {
                warn!("candidate block {} hash does not match content", block.index);
                return false;
            }
            if block.previous_hash != blocks[i - 1].compute_hash() {
                warn!(
                    "candidate block {} does not link to its parent",
                    block.index
                );
                return false;
            }
            if block.index != blocks[i - 1].index + 1 {
                warn!("candidate block {} has non-sequential index", block.index);
                return false;
            }
            if block.timestamp < blocks[i - 1].timestamp {
                warn!("candidate block {} moves time backwards", block.index);
                return false;
            }
        }
        true
    }

    /// Replace the chain wholesale. The caller (fork choice) is responsible
    /// for having validated the candidate first.
    pub fn replace(&mut self, blocks: Vec<Block>) {
        self.blocks = blocks;
    }
}
