use crate::error::ConsensusError;
use crate::scheduler::DelegateScheduler;
use aurum_core::{Block, Transaction};
use log::{debug, info};

/// Signing capability supplied by the wallet layer. The engine treats the
/// returned signature as an opaque blob it stores on the block.
pub trait BlockSigner: Send + Sync {
    /// Sign the given message bytes (the block hash).
    fn sign(&self, message: &[u8]) -> Vec<u8>;
}

/// Per-attempt production states. One full loop per produced block:
/// `Idle -> AwaitingSlot -> Authorized -> Building -> Appended -> Idle`,
/// with `Rejected` terminating a failed attempt before the next poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    AwaitingSlot,
    Authorized,
    Building,
    Appended,
    Rejected,
}

/// Drives slot timing and block assembly for one validator.
///
/// SAFETY INVARIANT: `create_block` re-checks authorization against the
/// schedule before assembling anything; an unauthorized call fails rather
/// than producing a block the network would have to reject.
pub struct ProducerEngine {
    /// This node's validator identity
    validator: String,
    /// Slot width in milliseconds
    block_time_ms: u64,
    /// Timestamp of the last block observed on the local chain
    last_block_time_ms: u64,
    state: EngineState,
}

impl ProducerEngine {
    pub fn new(validator: String, block_time_ms: u64, genesis_time_ms: u64) -> Self {
        Self {
            validator,
            block_time_ms,
            last_block_time_ms: genesis_time_ms,
            state: EngineState::Idle,
        }
    }

    pub fn validator(&self) -> &str {
        &self.validator
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn last_block_time_ms(&self) -> u64 {
        self.last_block_time_ms
    }

    /// Whether a full slot has elapsed since the last block.
    pub fn is_time_for_next_block(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_block_time_ms) >= self.block_time_ms
    }

    /// One slot poll. Returns true when this validator holds the current
    /// slot; a miss is a routine no-op, not an error.
    pub fn poll_slot(&mut self, scheduler: &DelegateScheduler, now_ms: u64) -> bool {
        if !self.is_time_for_next_block(now_ms) {
            self.state = EngineState::AwaitingSlot;
            return false;
        }
        if scheduler.is_authorized(&self.validator, now_ms, self.last_block_time_ms) {
            self.state = EngineState::Authorized;
            true
        } else {
            debug!("slot poll: {} is not the scheduled producer", self.validator);
            self.state = EngineState::AwaitingSlot;
            false
        }
    }

    /// Assemble and sign a block for the current slot.
    ///
    /// Fails with `NotAuthorized` when this validator does not hold the
    /// slot; the caller should simply retry at the next tick.
    pub fn create_block(
        &mut self,
        scheduler: &DelegateScheduler,
        transactions: Vec<Transaction>,
        previous: &Block,
        difficulty: u32,
        now_ms: u64,
        signer: &dyn BlockSigner,
    ) -> Result<Block, ConsensusError> {
        if scheduler.schedule().is_empty() {
            self.state = EngineState::Rejected;
            return Err(ConsensusError::EmptySchedule);
        }
        if !scheduler.is_authorized(&self.validator, now_ms, self.last_block_time_ms) {
            self.state = EngineState::Rejected;
            return Err(ConsensusError::NotAuthorized {
                validator: self.validator.clone(),
            });
        }

        self.state = EngineState::Building;
        let mut block = Block::new(
            previous.index + 1,
            now_ms,
            transactions,
            previous.hash.clone(),
            self.validator.clone(),
            difficulty,
        );
        block.signature = signer.sign(block.hash.as_bytes());
        info!(
            "built block {} with {} transaction(s) at {}",
            block.index,
            block.transactions.len(),
            block.timestamp
        );
        Ok(block)
    }

    /// Record a successful append of a block (self-produced or received)
    /// and re-anchor slot arithmetic to its timestamp.
    pub fn observe_block(&mut self, timestamp_ms: u64) {
        self.last_block_time_ms = timestamp_ms;
        self.state = EngineState::Appended;
    }

    /// Record a failed production attempt; the engine returns to polling.
    pub fn mark_rejected(&mut self) {
        self.state = EngineState::Rejected;
    }

    /// Shift the slot origin forward one slot after a producer was skipped,
    /// so the advanced cursor lines up with slot zero again.
    pub fn advance_slot_origin(&mut self) {
        self.last_block_time_ms += self.block_time_ms;
    }

    /// Return to idle between attempts.
    pub fn reset(&mut self) {
        self.state = EngineState::Idle;
    }
}
