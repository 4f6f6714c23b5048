use crate::registry::ValidatorRegistry;
use log::{debug, info};
use sha3::{Digest, Sha3_256};
use std::time::Duration;

/// Derives the deterministic producer order for an epoch.
///
/// SAFETY INVARIANTS:
/// 1. `active`/`standby` split and the shuffled schedule are functions of
///    the vote ledger and an agreed-upon seed only; no wall-clock input
/// 2. Two nodes with identical ledgers and seed compute identical schedules
/// 3. The cursor wraps without re-shuffling mid-epoch
#[derive(Debug, Clone)]
pub struct DelegateScheduler {
    /// Maximum number of active producers
    delegate_count: usize,
    /// Slot width in milliseconds
    block_time_ms: u64,
    /// Top-N delegates by stake, ties broken by address
    active: Vec<String>,
    /// Ranked delegates outside the active set
    standby: Vec<String>,
    /// Shuffled permutation of `active` for the current epoch
    schedule: Vec<String>,
    /// Next producer to dequeue
    cursor: usize,
}

impl DelegateScheduler {
    pub fn new(delegate_count: usize, block_time_ms: u64) -> Self {
        Self {
            delegate_count,
            block_time_ms,
            active: Vec::new(),
            standby: Vec::new(),
            schedule: Vec::new(),
            cursor: 0,
        }
    }

    /// Recompute the active/standby split from the vote ledger.
    /// Invoked at epoch boundaries.
    pub fn update_delegates(&mut self, registry: &ValidatorRegistry) {
        let ranked = registry.ranked();
        let split = ranked.len().min(self.delegate_count);
        self.active = ranked[..split].iter().map(|(addr, _)| addr.clone()).collect();
        self.standby = ranked[split..].iter().map(|(addr, _)| addr.clone()).collect();
        info!(
            "delegate set updated: {} active, {} standby",
            self.active.len(),
            self.standby.len()
        );
    }

    /// Seed for the epoch shuffle: SHA3-256 of the tip block hash. Every
    /// node derives the same bytes from the same agreed chain state.
    pub fn schedule_seed(tip_hash: &str) -> Vec<u8> {
        let mut hasher = Sha3_256::new();
        hasher.update(tip_hash.as_bytes());
        hasher.finalize().to_vec()
    }

    /// Produce the epoch schedule: a Fisher-Yates permutation of `active`
    /// driven by the seed's byte stream, `j = seed[i mod len] mod (i + 1)`.
    /// Resets the cursor to the head of the new schedule.
    pub fn create_schedule(&mut self, seed: &[u8]) {
        let mut schedule = self.active.clone();
        if !seed.is_empty() {
            for i in (1..schedule.len()).rev() {
                let j = seed[i % seed.len()] as usize % (i + 1);
                schedule.swap(i, j);
            }
        }
        debug!("epoch schedule created: {:?}", schedule);
        self.schedule = schedule;
        self.cursor = 0;
    }

    /// Dequeue the next scheduled producer, wrapping without re-shuffling.
    pub fn next_producer(&mut self) -> Option<String> {
        if self.schedule.is_empty() {
            return None;
        }
        let producer = self.schedule[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.schedule.len();
        Some(producer)
    }

    /// Producer expected `slots_ahead` slots past the cursor.
    pub fn expected_producer(&self, slots_ahead: usize) -> Option<&str> {
        if self.schedule.is_empty() {
            return None;
        }
        let idx = (self.cursor + slots_ahead) % self.schedule.len();
        Some(self.schedule[idx].as_str())
    }

    /// Whether `address` is the scheduled producer for the slot containing
    /// `now_ms`, given the timestamp of the last appended block.
    ///
    /// SAFETY: This check gates both self-produced and externally received
    /// blocks. Skipping it voids the Byzantine-fault-tolerance property.
    pub fn is_authorized(&self, address: &str, now_ms: u64, last_block_time_ms: u64) -> bool {
        if self.schedule.is_empty() {
            return false;
        }
        let elapsed = now_ms.saturating_sub(last_block_time_ms);
        let slot = (elapsed / self.block_time_ms) as usize;
        match self.expected_producer(slot) {
            Some(expected) => expected == address,
            None => false,
        }
    }

    /// Consume `slots` schedule positions after a block is appended, so the
    /// cursor tracks which producers have had their turn. Wraps without
    /// re-shuffling.
    pub fn advance_cursor(&mut self, slots: usize) {
        if self.schedule.is_empty() {
            return;
        }
        self.cursor = (self.cursor + slots) % self.schedule.len();
    }

    /// Liveness recovery: skip an unavailable producer by advancing the
    /// cursor one position. No re-shuffle occurs.
    pub fn handle_missed_block(&mut self) {
        if self.schedule.is_empty() {
            return;
        }
        let skipped = self.schedule[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.schedule.len();
        info!("producer {} missed its slot, cursor advanced", skipped);
    }

    /// Time after which a block is irreversible assuming ceil(2N/3) of the
    /// active delegates are honest and built on top of it.
    pub fn finalization_time(&self) -> Duration {
        let n = self.active.len() as u64;
        let confirmations = (2 * n).div_ceil(3);
        Duration::from_millis(confirmations * self.block_time_ms)
    }

    /// Block-depth equivalent of `finalization_time`.
    pub fn finalization_depth(&self) -> u64 {
        let n = self.active.len() as u64;
        (2 * n).div_ceil(3)
    }

    pub fn active(&self) -> &[String] {
        &self.active
    }

    pub fn standby(&self) -> &[String] {
        &self.standby
    }

    pub fn schedule(&self) -> &[String] {
        &self.schedule
    }

    pub fn block_time_ms(&self) -> u64 {
        self.block_time_ms
    }
}
