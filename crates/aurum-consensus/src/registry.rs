use crate::error::ConsensusError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed minimum self-stake for delegate registration.
pub const MIN_DELEGATE_STAKE: u64 = 10_000;

/// Stake-weighted vote ledger for delegate candidates.
///
/// SAFETY INVARIANTS:
/// 1. Stakes are exact integers; no floating-point accumulation anywhere
/// 2. An address has an entry iff its accumulated stake is > 0
/// 3. Given the same vote operations, two nodes hold identical ledgers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorRegistry {
    /// Accumulated stake per delegate address. BTreeMap keeps iteration
    /// order total over addresses, which the ranking relies on for
    /// cross-node tie-breaking.
    votes: BTreeMap<String, u64>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add stake to a delegate, creating the entry if absent.
    pub fn register_vote(&mut self, delegate: &str, stake: u64) {
        if stake == 0 {
            return;
        }
        let entry = self.votes.entry(delegate.to_string()).or_insert(0);
        *entry = entry.saturating_add(stake);
        debug!("vote registered: {} now holds {} stake", delegate, *entry);
    }

    /// Subtract stake from a delegate, clamped at zero. The entry is
    /// removed entirely once its stake reaches zero.
    pub fn remove_vote(&mut self, delegate: &str, stake: u64) {
        if let Some(entry) = self.votes.get_mut(delegate) {
            *entry = entry.saturating_sub(stake);
            if *entry == 0 {
                self.votes.remove(delegate);
                debug!("delegate {} removed from ledger (stake exhausted)", delegate);
            }
        }
    }

    /// Register a new delegate with a self-vote. Fails with
    /// `InsufficientStake` below the fixed minimum; no state changes on
    /// failure.
    pub fn register_delegate(&mut self, candidate: &str, self_stake: u64) -> Result<(), ConsensusError> {
        if self_stake < MIN_DELEGATE_STAKE {
            return Err(ConsensusError::InsufficientStake {
                candidate: candidate.to_string(),
                stake: self_stake,
                minimum: MIN_DELEGATE_STAKE,
            });
        }
        self.register_vote(candidate, self_stake);
        info!("delegate {} registered with self-stake {}", candidate, self_stake);
        Ok(())
    }

    /// Stake currently held by a delegate (zero if absent).
    pub fn stake_of(&self, delegate: &str) -> u64 {
        self.votes.get(delegate).copied().unwrap_or(0)
    }

    pub fn contains(&self, delegate: &str) -> bool {
        self.votes.contains_key(delegate)
    }

    /// Number of delegates with positive stake.
    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Candidates ranked by stake descending, ties broken by address
    /// ascending so every node agrees on the ordering.
    pub fn ranked(&self) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> = self
            .votes
            .iter()
            .map(|(addr, stake)| (addr.clone(), *stake))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }
}
