use crate::error::ConsensusError;
use aurum_core::{Block, Chain, PendingPool};
use log::{info, warn};

/// Longest-valid-chain fork choice with a finality-aware depth cap.
///
/// SAFETY INVARIANTS:
/// 1. The local chain is mutated only when every precondition holds; a
///    rejected candidate leaves local state untouched
/// 2. Replacement is wholesale: the tip is never spliced mid-chain
/// 3. Reorgs deeper than `max_reorg_depth` are refused, so blocks past the
///    DPoS finalization point stay irreversible
pub struct ForkChoice {
    /// Maximum blocks behind the local tip a reorg may rewind
    max_reorg_depth: u64,
}

impl ForkChoice {
    pub fn new(max_reorg_depth: u64) -> Self {
        Self { max_reorg_depth }
    }

    /// Evaluate a competing chain and replace the local chain when it wins.
    ///
    /// Acceptance requires: strictly greater length, an identical genesis
    /// block, full chain validity, and a rewind no deeper than the
    /// finalized depth. On acceptance every pending transaction already
    /// present in the accepted chain is dropped from the pool. Returns the
    /// new chain height.
    pub fn consider_chain(
        &self,
        chain: &mut Chain,
        pool: &mut PendingPool,
        candidate: Vec<Block>,
    ) -> Result<u64, ConsensusError> {
        let local_height = chain.height();
        let candidate_height = candidate.len().saturating_sub(1) as u64;

        if candidate.len() <= chain.blocks().len() {
            return Err(ConsensusError::ChainNotLonger {
                local: local_height,
                candidate: candidate_height,
            });
        }

        let local_genesis = chain.blocks().first().ok_or(aurum_core::ChainError::EmptyChain)?;
        if candidate.first() != Some(local_genesis) {
            warn!("candidate chain rejected: genesis mismatch");
            return Err(ConsensusError::ChainInvalid {
                reason: "genesis block differs from local genesis".to_string(),
            });
        }

        if !Chain::is_valid_chain(&candidate) {
            return Err(ConsensusError::ChainInvalid {
                reason: "linkage or structural validation failed".to_string(),
            });
        }

        let depth = reorg_depth(chain.blocks(), &candidate);
        if depth > self.max_reorg_depth {
            return Err(ConsensusError::ReorgTooDeep {
                depth,
                max: self.max_reorg_depth,
            });
        }

        info!(
            "reorg accepted: height {} -> {} (rewind depth {})",
            local_height, candidate_height, depth
        );
        chain.replace(candidate);
        pool.retain_not_in_chain(chain.blocks());
        Ok(chain.height())
    }
}

/// Number of local blocks abandoned by switching to the candidate: the
/// distance from the local tip back to the last common ancestor.
fn reorg_depth(local: &[Block], candidate: &[Block]) -> u64 {
    let shared = local
        .iter()
        .zip(candidate.iter())
        .take_while(|(a, b)| a.hash == b.hash)
        .count();
    (local.len() - shared) as u64
}
