use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Node configuration. Consensus-critical parameters (block time, epoch
/// length, delegate count, reward schedule) must be identical across all
/// nodes of a network; changing them is a hard fork.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// This node's validator address; empty means derive from the signer
    pub validator: String,

    /// Slot width in milliseconds
    pub block_time_ms: u64,

    /// Blocks between delegate-set and schedule recomputation
    pub epoch_length: u64,

    /// Maximum number of active producers
    pub delegate_count: usize,

    /// Base issuance per block before halving
    pub block_reward: u64,

    /// Blocks between reward halvings
    pub halving_interval: u64,

    /// Extra time past the slot before a producer counts as missed
    pub grace_window_ms: u64,

    /// Pending pool capacity
    pub max_pending: usize,

    /// Maximum transactions pulled into one block
    pub max_block_txs: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            validator: String::new(),
            block_time_ms: 3_000,
            epoch_length: 100,
            delegate_count: 21,
            block_reward: 50,
            halving_interval: 210_000,
            grace_window_ms: 6_000,
            max_pending: 10_000,
            max_block_txs: 500,
        }
    }
}

impl NodeConfig {
    /// Load configuration from a JSON file. Missing fields fall back to
    /// the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let config: NodeConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Reorg depth cap implied by the delegate count: ceil(2N/3) blocks.
    pub fn max_reorg_depth(&self) -> u64 {
        (2 * self.delegate_count as u64).div_ceil(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = NodeConfig::default();
        assert!(config.block_time_ms > 0);
        assert!(config.epoch_length > 0);
        assert!(config.delegate_count > 0);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: NodeConfig = serde_json::from_str(r#"{"block_time_ms": 500}"#).unwrap();
        assert_eq!(config.block_time_ms, 500);
        assert_eq!(config.delegate_count, NodeConfig::default().delegate_count);
    }

    #[test]
    fn test_max_reorg_depth_rounds_up() {
        let config = NodeConfig {
            delegate_count: 4,
            ..Default::default()
        };
        assert_eq!(config.max_reorg_depth(), 3);

        let config21 = NodeConfig::default();
        assert_eq!(config21.max_reorg_depth(), 14);
    }
}
