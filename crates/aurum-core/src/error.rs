use thiserror::Error;

/// Chain-level errors with detailed context.
///
/// SAFETY: Only `EmptyChain` is fatal (a chain without genesis cannot be
/// extended safely). Every other variant is recovered locally: the offending
/// block or transaction is discarded and the chain is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Transaction failed admission checks (missing parties, zero amount, duplicate)
    #[error("invalid transaction: {reason}")]
    InvalidTransaction { reason: String },

    /// Candidate block does not chain from the current tip
    #[error("block {index} previous hash mismatch: expected {expected}, got {got}")]
    InvalidPreviousHash {
        index: u64,
        expected: String,
        got: String,
    },

    /// Candidate block height does not follow the current tip
    #[error("block index {got} does not follow tip index {tip}")]
    InvalidIndex { tip: u64, got: u64 },

    /// Block failed structural validation
    #[error("block {index} rejected: {reason}")]
    InvalidBlock { index: u64, reason: String },

    /// Invariant violation: the chain has no genesis block
    #[error("chain is empty: genesis block is missing")]
    EmptyChain,
}
