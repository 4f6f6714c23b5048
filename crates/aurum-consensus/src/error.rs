use aurum_core::ChainError;
use thiserror::Error;

/// Consensus-level errors with detailed context.
///
/// Authorization misses during routine slot polling are NOT errors; they
/// are the expected no-op outcome of an unscheduled tick. `NotAuthorized`
/// only surfaces when block creation is forced outside the producer's slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    /// Delegate registration below the fixed self-stake minimum
    #[error("delegate {candidate} stake {stake} below minimum {minimum}")]
    InsufficientStake {
        candidate: String,
        stake: u64,
        minimum: u64,
    },

    /// Reorg candidate is not strictly longer than the local chain
    #[error("candidate height {candidate} does not exceed local height {local}")]
    ChainNotLonger { local: u64, candidate: u64 },

    /// Reorg candidate failed validation
    #[error("candidate chain rejected: {reason}")]
    ChainInvalid { reason: String },

    /// Reorg would rewind past the finalized depth
    #[error("reorg depth {depth} exceeds finalized depth {max}")]
    ReorgTooDeep { depth: u64, max: u64 },

    /// Block creation attempted outside the producer's scheduled slot
    #[error("validator {validator} is not the scheduled producer for this slot")]
    NotAuthorized { validator: String },

    /// No producer schedule exists (no active delegates)
    #[error("producer schedule is empty")]
    EmptySchedule,

    /// Error bubbled up from the chain model
    #[error(transparent)]
    Chain(#[from] ChainError),
}
