// === Core Chain Logic ===
pub mod block;
pub mod blockchain;
pub mod error;

// === Transactions and Pending Pool ===
pub mod mempool;
pub mod transaction;

// === Re-exports for broader ecosystem access ===
pub use block::{Block, GENESIS_DIFFICULTY, GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP};
pub use blockchain::Chain;
pub use error::ChainError;
pub use mempool::{PendingPool, DEFAULT_MAX_PENDING};
pub use transaction::Transaction;
