use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

/// Fixed genesis timestamp (milliseconds since the Unix epoch).
///
/// SAFETY: Genesis must be byte-identical on every node; deriving it from
/// wall-clock time would fork the network at height 0.
pub const GENESIS_TIMESTAMP: u64 = 1_609_459_200_000; // 2021-01-01T00:00:00Z

/// Sentinel previous-hash carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Validator identity recorded on the genesis block.
pub const GENESIS_VALIDATOR: &str = "genesis";

/// Starting difficulty; retained for protocol compatibility.
pub const GENESIS_DIFFICULTY: u32 = 1;

/// Expected width of a hex-encoded SHA3-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// A block in the Aurum chain. Immutable once appended.
///
/// SAFETY INVARIANTS:
/// 1. `index` equals the parent's index + 1
/// 2. `timestamp` is >= the parent's timestamp
/// 3. `previous_hash` equals the parent's hash
/// 4. `hash` covers {index, timestamp, transactions, previous_hash, validator}
/// 5. `validator` must match the scheduled producer for the block's slot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    /// Block height in the chain
    pub index: u64,

    /// Block creation timestamp (milliseconds since epoch)
    pub timestamp: u64,

    /// Transactions in execution order
    pub transactions: Vec<Transaction>,

    /// Hash of the previous block (immutable link)
    pub previous_hash: String,

    /// Digest over the canonical encoding of the block
    pub hash: String,

    /// Identity of the producing delegate
    pub validator: String,

    /// Producer's attestation over `hash` (opaque blob)
    pub signature: Vec<u8>,

    /// Difficulty telemetry; DPoS admission does not gate on it
    pub difficulty: u32,
}

impl Block {
    /// Assemble a block and stamp its canonical hash. The signature is
    /// attached afterwards by the producer.
    pub fn new(
        index: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
        previous_hash: String,
        validator: String,
        difficulty: u32,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash,
            hash: String::new(),
            validator,
            signature: Vec::new(),
            difficulty,
        };
        block.hash = block.compute_hash();
        block
    }

    /// The deterministic genesis block, identical on every node.
    pub fn genesis() -> Self {
        Block::new(
            0,
            GENESIS_TIMESTAMP,
            Vec::new(),
            GENESIS_PREVIOUS_HASH.to_string(),
            GENESIS_VALIDATOR.to_string(),
            GENESIS_DIFFICULTY,
        )
    }

    /// Compute the block hash using SHA3-256.
    ///
    /// The canonical encoding feeds {index, timestamp, transactions,
    /// previous_hash, validator} into the hasher in that fixed order.
    /// Transactions contribute their content hashes, which already commit
    /// to every consensus-relevant field.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha3_256::new();
        hasher.update(self.index.to_be_bytes());
        hasher.update(self.timestamp.to_be_bytes());
        for tx in &self.transactions {
            hasher.update(tx.hash.as_bytes());
        }
        hasher.update(self.previous_hash.as_bytes());
        hasher.update(self.validator.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Field-shape checks: fixed-width hex digests and a present validator
    /// identity. Necessary but not sufficient for acceptance.
    pub fn is_structurally_valid(&self) -> bool {
        if !is_hex_digest(&self.hash) {
            log::warn!("block {} has malformed hash field", self.index);
            return false;
        }
        if !is_hex_digest(&self.previous_hash) {
            log::warn!("block {} has malformed previous_hash field", self.index);
            return false;
        }
        if self.validator.is_empty() {
            log::warn!("block {} has no validator identity", self.index);
            return false;
        }
        true
    }
}

fn is_hex_digest(s: &str) -> bool {
    s.len() == DIGEST_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}
