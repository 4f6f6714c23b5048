use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

/// A value transfer queued for inclusion in a block.
///
/// SAFETY INVARIANT: `hash` is computed once at construction over the
/// canonical content fields and is the transaction's identity everywhere
/// (pending-pool keys, post-append pruning, reorg re-admission). There is
/// no fallback identity derived from field stringification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
    /// Creation time in milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Opaque signature blob produced by the wallet layer
    pub signature: Vec<u8>,
    /// Content digest over {sender, recipient, amount, timestamp}
    pub hash: String,
}

impl Transaction {
    /// Create a transaction and stamp its content hash.
    pub fn new(sender: &str, recipient: &str, amount: u64, timestamp: u64) -> Self {
        let hash = Self::content_hash(sender, recipient, amount, timestamp);
        Self {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount,
            timestamp,
            signature: Vec::new(),
            hash,
        }
    }

    /// Attach a signature produced by an external signing provider.
    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.signature = signature;
        self
    }

    /// Canonical content digest: SHA3-256 over the fields in fixed order.
    pub fn content_hash(sender: &str, recipient: &str, amount: u64, timestamp: u64) -> String {
        let mut hasher = Sha3_256::new();
        hasher.update(sender.as_bytes());
        hasher.update(recipient.as_bytes());
        hasher.update(amount.to_be_bytes());
        hasher.update(timestamp.to_be_bytes());
        hex::encode(hasher.finalize())
    }

    /// Admission checks applied before a transaction is queued.
    ///
    /// Verifies sender and recipient are present, the amount is positive,
    /// and the stamped hash matches the content.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.sender.is_empty() {
            return Err(ChainError::InvalidTransaction {
                reason: "missing sender".to_string(),
            });
        }
        if self.recipient.is_empty() {
            return Err(ChainError::InvalidTransaction {
                reason: "missing recipient".to_string(),
            });
        }
        if self.amount == 0 {
            return Err(ChainError::InvalidTransaction {
                reason: "amount must be positive".to_string(),
            });
        }
        let expected = Self::content_hash(&self.sender, &self.recipient, self.amount, self.timestamp);
        if self.hash != expected {
            return Err(ChainError::InvalidTransaction {
                reason: format!("hash mismatch: expected {}, got {}", expected, self.hash),
            });
        }
        Ok(())
    }
}
