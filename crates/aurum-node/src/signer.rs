use aurum_consensus::BlockSigner;
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;

/// Ed25519 signing provider. The validator address is the hex-encoded
/// public key, so any peer can verify a block signature from the address
/// recorded on the block.
pub struct Ed25519Signer {
    key: SigningKey,
    address: String,
}

impl Ed25519Signer {
    /// Generate a fresh keypair.
    pub fn generate() -> Self {
        let key = SigningKey::generate(&mut OsRng);
        Self::from_key(key)
    }

    /// Derive a keypair from a fixed seed. Used for reproducible setups
    /// and tests.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::from_key(SigningKey::from_bytes(&seed))
    }

    fn from_key(key: SigningKey) -> Self {
        let address = hex::encode(key.verifying_key().to_bytes());
        Self { key, address }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl BlockSigner for Ed25519Signer {
    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.key.sign(message).to_bytes().to_vec()
    }
}

/// Verify an opaque signature blob against a hex-encoded public-key
/// address. Malformed addresses or signatures verify as false rather than
/// erroring.
pub fn verify_signature(address: &str, message: &[u8], signature: &[u8]) -> bool {
    let Ok(key_bytes) = hex::decode(address) else {
        return false;
    };
    let Ok(key_array) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&key_array) else {
        return false;
    };
    let Ok(sig) = Signature::from_slice(signature) else {
        return false;
    };
    key.verify(message, &sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify_round_trip() {
        let signer = Ed25519Signer::from_seed([7u8; 32]);
        let message = b"block-hash-bytes";
        let signature = signer.sign(message);
        assert!(verify_signature(signer.address(), message, &signature));
    }

    #[test]
    fn test_verify_rejects_wrong_message() {
        let signer = Ed25519Signer::from_seed([7u8; 32]);
        let signature = signer.sign(b"original");
        assert!(!verify_signature(signer.address(), b"tampered", &signature));
    }

    #[test]
    fn test_verify_rejects_wrong_address() {
        let signer = Ed25519Signer::from_seed([7u8; 32]);
        let other = Ed25519Signer::from_seed([8u8; 32]);
        let signature = signer.sign(b"message");
        assert!(!verify_signature(other.address(), b"message", &signature));
    }

    #[test]
    fn test_verify_tolerates_malformed_inputs() {
        assert!(!verify_signature("not-hex", b"m", &[0u8; 64]));
        assert!(!verify_signature("abcd", b"m", &[0u8; 64]));
        let signer = Ed25519Signer::from_seed([7u8; 32]);
        assert!(!verify_signature(signer.address(), b"m", &[0u8; 3]));
    }

    #[test]
    fn test_seeded_signer_is_reproducible() {
        let a = Ed25519Signer::from_seed([1u8; 32]);
        let b = Ed25519Signer::from_seed([1u8; 32]);
        assert_eq!(a.address(), b.address());
    }
}
