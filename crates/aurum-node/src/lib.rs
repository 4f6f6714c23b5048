// === Node Assembly ===
pub mod config;
pub mod node;
pub mod signer;

pub use config::NodeConfig;
pub use node::ChainNode;
pub use signer::{verify_signature, Ed25519Signer};
