// === Delegated-Proof-of-Stake Consensus ===
pub mod engine;
pub mod error;
pub mod fork_choice;
pub mod registry;
pub mod scheduler;

pub use engine::{BlockSigner, EngineState, ProducerEngine};
pub use error::ConsensusError;
pub use fork_choice::ForkChoice;
pub use registry::{ValidatorRegistry, MIN_DELEGATE_STAKE};
pub use scheduler::DelegateScheduler;
