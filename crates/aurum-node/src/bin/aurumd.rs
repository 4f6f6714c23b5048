use anyhow::Context;
use aurum_consensus::MIN_DELEGATE_STAKE;
use aurum_node::{ChainNode, Ed25519Signer, NodeConfig};
use log::info;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => NodeConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => NodeConfig::default(),
    };

    let signer = Arc::new(Ed25519Signer::generate());
    if config.validator.is_empty() {
        config.validator = signer.address().to_string();
    }
    info!("starting aurumd as validator {}", config.validator);

    let node = ChainNode::new(config.clone());

    // Single-node bootstrap: self-register as a delegate and derive the
    // first schedule from genesis.
    node.register_delegate(&config.validator, MIN_DELEGATE_STAKE)?;
    node.refresh_schedule()?;

    node.run_producer(signer).await;
    Ok(())
}
