//! Binary entry point. Parses settings, initializes logging, and hands off
//! to the `Supervisor`. Deliberately thin — constructing a concrete
//! `ChainClient`/`ScoringProbe`/`Signer` is the RPC transport, scoring
//! transport, and signing layer the core treats as opaque collaborators,
//! so this binary only shows the seam where a real deployment would plug
//! them in.

use clap::Parser;
use subnet_consensus_agent::settings::{CommandLineOptions, Settings};
use subnet_consensus_agent::{logging, supervisor::Supervisor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let settings = Settings::new(CommandLineOptions::parse())?;
	logging::init();

	tracing::info!(subnet_path = %settings.subnet_path, "starting subnet consensus agent");

	let (chain, probe, signer) = unimplemented_transport(&settings);
	let supervisor = Supervisor::spawn(chain, probe, signer, settings.subnet_path.clone());

	tokio::signal::ctrl_c().await?;
	tracing::info!("received shutdown signal");
	supervisor.shutdown().await;

	Ok(())
}

/// The concrete RPC transport, DHT scoring probe, and keypair-backed signer
/// are out of scope: plugging in real ones is the remaining integration
/// work for a specific deployment, not something the consensus core needs
/// to know about.
fn unimplemented_transport(
	_settings: &Settings,
) -> (
	std::sync::Arc<dyn subnet_consensus_agent::chain_client::ChainClient>,
	std::sync::Arc<dyn subnet_consensus_agent::scoring_probe::ScoringProbe>,
	std::sync::Arc<dyn subnet_consensus_agent::chain_client::Signer>,
) {
	unimplemented!("wire a concrete ChainClient, ScoringProbe, and Signer for this deployment")
}
