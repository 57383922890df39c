//! `Supervisor` (spec §4.7): owns the worker task and its cooperative stop
//! flag, isolates crashes per-iteration rather than per-epoch, and decides
//! fatal vs. retryable per [`crate::error::IterationError::is_fatal`]. A non-fatal
//! failure is logged with its `(epoch, phase)` context (spec §7) and the
//! worker backs off one block before retrying, rather than hammering the
//! chain/probe again immediately.
//!
//! Grounded on the retry-and-log-then-continue shape of the teacher's
//! `sc_observer` block-processing loop (`engine/src/state_chain/sc_observer.rs`),
//! generalized from "one bad block doesn't kill the witnesser" to "one bad
//! tick doesn't kill the agent".

use tracing::{error, warn};

use crate::cancellation::{channel, StopHandle, StopSignal};
use crate::chain_client::{ChainClient, Signer};
use crate::consensus_loop::ConsensusLoop;
use crate::scoring_probe::ScoringProbe;
use crate::state::AgentState;

pub struct Supervisor {
	stop: StopHandle,
	handle: tokio::task::JoinHandle<()>,
}

impl Supervisor {
	/// Spawns the worker task and returns a handle that can request
	/// shutdown. `chain`/`probe`/`signer` are held for the task's entire
	/// lifetime via `Arc`, since the worker runs on its own tokio task.
	pub fn spawn(
		chain: std::sync::Arc<dyn ChainClient>,
		probe: std::sync::Arc<dyn ScoringProbe>,
		signer: std::sync::Arc<dyn Signer>,
		path: String,
	) -> Self {
		let (stop_handle, stop_signal) = channel();
		let handle = tokio::spawn(run_worker(chain, probe, signer, path, stop_signal));
		Self { stop: stop_handle, handle }
	}

	/// Requests shutdown and waits for the worker task to exit. The worker
	/// exits at its next suspension point (spec §5: no preemption).
	pub async fn shutdown(self) {
		self.stop.stop();
		let _ = self.handle.await;
	}
}

async fn run_worker(
	chain: std::sync::Arc<dyn ChainClient>,
	probe: std::sync::Arc<dyn ScoringProbe>,
	signer: std::sync::Arc<dyn Signer>,
	path: String,
	mut stop: StopSignal,
) {
	let mut state = AgentState::new(signer.account_id().clone());
	let consensus = ConsensusLoop { chain: chain.as_ref(), probe: probe.as_ref(), signer: signer.as_ref(), path: &path };

	while !stop.is_stopped() {
		match consensus.run_iteration(&mut state, &mut stop).await {
			Ok(()) => {}
			Err(err) if err.is_fatal() => {
				error!(epoch = ?err.epoch, phase = %err.phase, error = %err, "fatal error, shutting down consensus worker");
				return;
			}
			Err(err) => {
				warn!(
					epoch = ?err.epoch,
					phase = %err.phase,
					error = %err,
					"consensus iteration failed, retrying next tick"
				);
				// Back off one block before retrying, otherwise a
				// persistent transport failure busy-loops against the RPC
				// endpoint instead of waiting (spec §7).
				if stop.sleep_or_stop(chain.block_secs()).await {
					return;
				}
			}
		}
	}
}
