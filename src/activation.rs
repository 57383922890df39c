//! `ActivationDriver` (spec §4.5): one-shot progression from "subnet
//! registered" to "subnet accepting consensus". Entered while
//! `subnet_accepting_consensus == false`.
//!
//! The source expresses the retry structure (re-resolve path, wait for the
//! activation window, wait for someone else's late activation) via
//! self-recursion; per the Design Notes this is flattened here into a
//! single bounded loop so a long wait for the chain never grows the stack.
//! `step` still does at most one *outward* thing per call — matching the
//! `ConsensusLoop` pseudocode, which calls `step()` once per outer tick and
//! sleeps `BLOCK_SECS` between calls when it returns `false` — by bounding
//! the inner loop and falling back to the outer tick for further waiting.

use std::time::Duration;

use tracing::{info, warn};

use crate::cancellation::StopSignal;
use crate::chain_client::{ChainClient, Signer};
use crate::constants::ACTIVATION_SLOT_BLOCKS;
use crate::state::AgentState;

/// Bounds the inner retry loop within one `step()` call. Each iteration
/// does at least one chain round-trip, so this is generous without being
/// unbounded; further waiting resumes on the next outer-loop tick.
const MAX_INNER_ITERATIONS: u32 = 16;

pub struct ActivationDriver<'a> {
	pub chain: &'a dyn ChainClient,
	pub signer: &'a dyn Signer,
	pub path: &'a str,
	pub block_secs: Duration,
}

/// Activation failed in a way that means the agent should shut down:
/// the subnet path or its on-chain data could not be resolved at all.
#[derive(Debug)]
pub struct FatalActivationError(pub crate::error::AgentError);

impl<'a> ActivationDriver<'a> {
	pub async fn step(
		&self,
		state: &mut AgentState,
		stop: &mut StopSignal,
	) -> Result<bool, FatalActivationError> {
		for _ in 0..MAX_INNER_ITERATIONS {
			if stop.is_stopped() {
				return Ok(false);
			}

			// Step 1-2: resolve subnet_id and status. Absent is fatal —
			// these indicate misconfiguration, not a transient condition.
			let subnet_id = self
				.chain
				.subnet_id_by_path(self.path)
				.await
				.map_err(FatalActivationError)?
				.ok_or_else(|| {
					FatalActivationError(crate::error::AgentError::PathNotFound(self.path.to_string()))
				})?;

			let status = self
				.chain
				.subnet_data(subnet_id)
				.await
				.map_err(FatalActivationError)?
				.ok_or(FatalActivationError(crate::error::AgentError::SubnetDataMissing(subnet_id)))?;

			// Step 3: already activated (possibly by someone else).
			if status.is_activated() {
				state.subnet_id = Some(subnet_id);
				state.subnet_accepting_consensus = true;
				info!(subnet_id, "subnet activated");
				return Ok(true);
			}

			// Step 4: compute this node's stagger slot.
			let nodes = self
				.chain
				.submittable_nodes(subnet_id)
				.await
				.map_err(FatalActivationError)?;
			let our_index = nodes.iter().position(|n| &n.account_id == self.signer.account_id());

			let Some(index) = our_index else {
				// Not in the list yet: wait one block and retry from step 1.
				if stop.sleep_or_stop(self.block_secs).await {
					return Ok(false);
				}
				continue;
			};
			let n = (index + 1) as u64; // 1-based index

			let base = status.activation_window_start();
			let slot_width = ACTIVATION_SLOT_BLOCKS * self.block_secs.as_secs();
			let lo = base + slot_width * (n - 1);
			let hi = base + slot_width * n;

			// Step 5.
			let cur = self.chain.block_number().await.map_err(FatalActivationError)?;

			if cur < lo {
				let wait = Duration::from_secs((lo - cur).saturating_mul(self.block_secs.as_secs()));
				if stop.sleep_or_stop(wait).await {
					return Ok(false);
				}
				continue;
			}

			if cur >= hi {
				warn!(subnet_id, n, "activation window for an earlier node elapsed without activation; submitting anyway next check");
				if stop.sleep_or_stop(self.block_secs).await {
					return Ok(false);
				}
				continue;
			}

			// lo <= cur < hi: our turn. Re-read status in case activation
			// landed between our earlier read and now.
			let status = self
				.chain
				.subnet_data(subnet_id)
				.await
				.map_err(FatalActivationError)?
				.ok_or(FatalActivationError(crate::error::AgentError::SubnetDataMissing(subnet_id)))?;
			if status.is_activated() {
				state.subnet_id = Some(subnet_id);
				state.subnet_accepting_consensus = true;
				return Ok(true);
			}

			let receipt = self
				.chain
				.activate_subnet(self.signer, subnet_id)
				.await
				.map_err(FatalActivationError)?;

			if receipt.is_success && receipt.has_event(crate::constants::EVENT_SUBNET_ACTIVATED) {
				state.subnet_id = Some(subnet_id);
				state.subnet_accepting_consensus = true;
				info!(subnet_id, "submitted activate_subnet, subnet now accepting consensus");
				return Ok(true);
			}

			let rejected = crate::error::AgentError::ExtrinsicRejected(
				receipt.error.clone().unwrap_or_else(|| "no reason given".to_string()),
			);
			warn!(subnet_id, error = %rejected, "activate_subnet extrinsic rejected, retrying next tick");
			return Ok(false);
		}

		// Exhausted the bounded inner loop without resolving; the outer
		// tick will call step() again.
		Ok(false)
	}
}
