//! The `ChainClient` contract (spec §4.1). The transport itself — a
//! Substrate-style typed RPC connection plus signed-extrinsic submission —
//! is explicitly out of scope; this module defines only the interface the
//! core consumes, grounded on `engine/src/state_chain/client.rs`'s
//! `StateChainRpcApi` trait (an `#[async_trait]` interface wrapping the
//! substrate client library) and on `engine/sc-client`'s split between a
//! raw RPC layer and a typed API built on top of it.

use async_trait::async_trait;

use crate::error::AgentError;
use crate::types::{AccountId, Epoch, Event, Receipt, ScoreSet, SubmittableNode, SubnetStatus, ValidatorSubmission};

/// Produces signed extrinsics for a single account. Keypair loading and the
/// actual signing algorithm are out of scope (spec §1); the core only ever
/// needs to pass a `Signer` through to `ChainClient` submission calls and
/// read back its `account_id`.
pub trait Signer: Send + Sync {
	fn account_id(&self) -> &AccountId;
}

/// Typed synchronous queries against chain state, plus signed extrinsic
/// submission. One instance is bound to a specific RPC endpoint and is
/// invoked only from the single consensus worker (no internal locking
/// required by callers, though implementations must be `Send + Sync` to be
/// held behind an `Arc`).
#[async_trait]
pub trait ChainClient: Send + Sync {
	async fn block_number(&self) -> Result<u64, AgentError>;

	/// Fetched once at startup and assumed immutable for the agent's
	/// lifetime.
	async fn epoch_length(&self) -> Result<u64, AgentError>;

	/// Average block time. A chain constant, not expected to change over
	/// the agent's lifetime; used to turn block counts into sleep
	/// durations (spec §4.3).
	fn block_secs(&self) -> std::time::Duration;

	async fn subnet_id_by_path(&self, path: &str) -> Result<Option<u64>, AgentError>;

	async fn subnet_data(&self, subnet_id: u64) -> Result<Option<SubnetStatus>, AgentError>;

	/// Ordering is as returned by the chain and is the source of truth for
	/// activation staggering.
	async fn submittable_nodes(&self, subnet_id: u64) -> Result<Vec<SubmittableNode>, AgentError>;

	async fn rewards_validator(
		&self,
		subnet_id: u64,
		epoch: Epoch,
	) -> Result<Option<AccountId>, AgentError>;

	async fn rewards_submission(
		&self,
		subnet_id: u64,
		epoch: Epoch,
	) -> Result<Option<ValidatorSubmission>, AgentError>;

	async fn activate_subnet(&self, signer: &dyn Signer, subnet_id: u64) -> Result<Receipt, AgentError>;

	async fn validate(
		&self,
		signer: &dyn Signer,
		subnet_id: u64,
		data: ScoreSet,
	) -> Result<Receipt, AgentError>;

	async fn attest(&self, signer: &dyn Signer, subnet_id: u64) -> Result<Receipt, AgentError>;
}

impl Event {
	pub fn subnet_activated() -> Self {
		Event { event_id: crate::constants::EVENT_SUBNET_ACTIVATED.to_string() }
	}
}
