//! Hand-rolled fakes for `ChainClient`, `ScoringProbe`, and `Signer`, used
//! only by `#[cfg(test)]` code across the crate. Grounded on the
//! `Arc<Mutex<_>>`-backed fake RPC client pattern used throughout
//! `engine`'s state-chain client tests rather than a mocking crate, since
//! the traits here are small and the test doubles need stateful call
//! recording (extrinsic counts) that a generated mock would obscure.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::chain_client::{ChainClient, Signer};
use crate::error::AgentError;
use crate::scoring_probe::ScoringProbe;
use crate::types::{
	AccountId, Epoch, Event, Receipt, ScoreSet, SubmittableNode, SubnetStatus, ValidatorSubmission,
};

pub struct FakeSigner(AccountId);

impl Signer for FakeSigner {
	fn account_id(&self) -> &AccountId {
		&self.0
	}
}

pub fn signer(n: u8) -> FakeSigner {
	FakeSigner(AccountId::new(vec![n]))
}

#[derive(Default)]
struct Inner {
	block_number: u64,
	epoch_length: u64,
	subnet_ids: HashMap<String, u64>,
	subnet_status: HashMap<u64, SubnetStatus>,
	submittable_nodes: HashMap<u64, Vec<SubmittableNode>>,
	rewards_validator: HashMap<(u64, Epoch), AccountId>,
	rewards_submission: HashMap<(u64, Epoch), ValidatorSubmission>,
	activate_subnet_calls: u32,
	validate_calls: u32,
	attest_calls: u32,
	rewards_submission_calls: u32,
}

/// Configurable, call-recording stand-in for a real chain connection.
/// Every setter is a plain synchronous method so tests can arrange state up
/// front without an executor.
#[derive(Clone)]
pub struct FakeChainClient(Arc<Mutex<Inner>>);

impl FakeChainClient {
	pub fn new() -> Self {
		Self(Arc::new(Mutex::new(Inner { epoch_length: 10, ..Inner::default() })))
	}

	pub fn set_block_number(&self, block: u64) {
		self.0.lock().unwrap().block_number = block;
	}

	pub fn set_epoch_length(&self, epoch_length: u64) {
		self.0.lock().unwrap().epoch_length = epoch_length;
	}

	pub fn set_subnet_id(&self, path: &str, subnet_id: u64) {
		self.0.lock().unwrap().subnet_ids.insert(path.to_string(), subnet_id);
	}

	pub fn set_subnet_status(&self, subnet_id: u64, status: SubnetStatus) {
		self.0.lock().unwrap().subnet_status.insert(subnet_id, status);
	}

	pub fn set_submittable_nodes(&self, subnet_id: u64, nodes: Vec<SubmittableNode>) {
		self.0.lock().unwrap().submittable_nodes.insert(subnet_id, nodes);
	}

	pub fn set_rewards_validator(&self, subnet_id: u64, epoch: Epoch, validator: AccountId) {
		self.0.lock().unwrap().rewards_validator.insert((subnet_id, epoch), validator);
	}

	pub fn set_rewards_submission(
		&self,
		subnet_id: u64,
		epoch: Epoch,
		data: ScoreSet,
		attests: Vec<AccountId>,
	) {
		let submission = ValidatorSubmission { data, attests: attests.into_iter().collect() };
		self.0.lock().unwrap().rewards_submission.insert((subnet_id, epoch), submission);
	}

	pub fn activate_subnet_calls(&self) -> u32 {
		self.0.lock().unwrap().activate_subnet_calls
	}

	pub fn validate_calls(&self) -> u32 {
		self.0.lock().unwrap().validate_calls
	}

	pub fn attest_calls(&self) -> u32 {
		self.0.lock().unwrap().attest_calls
	}

	/// Number of `rewards_submission` reads so far — used to confirm an
	/// attest-checking loop actually iterated rather than exiting early.
	pub fn rewards_submission_calls(&self) -> u32 {
		self.0.lock().unwrap().rewards_submission_calls
	}
}

impl Default for FakeChainClient {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl ChainClient for FakeChainClient {
	async fn block_number(&self) -> Result<u64, AgentError> {
		Ok(self.0.lock().unwrap().block_number)
	}

	async fn epoch_length(&self) -> Result<u64, AgentError> {
		Ok(self.0.lock().unwrap().epoch_length)
	}

	fn block_secs(&self) -> Duration {
		Duration::from_millis(1)
	}

	async fn subnet_id_by_path(&self, path: &str) -> Result<Option<u64>, AgentError> {
		Ok(self.0.lock().unwrap().subnet_ids.get(path).copied())
	}

	async fn subnet_data(&self, subnet_id: u64) -> Result<Option<SubnetStatus>, AgentError> {
		Ok(self.0.lock().unwrap().subnet_status.get(&subnet_id).copied())
	}

	async fn submittable_nodes(&self, subnet_id: u64) -> Result<Vec<SubmittableNode>, AgentError> {
		Ok(self.0.lock().unwrap().submittable_nodes.get(&subnet_id).cloned().unwrap_or_default())
	}

	async fn rewards_validator(
		&self,
		subnet_id: u64,
		epoch: Epoch,
	) -> Result<Option<AccountId>, AgentError> {
		Ok(self.0.lock().unwrap().rewards_validator.get(&(subnet_id, epoch)).cloned())
	}

	async fn rewards_submission(
		&self,
		subnet_id: u64,
		epoch: Epoch,
	) -> Result<Option<ValidatorSubmission>, AgentError> {
		let mut inner = self.0.lock().unwrap();
		inner.rewards_submission_calls += 1;
		Ok(inner.rewards_submission.get(&(subnet_id, epoch)).cloned())
	}

	async fn activate_subnet(&self, _signer: &dyn Signer, subnet_id: u64) -> Result<Receipt, AgentError> {
		let mut inner = self.0.lock().unwrap();
		inner.activate_subnet_calls += 1;
		let activated_block = inner.block_number.max(1);
		let status = inner.subnet_status.entry(subnet_id).or_insert(SubnetStatus {
			initialized_block: 0,
			registration_blocks: 0,
			activated_block: 0,
		});
		status.activated_block = activated_block;
		Ok(Receipt::success(vec![Event::subnet_activated()]))
	}

	async fn validate(
		&self,
		signer: &dyn Signer,
		subnet_id: u64,
		data: ScoreSet,
	) -> Result<Receipt, AgentError> {
		let epoch = {
			let inner = self.0.lock().unwrap();
			inner.block_number / inner.epoch_length
		};
		let mut inner = self.0.lock().unwrap();
		inner.validate_calls += 1;
		inner
			.rewards_submission
			.insert((subnet_id, epoch), ValidatorSubmission { data, attests: Default::default() });
		let _ = signer;
		Ok(Receipt::success(vec![]))
	}

	async fn attest(&self, signer: &dyn Signer, subnet_id: u64) -> Result<Receipt, AgentError> {
		let epoch = {
			let inner = self.0.lock().unwrap();
			inner.block_number / inner.epoch_length
		};
		let mut inner = self.0.lock().unwrap();
		inner.attest_calls += 1;
		if let Some(submission) = inner.rewards_submission.get_mut(&(subnet_id, epoch)) {
			submission.attests.insert(signer.account_id().clone());
		}
		Ok(Receipt::success(vec![]))
	}
}

/// Returns a fixed `ScoreSet` on every call.
pub struct FakeScoringProbe(ScoreSet);

impl FakeScoringProbe {
	pub fn new(scores: ScoreSet) -> Self {
		Self(scores)
	}
}

#[async_trait]
impl ScoringProbe for FakeScoringProbe {
	async fn score(&self, _subnet_id: u64) -> Result<ScoreSet, AgentError> {
		Ok(self.0.clone())
	}
}

/// Always fails, the way a real probe would if it couldn't reach the DHT.
pub struct FailingScoringProbe;

#[async_trait]
impl ScoringProbe for FailingScoringProbe {
	async fn score(&self, _subnet_id: u64) -> Result<ScoreSet, AgentError> {
		Err(AgentError::ProbeFailure("dht lookup timed out".to_string()))
	}
}
