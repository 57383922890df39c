//! `AgentState` — the only durable-in-memory state of the core (spec §3).
//! Owned exclusively by the worker task driving [`crate::consensus_loop`];
//! never behind a lock (spec §5).

use crate::types::{AccountId, Epoch, ScoreSet};

#[derive(Debug)]
pub struct AgentState {
	pub account_id: AccountId,

	/// Resolved once subnet path → id. Set on successful activation, never
	/// cleared (I5: once `subnet_accepting_consensus` is true, non-null).
	pub subnet_id: Option<u64>,

	/// Gate: activation complete. False → True once; never back.
	pub subnet_accepting_consensus: bool,

	/// This account appears in the submittable-nodes set. False → True
	/// once observed; never back.
	pub subnet_node_eligible: bool,

	/// Highest epoch for which this node has validated or attested.
	/// Monotonic non-decreasing (I1).
	pub last_completed_epoch: Option<Epoch>,

	/// Own `ScoreSet` from the most recently completed epoch. Updated at
	/// the end of each attempted attestation, success or not.
	pub previous_epoch_scores: Option<ScoreSet>,
}

impl AgentState {
	pub fn new(account_id: AccountId) -> Self {
		Self {
			account_id,
			subnet_id: None,
			subnet_accepting_consensus: false,
			subnet_node_eligible: false,
			last_completed_epoch: None,
			previous_epoch_scores: None,
		}
	}

	/// Advances `last_completed_epoch`, enforcing monotonicity (I1) even if
	/// called redundantly (e.g. a duplicate-submission confirmation).
	pub fn complete_epoch(&mut self, epoch: Epoch) {
		self.last_completed_epoch = Some(self.last_completed_epoch.map_or(epoch, |e| e.max(epoch)));
	}

	pub fn has_completed(&self, epoch: Epoch) -> bool {
		self.last_completed_epoch.is_some_and(|e| epoch <= e)
	}

	/// Panics if `subnet_id` is unset while consensus is accepting — I5
	/// should make this unreachable; kept as a debug assertion at the call
	/// site that needs the id, not enforced eagerly here.
	pub fn require_subnet_id(&self) -> u64 {
		self.subnet_id.expect("subnet_id must be set once subnet_accepting_consensus is true (I5)")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn complete_epoch_never_decreases() {
		let mut state = AgentState::new(AccountId::new(vec![1]));
		state.complete_epoch(5);
		state.complete_epoch(3);
		assert_eq!(state.last_completed_epoch, Some(5));
		state.complete_epoch(7);
		assert_eq!(state.last_completed_epoch, Some(7));
	}

	#[test]
	fn has_completed_is_inclusive() {
		let mut state = AgentState::new(AccountId::new(vec![1]));
		state.complete_epoch(5);
		assert!(state.has_completed(5));
		assert!(state.has_completed(4));
        #[allow(clippy::bool_assert_comparison)]
		{
			assert_eq!(state.has_completed(6), false);
		}
	}
}
