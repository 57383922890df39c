//! Error taxonomy for the consensus agent, per the propagation policy:
//! transport and probe failures are logged and retried next tick; path/data
//! misconfiguration is fatal and triggers shutdown; rejected extrinsics are
//! logged and the epoch state machine re-enters the appropriate wait.

use thiserror::Error;

use crate::types::Epoch;

/// A transport-layer failure talking to the chain: unreachable endpoint,
/// malformed response, or SCALE/JSON decode failure.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
	pub fn new(msg: impl Into<String>) -> Self {
		Self(msg.into())
	}
}

#[derive(Error, Debug)]
pub enum AgentError {
	#[error("transport error: {0}")]
	Transport(#[from] TransportError),

	#[error("subnet path {0:?} not found on chain")]
	PathNotFound(String),

	#[error("subnet data missing for subnet {0}")]
	SubnetDataMissing(u64),

	#[error("extrinsic rejected: {0}")]
	ExtrinsicRejected(String),

	#[error("scoring probe failure: {0}")]
	ProbeFailure(String),
}

impl AgentError {
	/// Fatal errors indicate misconfiguration, not a transient condition;
	/// the Supervisor shuts down rather than retrying.
	pub fn is_fatal(&self) -> bool {
		matches!(self, AgentError::PathNotFound(_) | AgentError::SubnetDataMissing(_))
	}
}

/// Where in the epoch-paced state machine an error occurred. Logged
/// alongside the error itself (spec §7: "(epoch, phase)" context) so an
/// operator can tell "stuck waiting for activation" from "stuck mid-attest"
/// without having to infer it from `AgentState::last_completed_epoch`, which
/// only reflects the last *successful* epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
	Activation,
	Eligibility,
	ValidatorCheck,
	Validate,
	Attest,
}

impl std::fmt::Display for Phase {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			Phase::Activation => "activation",
			Phase::Eligibility => "eligibility",
			Phase::ValidatorCheck => "validator_check",
			Phase::Validate => "validate",
			Phase::Attest => "attest",
		};
		f.write_str(s)
	}
}

/// An [`AgentError`] tagged with the epoch (if known at the point of
/// failure) and the phase of `ConsensusLoop::run_iteration` it came from.
/// `ConsensusLoop` produces these; `Supervisor` is the only consumer.
#[derive(Debug)]
pub struct IterationError {
	pub phase: Phase,
	pub epoch: Option<Epoch>,
	pub source: AgentError,
}

impl IterationError {
	pub fn new(phase: Phase, epoch: Option<Epoch>, source: AgentError) -> Self {
		Self { phase, epoch, source }
	}

	pub fn is_fatal(&self) -> bool {
		self.source.is_fatal()
	}
}

impl std::fmt::Display for IterationError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.source)
	}
}

impl std::error::Error for IterationError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		Some(&self.source)
	}
}
