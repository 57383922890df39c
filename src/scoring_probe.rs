//! The `ScoringProbe` contract (spec §4.2). The DHT transport and the
//! concrete scoring rule are out of scope; the core only needs a single
//! deterministic operation.

use async_trait::async_trait;

use crate::error::AgentError;
use crate::types::ScoreSet;

/// Produces this node's independent peer-score snapshot for a subnet.
/// Two honest nodes querying the same DHT state within the same epoch
/// SHOULD produce equal `ScoreSet`s; transient peer churn is tolerated by
/// the attest policy in [`crate::attestation`], not here.
#[async_trait]
pub trait ScoringProbe: Send + Sync {
	async fn score(&self, subnet_id: u64) -> Result<ScoreSet, AgentError>;
}
