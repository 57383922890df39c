//! Protocol constants. Wire-stable extrinsic names live here too, since
//! they're part of the contract with the chain even though the transport
//! itself is out of scope.

use std::time::Duration;

/// Inner attest-loop bound: after this many unsuccessful checks within one
/// epoch, the agent gives up waiting for the validator and lets the epoch
/// roll over.
pub const MAX_ATTEST_CHECKS: u32 = 3;

/// Width, in blocks, of one node's staggered activation slot.
pub const ACTIVATION_SLOT_BLOCKS: u64 = 10;

/// Default block time used when a chain client doesn't surface its own
/// `BLOCK_SECS` constant (e.g. in tests). Real deployments should prefer
/// `ChainClient::block_secs`.
pub const DEFAULT_BLOCK_SECS: Duration = Duration::from_secs(6);

pub const EXTRINSIC_ACTIVATE_SUBNET: &str = "activate_subnet";
pub const EXTRINSIC_VALIDATE: &str = "validate";
pub const EXTRINSIC_ATTEST: &str = "attest";

pub const EVENT_SUBNET_ACTIVATED: &str = "SubnetActivated";
