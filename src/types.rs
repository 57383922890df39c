//! Canonical data model shared by every component: chain-facing identifiers,
//! the per-peer score record, and the set types built on top of it.
//!
//! Every field that participates in equality/hash is compared bit-exact —
//! no float fields, no lossy coercions — so that two independently
//! measured [`ScoreSet`]s can be compared for equivalence without a
//! tolerance band creeping in by accident.

use std::collections::{BTreeSet, HashSet};

/// Opaque peer identifier, as handed back by the DHT and recorded on chain.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId(pub Vec<u8>);

impl PeerId {
	pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
		Self(bytes.into())
	}
}

impl std::fmt::Display for PeerId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", hex::encode(&self.0))
	}
}

/// Opaque chain account identifier. Each node owns exactly one.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(pub Vec<u8>);

impl AccountId {
	pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
		Self(bytes.into())
	}
}

impl std::fmt::Display for AccountId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", hex::encode(&self.0))
	}
}

/// Non-negative epoch index. `epoch = floor(block_number / epoch_length)`.
pub type Epoch = u64;

/// Chain-defined lifecycle classification of a subnet node. The concrete
/// variants mirror what the original reward-accounting pipeline decodes
/// off-chain; they participate in `ScoreRecord` equality bit-exact, same as
/// every other field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeClass {
	Idle,
	Included,
	Submittable,
}

/// One peer's reward contribution for an epoch. `score` is a fixed-point
/// integer (not a float) specifically so equality stays bit-exact across
/// independently computed [`ScoreSet`]s.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScoreRecord {
	pub peer_id: PeerId,
	pub score: u64,
	pub class: NodeClass,
}

/// An unordered set of [`ScoreRecord`]s, at most one per `peer_id`.
/// Equality is set-equality on record field-tuples (derived `Eq`/`Hash` on
/// `ScoreRecord` already gives us this via the backing `HashSet`).
#[derive(Clone, Debug, Default)]
pub struct ScoreSet {
	records: HashSet<ScoreRecord>,
}

impl ScoreSet {
	pub fn new() -> Self {
		Self { records: HashSet::new() }
	}

	/// Builds a `ScoreSet` from records, keeping only the last record seen
	/// per `peer_id` (enforces the at-most-one-record-per-peer invariant).
	pub fn from_records(records: impl IntoIterator<Item = ScoreRecord>) -> Self {
		let mut by_peer = std::collections::HashMap::new();
		for record in records {
			by_peer.insert(record.peer_id.clone(), record);
		}
		Self { records: by_peer.into_values().collect() }
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn iter(&self) -> impl Iterator<Item = &ScoreRecord> {
		self.records.iter()
	}

	pub fn contains_peer(&self, peer_id: &PeerId) -> bool {
		self.records.iter().any(|r| &r.peer_id == peer_id)
	}

	/// Records present in exactly one of `self`/`other` (set-symmetric
	/// difference on whole-record equality, so a peer present in both with
	/// a differing field still counts as a discrepancy).
	pub fn symmetric_difference(&self, other: &ScoreSet) -> ScoreSet {
		let diff: HashSet<ScoreRecord> =
			self.records.symmetric_difference(&other.records).cloned().collect();
		ScoreSet { records: diff }
	}

	/// True iff every record in `self` also appears, verbatim, in `other`.
	pub fn is_subset_of(&self, other: &ScoreSet) -> bool {
		self.records.iter().all(|r| other.records.contains(r))
	}

	/// Strict equivalence: equal as sets of records (I4).
	pub fn strictly_equal(&self, other: &ScoreSet) -> bool {
		self.records == other.records
	}

	/// Deterministic ordering, useful only for display/logging — never for
	/// equality, which must stay order-independent (I4).
	pub fn sorted_peer_ids(&self) -> BTreeSet<&PeerId> {
		self.records.iter().map(|r| &r.peer_id).collect()
	}
}

impl PartialEq for ScoreSet {
	fn eq(&self, other: &Self) -> bool {
		self.strictly_equal(other)
	}
}
impl Eq for ScoreSet {}

impl FromIterator<ScoreRecord> for ScoreSet {
	fn from_iter<T: IntoIterator<Item = ScoreRecord>>(iter: T) -> Self {
		Self::from_records(iter)
	}
}

/// What the chain returns for `(subnet_id, epoch)` once a validator has
/// published. `data` is immutable once present; `attests` only grows.
#[derive(Clone, Debug, Default)]
pub struct ValidatorSubmission {
	pub data: ScoreSet,
	pub attests: BTreeSet<AccountId>,
}

impl ValidatorSubmission {
	pub fn has_attested(&self, account_id: &AccountId) -> bool {
		self.attests.contains(account_id)
	}
}

/// Snapshot of on-chain subnet lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubnetStatus {
	pub initialized_block: u64,
	pub registration_blocks: u64,
	/// `0` if the subnet has not yet been activated.
	pub activated_block: u64,
}

impl SubnetStatus {
	pub fn activation_window_start(&self) -> u64 {
		self.initialized_block + self.registration_blocks
	}

	pub fn is_activated(&self) -> bool {
		self.activated_block > 0
	}
}

/// One entry of the chain's submittable-nodes set; ordering of the
/// containing `Vec` (as returned by the chain) is the source of truth for
/// activation staggering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittableNode {
	pub account_id: AccountId,
}

/// A recognized on-chain event emitted by an extrinsic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
	pub event_id: String,
}

/// Result of submitting a signed extrinsic.
#[derive(Clone, Debug, Default)]
pub struct Receipt {
	pub is_success: bool,
	pub events: Vec<Event>,
	pub error: Option<String>,
}

impl Receipt {
	pub fn success(events: Vec<Event>) -> Self {
		Self { is_success: true, events, error: None }
	}

	pub fn failure(error: impl Into<String>) -> Self {
		Self { is_success: false, events: Vec::new(), error: Some(error.into()) }
	}

	pub fn has_event(&self, event_id: &str) -> bool {
		self.events.iter().any(|e| e.event_id == event_id)
	}
}

/// Why `try_attest` did or didn't submit an `attest` extrinsic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttestReason {
	/// The validator hasn't submitted yet this epoch.
	Waiting,
	/// Either we just attested successfully, or we'd already attested
	/// (duplicate-submission, not an error — see I3).
	Attested,
	/// We decided to attest but the extrinsic came back unsuccessful.
	AttestFailed,
	/// Our measurement disagrees with the validator's beyond what the
	/// previous epoch's scores can explain.
	ShouldNotAttest,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(peer: u8, score: u64, class: NodeClass) -> ScoreRecord {
		ScoreRecord { peer_id: PeerId::new(vec![peer]), score, class }
	}

	#[test]
	fn score_set_equality_is_order_independent() {
		let a = ScoreSet::from_records([
			record(1, 10, NodeClass::Submittable),
			record(2, 20, NodeClass::Included),
		]);
		let b = ScoreSet::from_records([
			record(2, 20, NodeClass::Included),
			record(1, 10, NodeClass::Submittable),
		]);
		assert_eq!(a, b);
	}

	#[test]
	fn score_set_keeps_at_most_one_record_per_peer() {
		let set = ScoreSet::from_records([
			record(1, 10, NodeClass::Idle),
			record(1, 99, NodeClass::Submittable),
		]);
		assert_eq!(set.len(), 1);
	}

	#[test]
	fn symmetric_difference_is_empty_for_equal_sets() {
		let a = ScoreSet::from_records([record(1, 10, NodeClass::Submittable)]);
		assert!(a.symmetric_difference(&a.clone()).is_empty());
	}

	#[test]
	fn symmetric_difference_catches_differing_field_on_same_peer() {
		let a = ScoreSet::from_records([record(1, 10, NodeClass::Submittable)]);
		let b = ScoreSet::from_records([record(1, 11, NodeClass::Submittable)]);
		// Same peer, different score => two distinct records => both show up.
		assert_eq!(a.symmetric_difference(&b).len(), 2);
	}
}
