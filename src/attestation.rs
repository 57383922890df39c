//! Attestable-equivalence: the policy (spec §4.4) that decides whether an
//! attester's own measurement is "close enough" to the validator's
//! published submission to be worth confirming.
//!
//! Both sides are always pushed through the same canonicalization
//! ([`ScoreSet`] construction) before comparison — the Design Notes flag an
//! asymmetry in the source where the previous-epoch fallback skips this,
//! and the decision recorded in DESIGN.md is to treat that as a bug and
//! normalize unconditionally.

use crate::types::ScoreSet;

/// `A` and `B` are attestably equivalent for an epoch given the previous
/// epoch's scores `previous` iff:
/// 1. both are empty ("subnet broken, nothing to reward"), or
/// 2. they're strictly equal, or
/// 3. every discrepancy between them is explainable by a peer that was
///    present in `previous` (dropped/rejoined across the submission-to-
///    attestation window).
pub fn attestably_equivalent(a: &ScoreSet, b: &ScoreSet, previous: &ScoreSet) -> bool {
	if a.is_empty() && b.is_empty() {
		return true;
	}
	if a.strictly_equal(b) {
		return true;
	}
	a.symmetric_difference(b).is_subset_of(previous)
}
