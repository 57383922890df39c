//! Pure epoch arithmetic. No I/O, no chain access — every function here is
//! a one-liner over `block_number` and `epoch_length`, kept separate so it
//! can be property-tested in isolation (spec property P3).

use std::time::Duration;

use crate::types::Epoch;

pub fn epoch_of(block: u64, epoch_length: u64) -> Epoch {
	block / epoch_length
}

pub fn next_epoch_start(block: u64, epoch_length: u64) -> u64 {
	(epoch_of(block, epoch_length) + 1) * epoch_length
}

pub fn blocks_remaining(block: u64, epoch_length: u64) -> u64 {
	next_epoch_start(block, epoch_length) - block
}

pub fn sleep_duration(blocks: u64, block_secs: Duration) -> Duration {
	block_secs.saturating_mul(blocks as u32)
}
