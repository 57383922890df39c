//! Cooperative cancellation (spec §5): there is no preemption, so every
//! sleep must be interruptible by the stop flag. Grounded on the
//! `tokio::sync::watch`-based signal idiom used by the teacher's witnesser
//! loops to coordinate with a long-running stream (e.g.
//! `engine/src/eth/chain_data_witnessing.rs` and `engine/src/eth/mod.rs`),
//! generalized here to a plain stop flag rather than a data channel.

use std::time::Duration;

use tokio::sync::watch;

/// The write side, held by the [`crate::supervisor::Supervisor`].
#[derive(Clone)]
pub struct StopHandle(watch::Sender<bool>);

/// The read side, threaded through the worker, the `ActivationDriver`, and
/// the `ConsensusLoop`.
#[derive(Clone)]
pub struct StopSignal(watch::Receiver<bool>);

pub fn channel() -> (StopHandle, StopSignal) {
	let (tx, rx) = watch::channel(false);
	(StopHandle(tx), StopSignal(rx))
}

impl StopHandle {
	/// Requests shutdown. The worker exits at its next suspension point.
	pub fn stop(&self) {
		let _ = self.0.send(true);
	}
}

impl StopSignal {
	pub fn is_stopped(&self) -> bool {
		*self.0.borrow()
	}

	/// Sleeps for `duration` unless a stop is requested first, in which
	/// case it returns early. Returns `true` if the sleep was cut short by
	/// a stop request.
	pub async fn sleep_or_stop(&mut self, duration: Duration) -> bool {
		if duration.is_zero() {
			return self.is_stopped();
		}
		tokio::select! {
			_ = tokio::time::sleep(duration) => false,
			result = self.0.changed() => {
				result.is_err() || *self.0.borrow()
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn stop_interrupts_a_pending_sleep() {
		let (handle, mut signal) = channel();
		let sleeper = tokio::spawn(async move {
			signal.sleep_or_stop(Duration::from_secs(3600)).await
		});
		tokio::task::yield_now().await;
		handle.stop();
		let was_interrupted = sleeper.await.unwrap();
		assert!(was_interrupted);
	}

	#[tokio::test]
	async fn zero_duration_sleep_is_a_stop_check() {
		let (handle, mut signal) = channel();
		assert!(!signal.sleep_or_stop(Duration::ZERO).await);
		handle.stop();
		assert!(signal.sleep_or_stop(Duration::ZERO).await);
	}
}
