//! Cancellable background task that clears a cache on a fixed interval.

// std
use std::sync::Weak;
// crates.io
use tokio::{
	runtime::Handle,
	sync::watch,
	task::JoinHandle,
	time::{self, Instant, MissedTickBehavior},
};
// self
use crate::{
	_prelude::*,
	cache::lru::LruIndex,
	error::ConfigError,
	obs::{self, Component, Outcome},
};

/// Handle to a running purge loop.
///
/// Dropping the handle closes the stop channel, which also ends the loop.
#[derive(Debug)]
pub(crate) struct PurgeTask {
	stop: watch::Sender<bool>,
	handle: JoinHandle<()>,
}
impl PurgeTask {
	/// Spawns the loop on the current Tokio runtime.
	///
	/// The loop only holds a weak reference, so it also exits once the cache is gone.
	pub(crate) fn spawn<V>(
		entries: Weak<Mutex<LruIndex<V>>>,
		interval: StdDuration,
	) -> Result<Self, ConfigError>
	where
		V: 'static + Send,
	{
		let runtime = Handle::try_current().map_err(|_| ConfigError::PurgeWithoutRuntime)?;
		let (stop, stopped) = watch::channel(false);
		let handle = runtime.spawn(run(entries, interval, stopped));

		Ok(Self { stop, handle })
	}

	/// Signals the loop to exit; the pending wait is interrupted immediately.
	pub(crate) fn stop(self) -> JoinHandle<()> {
		self.stop.send_replace(true);

		self.handle
	}

	#[cfg(test)]
	pub(crate) fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}
}

async fn run<V>(
	entries: Weak<Mutex<LruIndex<V>>>,
	interval: StdDuration,
	mut stopped: watch::Receiver<bool>,
) {
	let mut ticker = time::interval_at(Instant::now() + interval, interval);

	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		tokio::select! {
			biased;
			// Either an explicit stop or a dropped sender ends the loop.
			_ = stopped.changed() => break,
			_ = ticker.tick() => {
				if *stopped.borrow() {
					break;
				}

				let Some(entries) = entries.upgrade() else { break };
				let removed = entries.lock().clear();

				obs::record_outcome(Component::Cache, Outcome::Purge);
				obs::log_cache_purged(removed);
			},
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::num::NonZeroUsize;
	// self
	use super::*;

	fn shared_index() -> Arc<Mutex<LruIndex<u32>>> {
		let capacity = NonZeroUsize::new(8).expect("Test capacity should be non-zero.");

		Arc::new(Mutex::new(LruIndex::new(capacity)))
	}

	#[test]
	fn spawn_outside_runtime_is_a_config_error() {
		let index = shared_index();
		let err = PurgeTask::spawn(Arc::downgrade(&index), StdDuration::from_secs(1))
			.expect_err("Spawning a purge task without a runtime should fail.");

		assert!(matches!(err, ConfigError::PurgeWithoutRuntime));
	}

	#[tokio::test(start_paused = true)]
	async fn loop_exits_when_cache_is_dropped() {
		let index = shared_index();
		let task = PurgeTask::spawn(Arc::downgrade(&index), StdDuration::from_secs(5))
			.expect("Spawning a purge task inside a runtime should succeed.");

		drop(index);
		time::sleep(StdDuration::from_secs(6)).await;

		assert!(task.is_finished());
	}

	#[tokio::test(start_paused = true)]
	async fn stop_interrupts_the_pending_wait() {
		let index = shared_index();
		let task = PurgeTask::spawn(Arc::downgrade(&index), StdDuration::from_secs(3600))
			.expect("Spawning a purge task inside a runtime should succeed.");

		time::timeout(StdDuration::from_millis(10), task.stop())
			.await
			.expect("Stopped purge loop should exit without waiting for the interval.")
			.expect("Purge loop should not panic.");

		assert_eq!(index.lock().len(), 0);
	}
}
