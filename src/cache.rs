//! Capacity-bounded recency cache for upstream lookup results.
//!
//! [`ResponseCache`] keeps at most `capacity` entries and evicts the least-recently-used key on
//! overflow; reads and writes both refresh recency. An optional purge schedule clears the
//! whole cache every interval on a background Tokio task. One exclusive section guards every
//! operation, including the purge body, and it is never held across an `.await`.
//!
//! [`ResponseCache::get_instance`] and [`ResponseCache::destroy_instance`] manage the single
//! process-wide instance used by request handlers.

mod lru;
mod purge;
mod singleton;

// std
use std::num::NonZeroUsize;
// self
use crate::{
	_prelude::*,
	cache::{lru::LruIndex, purge::PurgeTask},
	error::ConfigError,
	obs::{self, Component, Outcome},
};

/// Default number of entries kept by the process-wide cache.
pub const DEFAULT_CAPACITY: usize = 100;
/// Default interval between full purges of the process-wide cache.
pub const DEFAULT_PURGE_INTERVAL: StdDuration = StdDuration::from_secs(60);

/// Least-recently-used cache with an optional periodic full purge.
pub struct ResponseCache<V> {
	entries: Arc<Mutex<LruIndex<V>>>,
	purge_interval: Option<StdDuration>,
	purge: Mutex<Option<PurgeTask>>,
}
impl<V> ResponseCache<V>
where
	V: 'static + Clone + Send,
{
	/// Creates a cache holding at most `capacity` entries.
	///
	/// When `purge_interval` is set, a background task clears the cache on that interval until
	/// [`stop_purge`](Self::stop_purge) is called or the cache is dropped. Scheduling a purge
	/// requires a running Tokio runtime.
	pub fn new(capacity: usize, purge_interval: Option<StdDuration>) -> Result<Self> {
		let capacity = NonZeroUsize::new(capacity).ok_or(ConfigError::ZeroCapacity)?;

		if purge_interval.is_some_and(|interval| interval.is_zero()) {
			return Err(ConfigError::ZeroPurgeInterval.into());
		}

		let entries = Arc::new(Mutex::new(LruIndex::new(capacity)));
		let purge = purge_interval
			.map(|interval| PurgeTask::spawn(Arc::downgrade(&entries), interval))
			.transpose()?;

		obs::log_cache_created(capacity.get(), purge_interval);

		Ok(Self { entries, purge_interval, purge: Mutex::new(purge) })
	}

	/// Returns a clone of the cached value and marks `key` most-recently-used.
	pub fn get(&self, key: &str) -> Option<V> {
		let value = self.entries.lock().get(key).cloned();

		match &value {
			Some(_) => {
				obs::record_outcome(Component::Cache, Outcome::Hit);
				obs::log_cache_hit(key);
			},
			None => obs::record_outcome(Component::Cache, Outcome::Miss),
		}

		value
	}

	/// Inserts or overwrites `key` and marks it most-recently-used.
	///
	/// Returns the key evicted to stay within capacity, if any.
	pub fn set(&self, key: impl Into<String>, value: V) -> Option<String> {
		let evicted = self.entries.lock().insert(key.into(), value);

		if let Some(key) = &evicted {
			obs::record_outcome(Component::Cache, Outcome::Evict);
			obs::log_cache_evicted(key);
		}

		evicted
	}
}
impl<V> ResponseCache<V> {
	/// Removes every entry; the purge schedule keeps running.
	pub fn clear(&self) {
		self.entries.lock().clear();
	}

	/// Halts the periodic purge. Safe to call repeatedly or when no purge was scheduled.
	pub fn stop_purge(&self) {
		if let Some(task) = self.purge.lock().take() {
			// The loop observes the stop on its own; nothing needs to wait for it here.
			drop(task.stop());
		}
	}

	/// Reports whether the periodic purge is still scheduled.
	pub fn is_purging(&self) -> bool {
		self.purge.lock().is_some()
	}

	/// Checks membership without touching recency.
	pub fn contains(&self, key: &str) -> bool {
		self.entries.lock().contains(key)
	}

	/// Number of cached entries.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Returns `true` when nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Maximum number of cached entries.
	pub fn capacity(&self) -> usize {
		self.entries.lock().capacity()
	}

	/// Interval between full purges, if one was configured.
	pub fn purge_interval(&self) -> Option<StdDuration> {
		self.purge_interval
	}

	/// Keys ordered from least- to most-recently-used.
	pub fn keys_by_recency(&self) -> Vec<String> {
		self.entries.lock().keys_by_recency().map(str::to_owned).collect()
	}
}
impl<V> Debug for ResponseCache<V> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResponseCache")
			.field("capacity", &self.capacity())
			.field("len", &self.len())
			.field("purge_interval", &self.purge_interval)
			.field("purging", &self.is_purging())
			.finish()
	}
}
impl<V> Drop for ResponseCache<V> {
	fn drop(&mut self) {
		self.stop_purge();
	}
}
