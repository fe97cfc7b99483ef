//! Recency-ordered key index backing [`ResponseCache`](crate::cache::ResponseCache).

// std
use std::num::NonZeroUsize;
// self
use crate::_prelude::*;

/// Capacity-bounded map that evicts the least-recently-touched key on overflow.
///
/// Every read or write stamps the key with a monotonically increasing tick; `order` maps ticks
/// back to keys so the oldest entry is always the first one in the tree.
#[derive(Debug)]
pub(crate) struct LruIndex<V> {
	capacity: NonZeroUsize,
	tick: u64,
	entries: HashMap<String, Slot<V>>,
	order: BTreeMap<u64, String>,
}
impl<V> LruIndex<V> {
	pub(crate) fn new(capacity: NonZeroUsize) -> Self {
		Self { capacity, tick: 0, entries: HashMap::new(), order: BTreeMap::new() }
	}

	pub(crate) fn capacity(&self) -> usize {
		self.capacity.get()
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}

	pub(crate) fn contains(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	/// Returns the value and marks the key most-recently-used.
	pub(crate) fn get(&mut self, key: &str) -> Option<&V> {
		let tick = self.next_tick();
		let slot = self.entries.get_mut(key)?;

		self.order.remove(&slot.touched);
		self.order.insert(tick, key.to_owned());
		slot.touched = tick;

		Some(&slot.value)
	}

	/// Inserts or overwrites `key`, returning the evicted key when capacity overflowed.
	pub(crate) fn insert(&mut self, key: String, value: V) -> Option<String> {
		let tick = self.next_tick();

		if let Some(slot) = self.entries.get_mut(&key) {
			self.order.remove(&slot.touched);
			self.order.insert(tick, key);
			slot.touched = tick;
			slot.value = value;

			return None;
		}

		self.order.insert(tick, key.clone());
		self.entries.insert(key, Slot { value, touched: tick });

		// A fresh insertion overflows by at most one entry.
		if self.entries.len() > self.capacity.get() {
			let (_, oldest) = self.order.pop_first()?;

			self.entries.remove(&oldest);

			return Some(oldest);
		}

		None
	}

	/// Drops every entry and returns how many were removed.
	pub(crate) fn clear(&mut self) -> usize {
		let removed = self.entries.len();

		self.entries.clear();
		self.order.clear();

		removed
	}

	/// Keys from least- to most-recently-used.
	pub(crate) fn keys_by_recency(&self) -> impl Iterator<Item = &str> {
		self.order.values().map(String::as_str)
	}

	fn next_tick(&mut self) -> u64 {
		self.tick += 1;

		self.tick
	}
}

#[derive(Debug)]
struct Slot<V> {
	value: V,
	touched: u64,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn index(capacity: usize) -> LruIndex<u32> {
		LruIndex::new(NonZeroUsize::new(capacity).expect("Test capacity should be non-zero."))
	}

	#[test]
	fn overflow_evicts_exactly_the_oldest_key() {
		let mut lru = index(2);

		assert_eq!(lru.insert("a".into(), 1), None);
		assert_eq!(lru.insert("b".into(), 2), None);
		assert_eq!(lru.insert("c".into(), 3), Some("a".into()));
		assert_eq!(lru.len(), 2);
		assert!(!lru.contains("a"));
		assert_eq!(lru.keys_by_recency().collect::<Vec<_>>(), ["b", "c"]);
	}

	#[test]
	fn reads_and_overwrites_refresh_recency() {
		let mut lru = index(3);

		lru.insert("a".into(), 1);
		lru.insert("b".into(), 2);
		lru.insert("c".into(), 3);

		assert_eq!(lru.get("a"), Some(&1));
		assert_eq!(lru.insert("b".into(), 20), None);
		assert_eq!(lru.keys_by_recency().collect::<Vec<_>>(), ["c", "a", "b"]);
		assert_eq!(lru.insert("d".into(), 4), Some("c".into()));
		assert_eq!(lru.get("b"), Some(&20));
	}

	#[test]
	fn miss_leaves_order_untouched() {
		let mut lru = index(2);

		lru.insert("a".into(), 1);
		lru.insert("b".into(), 2);

		assert_eq!(lru.get("zzz"), None);
		assert_eq!(lru.keys_by_recency().collect::<Vec<_>>(), ["a", "b"]);
	}

	#[test]
	fn clear_reports_removed_count() {
		let mut lru = index(4);

		lru.insert("a".into(), 1);
		lru.insert("b".into(), 2);

		assert_eq!(lru.clear(), 2);
		assert_eq!(lru.len(), 0);
		assert_eq!(lru.keys_by_recency().count(), 0);
	}
}
