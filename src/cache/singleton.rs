//! Process-wide [`ResponseCache`] slot shared by request handlers.

// self
use crate::{_prelude::*, cache::ResponseCache, risk::CheckResponse};

static INSTANCE: Mutex<Option<Arc<ResponseCache<CheckResponse>>>> = parking_lot::const_mutex(None);

impl ResponseCache<CheckResponse> {
	/// Returns the process-wide cache, constructing it on the first call.
	///
	/// Construction happens under the slot's lock, so racing first callers share one instance.
	/// While that instance is alive, the parameters of later calls are ignored.
	pub fn get_instance(capacity: usize, purge_interval: Option<StdDuration>) -> Result<Arc<Self>> {
		let mut slot = INSTANCE.lock();

		if let Some(instance) = slot.as_ref() {
			return Ok(instance.clone());
		}

		let instance = Arc::new(Self::new(capacity, purge_interval)?);

		*slot = Some(instance.clone());

		Ok(instance)
	}

	/// Clears the process-wide slot after stopping the instance's purge schedule.
	///
	/// Handles obtained earlier stay usable but no longer purge; the next
	/// [`get_instance`](Self::get_instance) call builds a fresh cache.
	pub fn destroy_instance() {
		let mut slot = INSTANCE.lock();

		if let Some(instance) = slot.take() {
			instance.stop_purge();
		}
	}
}
