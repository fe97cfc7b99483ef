// std
use std::{sync::Arc, time::Duration};
// self
use risk_gate::{
	cache::ResponseCache,
	error::{ConfigError, Error},
	risk::CheckResponse,
};

type SharedCache = ResponseCache<CheckResponse>;

fn response(name: &str) -> CheckResponse {
	CheckResponse { category_names: vec![name.into()] }
}

// The process-wide slot is shared by every test in this binary, so the lifecycle is exercised
// by one test in sequence.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn singleton_lifecycle() {
	let tasks = (0..8)
		.map(|_| {
			tokio::spawn(async {
				SharedCache::get_instance(4, Some(Duration::from_secs(60)))
					.expect("Racing first callers should construct or share the cache.")
			})
		})
		.collect::<Vec<_>>();
	let mut instances = Vec::new();

	for task in tasks {
		instances.push(task.await.expect("Instance task should not panic."));
	}

	let first = instances[0].clone();

	assert!(instances.iter().all(|instance| Arc::ptr_eq(instance, &first)));
	assert!(first.is_purging());

	let later = SharedCache::get_instance(999, None).expect("Existing instance should be reused.");

	assert!(Arc::ptr_eq(&later, &first));
	assert_eq!(later.capacity(), 4);

	first.set("0xabc", response("Exchange"));

	SharedCache::destroy_instance();

	assert!(!first.is_purging());
	assert_eq!(first.get("0xabc"), Some(response("Exchange")));

	let fresh = SharedCache::get_instance(2, None).expect("Destroyed slot should be rebuilt.");

	assert!(!Arc::ptr_eq(&fresh, &first));
	assert!(fresh.is_empty());
	assert_eq!(fresh.capacity(), 2);

	SharedCache::destroy_instance();
	SharedCache::destroy_instance();

	let err = SharedCache::get_instance(0, None).expect_err("Zero capacity should be rejected.");

	assert!(matches!(err, Error::Config(ConfigError::ZeroCapacity)));
}
