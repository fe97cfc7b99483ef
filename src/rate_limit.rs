//! Sliding-window admission control for inbound requests.
//!
//! [`RateLimiter`] carries two independent policies that share one algorithm: a global window
//! ([`RateLimiter::admit`]) and one window per key such as a client address
//! ([`RateLimiter::admit_for_key`]). Each admission prunes timestamps older than the window,
//! rejects when the retained count reached the limit, and otherwise records `now`, all under
//! the lock of that one window. Per-key windows live behind their own locks, so unrelated
//! clients never contend; the key map has a separate lock that is only held to look a window
//! up.
//!
//! Per-key windows are created on first sighting and are never dropped automatically. Long
//! running services with many distinct keys should call [`RateLimiter::sweep_idle_keys`]
//! periodically.

mod window;

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	obs::{self, Component, GateSpan, Outcome},
	rate_limit::window::SlidingWindow,
};

/// Limit and window shared by every sequence of a [`RateLimiter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
	/// Maximum number of admissions retained per window.
	pub limit: u32,
	/// Trailing duration a timestamp stays counted.
	pub window: Duration,
}
impl RateLimitConfig {
	/// Validates and creates a configuration.
	pub fn new(limit: u32, window: Duration) -> Result<Self, ConfigError> {
		if limit == 0 {
			return Err(ConfigError::ZeroRateLimit);
		}
		if !window.is_positive() {
			return Err(ConfigError::NonPositiveWindow);
		}

		Ok(Self { limit, window })
	}

	fn limit_usize(&self) -> usize {
		usize::try_from(self.limit).unwrap_or(usize::MAX)
	}
}

/// Which sequence inbound requests are counted against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitScope {
	/// One window shared by every caller.
	#[default]
	Global,
	/// One window per client key.
	PerClient,
}

/// Result emitted by a [`RateLimiter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The request may proceed immediately.
	Allow,
	/// The request was rejected.
	Reject(RetryDirective),
}
impl RateLimitDecision {
	/// Returns `true` when the request was admitted.
	pub fn is_allow(&self) -> bool {
		matches!(self, Self::Allow)
	}

	/// Returns `true` when the request was rejected.
	pub fn is_reject(&self) -> bool {
		matches!(self, Self::Reject(_))
	}
}

/// Advises callers when to retry after a [`RateLimitDecision::Reject`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Instant after which the oldest retained admission leaves the window.
	pub earliest_retry_at: OffsetDateTime,
	/// Suggested backoff duration.
	pub recommended_backoff: Duration,
	/// Optional descriptive string.
	pub reason: Option<String>,
}
impl RetryDirective {
	/// Creates a new directive with the provided timing metadata.
	pub fn new(earliest_retry_at: OffsetDateTime, recommended_backoff: Duration) -> Self {
		Self { earliest_retry_at, recommended_backoff, reason: None }
	}

	/// Adds a human-readable reason.
	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());

		self
	}
}

type KeyedWindows = HashMap<String, Arc<Mutex<SlidingWindow>>>;

/// Global and per-key sliding-window rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
	config: RateLimitConfig,
	global: Mutex<SlidingWindow>,
	keyed: Mutex<KeyedWindows>,
}
impl RateLimiter {
	/// Creates a limiter with empty windows.
	pub fn new(config: RateLimitConfig) -> Self {
		Self { config, global: Default::default(), keyed: Default::default() }
	}

	/// Limit and window applied to every sequence.
	pub fn config(&self) -> RateLimitConfig {
		self.config
	}

	/// Evaluates the global window at the current time.
	pub fn admit(&self) -> RateLimitDecision {
		self.admit_at(OffsetDateTime::now_utc())
	}

	/// Evaluates the global window at `now`.
	pub fn admit_at(&self, now: OffsetDateTime) -> RateLimitDecision {
		let _span = GateSpan::new(Component::RateLimit, "admit").entered();
		let decision = self.global.lock().admit(&self.config, now);

		record(&decision, None);

		decision
	}

	/// Evaluates the window of `key` at the current time.
	pub fn admit_for_key(&self, key: &str) -> RateLimitDecision {
		self.admit_for_key_at(key, OffsetDateTime::now_utc())
	}

	/// Evaluates the window of `key` at `now`.
	pub fn admit_for_key_at(&self, key: &str, now: OffsetDateTime) -> RateLimitDecision {
		let _span = GateSpan::new(Component::RateLimit, "admit_for_key").with_key(key).entered();
		let window = self.window_for(key);
		let decision = window.lock().admit(&self.config, now);

		record(&decision, Some(key));

		decision
	}

	/// Number of keys that currently own a window.
	pub fn tracked_keys(&self) -> usize {
		self.keyed.lock().len()
	}

	/// Removes per-key windows that hold no admissions inside the window at `now`.
	///
	/// Windows another caller is evaluating right now are skipped. Returns how many keys were
	/// removed.
	pub fn sweep_idle_keys(&self, now: OffsetDateTime) -> usize {
		let mut keyed = self.keyed.lock();
		let before = keyed.len();

		keyed.retain(|_, window| {
			// Only the map holds an idle window; anyone else holding it may be mid-admission.
			if Arc::strong_count(window) > 1 {
				return true;
			}

			let mut window = window.lock();

			window.prune(self.config.window, now);

			!window.is_empty()
		});

		before - keyed.len()
	}

	fn window_for(&self, key: &str) -> Arc<Mutex<SlidingWindow>> {
		let mut keyed = self.keyed.lock();

		if let Some(window) = keyed.get(key) {
			return window.clone();
		}

		keyed.entry(key.to_owned()).or_default().clone()
	}
}

fn record(decision: &RateLimitDecision, key: Option<&str>) {
	match decision {
		RateLimitDecision::Allow => obs::record_outcome(Component::RateLimit, Outcome::Allow),
		RateLimitDecision::Reject(_) => {
			obs::record_outcome(Component::RateLimit, Outcome::Reject);
			obs::log_rate_limited(key);
		},
	}
}
