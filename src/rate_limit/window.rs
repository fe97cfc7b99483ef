// std
use std::collections::VecDeque;
// self
use crate::{
	_prelude::*,
	rate_limit::{RateLimitConfig, RateLimitDecision, RetryDirective},
};

/// Admission timestamps retained for one sliding window.
#[derive(Debug, Default)]
pub(crate) struct SlidingWindow {
	admitted: VecDeque<OffsetDateTime>,
}
impl SlidingWindow {
	/// Prunes, checks, and records in one step; callers hold the window's lock throughout.
	pub(crate) fn admit(
		&mut self,
		config: &RateLimitConfig,
		now: OffsetDateTime,
	) -> RateLimitDecision {
		self.prune(config.window, now);

		if self.admitted.len() >= config.limit_usize() {
			return RateLimitDecision::Reject(self.retry_directive(config.window, now));
		}

		self.admitted.push_back(now);

		RateLimitDecision::Allow
	}

	/// Drops every timestamp older than `window` relative to `now`; the boundary is retained.
	pub(crate) fn prune(&mut self, window: Duration, now: OffsetDateTime) {
		self.admitted.retain(|admitted| now - *admitted <= window);
	}

	#[cfg(test)]
	pub(crate) fn len(&self) -> usize {
		self.admitted.len()
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.admitted.is_empty()
	}

	fn retry_directive(&self, window: Duration, now: OffsetDateTime) -> RetryDirective {
		let earliest_retry_at = self.admitted.iter().min().map_or(now, |oldest| *oldest + window);
		let backoff = earliest_retry_at - now;
		let backoff = if backoff.is_negative() { Duration::ZERO } else { backoff };

		RetryDirective::new(earliest_retry_at, backoff).with_reason("Rate limit exceeded")
	}
}
