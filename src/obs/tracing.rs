// self
use crate::{_prelude::*, obs::Component};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by the gate components.
#[derive(Clone, Debug)]
pub struct GateSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl GateSpan {
	/// Creates a new span tagged with the provided component + stage.
	pub fn new(component: Component, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"risk_gate.op",
				component = component.as_str(),
				stage,
				key = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (component, stage);

			Self {}
		}
	}

	/// Records the address or client key the operation acts on.
	pub fn with_key(self, key: &str) -> Self {
		#[cfg(feature = "tracing")]
		self.span.record("key", key);
		#[cfg(not(feature = "tracing"))]
		let _ = key;

		self
	}

	/// Reports whether the span will be exported to a subscriber.
	pub fn is_recording(&self) -> bool {
		#[cfg(feature = "tracing")]
		{
			!self.span.is_disabled()
		}
		#[cfg(not(feature = "tracing"))]
		{
			false
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> GateSpanGuard {
		#[cfg(feature = "tracing")]
		{
			GateSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			GateSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`GateSpan::entered`].
pub struct GateSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for GateSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("GateSpanGuard(..)")
	}
}

pub(crate) fn log_cache_created(capacity: usize, purge_interval: Option<StdDuration>) {
	#[cfg(feature = "tracing")]
	tracing::info!(capacity, purge_interval = ?purge_interval, "created new cache instance");
	#[cfg(not(feature = "tracing"))]
	let _ = (capacity, purge_interval);
}

pub(crate) fn log_cache_hit(key: &str) {
	#[cfg(feature = "tracing")]
	tracing::info!(key, "cache hit");
	#[cfg(not(feature = "tracing"))]
	let _ = key;
}

pub(crate) fn log_cache_evicted(key: &str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(key, "evicted least-recently-used entry");
	#[cfg(not(feature = "tracing"))]
	let _ = key;
}

pub(crate) fn log_cache_purged(removed: usize) {
	#[cfg(feature = "tracing")]
	tracing::info!(removed, "cache purged");
	#[cfg(not(feature = "tracing"))]
	let _ = removed;
}

pub(crate) fn log_token_fetched(refreshed: bool, expires_at: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	{
		let action = if refreshed { "refreshed" } else { "fetched" };

		tracing::info!(%expires_at, action, "bearer token acquired");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (refreshed, expires_at);
	}
}

pub(crate) fn log_rate_limited(key: Option<&str>) {
	#[cfg(feature = "tracing")]
	tracing::warn!(key, "rate limit exceeded");
	#[cfg(not(feature = "tracing"))]
	let _ = key;
}

pub(crate) fn log_upstream_failure(err: &Error) {
	#[cfg(feature = "tracing")]
	tracing::error!(error = %err, status = err.http_status(), "upstream lookup failed");
	#[cfg(not(feature = "tracing"))]
	let _ = err;
}

pub(crate) fn log_check_completed(address: &str, cached: bool, elapsed: StdDuration) {
	#[cfg(feature = "tracing")]
	tracing::info!(
		address,
		cached,
		elapsed_ms = elapsed.as_secs_f64() * 1_000.,
		"check completed"
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (address, cached, elapsed);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn gate_span_noop_without_tracing() {
		let _guard = GateSpan::new(Component::Cache, "test").entered();
		// Compile-time smoke test ensures the guard exists even when tracing is disabled.
	}

	#[test]
	fn keyed_span_is_inert_without_a_subscriber() {
		let span = GateSpan::new(Component::RateLimit, "admit_for_key").with_key("0xabc");

		assert!(!span.is_recording());

		let _guard = span.entered();
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = GateSpan::new(Component::Token, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
