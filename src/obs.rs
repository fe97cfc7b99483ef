//! Optional observability helpers for the gate components.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `risk_gate.op` with the `component` and
//!   `stage` (call site) fields, plus the events the gate logs along the request path.
//! - Enable `metrics` to increment the `risk_gate_outcome_total` counter for every recorded
//!   outcome, labeled by `component` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Gate components observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Component {
	/// Response cache.
	Cache,
	/// Bearer token lifecycle manager.
	Token,
	/// Sliding-window rate limiter.
	RateLimit,
	/// Composed lookup flow.
	Gateway,
}
impl Component {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Component::Cache => "cache",
			Component::Token => "token",
			Component::RateLimit => "rate_limit",
			Component::Gateway => "gateway",
		}
	}
}
impl Display for Component {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded by the components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Cache lookup found the key.
	Hit,
	/// Cache lookup missed.
	Miss,
	/// Cache dropped its least-recently-used entry.
	Evict,
	/// Cache was cleared by the purge schedule.
	Purge,
	/// Token was fetched from upstream.
	Fetch,
	/// Held token was reused.
	Reuse,
	/// Request was admitted.
	Allow,
	/// Request was rejected.
	Reject,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Hit => "hit",
			Outcome::Miss => "miss",
			Outcome::Evict => "evict",
			Outcome::Purge => "purge",
			Outcome::Fetch => "fetch",
			Outcome::Reuse => "reuse",
			Outcome::Allow => "allow",
			Outcome::Reject => "reject",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
