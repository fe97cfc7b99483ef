//! Request flow composing the rate limiter, response cache, token manager, and risk lookup.
//!
//! [`RiskGateway::check`] evaluates admission first, serves cached results when present, and
//! otherwise obtains a bearer token, queries the upstream, deduplicates categories, and caches
//! the result. Locks of the limiter and cache are never held across the upstream calls.

// std
use std::time::Instant;
// self
use crate::{
	_prelude::*,
	cache::ResponseCache,
	error::ErrorBody,
	obs::{self, Component, GateSpan, Outcome},
	rate_limit::{RateLimitDecision, RateLimitScope, RateLimiter, RetryDirective},
	risk::{CheckResponse, RiskLookup},
	token::{TokenFetcher, TokenManager},
};
#[cfg(feature = "reqwest")]
use crate::{
	http::{ReqwestRiskLookup, ReqwestTokenFetcher},
	settings::GatewayConfig,
};

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's reqwest collaborators.
pub type ReqwestGateway = RiskGateway<ReqwestTokenFetcher, ReqwestRiskLookup>;

/// Message returned to rate-limited callers.
pub const RATE_LIMIT_DETAIL: &str = "Rate limit exceeded";

/// Result of a successful pass through [`RiskGateway::check`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
	/// Computed from a fresh upstream lookup.
	Fresh(CheckResponse),
	/// Served from the response cache.
	Cached(CheckResponse),
	/// Rejected by the rate limiter.
	RateLimited(RetryDirective),
}
impl CheckOutcome {
	/// HTTP status the surrounding route should answer with.
	pub fn http_status(&self) -> u16 {
		match self {
			Self::Fresh(_) | Self::Cached(_) => 200,
			Self::RateLimited(_) => 429,
		}
	}

	/// Result payload, unless the request was rejected.
	pub fn response(&self) -> Option<&CheckResponse> {
		match self {
			Self::Fresh(response) | Self::Cached(response) => Some(response),
			Self::RateLimited(_) => None,
		}
	}

	/// JSON body the surrounding route should answer with.
	pub fn to_json(&self) -> serde_json::Value {
		match self {
			Self::Fresh(response) | Self::Cached(response) =>
				serde_json::json!({ "category_names": response.category_names }),
			Self::RateLimited(_) => serde_json::json!(ErrorBody::new(RATE_LIMIT_DETAIL)),
		}
	}
}

/// Front door for risk lookups.
pub struct RiskGateway<F, L>
where
	F: ?Sized + TokenFetcher,
	L: ?Sized + RiskLookup,
{
	limiter: Arc<RateLimiter>,
	scope: RateLimitScope,
	cache: Arc<ResponseCache<CheckResponse>>,
	tokens: Arc<TokenManager<F>>,
	lookup: Arc<L>,
}
impl<F, L> RiskGateway<F, L>
where
	F: ?Sized + TokenFetcher,
	L: ?Sized + RiskLookup,
{
	/// Assembles a gateway that rate-limits globally.
	pub fn new(
		limiter: impl Into<Arc<RateLimiter>>,
		cache: Arc<ResponseCache<CheckResponse>>,
		tokens: impl Into<Arc<TokenManager<F>>>,
		lookup: impl Into<Arc<L>>,
	) -> Self {
		Self {
			limiter: limiter.into(),
			scope: RateLimitScope::Global,
			cache,
			tokens: tokens.into(),
			lookup: lookup.into(),
		}
	}

	/// Selects which rate-limit sequence requests are counted against.
	pub fn with_scope(mut self, scope: RateLimitScope) -> Self {
		self.scope = scope;

		self
	}

	/// Shared rate limiter.
	pub fn limiter(&self) -> &RateLimiter {
		&self.limiter
	}

	/// Shared response cache.
	pub fn cache(&self) -> &Arc<ResponseCache<CheckResponse>> {
		&self.cache
	}

	/// Shared token manager.
	pub fn tokens(&self) -> &TokenManager<F> {
		&self.tokens
	}

	/// Runs the check flow for `address` on behalf of `client`.
	///
	/// Rate-limit rejections are reported as [`CheckOutcome::RateLimited`]; token and upstream
	/// failures are returned as errors without retrying.
	pub async fn check(&self, client: &str, address: &str) -> Result<CheckOutcome> {
		let started = Instant::now();
		let decision = match self.scope {
			RateLimitScope::Global => self.limiter.admit(),
			RateLimitScope::PerClient => self.limiter.admit_for_key(client),
		};

		if let RateLimitDecision::Reject(directive) = decision {
			return Ok(CheckOutcome::RateLimited(directive));
		}

		let span = GateSpan::new(Component::Gateway, "check").with_key(address);
		let result = span
			.instrument(async move {
				if let Some(hit) = self.cache.get(address) {
					return Ok(CheckOutcome::Cached(hit));
				}

				let token = self.tokens.get_token().await?;
				let details = self.lookup.fetch(address, &token).await?;
				let response = CheckResponse::from(&details);

				self.cache.set(address, response.clone());

				Ok(CheckOutcome::Fresh(response))
			})
			.await;

		match &result {
			Ok(outcome) => {
				obs::record_outcome(Component::Gateway, Outcome::Success);
				obs::log_check_completed(
					address,
					matches!(outcome, CheckOutcome::Cached(_)),
					started.elapsed(),
				);
			},
			Err(err) => {
				obs::record_outcome(Component::Gateway, Outcome::Failure);
				obs::log_upstream_failure(err);
			},
		}

		result
	}

	/// Stops the cache's purge schedule; call once while shutting down.
	pub fn shutdown(&self) {
		self.cache.stop_purge();
	}
}
#[cfg(feature = "reqwest")]
impl RiskGateway<ReqwestTokenFetcher, ReqwestRiskLookup> {
	/// Wires the process-wide cache and reqwest collaborators from loaded settings.
	///
	/// Must run inside a Tokio runtime when the cache purge is enabled.
	pub fn from_config(config: &GatewayConfig) -> Result<Self> {
		Self::from_config_with_client(config, ReqwestClient::default())
	}

	/// Same as [`from_config`](Self::from_config) with a caller-provided reqwest client.
	pub fn from_config_with_client(config: &GatewayConfig, client: ReqwestClient) -> Result<Self> {
		let limits = config.rate_limit_config()?;
		let lookup = ReqwestRiskLookup::with_client(
			client.clone(),
			config.blockmate_api_url.clone(),
			config.chain.clone(),
		)?;
		let fetcher = ReqwestTokenFetcher::with_client(
			client,
			config.jwt_url.clone(),
			config.project_token.clone(),
		);
		let cache =
			ResponseCache::get_instance(config.cache_capacity, config.cache_purge_interval())?;

		Ok(Self::new(RateLimiter::new(limits), cache, TokenManager::new(fetcher), lookup)
			.with_scope(config.rate_limit_scope))
	}
}
impl<F, L> Debug for RiskGateway<F, L>
where
	F: ?Sized + TokenFetcher,
	L: ?Sized + RiskLookup,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RiskGateway")
			.field("scope", &self.scope)
			.field("limiter", &self.limiter.config())
			.field("cache", &self.cache)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, rate_limit::RateLimitConfig};

	type TestGateway = RiskGateway<ScriptedFetcher, CountingLookup>;

	fn gateway(
		limit: u32,
		fetcher: &Arc<ScriptedFetcher>,
		lookup: &Arc<CountingLookup>,
	) -> TestGateway {
		let limits = RateLimitConfig::new(limit, Duration::seconds(10))
			.expect("Rate limit fixture should be valid.");
		let cache =
			Arc::new(ResponseCache::new(2, None).expect("Cache fixture should be valid."));

		RiskGateway::new(
			RateLimiter::new(limits),
			cache,
			TokenManager::new(fetcher.clone()),
			lookup.clone(),
		)
	}

	#[tokio::test]
	async fn fresh_results_are_deduplicated_and_cached() {
		let token = unsigned_token(OffsetDateTime::now_utc() + Duration::hours(1));
		let fetcher = Arc::new(ScriptedFetcher::new([token]));
		let lookup = Arc::new(
			CountingLookup::default()
				.with_answer(sample_details("0xabc", "Exchange", &["Exchange", "Gambling"])),
		);
		let gateway = gateway(10, &fetcher, &lookup);
		let fresh = gateway.check("client", "0xabc").await.expect("First check should succeed.");
		let cached = gateway.check("client", "0xabc").await.expect("Second check should hit.");

		assert_eq!(
			fresh,
			CheckOutcome::Fresh(CheckResponse {
				category_names: vec!["Exchange".into(), "Gambling".into()],
			})
		);
		assert_eq!(cached.response(), fresh.response());
		assert!(matches!(cached, CheckOutcome::Cached(_)));
		assert_eq!(fetcher.calls(), 1);
		assert_eq!(lookup.calls(), 1);
	}

	#[tokio::test]
	async fn cache_hits_still_count_against_the_limit() {
		let token = unsigned_token(OffsetDateTime::now_utc() + Duration::hours(1));
		let fetcher = Arc::new(ScriptedFetcher::new([token]));
		let lookup =
			Arc::new(CountingLookup::default().with_answer(sample_details("0xabc", "None", &[])));
		let gateway = gateway(2, &fetcher, &lookup);

		gateway.check("client", "0xabc").await.expect("First check should succeed.");
		gateway.check("client", "0xabc").await.expect("Cached check should succeed.");

		let limited = gateway.check("client", "0xabc").await.expect("Rejection is not an error.");

		assert_eq!(limited.http_status(), 429);
		assert_eq!(lookup.calls(), 1);
	}

	#[tokio::test]
	async fn token_failures_skip_the_lookup() {
		let fetcher = Arc::new(ScriptedFetcher::new(Vec::<String>::new()));
		let lookup = Arc::new(CountingLookup::default());
		let gateway = gateway(10, &fetcher, &lookup);
		let err = gateway.check("client", "0xabc").await.expect_err("Token fetch should fail.");

		assert_eq!(err.http_status(), 502);
		assert_eq!(lookup.calls(), 0);
		assert!(gateway.cache().is_empty());
	}

	#[tokio::test]
	async fn shutdown_stops_the_purge_schedule() {
		let cache = Arc::new(
			ResponseCache::new(2, Some(StdDuration::from_secs(60)))
				.expect("Purging cache fixture should be valid."),
		);
		let limits = RateLimitConfig::new(1, Duration::seconds(1))
			.expect("Rate limit fixture should be valid.");
		let gateway = TestGateway::new(
			RateLimiter::new(limits),
			cache.clone(),
			TokenManager::new(ScriptedFetcher::default()),
			CountingLookup::default(),
		);

		assert!(cache.is_purging());

		gateway.shutdown();

		assert!(!cache.is_purging());
	}

	#[test]
	fn outcome_statuses_and_bodies() {
		let response = CheckResponse { category_names: vec!["Exchange".into()] };
		let fresh = CheckOutcome::Fresh(response.clone());
		let limited = CheckOutcome::RateLimited(RetryDirective::new(
			OffsetDateTime::UNIX_EPOCH,
			Duration::ZERO,
		));

		assert_eq!(fresh.http_status(), 200);
		assert_eq!(fresh.response(), Some(&response));
		assert_eq!(fresh.to_json(), serde_json::json!({ "category_names": ["Exchange"] }));
		assert_eq!(limited.http_status(), 429);
		assert_eq!(limited.response(), None);
		assert_eq!(limited.to_json(), serde_json::json!({ "detail": "Rate limit exceeded" }));
	}
}
