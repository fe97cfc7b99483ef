//! Environment-driven gateway settings.
//!
//! Variables use the upper-case field names, e.g. `BLOCKMATE_API_URL`, `JWT_URL`,
//! `PROJECT_TOKEN`, `RATE_LIMIT`, and `RATE_LIMIT_TIME_WINDOW` (seconds).

// crates.io
use config::{Config, Environment, Map};
// self
use crate::{
	_prelude::*,
	cache,
	error::ConfigError,
	rate_limit::{RateLimitConfig, RateLimitScope},
};

/// Settings needed to wire a [`RiskGateway`](crate::gateway::RiskGateway).
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
	/// Risk-details endpoint.
	pub blockmate_api_url: Url,
	/// Token-issuing endpoint.
	pub jwt_url: Url,
	/// API key presented to the token endpoint.
	pub project_token: String,
	/// Admissions allowed per window.
	pub rate_limit: u32,
	/// Window length in seconds.
	pub rate_limit_time_window: u64,
	/// Whether the limit applies globally or per client.
	#[serde(default)]
	pub rate_limit_scope: RateLimitScope,
	/// Entries kept by the response cache.
	#[serde(default = "default_cache_capacity")]
	pub cache_capacity: usize,
	/// Seconds between full cache purges; `0` disables purging.
	#[serde(default = "default_cache_purge_interval")]
	pub cache_purge_interval: u64,
	/// Chain label sent with every lookup.
	#[serde(default = "default_chain")]
	pub chain: String,
}
impl GatewayConfig {
	/// Loads settings from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::load(Environment::default())
	}

	/// Loads settings from an explicit variable map instead of the process environment.
	pub fn from_env_map<I, K, V>(vars: I) -> Result<Self, ConfigError>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let vars = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect::<Map<_, _>>();

		Self::load(Environment::default().source(Some(vars)))
	}

	/// Validated rate-limit settings.
	pub fn rate_limit_config(&self) -> Result<RateLimitConfig, ConfigError> {
		let window_secs =
			i64::try_from(self.rate_limit_time_window).map_err(|_| ConfigError::NonPositiveWindow)?;

		RateLimitConfig::new(self.rate_limit, Duration::seconds(window_secs))
	}

	/// Purge interval for the response cache, if purging is enabled.
	pub fn cache_purge_interval(&self) -> Option<StdDuration> {
		(self.cache_purge_interval > 0).then(|| StdDuration::from_secs(self.cache_purge_interval))
	}

	fn load(source: Environment) -> Result<Self, ConfigError> {
		// Values stay strings; numeric fields are converted during deserialization.
		let config = Config::builder().add_source(source).build()?;

		Ok(config.try_deserialize()?)
	}
}
impl Debug for GatewayConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GatewayConfig")
			.field("blockmate_api_url", &self.blockmate_api_url.as_str())
			.field("jwt_url", &self.jwt_url.as_str())
			.field("project_token_set", &!self.project_token.is_empty())
			.field("rate_limit", &self.rate_limit)
			.field("rate_limit_time_window", &self.rate_limit_time_window)
			.field("rate_limit_scope", &self.rate_limit_scope)
			.field("cache_capacity", &self.cache_capacity)
			.field("cache_purge_interval", &self.cache_purge_interval)
			.field("chain", &self.chain)
			.finish()
	}
}

fn default_cache_capacity() -> usize {
	cache::DEFAULT_CAPACITY
}

fn default_cache_purge_interval() -> u64 {
	cache::DEFAULT_PURGE_INTERVAL.as_secs()
}

fn default_chain() -> String {
	"eth".into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const REQUIRED: [(&str, &str); 5] = [
		("BLOCKMATE_API_URL", "https://api.blockmate.io/v1/risk/score/details"),
		("JWT_URL", "https://auth.blockmate.io/v1/auth"),
		("PROJECT_TOKEN", "project-secret"),
		("RATE_LIMIT", "5"),
		("RATE_LIMIT_TIME_WINDOW", "10"),
	];

	#[test]
	fn required_variables_load_with_defaults() {
		let config =
			GatewayConfig::from_env_map(REQUIRED).expect("Required variables should load.");

		assert_eq!(config.jwt_url.as_str(), "https://auth.blockmate.io/v1/auth");
		assert_eq!(config.project_token, "project-secret");
		assert_eq!(config.rate_limit_scope, RateLimitScope::Global);
		assert_eq!(config.cache_capacity, 100);
		assert_eq!(config.cache_purge_interval(), Some(StdDuration::from_secs(60)));
		assert_eq!(config.chain, "eth");

		let limits = config.rate_limit_config().expect("Loaded limits should be valid.");

		assert_eq!(limits.limit, 5);
		assert_eq!(limits.window, Duration::seconds(10));
	}

	#[test]
	fn optional_variables_override_defaults() {
		let vars = REQUIRED.into_iter().chain([
			("RATE_LIMIT_SCOPE", "per_client"),
			("CACHE_CAPACITY", "8"),
			("CACHE_PURGE_INTERVAL", "0"),
		]);
		let config = GatewayConfig::from_env_map(vars).expect("Optional variables should load.");

		assert_eq!(config.rate_limit_scope, RateLimitScope::PerClient);
		assert_eq!(config.cache_capacity, 8);
		assert_eq!(config.cache_purge_interval(), None);
	}

	#[test]
	fn missing_variables_fail_to_load() {
		let err = GatewayConfig::from_env_map(REQUIRED.into_iter().skip(1))
			.expect_err("Missing endpoint should be rejected.");

		assert!(matches!(err, ConfigError::Load(_)));
	}

	#[test]
	fn zero_limit_is_rejected_when_building_limits() {
		let vars = REQUIRED.into_iter().map(|(k, v)| (k, if k == "RATE_LIMIT" { "0" } else { v }));
		let config = GatewayConfig::from_env_map(vars).expect("Zero limit should still load.");

		assert!(matches!(config.rate_limit_config(), Err(ConfigError::ZeroRateLimit)));
	}

	#[test]
	fn digit_only_values_keep_their_text() {
		let vars = REQUIRED.into_iter().map(|(k, v)| match k {
			"PROJECT_TOKEN" => (k, "007"),
			_ => (k, v),
		});
		let config = GatewayConfig::from_env_map(vars.chain([("CHAIN", "0042")]))
			.expect("Digit-only strings should load.");

		assert_eq!(config.project_token, "007");
		assert_eq!(config.chain, "0042");
		assert_eq!(config.rate_limit, 5);
		assert_eq!(config.rate_limit_time_window, 10);
	}

	#[test]
	fn debug_redacts_project_token() {
		let config =
			GatewayConfig::from_env_map(REQUIRED).expect("Required variables should load.");

		assert!(!format!("{config:?}").contains("project-secret"));
	}
}
