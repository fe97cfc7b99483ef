//! Gate-level error types shared across the cache, token, and upstream layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Cache misses and rate-limit rejections are ordinary return values and never show up here.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Bearer token could not be decoded.
	#[error(transparent)]
	Token(#[from] TokenError),
	/// Upstream service answered, but not successfully.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl Error {
	/// HTTP status the surrounding route should answer with for this failure.
	pub fn http_status(&self) -> u16 {
		match self {
			Self::Upstream(_) => 502,
			Self::Config(_) | Self::Token(_) | Self::Transport(_) => 500,
		}
	}

	/// Builds the JSON body the surrounding route should answer with.
	pub fn to_body(&self) -> ErrorBody {
		ErrorBody::new(self.to_string())
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Environment-driven settings could not be loaded.
	#[error("Gateway configuration could not be loaded.")]
	Load(#[from] config::ConfigError),
	/// Cache capacity must be positive.
	#[error("Cache capacity must be at least 1.")]
	ZeroCapacity,
	/// Purge interval must be positive when present.
	#[error("Cache purge interval must be positive.")]
	ZeroPurgeInterval,
	/// A purge schedule was requested outside of an async runtime.
	#[error("Cache purge schedule requires a running Tokio runtime.")]
	PurgeWithoutRuntime,
	/// Rate limit must admit at least one request.
	#[error("Rate limit must be at least 1.")]
	ZeroRateLimit,
	/// Rate-limit window must be positive.
	#[error("Rate-limit window must be positive.")]
	NonPositiveWindow,
	/// Upstream endpoint URL cannot carry query parameters.
	#[error("Endpoint `{url}` cannot be used as a base URL.")]
	InvalidEndpoint {
		/// Offending URL.
		url: String,
	},
}

/// Failures raised while deriving the expiry of a bearer token.
#[derive(Debug, ThisError)]
pub enum TokenError {
	/// Token does not have exactly three dot-separated segments.
	#[error("Invalid token format: expected 3 segments, found {segments}.")]
	Format {
		/// Number of segments observed.
		segments: usize,
	},
	/// Payload segment is not valid base64url.
	#[error("Token payload is not valid base64url.")]
	PayloadEncoding {
		/// Underlying decoding failure.
		#[source]
		source: base64::DecodeError,
	},
	/// Payload segment is not a JSON object with a numeric `exp`.
	#[error("Token payload is not a valid claims object.")]
	PayloadJson {
		/// Underlying parsing failure.
		#[source]
		source: serde_json::Error,
	},
	/// The `exp` claim cannot be represented as a timestamp.
	#[error("Token expiry claim `{exp}` is out of range.")]
	ExpiryOutOfRange {
		/// Raw claim value.
		exp: f64,
	},
}
impl TokenError {
	/// Returns `true` when the token had the wrong number of segments.
	pub fn is_format(&self) -> bool {
		matches!(self, Self::Format { .. })
	}

	/// Returns `true` when the payload segment existed but could not be decoded.
	pub fn is_payload_decode(&self) -> bool {
		matches!(
			self,
			Self::PayloadEncoding { .. } | Self::PayloadJson { .. } | Self::ExpiryOutOfRange { .. }
		)
	}
}

/// Upstream collaborators that failed to deliver a usable answer.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Upstream returned a non-success status.
	#[error("Unable to fetch {service}: {detail}.")]
	Unavailable {
		/// Upstream service label (`token` or `risk`).
		service: &'static str,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Upstream-supplied detail.
		detail: String,
	},
	/// Upstream answered with a body that could not be parsed.
	#[error("Upstream {service} returned a malformed response.")]
	MalformedResponse {
		/// Upstream service label (`token` or `risk`).
		service: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl UpstreamError {
	/// HTTP status code reported by the upstream, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Unavailable { status, .. } | Self::MalformedResponse { status, .. } => *status,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {service} endpoint.")]
	Network {
		/// Upstream service label (`token` or `risk`).
		service: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		service: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { service, source: Box::new(src) }
	}
}

/// JSON body returned to HTTP clients for failures and rejections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
	/// Human-readable failure detail.
	pub detail: String,
}
impl ErrorBody {
	/// Wraps a detail message.
	pub fn new(detail: impl Into<String>) -> Self {
		Self { detail: detail.into() }
	}
}
