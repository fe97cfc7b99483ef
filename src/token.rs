//! Bearer token lifecycle with single-flight refreshes.
//!
//! [`TokenManager::get_token`] hands out the held token while its expiry lies in the future and
//! otherwise fetches a new one through a [`TokenFetcher`]. The check and the fetch run under a
//! single async lock, so a burst of callers arriving while the token is stale produces exactly
//! one upstream fetch and every caller receives the refreshed token. Expiry comes from the
//! token's own `exp` claim (see [`claims`]); the signature is never verified.

pub mod claims;

mod metrics;
mod secret;

pub use metrics::TokenMetrics;
pub use secret::BearerToken;

// self
use crate::{
	_prelude::*,
	error::TokenError,
	obs::{self, Component, GateSpan, Outcome},
};

/// Default margin subtracted from the decoded expiry so tokens are never used on their last
/// second.
pub const DEFAULT_EXPIRY_SKEW: Duration = Duration::seconds(1);

/// Boxed future returned by [`TokenFetcher::fetch_token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + 'a + Send>>;

/// Collaborator that obtains a fresh raw token from the credential issuer.
pub trait TokenFetcher
where
	Self: Send + Sync,
{
	/// Fetches a new token. Failures should surface as [`Error::Upstream`] or
	/// [`Error::Transport`].
	fn fetch_token(&self) -> TokenFuture<'_>;
}

#[derive(Debug)]
struct HeldToken {
	token: BearerToken,
	expires_at: OffsetDateTime,
}

/// Long-lived owner of the current bearer token.
///
/// Share one instance (behind an [`Arc`]) across request handlers; its lock is the only thing
/// coordinating refreshes.
pub struct TokenManager<F>
where
	F: ?Sized + TokenFetcher,
{
	fetcher: Arc<F>,
	expiry_skew: Duration,
	metrics: Arc<TokenMetrics>,
	held: AsyncMutex<Option<HeldToken>>,
}
impl<F> TokenManager<F>
where
	F: ?Sized + TokenFetcher,
{
	/// Creates a manager that holds no token yet.
	pub fn new(fetcher: impl Into<Arc<F>>) -> Self {
		Self {
			fetcher: fetcher.into(),
			expiry_skew: DEFAULT_EXPIRY_SKEW,
			metrics: Default::default(),
			held: AsyncMutex::new(None),
		}
	}

	/// Overrides the margin subtracted from decoded expiries (defaults to one second).
	pub fn with_expiry_skew(mut self, skew: Duration) -> Self {
		self.expiry_skew = if skew.is_negative() { Duration::ZERO } else { skew };

		self
	}

	/// Counters describing how lookups were served.
	pub fn metrics(&self) -> &TokenMetrics {
		&self.metrics
	}

	/// Returns a valid token, fetching one when none is held or the held one expired.
	pub async fn get_token(&self) -> Result<BearerToken> {
		self.get_token_at(OffsetDateTime::now_utc()).await
	}

	/// Same as [`get_token`](Self::get_token) with `now` supplied by the caller.
	pub async fn get_token_at(&self, now: OffsetDateTime) -> Result<BearerToken> {
		let span = GateSpan::new(Component::Token, "get_token");

		self.metrics.record_attempt();

		let result = span
			.instrument(async move {
				let mut held = self.held.lock().await;
				let refreshed = match held.as_ref() {
					Some(current) if now < current.expires_at => {
						self.metrics.record_reuse();
						obs::record_outcome(Component::Token, Outcome::Reuse);

						return Ok(current.token.clone());
					},
					Some(_) => true,
					None => false,
				};
				let raw = self.fetcher.fetch_token().await?;
				let expires_at = self.compute_expiry(&raw)?;
				let token = BearerToken::new(raw);

				*held = Some(HeldToken { token: token.clone(), expires_at });

				self.metrics.record_fetch();
				obs::record_outcome(Component::Token, Outcome::Fetch);
				obs::log_token_fetched(refreshed, expires_at);

				Ok(token)
			})
			.await;

		if result.is_err() {
			self.metrics.record_failure();
			obs::record_outcome(Component::Token, Outcome::Failure);
		}

		result
	}

	/// Derives the instant after which `token` must be refreshed.
	pub fn compute_expiry(&self, token: &str) -> Result<OffsetDateTime, TokenError> {
		let expiry = claims::decode_expiry(token)?;

		Ok(expiry.checked_sub(self.expiry_skew).unwrap_or(claims::EARLIEST_EXPIRY))
	}

	/// Expiry of the held token, if any.
	pub async fn expires_at(&self) -> Option<OffsetDateTime> {
		self.held.lock().await.as_ref().map(|held| held.expires_at)
	}

	/// Drops the held token so the next lookup fetches a new one.
	pub async fn invalidate(&self) {
		self.held.lock().await.take();
	}
}
impl<F> Debug for TokenManager<F>
where
	F: ?Sized + TokenFetcher,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("expiry_skew", &self.expiry_skew)
			.field("metrics", &self.metrics)
			.finish()
	}
}
