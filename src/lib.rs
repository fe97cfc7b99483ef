//! In-process guard rails for third-party risk lookups: a bounded LRU response cache with a
//! periodic purge, a single-flight bearer-token manager driven by the JWT `exp` claim, and
//! global or per-client sliding-window rate limits, composed by [`gateway::RiskGateway`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cache;
pub mod error;
pub mod gateway;
#[cfg(feature = "reqwest")] pub mod http;
pub mod obs;
pub mod rate_limit;
pub mod risk;
pub mod settings;
pub mod token;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// crates.io
	use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	use crate::{
		error::UpstreamError,
		risk::{CategoryEntry, Details, RiskDetails, RiskFuture, RiskLookup},
		token::{BearerToken, TokenFetcher, TokenFuture},
	};

	/// Builds an unsigned three-segment token whose payload carries `exp`.
	pub fn unsigned_token(exp: OffsetDateTime) -> String {
		unsigned_token_with_payload(&format!("{{\"exp\":{}}}", exp.unix_timestamp()))
	}

	/// Builds an unsigned three-segment token around an arbitrary payload string.
	pub fn unsigned_token_with_payload(payload: &str) -> String {
		let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
		let payload = URL_SAFE_NO_PAD.encode(payload);

		format!("{header}.{payload}.signature")
	}

	/// Risk details whose headline category is `headline`, followed by `own` categories.
	pub fn sample_details(address: &str, headline: &str, own: &[&str]) -> RiskDetails {
		let entry = |category: &&str| CategoryEntry {
			address: address.into(),
			name: "counterparty".into(),
			category_name: (*category).into(),
			risk: 50,
		};

		RiskDetails {
			case_id: format!("case-{address}"),
			request_datetime: "2025-11-10T12:00:00Z".into(),
			response_datetime: "2025-11-10T12:00:01Z".into(),
			chain: "eth".into(),
			address: address.into(),
			name: "target".into(),
			category_name: headline.into(),
			risk: 50,
			details: Details {
				own_categories: own.iter().map(entry).collect(),
				..Default::default()
			},
		}
	}

	/// Token fetcher that replays a fixed script and then reports the issuer as unavailable.
	#[derive(Debug, Default)]
	pub struct ScriptedFetcher {
		tokens: Mutex<VecDeque<String>>,
		delay: Option<StdDuration>,
		calls: AtomicUsize,
	}
	impl ScriptedFetcher {
		/// Creates a fetcher that yields `tokens` in order.
		pub fn new<I>(tokens: I) -> Self
		where
			I: IntoIterator,
			I::Item: Into<String>,
		{
			Self {
				tokens: Mutex::new(tokens.into_iter().map(Into::into).collect()),
				..Default::default()
			}
		}

		/// Sleeps for `delay` before every response.
		pub fn with_delay(mut self, delay: StdDuration) -> Self {
			self.delay = Some(delay);

			self
		}

		/// Number of fetches attempted so far.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl TokenFetcher for ScriptedFetcher {
		fn fetch_token(&self) -> TokenFuture<'_> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);

				if let Some(delay) = self.delay {
					tokio::time::sleep(delay).await;
				}

				let next = self.tokens.lock().pop_front();

				next.ok_or_else(|| {
					UpstreamError::Unavailable {
						service: "token",
						status: Some(503),
						detail: "Scripted fetcher has no tokens left.".into(),
					}
					.into()
				})
			})
		}
	}

	/// Risk lookup that answers every address from a fixed table and counts calls.
	#[derive(Debug, Default)]
	pub struct CountingLookup {
		answers: HashMap<String, RiskDetails>,
		calls: AtomicUsize,
	}
	impl CountingLookup {
		/// Registers the answer for `details.address`.
		pub fn with_answer(mut self, details: RiskDetails) -> Self {
			self.answers.insert(details.address.clone(), details);

			self
		}

		/// Number of lookups performed so far.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl RiskLookup for CountingLookup {
		fn fetch<'a>(&'a self, address: &'a str, _token: &'a BearerToken) -> RiskFuture<'a> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);

				self.answers.get(address).cloned().ok_or_else(|| {
					UpstreamError::Unavailable {
						service: "risk",
						status: Some(404),
						detail: format!("No answer for {address}."),
					}
					.into()
				})
			})
		}
	}

	/// Builds a reqwest client for talking to `httpmock` servers.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_client() -> ReqwestClient {
		ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build Reqwest client for tests.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::Client as ReqwestClient;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
