#![allow(dead_code)]

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use time::OffsetDateTime;
// self
use risk_gate::{
	error::UpstreamError,
	risk::{CategoryEntry, Details, RiskDetails, RiskFuture, RiskLookup},
	token::{BearerToken, TokenFetcher, TokenFuture},
};

/// Reqwest client that trusts the self-signed certificates `httpmock` serves.
#[cfg(feature = "reqwest")]
pub fn test_reqwest_client() -> risk_gate::reqwest::Client {
	risk_gate::reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.")
}

pub fn unsigned_token(exp: OffsetDateTime) -> String {
	let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
	let payload = URL_SAFE_NO_PAD.encode(format!("{{\"exp\":{}}}", exp.unix_timestamp()));

	format!("{header}.{payload}.signature")
}

pub fn details_json(address: &str, headline: &str, own: &[&str], funds: &[&str]) -> String {
	let entries = |names: &[&str]| {
		names
			.iter()
			.map(|name| {
				serde_json::json!({
					"address": "0x00000000000000000000000000000000000000ff",
					"name": "peer",
					"category_name": name,
					"risk": 20,
				})
			})
			.collect::<Vec<_>>()
	};

	serde_json::json!({
		"case_id": format!("case-{address}"),
		"request_datetime": "2025-11-10T12:00:00Z",
		"response_datetime": "2025-11-10T12:00:01Z",
		"chain": "eth",
		"address": address,
		"name": "target",
		"category_name": headline,
		"risk": 60,
		"details": {
			"own_categories": entries(own),
			"source_of_funds_categories": entries(funds),
		},
	})
	.to_string()
}

/// Issues the same token on every call and counts the calls.
pub struct FixedFetcher {
	token: String,
	calls: AtomicUsize,
}
impl FixedFetcher {
	pub fn new(token: String) -> Self {
		Self { token, calls: AtomicUsize::new(0) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl TokenFetcher for FixedFetcher {
	fn fetch_token(&self) -> TokenFuture<'_> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			Ok(self.token.clone())
		})
	}
}

/// Answers every address with a single headline category, or fails for `0xdead`.
#[derive(Default)]
pub struct EchoLookup {
	calls: AtomicUsize,
}
impl EchoLookup {
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl RiskLookup for EchoLookup {
	fn fetch<'a>(&'a self, address: &'a str, _token: &'a BearerToken) -> RiskFuture<'a> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			if address == "0xdead" {
				return Err(UpstreamError::Unavailable {
					service: "risk",
					status: Some(500),
					detail: "Upstream exploded.".into(),
				}
				.into());
			}

			Ok(RiskDetails {
				case_id: format!("case-{address}"),
				request_datetime: "2025-11-10T12:00:00Z".into(),
				response_datetime: "2025-11-10T12:00:01Z".into(),
				chain: "eth".into(),
				address: address.into(),
				name: "target".into(),
				category_name: format!("category-{address}"),
				risk: 10,
				details: Details {
					own_categories: vec![CategoryEntry {
						address: address.into(),
						name: "target".into(),
						category_name: format!("category-{address}"),
						risk: 10,
					}],
					..Default::default()
				},
			})
		})
	}
}
