//! Reqwest-backed implementations of the upstream collaborators.
//!
//! [`ReqwestTokenFetcher`] obtains bearer tokens from the credential issuer using the project
//! API key, and [`ReqwestRiskLookup`] queries the risk-details endpoint with that token. Both map
//! non-success statuses to [`UpstreamError::Unavailable`] carrying the upstream status and body,
//! and network failures to [`TransportError::Network`]. Neither retries.

// crates.io
use reqwest::{
	Response,
	header::{ACCEPT, AUTHORIZATION},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError, UpstreamError},
	risk::{RiskDetails, RiskFuture, RiskLookup},
	token::{BearerToken, TokenFetcher, TokenFuture},
};

const TOKEN_SERVICE: &str = "token";
const RISK_SERVICE: &str = "risk";
const API_KEY_HEADER: &str = "x-api-key";
const JSON: &str = "application/json";

#[derive(Debug, Deserialize)]
struct TokenResponse {
	token: String,
}

/// Fetches bearer tokens from the credential issuer.
#[derive(Clone)]
pub struct ReqwestTokenFetcher {
	client: ReqwestClient,
	endpoint: Url,
	api_key: String,
}
impl ReqwestTokenFetcher {
	/// Creates a fetcher with a default reqwest client.
	pub fn new(endpoint: Url, api_key: impl Into<String>) -> Self {
		Self::with_client(ReqwestClient::default(), endpoint, api_key)
	}

	/// Creates a fetcher that reuses an existing reqwest client.
	pub fn with_client(client: ReqwestClient, endpoint: Url, api_key: impl Into<String>) -> Self {
		Self { client, endpoint, api_key: api_key.into() }
	}
}
impl TokenFetcher for ReqwestTokenFetcher {
	fn fetch_token(&self) -> TokenFuture<'_> {
		Box::pin(async move {
			let response = self
				.client
				.get(self.endpoint.clone())
				.header(ACCEPT, JSON)
				.header(API_KEY_HEADER, &self.api_key)
				.send()
				.await
				.map_err(|e| TransportError::network(TOKEN_SERVICE, e))?;
			let (status, body) = read_success(TOKEN_SERVICE, response).await?;

			Ok(parse::<TokenResponse>(TOKEN_SERVICE, status, &body)?.token)
		})
	}
}
impl Debug for ReqwestTokenFetcher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ReqwestTokenFetcher")
			.field("endpoint", &self.endpoint.as_str())
			.field("api_key", &"<redacted>")
			.finish()
	}
}

/// Queries the risk-details endpoint for one address at a time.
#[derive(Clone, Debug)]
pub struct ReqwestRiskLookup {
	client: ReqwestClient,
	endpoint: Url,
	chain: String,
}
impl ReqwestRiskLookup {
	/// Creates a lookup with a default reqwest client.
	pub fn new(endpoint: Url, chain: impl Into<String>) -> Result<Self, ConfigError> {
		Self::with_client(ReqwestClient::default(), endpoint, chain)
	}

	/// Creates a lookup that reuses an existing reqwest client.
	pub fn with_client(
		client: ReqwestClient,
		endpoint: Url,
		chain: impl Into<String>,
	) -> Result<Self, ConfigError> {
		if endpoint.cannot_be_a_base() {
			return Err(ConfigError::InvalidEndpoint { url: endpoint.into() });
		}

		Ok(Self { client, endpoint, chain: chain.into() })
	}

	/// Builds the lookup URL for `address`; the address is percent-encoded.
	pub fn lookup_url(&self, address: &str) -> Url {
		let mut url = self.endpoint.clone();

		url.query_pairs_mut().append_pair("address", address).append_pair("chain", &self.chain);

		url
	}
}
impl RiskLookup for ReqwestRiskLookup {
	fn fetch<'a>(&'a self, address: &'a str, token: &'a BearerToken) -> RiskFuture<'a> {
		Box::pin(async move {
			let response = self
				.client
				.get(self.lookup_url(address))
				.header(ACCEPT, JSON)
				.header(AUTHORIZATION, token.authorization_header())
				.send()
				.await
				.map_err(|e| TransportError::network(RISK_SERVICE, e))?;
			let (status, body) = read_success(RISK_SERVICE, response).await?;

			Ok(parse::<RiskDetails>(RISK_SERVICE, status, &body)?)
		})
	}
}

async fn read_success(service: &'static str, response: Response) -> Result<(u16, Vec<u8>)> {
	let status = response.status();
	let body = response.bytes().await.map_err(|e| TransportError::network(service, e))?;

	if status.is_success() {
		return Ok((status.as_u16(), body.to_vec()));
	}

	let detail = String::from_utf8_lossy(&body).trim().to_owned();
	let detail = if detail.is_empty() { format!("HTTP {status}") } else { detail };

	Err(UpstreamError::Unavailable { service, status: Some(status.as_u16()), detail }.into())
}

fn parse<T>(service: &'static str, status: u16, body: &[u8]) -> Result<T, UpstreamError>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		UpstreamError::MalformedResponse { service, source, status: Some(status) }
	})
}
