//! Demonstrates a risk gateway wired from environment-style settings against mocked upstreams:
//! the first check fetches a token and the risk details, the second is answered from the cache,
//! and the third trips the rate limit.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use color_eyre::Result;
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
// self
use risk_gate::{
	cache::ResponseCache, gateway::ReqwestGateway, reqwest::Client, risk::CheckResponse,
	settings::GatewayConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let exp = (OffsetDateTime::now_utc() + Duration::minutes(30)).unix_timestamp();
	let token = format!(
		"{}.{}.demo-signature",
		URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
		URL_SAFE_NO_PAD.encode(format!("{{\"exp\":{exp}}}")),
	);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/auth").header("x-api-key", "demo-project");
			then.status(200)
				.header("content-type", "application/json")
				.body(format!("{{\"token\":\"{token}\"}}"));
		})
		.await;
	let risk_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/risk/score/details").query_param("chain", "eth");
			then.status(200).json_body(serde_json::json!({
				"case_id": "demo",
				"request_datetime": "2025-11-10T12:00:00Z",
				"response_datetime": "2025-11-10T12:00:01Z",
				"chain": "eth",
				"address": "0xabc",
				"name": "Demo",
				"category_name": "Exchange",
				"risk": 35,
				"details": {
					"own_categories": [
						{
							"address": "0xabc",
							"name": "Demo",
							"category_name": "Exchange",
							"risk": 35,
						},
					],
					"source_of_funds_categories": [
						{
							"address": "0xdef",
							"name": "Tumbler",
							"category_name": "Mixer",
							"risk": 90,
						},
					],
				},
			}));
		})
		.await;
	let config = GatewayConfig::from_env_map([
		("BLOCKMATE_API_URL", server.url("/v1/risk/score/details")),
		("JWT_URL", server.url("/v1/auth")),
		("PROJECT_TOKEN", "demo-project".into()),
		("RATE_LIMIT", "2".into()),
		("RATE_LIMIT_TIME_WINDOW", "10".into()),
	])?;
	// The mock server presents a self-signed certificate.
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()?;
	let gateway = ReqwestGateway::from_config_with_client(&config, client)?;

	for attempt in 1..=3 {
		let outcome = gateway.check("demo-client", "0xabc").await?;

		println!("check #{attempt}: HTTP {} {}", outcome.http_status(), outcome.to_json());
	}

	token_mock.assert_calls_async(1).await;
	risk_mock.assert_calls_async(1).await;

	gateway.shutdown();
	ResponseCache::<CheckResponse>::destroy_instance();

	Ok(())
}
