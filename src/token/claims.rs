//! Expiry extraction from the unverified payload segment of a bearer token.

// crates.io
use base64::{
	Engine,
	alphabet,
	engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use time::PrimitiveDateTime;
// self
use crate::{_prelude::*, error::TokenError};

/// Expiry assigned to payloads without an `exp` claim; forces a refresh on the next use.
pub const EARLIEST_EXPIRY: OffsetDateTime = PrimitiveDateTime::MIN.assume_utc();

// Issuers disagree on padding, so accept both forms.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
	&alphabet::URL_SAFE,
	GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Deserialize)]
struct Claims {
	#[serde(default)]
	exp: Option<f64>,
}

/// Decodes the `exp` claim of a three-segment token.
///
/// The signature is not verified. A missing claim yields [`EARLIEST_EXPIRY`]; every other
/// irregularity is an error.
pub fn decode_expiry(token: &str) -> Result<OffsetDateTime, TokenError> {
	let segments = token.split('.').collect::<Vec<_>>();
	let [_, payload, _] = segments.as_slice() else {
		return Err(TokenError::Format { segments: segments.len() });
	};
	let bytes =
		PAYLOAD_ENGINE.decode(payload).map_err(|source| TokenError::PayloadEncoding { source })?;
	let claims = serde_json::from_slice::<Claims>(&bytes)
		.map_err(|source| TokenError::PayloadJson { source })?;

	match claims.exp {
		Some(exp) => unix_seconds(exp),
		None => Ok(EARLIEST_EXPIRY),
	}
}

fn unix_seconds(exp: f64) -> Result<OffsetDateTime, TokenError> {
	if !exp.is_finite() {
		return Err(TokenError::ExpiryOutOfRange { exp });
	}

	let nanos = (exp * 1_000_000_000.) as i128;

	OffsetDateTime::from_unix_timestamp_nanos(nanos)
		.map_err(|_| TokenError::ExpiryOutOfRange { exp })
}
