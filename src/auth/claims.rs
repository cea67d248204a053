//! Client-side expiry classification for signed access tokens.
//!
//! Tokens are three dot-separated segments; the middle one is base64url-encoded JSON carrying an
//! `exp` claim in seconds since the epoch. The signature is never verified here: the payload is
//! only read to avoid sending a request the API is certain to reject. Anything that cannot be
//! decoded is classified as expired so the caller refreshes instead of failing.

// crates.io
use base64::{
	Engine,
	alphabet,
	engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
// self
use crate::{_prelude::*, auth::TokenSecret};

const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
	&alphabet::URL_SAFE,
	GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors raised while reading an access token payload.
#[derive(Debug, ThisError)]
pub enum TokenDecodeError {
	/// Token has no payload segment.
	#[error("Token has no payload segment.")]
	MissingPayload,
	/// Payload segment is not valid base64url.
	#[error("Token payload is not valid base64url.")]
	Base64(#[from] base64::DecodeError),
	/// Payload is not a JSON object with a numeric `exp`.
	#[error("Token payload is not valid claims JSON.")]
	Json(#[from] serde_path_to_error::Error<serde_json::Error>),
}

/// Subset of access-token claims the client relies on.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AccessClaims {
	/// Expiry in seconds since the Unix epoch.
	pub exp: f64,
}
impl AccessClaims {
	/// Decodes the claims carried by `token` without verifying its signature.
	pub fn decode(token: &str) -> Result<Self, TokenDecodeError> {
		let payload = token.split('.').nth(1).ok_or(TokenDecodeError::MissingPayload)?;

		if payload.is_empty() {
			return Err(TokenDecodeError::MissingPayload);
		}

		let bytes = PAYLOAD_ENGINE.decode(payload)?;
		let de = &mut serde_json::Deserializer::from_slice(&bytes);

		Ok(serde_path_to_error::deserialize(de)?)
	}

	/// Expiry expressed in milliseconds since the Unix epoch.
	pub fn expires_at_millis(&self) -> f64 {
		self.exp * 1000.
	}

	/// Returns `true` once `instant` is strictly past the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at_millis() < unix_millis(instant)
	}
}

/// Classifies `token` at `instant`, treating undecodable tokens as expired.
///
/// `leeway` moves the comparison point forward so tokens about to expire are refreshed early. A
/// comparison point outside the representable range counts as expired.
pub fn is_token_expired(token: &TokenSecret, instant: OffsetDateTime, leeway: Duration) -> bool {
	let Some(deadline) = instant.checked_add(leeway) else {
		return true;
	};

	match AccessClaims::decode(token.expose()) {
		Ok(claims) => claims.is_expired_at(deadline),
		Err(_) => true,
	}
}

fn unix_millis(instant: OffsetDateTime) -> f64 {
	(instant.unix_timestamp_nanos() / 1_000_000) as f64
}
