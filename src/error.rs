//! Client-level error types shared across the request path, refresh coordination, and stores.

// self
use crate::{_prelude::*, http::ApiResponse};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The session could not be refreshed before dispatch.
	#[error(transparent)]
	Refresh(#[from] RefreshError),
	/// Response body could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),

	/// The API rejected the request with 401 and the session could not be refreshed.
	#[error("Request was rejected as unauthorized and the session could not be refreshed.")]
	Unauthorized {
		/// Original 401 response.
		response: Box<ApiResponse>,
		/// Refresh failure observed while recovering.
		#[source]
		source: RefreshError,
	},
	/// The API answered with a non-success status.
	#[error("API responded with status {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Short body preview for diagnostics.
		body_preview: String,
	},
}

/// Configuration and request construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A URL could not be parsed.
	#[error("URL `{value}` is invalid.")]
	InvalidUrl {
		/// Offending input.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL must be an absolute http(s) URL with a host.
	#[error("Base URL `{0}` must be an absolute http(s) URL with a host.")]
	UnsupportedBaseUrl(String),
	/// A credential key is empty.
	#[error("The {which} credential key must not be empty.")]
	EmptyCredentialKey {
		/// Which key failed validation.
		which: &'static str,
	},
	/// Access and refresh tokens would share one store key.
	#[error("Access and refresh credential keys must differ.")]
	DuplicateCredentialKey,
	/// Expiry leeway cannot be negative.
	#[error("Expiry leeway must not be negative.")]
	NegativeLeeway,
	/// Expiry leeway exceeds the supported maximum.
	#[error("Expiry leeway of {secs}s exceeds the {max_secs}s maximum.")]
	LeewayTooLarge {
		/// Requested leeway in seconds.
		secs: i64,
		/// Largest accepted leeway in seconds.
		max_secs: i64,
	},
	/// A header value contains bytes that HTTP forbids.
	#[error("Header `{name}` has an invalid value.")]
	InvalidHeaderValue {
		/// Header name.
		name: String,
	},
	/// Configuration document could not be parsed.
	#[error("Configuration document is invalid.")]
	Parse(#[source] serde_path_to_error::Error<serde_json::Error>),
}

/// Failures that prevent the transport from producing a response.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the marketplace API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Response body decoding failures.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Body is not the expected JSON shape.
	#[error("Response body has an unexpected JSON shape.")]
	Json {
		/// Structured parsing failure, including the failing path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the decoded response.
		status: u16,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Encode(#[source] serde_json::Error),
}

/// Failure of a shared refresh cycle.
///
/// Every caller joined to the same cycle receives a clone of the same value.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// No refresh token is stored, so the session cannot be recovered.
	#[error("No refresh token is stored.")]
	MissingRefreshToken,
	/// The refresh endpoint could not be reached.
	#[error("Refresh endpoint is unreachable: {message}.")]
	Transport {
		/// Rendered transport failure.
		message: String,
	},
	/// The refresh endpoint answered with a non-success status.
	#[error("Refresh endpoint rejected the request with status {status}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
	},
	/// The refresh endpoint answered 2xx without a usable access token.
	#[error("Refresh endpoint returned a malformed body: {message}.")]
	MalformedResponse {
		/// Parsing failure summary.
		message: String,
	},
	/// Credentials could not be read or written.
	#[error("Credential store failed during refresh: {0}")]
	Storage(crate::store::StoreError),
	/// The refresh request could not be built.
	#[error("Refresh request could not be built: {message}.")]
	Request {
		/// Rendered construction failure.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn refresh_error_converts_into_client_error_with_source() {
		let refresh = RefreshError::Rejected { status: 403 };
		let error: Error = refresh.clone().into();

		assert!(matches!(error, Error::Refresh(RefreshError::Rejected { status: 403 })));
		assert!(error.to_string().contains("403"));

		let store_error = StoreError::Backend { message: "disk full".into() };
		let error: Error = store_error.clone().into();
		let source = StdError::source(&error)
			.expect("Client error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn transport_failures_wrap_the_stack_error_as_network() {
		let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
		let error: Error = TransportError::network(io).into();

		assert!(matches!(error, Error::Transport(TransportError::Network { .. })));

		let source =
			StdError::source(&error).expect("Network errors should expose the transport failure.");

		assert_eq!(source.to_string(), "connection refused");
	}

	#[test]
	fn unauthorized_exposes_refresh_failure_as_source() {
		let response = ApiResponse::new(oauth2::http::StatusCode::UNAUTHORIZED, Vec::new());
		let error =
			Error::Unauthorized { response: Box::new(response), source: RefreshError::MissingRefreshToken };
		let source =
			StdError::source(&error).expect("Unauthorized errors should expose the refresh failure.");

		assert_eq!(source.to_string(), RefreshError::MissingRefreshToken.to_string());
	}
}
