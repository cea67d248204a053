//! Request/response descriptors and the transport seam used by the client.
//!
//! [`ApiTransport`] is the client's only dependency on an HTTP stack. It receives fully resolved
//! [`HttpRequest`] values (absolute URL, headers, body) and returns the raw [`HttpResponse`]; the
//! client owns URL resolution, bearer attachment, and retry policy. The crate ships
//! [`ReqwestTransport`] behind the default `reqwest` feature.

// crates.io
use oauth2::{
	HttpRequest, HttpResponse,
	http::{
		HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
		header::{AUTHORIZATION, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, DecodeError, TransportError},
};

/// Boxed future returned by [`ApiTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// HTTP stack capable of executing resolved marketplace requests.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared across
/// clients and tasks. Non-2xx statuses are successful transport outcomes; only failures that
/// prevent a response (DNS, TCP, TLS, IO) map to [`TransportError`].
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` and returns the upstream response.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Number of retries a request has consumed.
///
/// A request starts at [`Attempt::FIRST`] and may advance at most [`Attempt::MAX_RETRIES`] times;
/// [`Attempt::next`] returns `None` once the budget is spent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attempt(u8);
impl Attempt {
	/// Initial dispatch.
	pub const FIRST: Self = Self(0);
	/// Retries allowed after a 401.
	pub const MAX_RETRIES: u8 = 1;

	/// Returns the following attempt, or `None` when the retry budget is spent.
	pub fn next(self) -> Option<Self> {
		if self.0 < Self::MAX_RETRIES { Some(Self(self.0 + 1)) } else { None }
	}

	/// Returns `true` for any attempt after the first.
	pub fn is_retry(self) -> bool {
		self.0 > 0
	}

	/// Number of retries consumed so far.
	pub fn retries(self) -> u8 {
		self.0
	}
}

/// Outbound request relative to the API base.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path (and optional query) relative to the API base.
	pub path: String,
	/// Caller-supplied headers; `Authorization` is set by the client at dispatch.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
	attempt: Attempt,
}
impl ApiRequest {
	/// Creates a request for `method` + `path` with no headers or body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: HeaderMap::new(),
			body: None,
			attempt: Attempt::FIRST,
		}
	}

	/// `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self, ConfigError> {
		let value = HeaderValue::from_str(value)
			.map_err(|_| ConfigError::InvalidHeaderValue { name: name.to_string() })?;

		self.headers.insert(name, value);

		Ok(self)
	}

	/// Sets a raw body.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `value` as the JSON body and sets `Content-Type: application/json`.
	pub fn json<T>(mut self, value: &T) -> Result<Self, DecodeError>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(value).map_err(DecodeError::Encode)?);
		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Retry budget consumed by this request.
	pub fn attempt(&self) -> Attempt {
		self.attempt
	}

	/// Returns a copy marked as the next attempt, or `None` when retries are exhausted.
	pub(crate) fn retried(&self) -> Option<Self> {
		let attempt = self.attempt.next()?;

		Some(Self { attempt, ..self.clone() })
	}

	/// Resolves the request into a transport-level [`HttpRequest`].
	pub(crate) fn to_http(&self, url: &Url, bearer: Option<&str>) -> Result<HttpRequest, ConfigError> {
		let mut builder = oauth2::http::Request::builder().method(self.method.clone()).uri(url.as_str());

		if let Some(headers) = builder.headers_mut() {
			headers.extend(self.headers.clone());

			match bearer {
				Some(token) => {
					headers.insert(AUTHORIZATION, bearer_header(token)?);
				},
				None => {
					headers.remove(AUTHORIZATION);
				},
			}
		}

		Ok(builder.body(self.body.clone().unwrap_or_default())?)
	}
}

/// Builds a sensitive `Authorization: Bearer <token>` header value.
pub(crate) fn bearer_header(token: &str) -> Result<HeaderValue, ConfigError> {
	let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
		.map_err(|_| ConfigError::InvalidHeaderValue { name: AUTHORIZATION.to_string() })?;

	value.set_sensitive(true);

	Ok(value)
}

/// Upstream response with its body fully buffered.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	const PREVIEW_LEN: usize = 256;

	/// Creates a response with no headers.
	pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: HeaderMap::new(), body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Body as lossy UTF-8 text.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the body as JSON, reporting the failing path on mismatch.
	pub fn json<T>(&self) -> Result<T, DecodeError>
	where
		T: DeserializeOwned,
	{
		let de = &mut serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(de)
			.map_err(|source| DecodeError::Json { source, status: self.status.as_u16() })
	}

	/// Decodes the marketplace `{ "data": ... }` envelope.
	pub fn data<T>(&self) -> Result<T, DecodeError>
	where
		T: DeserializeOwned,
	{
		self.json::<ApiEnvelope<T>>().map(|envelope| envelope.data)
	}

	/// Converts non-2xx responses into [`Error::Status`].
	pub fn error_for_status(self) -> Result<Self> {
		if self.is_success() {
			return Ok(self);
		}

		let mut body_preview = self.text();

		if body_preview.len() > Self::PREVIEW_LEN {
			let mut cut = Self::PREVIEW_LEN;

			while !body_preview.is_char_boundary(cut) {
				cut -= 1;
			}

			body_preview.truncate(cut);
		}

		Err(Error::Status { status: self.status.as_u16(), body_preview })
	}
}
impl From<HttpResponse> for ApiResponse {
	fn from(response: HttpResponse) -> Self {
		let (parts, body) = response.into_parts();

		Self { status: parts.status, headers: parts.headers, body }
	}
}

/// Marketplace response envelope wrapping every payload in `data`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
	/// Wrapped payload.
	pub data: T,
}

/// Reqwest-backed [`ApiTransport`].
///
/// Wrap a preconfigured [`ReqwestClient`] with [`ReqwestTransport::with_client`] to apply
/// timeouts, proxies, or TLS settings; this transport adds none of its own.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let response = client.execute(request.try_into()?).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok::<_, TransportError>(response_new)
		})
	}
}
