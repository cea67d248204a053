//! Authenticated request client for the marketplace API.

pub mod refresh;

mod send;

pub use refresh::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::CredentialPair,
	config::ClientConfig,
	http::{ApiRequest, ApiResponse, ApiTransport},
	nav::{LoginRedirect, NoopRedirect},
	session::Session,
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestAuthClient = AuthClient<ReqwestTransport>;

/// Issues marketplace API requests carrying the session's bearer credential.
///
/// The client owns the transport, the injected [`Session`], the login redirect, and the shared
/// refresh holder. Clones share all of them, so every clone coalesces refreshes with the others.
/// Expired access tokens are refreshed before dispatch; a `401` triggers one refresh and one
/// retry. When a refresh fails, both credentials are removed and the redirect fires once for the
/// whole cycle.
pub struct AuthClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// HTTP transport used for every outbound request.
	pub transport: Arc<T>,
	/// Credential context the client reads and rotates.
	pub session: Session,
	/// Endpoint, key, and expiry configuration.
	pub config: Arc<ClientConfig>,
	/// Side effect fired when the session cannot be recovered.
	pub redirect: Arc<dyn LoginRedirect>,
	/// Shared counters for refresh executions and outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	refresh_slot: Arc<refresh::RefreshSlot>,
}
impl<T> AuthClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a client bound to `session` that dispatches through `transport`.
	pub fn with_session(config: ClientConfig, session: Session, transport: impl Into<Arc<T>>) -> Self {
		Self {
			transport: transport.into(),
			session,
			config: Arc::new(config),
			redirect: Arc::new(NoopRedirect),
			refresh_metrics: Default::default(),
			refresh_slot: Default::default(),
		}
	}

	/// Creates a client whose session lives in `store` under the configured keys.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		let session = Session::new(store, config.keys.clone());

		Self::with_session(config, session, transport)
	}

	/// Sets the side effect fired after an unrecoverable refresh failure.
	pub fn with_redirect(mut self, redirect: Arc<dyn LoginRedirect>) -> Self {
		self.redirect = redirect;

		self
	}

	/// Starts the session with credentials issued at login.
	pub async fn login(&self, pair: CredentialPair) -> Result<()> {
		Ok(self.session.establish(pair).await?)
	}

	/// Ends the session by removing both credentials. No redirect is fired.
	pub async fn logout(&self) -> Result<()> {
		Ok(self.session.clear().await?)
	}

	/// Returns `true` while a refresh is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.refresh_slot.is_refreshing()
	}

	/// Sends a `GET` request.
	pub async fn get(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.send(ApiRequest::get(path)).await
	}

	/// Sends a `DELETE` request.
	pub async fn delete(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.send(ApiRequest::delete(path)).await
	}

	/// Sends a `POST` request with a JSON body.
	pub async fn post_json<B>(&self, path: impl Into<String>, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::post(path).json(body)?).await
	}

	/// Sends a `PUT` request with a JSON body.
	pub async fn put_json<B>(&self, path: impl Into<String>, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::put(path).json(body)?).await
	}

	/// Sends `request`, requires a 2xx status, and decodes the `{ "data": ... }` envelope.
	pub async fn fetch_data<D>(&self, request: ApiRequest) -> Result<D>
	where
		D: DeserializeOwned,
	{
		let response = self.send(request).await?.error_for_status()?;

		Ok(response.data::<D>()?)
	}
}
#[cfg(feature = "reqwest")]
impl AuthClient<ReqwestTransport> {
	/// Creates a client with its own reqwest transport and no redirect side effect.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Self {
		Self::with_transport(config, store, ReqwestTransport::default())
	}
}
impl<T> Clone for AuthClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			session: self.session.clone(),
			config: self.config.clone(),
			redirect: self.redirect.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			refresh_slot: self.refresh_slot.clone(),
		}
	}
}
impl<T> Debug for AuthClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("session", &self.session)
			.field("refreshing", &self.is_refreshing())
			.finish()
	}
}
