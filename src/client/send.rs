//! Request dispatch with proactive expiry checks and a single 401 retry.

// crates.io
use oauth2::http::StatusCode;
// self
use crate::{
	_prelude::*,
	auth::{self, TokenSecret},
	client::AuthClient,
	http::{ApiRequest, ApiResponse, ApiTransport},
	obs::{self, OpKind, OpOutcome, OpSpan, op_debug},
};

impl<T> AuthClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Sends `request` with the session's bearer credential.
	///
	/// An expired or undecodable access token is refreshed before dispatch; with no access token
	/// the request goes out unauthenticated. A `401` triggers one refresh and one retry. The
	/// retry's response is returned as-is, even when it is another `401`. Non-401 statuses are
	/// never interpreted; use [`ApiResponse::error_for_status`] to turn them into errors.
	///
	/// # Errors
	///
	/// - [`Error::Refresh`] when the proactive refresh fails.
	/// - [`Error::Unauthorized`] when the API answered `401` and the refresh failed.
	/// - [`Error::Transport`], [`Error::Config`], or [`Error::Storage`] for local failures.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: OpKind = OpKind::Send;

		let span = OpSpan::new(KIND, &request.path);

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.send_with_retry(request)).await;
		let outcome = if result.is_ok() { OpOutcome::Success } else { OpOutcome::Failure };

		span.finish(outcome);
		obs::record_op_outcome(KIND, outcome);

		result
	}

	async fn send_with_retry(&self, request: ApiRequest) -> Result<ApiResponse> {
		let bearer = self.bearer_for_dispatch().await?;
		let response = self.dispatch(&request, bearer.as_ref()).await?;

		if response.status != StatusCode::UNAUTHORIZED {
			return Ok(response);
		}

		let Some(retry) = request.retried() else {
			op_debug!(path = %request.path, "Retry budget spent; returning 401.");

			return Ok(response);
		};

		match self.refresh_access_token().await {
			Ok(token) => self.dispatch(&retry, Some(&token)).await,
			Err(source) => Err(Error::Unauthorized { response: Box::new(response), source }),
		}
	}

	async fn bearer_for_dispatch(&self) -> Result<Option<TokenSecret>> {
		let Some(token) = self.session.access_token().await? else {
			return Ok(None);
		};

		if !auth::is_token_expired(&token, OffsetDateTime::now_utc(), self.config.expiry_leeway) {
			return Ok(Some(token));
		}

		Ok(Some(self.refresh_access_token().await?))
	}

	async fn dispatch(&self, request: &ApiRequest, bearer: Option<&TokenSecret>) -> Result<ApiResponse> {
		let url = self.config.endpoint(&request.path)?;
		let http = request.to_http(&url, bearer.map(TokenSecret::expose))?;
		let response = self.transport.execute(http).await?;

		Ok(response.into())
	}
}
