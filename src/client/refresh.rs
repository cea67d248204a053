//! Coalesced access-token refresh.
//!
//! The client keeps one [`RefreshSlot`] shared by all clones. The slot is either empty (idle) or
//! holds the single in-flight [`RefreshOperation`]. The first caller that needs a refresh
//! installs an operation; every later caller, whether it found an expired token before dispatch
//! or received a `401`, joins the installed one and awaits its completion cell instead of
//! calling the refresh endpoint again.
//!
//! The operation is removed from the slot inside its initializer, before the outcome is
//! published. A caller that can still see the operation therefore always receives its outcome,
//! and a caller that arrives after settlement always starts a new cycle. If the task executing
//! the refresh is dropped, a joined waiter runs the initializer instead, so waiters never hang.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use oauth2::http::{Method, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::AuthClient,
	error::RefreshError,
	http::{ApiResponse, ApiTransport, bearer_header},
	obs::{self, OpKind, OpOutcome, OpSpan, op_debug, op_warn},
};

type RefreshOutcome = Result<TokenSecret, RefreshError>;

/// Holder for the in-flight refresh, shared by every clone of a client.
#[derive(Debug, Default)]
pub(crate) struct RefreshSlot {
	current: Mutex<Option<Arc<RefreshOperation>>>,
	cycles: AtomicU64,
}
impl RefreshSlot {
	/// Returns the in-flight operation, installing a new one when idle.
	///
	/// The flag is `true` when this call installed the operation.
	fn join_or_start(&self) -> (Arc<RefreshOperation>, bool) {
		let mut current = self.current.lock();

		if let Some(operation) = current.as_ref() {
			return (operation.clone(), false);
		}

		let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
		let operation = Arc::new(RefreshOperation { cycle, outcome: OnceCell::new() });

		*current = Some(operation.clone());

		(operation, true)
	}

	/// Returns the slot to idle if it still holds `operation`.
	fn settle(&self, operation: &Arc<RefreshOperation>) {
		let mut current = self.current.lock();

		if current.as_ref().is_some_and(|installed| Arc::ptr_eq(installed, operation)) {
			*current = None;
		}
	}

	pub(crate) fn is_refreshing(&self) -> bool {
		self.current.lock().is_some()
	}
}

/// One refresh cycle and the completion cell all joined callers await.
#[derive(Debug)]
pub(crate) struct RefreshOperation {
	cycle: u64,
	outcome: OnceCell<RefreshOutcome>,
}

#[derive(Deserialize)]
struct RefreshedAccess {
	access_token: String,
}

impl<T> AuthClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Obtains a new access token, joining the in-flight refresh when there is one.
	///
	/// On failure both credentials have already been removed and the login redirect has fired
	/// once for the cycle; every joined caller receives the same [`RefreshError`].
	pub async fn refresh_access_token(&self) -> Result<TokenSecret, RefreshError> {
		let (operation, started) = self.refresh_slot.join_or_start();

		if !started {
			self.refresh_metrics.record_join();
			obs::record_refresh_join();
		}

		let this = self;
		let op = &operation;

		op.outcome
			.get_or_init(move || async move {
				let outcome = this.execute_refresh(op.cycle).await;

				this.refresh_slot.settle(op);

				outcome
			})
			.await
			.clone()
	}

	#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
	async fn execute_refresh(&self, cycle: u64) -> RefreshOutcome {
		const KIND: OpKind = OpKind::Refresh;

		let span = OpSpan::new(KIND, &self.config.refresh_path);

		obs::record_op_outcome(KIND, OpOutcome::Attempt);
		self.refresh_metrics.record_execution();

		let outcome = span.instrument(self.request_access_token()).await;

		match &outcome {
			Ok(_) => {
				self.refresh_metrics.record_success();
				span.finish(OpOutcome::Success);
				obs::record_op_outcome(KIND, OpOutcome::Success);
				op_debug!(cycle, "Access token refreshed.");
			},
			Err(err) => {
				self.refresh_metrics.record_failure();
				span.finish(OpOutcome::Failure);
				obs::record_op_outcome(KIND, OpOutcome::Failure);
				op_warn!(cycle, error = %err, "Refresh failed; clearing session credentials.");

				if let Err(clear_err) = self.session.clear().await {
					op_warn!(cycle, error = %clear_err, "Failed to clear session credentials.");
				}

				self.redirect.redirect_to_login(&self.config.login_url);
			},
		}

		outcome
	}

	async fn request_access_token(&self) -> RefreshOutcome {
		let refresh_token = self
			.session
			.refresh_token()
			.await
			.map_err(RefreshError::Storage)?
			.ok_or(RefreshError::MissingRefreshToken)?;
		let url = self.config.refresh_url().map_err(|e| request_error(&e))?;
		let authorization =
			bearer_header(refresh_token.expose()).map_err(|e| request_error(&e))?;
		let request = oauth2::http::Request::builder()
			.method(Method::POST)
			.uri(url.as_str())
			.header(AUTHORIZATION, authorization)
			.body(Vec::new())
			.map_err(|e| request_error(&e))?;
		let response: ApiResponse = self
			.transport
			.execute(request)
			.await
			.map_err(|e| RefreshError::Transport { message: render_chain(&e) })?
			.into();

		if !response.is_success() {
			return Err(RefreshError::Rejected { status: response.status.as_u16() });
		}

		let refreshed = response
			.data::<RefreshedAccess>()
			.map_err(|e| RefreshError::MalformedResponse { message: render_chain(&e) })?;

		if refreshed.access_token.is_empty() {
			return Err(RefreshError::MalformedResponse {
				message: "data.access_token is empty".into(),
			});
		}

		let token = TokenSecret::new(refreshed.access_token);

		self.session.replace_access_token(&token).await.map_err(RefreshError::Storage)?;

		Ok(token)
	}
}

fn request_error(err: &dyn StdError) -> RefreshError {
	RefreshError::Request { message: render_chain(err) }
}

fn render_chain(err: &dyn StdError) -> String {
	let mut rendered = err.to_string();
	let mut source = err.source();

	while let Some(inner) = source {
		rendered.push_str(": ");
		rendered.push_str(&inner.to_string());

		source = inner.source();
	}

	rendered
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::AtomicUsize;
	// crates.io
	use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
	use oauth2::{HttpRequest, HttpResponse, http::StatusCode};
	// self
	use super::*;
	use crate::{
		auth::CredentialPair,
		config::ClientConfig,
		http::TransportFuture,
		nav::RecordingRedirect,
		store::{CredentialStore, MemoryStore},
	};

	fn jwt(exp: i64) -> String {
		format!(
			"{}.{}.sig",
			URL_SAFE_NO_PAD.encode("{}"),
			URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp}}}"#))
		)
	}

	/// Answers the refresh endpoint from a script and counts how often it was hit.
	struct ScriptedRefresh {
		status: StatusCode,
		body: String,
		delay: std::time::Duration,
		calls: AtomicUsize,
	}
	impl ScriptedRefresh {
		fn new(status: StatusCode, body: impl Into<String>) -> Self {
			Self {
				status,
				body: body.into(),
				delay: std::time::Duration::from_millis(20),
				calls: AtomicUsize::new(0),
			}
		}

		fn with_delay(mut self, delay: std::time::Duration) -> Self {
			self.delay = delay;

			self
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl ApiTransport for ScriptedRefresh {
		fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
			Box::pin(async move {
				assert_eq!(request.uri().path(), "/api/refresh-token");
				assert_eq!(request.headers()[AUTHORIZATION], "Bearer refresh-1");

				self.calls.fetch_add(1, Ordering::SeqCst);
				tokio::time::sleep(self.delay).await;

				let mut response = HttpResponse::new(self.body.clone().into_bytes());

				*response.status_mut() = self.status;

				Ok(response)
			})
		}
	}

	async fn client(
		transport: Arc<ScriptedRefresh>,
	) -> (AuthClient<ScriptedRefresh>, MemoryStore, Arc<RecordingRedirect>) {
		let store = MemoryStore::default();
		let redirect = Arc::new(RecordingRedirect::default());
		let config =
			ClientConfig::new("https://market.example.com").expect("Fixture config should build.");
		let client =
			AuthClient::<ScriptedRefresh>::with_transport(config, Arc::new(store.clone()), transport)
				.with_redirect(redirect.clone());

		client
			.login(CredentialPair::new(jwt(0), "refresh-1"))
			.await
			.expect("Seeding credentials should succeed.");

		(client, store, redirect)
	}

	#[tokio::test]
	async fn concurrent_callers_share_one_refresh() {
		let fresh = jwt(OffsetDateTime::now_utc().unix_timestamp() + 3600);
		let transport = Arc::new(ScriptedRefresh::new(
			StatusCode::OK,
			format!(r#"{{"data":{{"access_token":"{fresh}"}}}}"#),
		));
		let (client, store, redirect) = client(transport.clone()).await;
		let other = client.clone();
		let (a, b, c) = tokio::join!(
			client.refresh_access_token(),
			client.refresh_access_token(),
			other.refresh_access_token(),
		);

		for token in [a, b, c] {
			assert_eq!(token.expect("Every waiter should receive the token.").expose(), fresh);
		}

		assert_eq!(transport.calls(), 1);
		assert_eq!(client.refresh_metrics.executions(), 1);
		assert_eq!(client.refresh_metrics.joins(), 2);
		assert_eq!(store.peek("access_token").as_deref(), Some(fresh.as_str()));
		assert_eq!(redirect.count(), 0);
		assert!(!client.is_refreshing());
	}

	#[tokio::test]
	async fn failed_cycle_clears_session_and_redirects_once() {
		let transport = Arc::new(ScriptedRefresh::new(StatusCode::FORBIDDEN, "{}"));
		let (client, store, redirect) = client(transport.clone()).await;
		let (a, b) = tokio::join!(client.refresh_access_token(), client.refresh_access_token());

		assert_eq!(a, Err(RefreshError::Rejected { status: 403 }));
		assert_eq!(b, Err(RefreshError::Rejected { status: 403 }));
		assert_eq!(transport.calls(), 1);
		assert_eq!(redirect.count(), 1);
		assert_eq!(
			redirect.last().map(|url| url.to_string()),
			Some("https://market.example.com/login".into())
		);
		assert!(store.is_empty());
		assert_eq!(client.refresh_metrics.failures(), 1);
	}

	#[tokio::test]
	async fn settled_cycle_is_not_reused() {
		let transport =
			Arc::new(ScriptedRefresh::new(StatusCode::OK, r#"{"data":{"access_token":"next"}}"#));
		let (client, _store, _redirect) = client(transport.clone()).await;

		client.refresh_access_token().await.expect("First cycle should succeed.");
		client.refresh_access_token().await.expect("Second cycle should succeed.");

		assert_eq!(transport.calls(), 2);
		assert_eq!(client.refresh_metrics.executions(), 2);
	}

	#[tokio::test]
	async fn malformed_body_fails_the_cycle() {
		let transport =
			Arc::new(ScriptedRefresh::new(StatusCode::OK, r#"{"data":{"token":"x"}}"#));
		let (client, store, redirect) = client(transport).await;
		let err = client.refresh_access_token().await.expect_err("Missing token should fail.");

		match err {
			RefreshError::MalformedResponse { message } =>
				assert!(message.contains("data"), "unexpected message: {message}"),
			other => panic!("Unexpected error: {other:?}"),
		}

		assert!(store.is_empty());
		assert_eq!(redirect.count(), 1);
	}

	#[tokio::test]
	async fn joined_waiter_takes_over_when_the_running_task_is_dropped() {
		let transport = Arc::new(
			ScriptedRefresh::new(StatusCode::OK, r#"{"data":{"access_token":"next"}}"#)
				.with_delay(std::time::Duration::from_millis(200)),
		);
		let (client, store, redirect) = client(transport.clone()).await;
		let running = tokio::spawn({
			let client = client.clone();

			async move { client.refresh_access_token().await }
		});

		while transport.calls() == 0 {
			tokio::task::yield_now().await;
		}

		let waiter = tokio::spawn({
			let client = client.clone();

			async move { client.refresh_access_token().await }
		});

		tokio::time::sleep(std::time::Duration::from_millis(20)).await;
		running.abort();

		assert!(running.await.is_err_and(|e| e.is_cancelled()));

		let token = waiter
			.await
			.expect("Waiter task should not panic.")
			.expect("Waiter should finish the refresh itself.");

		assert_eq!(token.expose(), "next");
		assert_eq!(transport.calls(), 2);
		assert_eq!(client.refresh_metrics.joins(), 1);
		assert_eq!(store.peek("access_token").as_deref(), Some("next"));
		assert_eq!(redirect.count(), 0);
		assert!(!client.is_refreshing());
	}

	#[tokio::test]
	async fn missing_refresh_token_fails_without_network() {
		let transport = Arc::new(ScriptedRefresh::new(StatusCode::OK, "{}"));
		let (client, store, redirect) = client(transport.clone()).await;

		client.logout().await.expect("Logout should clear credentials.");
		store.set("access_token", jwt(0)).await.expect("Seeding access token should succeed.");

		let err = client.refresh_access_token().await.expect_err("Refresh should fail.");

		assert_eq!(err, RefreshError::MissingRefreshToken);
		assert_eq!(transport.calls(), 0);
		assert!(store.is_empty());
		assert_eq!(redirect.count(), 1);
	}

	#[test]
	fn slot_returns_to_idle_only_for_the_installed_operation() {
		let slot = RefreshSlot::default();
		let (first, started) = slot.join_or_start();

		assert!(started);
		assert_eq!(first.cycle, 1);

		let (joined, started) = slot.join_or_start();

		assert!(!started);
		assert!(Arc::ptr_eq(&first, &joined));

		slot.settle(&first);

		assert!(!slot.is_refreshing());

		let (second, started) = slot.join_or_start();

		assert!(started);
		assert_eq!(second.cycle, 2);

		slot.settle(&first);

		assert!(slot.is_refreshing());
	}
}
