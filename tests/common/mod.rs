//! Fixtures shared by the reqwest-backed integration tests.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use httpmock::MockServer;
use time::OffsetDateTime;
// self
use market_auth_client::{
	auth::CredentialPair,
	client::ReqwestAuthClient,
	config::ClientConfig,
	nav::RecordingRedirect,
	store::MemoryStore,
};

/// Builds an unsigned token whose payload carries `exp`.
pub fn jwt_with_exp(exp: i64) -> String {
	format!(
		"{}.{}.test-signature",
		URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
		URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"vendor-42","exp":{exp}}}"#)),
	)
}

/// Token that expired ten seconds ago.
pub fn expired_jwt() -> String {
	jwt_with_exp(OffsetDateTime::now_utc().unix_timestamp() - 10)
}

/// Token valid for another hour.
pub fn fresh_jwt() -> String {
	jwt_with_exp(OffsetDateTime::now_utc().unix_timestamp() + 3600)
}

/// Refresh endpoint success body wrapping `access_token`.
pub fn refresh_body(access_token: &str) -> String {
	format!(r#"{{"data":{{"access_token":"{access_token}"}}}}"#)
}

/// Client wired to `server` with an in-memory store and a recording redirect.
pub fn build_client(server: &MockServer) -> (ReqwestAuthClient, MemoryStore, Arc<RecordingRedirect>) {
	let store = MemoryStore::default();
	let redirect = Arc::new(RecordingRedirect::default());
	let config = ClientConfig::new(server.base_url()).expect("Mock server base URL should be valid.");
	let client = ReqwestAuthClient::new(config, Arc::new(store.clone())).with_redirect(redirect.clone());

	(client, store, redirect)
}

/// Client wired to `server` with `access`/`refresh` already stored.
pub async fn build_signed_in_client(
	server: &MockServer,
	access: &str,
	refresh: &str,
) -> (ReqwestAuthClient, MemoryStore, Arc<RecordingRedirect>) {
	let (client, store, redirect) = build_client(server);

	client
		.login(CredentialPair::new(access, refresh))
		.await
		.expect("Seeding credentials should succeed.");

	(client, store, redirect)
}
