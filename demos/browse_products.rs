//! Browses a mocked marketplace API with an expired access token, letting the client refresh it
//! once before the listing request goes out.

// std
use std::sync::Arc;
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use color_eyre::Result;
use httpmock::prelude::*;
use serde::Deserialize;
use time::OffsetDateTime;
// self
use market_auth_client::{
	auth::CredentialPair,
	client::ReqwestAuthClient,
	config::ClientConfig,
	http::ApiRequest,
	nav::CallbackRedirect,
	store::MemoryStore,
};

#[derive(Debug, Deserialize)]
struct Product {
	id: u64,
	name: String,
	price: u32,
}

fn demo_token(exp: i64) -> String {
	format!(
		"{}.{}.demo",
		URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#),
		URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"demo-vendor","exp":{exp}}}"#)),
	)
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let now = OffsetDateTime::now_utc().unix_timestamp();
	let renewed = demo_token(now + 900);
	let server = MockServer::start_async().await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/refresh-token").header("authorization", "Bearer demo-refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body(format!(r#"{{"data":{{"access_token":"{renewed}"}}}}"#));
		})
		.await;
	let products_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/products").header("authorization", format!("Bearer {renewed}"));
			then.status(200).header("content-type", "application/json").body(
				r#"{"data":[{"id":1,"name":"Sourdough loaf","price":650},{"id":2,"name":"Duck eggs","price":480}]}"#,
			);
		})
		.await;
	let config = ClientConfig::builder(server.base_url()).build()?;
	let client = ReqwestAuthClient::new(config, Arc::new(MemoryStore::default())).with_redirect(
		Arc::new(CallbackRedirect::new(|login| println!("Session lost; would navigate to {login}."))),
	);

	client.login(CredentialPair::new(demo_token(now - 60), "demo-refresh")).await?;

	let products = client.fetch_data::<Vec<Product>>(ApiRequest::get("/api/products")).await?;

	for product in &products {
		println!("#{} {} ({} cents)", product.id, product.name, product.price);
	}

	refresh_mock.assert_async().await;
	products_mock.assert_async().await;

	println!("Refresh cycles executed: {}", client.refresh_metrics.executions());

	Ok(())
}
