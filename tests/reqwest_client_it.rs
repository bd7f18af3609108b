#![cfg(feature = "reqwest")]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde::Deserialize;
use serde_json::json;
// self
use console_client::{
	client::ReqwestApiClient,
	decorate::LocaleState,
	descriptor::ApiDescriptor,
	error::ErrorKind,
	http::ApiRequest,
	store::MemoryCredentialStore,
	url::Url,
};

#[derive(Debug, Deserialize, PartialEq)]
struct Brand {
	id: u64,
	name: String,
}

fn build_client(
	base_url: &str,
) -> (ReqwestApiClient, Arc<MemoryCredentialStore>, Arc<LocaleState>) {
	let descriptor = ApiDescriptor::builder(
		Url::parse(base_url).expect("Mock server base URL should parse successfully."),
	)
	.build()
	.expect("Descriptor for the mock server should build successfully.");
	let store = Arc::new(MemoryCredentialStore::default());
	let locale = Arc::new(LocaleState::new("en"));
	let client = ReqwestApiClient::with_store(descriptor, store.clone(), locale.clone())
		.expect("Reqwest client should build for the mock server.");

	(client, store, locale)
}

#[tokio::test]
async fn expired_credential_is_refreshed_and_replayed() {
	let server = MockServer::start_async().await;
	let (client, store, _) = build_client(&server.url("/api"));
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/login");
			then.status(200)
				.header("content-type", "application/json")
				.header("set-cookie", "refresh=opaque-refresh; Path=/; HttpOnly")
				.body("{\"accessToken\":\"stale\"}");
		})
		.await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/brands").header("authorization", "Bearer stale");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"message\":\"Token expired.\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/auth/refresh")
				.header("cookie", "refresh=opaque-refresh")
				.header("accept-language", "en");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"accessToken\":\"fresh\"}");
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/brands").header("authorization", "Bearer fresh");
			then.status(200)
				.header("content-type", "application/json")
				.body("[{\"id\":1,\"name\":\"Acme\"}]");
		})
		.await;
	let session = client
		.send(ApiRequest::post("/auth/login").with_body(json!({ "email": "ops@example.com" })))
		.await
		.expect("Sign-in should succeed.");
	let token = session["accessToken"].as_str().expect("Sign-in should return an access token.");

	client.sign_in(token).expect("Credential should be stored.");

	let brands: Vec<Brand> =
		client.get("/brands").await.expect("Call should recover transparently.");

	assert_eq!(brands, vec![Brand { id: 1, name: "Acme".into() }]);
	assert_eq!(
		store.peek().map(|credential| credential.token.expose().to_owned()),
		Some("fresh".into())
	);

	login.assert_calls_async(1).await;
	stale.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	fresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn validation_failure_carries_details_and_request_id() {
	let server = MockServer::start_async().await;
	let (client, _, _) = build_client(&server.url("/api"));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/brands");
			then.status(422)
				.header("content-type", "application/json")
				.header("x-request-id", "req-42")
				.body(
					"{\"message\":\"Validation failed\",\"code\":\"VALIDATION\",\"errors\":{\"name\":[\"is required\"]}}",
				);
		})
		.await;
	let err = client
		.post::<_, Brand>("/brands", &json!({ "name": "" }))
		.await
		.expect_err("Invalid payloads should be rejected.");

	assert_eq!(err.kind(), ErrorKind::Validation);
	assert_eq!(err.status, Some(422));
	assert_eq!(err.message, "Validation failed");
	assert_eq!(err.code.as_deref(), Some("VALIDATION"));
	assert_eq!(err.details, Some(vec!["name: is required".to_owned()]));
	assert_eq!(err.request_id.as_deref(), Some("req-42"));

	mock.assert_async().await;
}

#[tokio::test]
async fn rate_limit_keeps_retry_after_verbatim() {
	let server = MockServer::start_async().await;
	let (client, _, _) = build_client(&server.url("/api"));
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/reports");
			then.status(429).header("retry-after", "30");
		})
		.await;
	let err = client
		.send(ApiRequest::get("/reports"))
		.await
		.expect_err("Rate-limited calls should fail.");

	assert_eq!(err.kind(), ErrorKind::RateLimited);
	assert_eq!(err.retry_after.as_deref(), Some("30"));
	assert_eq!(err.message, client.normalizer().messages().rate_limited);

	mock.assert_async().await;
}

#[tokio::test]
async fn locale_switch_applies_to_the_next_call() {
	let server = MockServer::start_async().await;
	let (client, _, locale) = build_client(&server.url("/api"));
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/profile").header("accept-language", "fr");
			then.status(200).header("content-type", "application/json").body("{\"id\":3}");
		})
		.await;

	locale.set("fr");

	let payload =
		client.send(ApiRequest::get("/profile")).await.expect("Localized call should succeed.");

	assert_eq!(payload, json!({ "id": 3 }));

	mock.assert_async().await;
}

#[tokio::test]
async fn unreachable_server_reads_as_network_failure() {
	let (client, _, _) = build_client("http://127.0.0.1:9/api");
	let err = client
		.send(ApiRequest::get("/brands"))
		.await
		.expect_err("Calls to a closed port should fail.");

	assert_eq!(err.kind(), ErrorKind::NetworkOrTimeout);
	assert_eq!(err.status, None);
	assert!(!err.is_canceled);
}
