// crates.io
use httpmock::prelude::*;
use reqwest::{
	Method,
	header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
// self
use outbound_auth::{
	_preludet::*,
	error::SendError,
	outbound::{InboundContext, PassThroughAuthenticator, TenantHeaderNames},
};

fn inbound_headers() -> HeaderMap {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
	headers.insert("x-agency-id", HeaderValue::from_static("7"));
	headers.insert("x-branch-id", HeaderValue::from_static("3"));

	headers
}

#[tokio::test]
async fn forwards_identity_and_tenant_headers() {
	let server = MockServer::start_async().await;
	let downstream = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/fuel-orders")
				.header("authorization", "Bearer abc123")
				.header("x-agency-id", "7")
				.header("x-branch-id", "3");
			then.status(200).body("{\"orders\":[]}");
		})
		.await;
	let authenticator =
		PassThroughAuthenticator::from_headers(&inbound_headers(), TenantHeaderNames::default());
	let client = build_test_client(&server.url("/api"), authenticator);
	let builder = client.request(Method::GET, "/fuel-orders").expect("Path should resolve.");
	let response = client.send(builder).await.expect("Pass-through send should succeed.");

	assert_eq!(response.status(), 200);

	downstream.assert_async().await;
}

#[tokio::test]
async fn missing_authorization_still_sends() {
	let server = MockServer::start_async().await;
	let downstream = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/branches")
				.header_missing("authorization")
				.header("x-agency-id", "7")
				.header_missing("x-branch-id");
			then.status(200);
		})
		.await;
	let context = InboundContext::new().with_agency_id(7).expect("Agency id should be valid.");
	let client = build_test_client(
		&server.url("/api"),
		PassThroughAuthenticator::new(context, TenantHeaderNames::default()),
	);
	let builder = client.request(Method::GET, "branches").expect("Path should resolve.");

	client.send(builder).await.expect("Absent identity is not an error.");

	downstream.assert_async().await;
}

#[tokio::test]
async fn repeated_sends_forward_identical_headers() {
	let server = MockServer::start_async().await;
	let downstream = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/deliveries")
				.header("authorization", "Bearer abc123")
				.header("x-agency-id", "7")
				.header("x-branch-id", "3");
			then.status(202);
		})
		.await;
	let authenticator =
		PassThroughAuthenticator::from_headers(&inbound_headers(), TenantHeaderNames::default());
	let client = build_test_client(&server.url("/api"), authenticator);

	for _ in 0..2 {
		let builder = client
			.request(Method::POST, "/deliveries")
			.expect("Path should resolve.")
			.body("{\"litres\":1200}");
		let response = client.send(builder).await.expect("Pass-through send should succeed.");

		assert_eq!(response.status(), 202);
	}

	downstream.assert_calls_async(2).await;
}

#[tokio::test]
async fn inbound_identity_replaces_caller_supplied_authorization() {
	let server = MockServer::start_async().await;
	let downstream = server
		.mock_async(|when, then| {
			when.path("/api/me").header("authorization", "Bearer abc123");
			then.status(200);
		})
		.await;
	let authenticator =
		PassThroughAuthenticator::from_headers(&inbound_headers(), TenantHeaderNames::default());
	let client = build_test_client(&server.url("/api"), authenticator);
	let builder = client
		.request(Method::GET, "/me")
		.expect("Path should resolve.")
		.header(AUTHORIZATION, "Basic c3RhbGU6c3RhbGU=");

	client.send(builder).await.expect("Pass-through send should succeed.");

	downstream.assert_async().await;
}

#[tokio::test]
async fn custom_tenant_header_names_are_honoured() {
	let server = MockServer::start_async().await;
	let downstream = server
		.mock_async(|when, then| {
			when.path("/api/tanks").header("agencyid", "11").header("branchid", "4");
			then.status(200);
		})
		.await;
	let names =
		TenantHeaderNames::new("AgencyId", "BranchId").expect("Custom header names should parse.");
	let mut inbound = HeaderMap::new();

	inbound.insert("agencyid", HeaderValue::from_static("11"));
	inbound.insert("branchid", HeaderValue::from_static("4"));

	let client = build_test_client(
		&server.url("/api"),
		PassThroughAuthenticator::from_headers(&inbound, names),
	);
	let builder = client.request(Method::GET, "/tanks").expect("Path should resolve.");

	client.send(builder).await.expect("Pass-through send should succeed.");

	downstream.assert_async().await;
}

#[tokio::test]
async fn downstream_statuses_and_failures_pass_through_unmodified() {
	let server = MockServer::start_async().await;
	let _maintenance = server
		.mock_async(|when, then| {
			when.path("/api/meters");
			then.status(503).body("maintenance");
		})
		.await;
	let client = build_test_client(&server.url("/api"), PassThroughAuthenticator::default());
	let builder = client.request(Method::GET, "/meters").expect("Path should resolve.");
	let response = client.send(builder).await.expect("Error statuses are still responses.");

	assert_eq!(response.status(), 503);
	assert_eq!(response.text().await.expect("Body should be readable."), "maintenance");

	let unreachable =
		build_test_client("http://127.0.0.1:1/api", PassThroughAuthenticator::default());
	let builder = unreachable.request(Method::GET, "/meters").expect("Path should resolve.");
	let err = unreachable.send(builder).await.expect_err("Closed ports must fail the send.");

	assert!(matches!(err, SendError::Downstream(_)));
	assert!(!err.is_token_failure());
}
