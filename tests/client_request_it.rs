#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use skyeye_client::{
	_preludet::*,
	auth::TokenPair,
	client::Payload,
	http::{ApiRequest, FormPart},
	store::SessionStore,
};

async fn seed_tokens(harness: &TestHarness, access: &str, refresh: &str) {
	harness
		.store
		.save_tokens(&TokenPair::new(access, refresh))
		.await
		.expect("Failed to seed tokens into the store.");
}

#[tokio::test]
async fn success_envelope_unwraps_data_and_attaches_bearer() {
	let server = MockServer::start_async().await;
	let (client, harness) = build_test_client(&server.base_url());

	// The mock server speaks TLS with a self-signed certificate.
	assert!(server.base_url().starts_with("https://"));

	seed_tokens(&harness, "access-a", "refresh-a").await;

	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/devices/1")
				.query_param("verbose", "true")
				.header("authorization", "Bearer access-a");
			then.status(200).json_body(json!({ "code": 200, "message": "ok", "data": { "foo": 1 } }));
		})
		.await;
	let data: Value = client
		.request(ApiRequest::get("/api/devices/1").query("verbose", true))
		.await
		.expect("Successful envelopes should resolve.");

	mock.assert_calls_async(1).await;

	assert_eq!(data, json!({ "foo": 1 }));
	assert!(harness.observer.notices().is_empty());
}

#[tokio::test]
async fn application_failure_notifies_mapped_message() {
	let server = MockServer::start_async().await;
	let (client, harness) = build_test_client(&server.base_url());

	seed_tokens(&harness, "access-b", "refresh-b").await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/collectors");
			then.status(200).json_body(json!({ "code": 403, "message": "forbidden", "data": null }));
		})
		.await;

	let err = client
		.execute(
			ApiRequest::post("/api/collectors")
				.json(&json!({ "name": "north-gate" }))
				.expect("Request body should serialize."),
		)
		.await
		.expect_err("Non-success envelopes should reject.");

	match &err {
		Error::Api(api) => {
			assert_eq!(api.code, 403);
			assert_eq!(api.server_message.as_deref(), Some("forbidden"));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
	assert_eq!(err.user_message(), "权限不足，拒绝访问");
	assert_eq!(harness.observer.notice_messages(), ["权限不足，拒绝访问"]);
	assert!(harness.observer.terminations().is_empty());
}

#[tokio::test]
async fn unknown_codes_surface_the_server_message() {
	let server = MockServer::start_async().await;
	let (client, harness) = build_test_client(&server.base_url());

	server
		.mock_async(|when, then| {
			when.method(PUT).path("/api/collector/scheduler/pause");
			then.status(200).json_body(json!({ "code": 1201, "message": "调度器未启动" }));
		})
		.await;

	let err = client
		.execute(ApiRequest::put("/api/collector/scheduler/pause"))
		.await
		.expect_err("Unknown codes should reject.");

	assert!(matches!(err, Error::Api(ref api) if api.code == 1201));
	assert_eq!(harness.observer.notice_messages(), ["调度器未启动"]);
}

#[tokio::test]
async fn malformed_envelope_rejects_with_envelope_error() {
	let server = MockServer::start_async().await;
	let (client, harness) = build_test_client(&server.base_url());

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/settings");
			then.status(200).header("content-type", "application/json").body("{\"message\":\"ok\"}");
		})
		.await;

	let err = client
		.execute(ApiRequest::get("/api/settings"))
		.await
		.expect_err("Envelopes without a code should reject.");

	assert!(matches!(err, Error::Envelope(_)));
	assert_eq!(harness.observer.notice_messages(), ["请求失败"]);
}

#[tokio::test]
async fn http_failures_map_the_status_table() {
	let server = MockServer::start_async().await;
	let (client, harness) = build_test_client(&server.base_url());

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/alerts/rules");
			then.status(500).body("upstream exploded");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/teapot");
			then.status(418).body("short and stout");
		})
		.await;

	let err = client
		.execute(ApiRequest::get("/api/alerts/rules"))
		.await
		.expect_err("HTTP 500 should reject.");

	assert!(matches!(err, Error::Http { status: 500, .. }));

	let err =
		client.execute(ApiRequest::get("/api/teapot")).await.expect_err("HTTP 418 should reject.");

	assert!(matches!(err, Error::Http { status: 418, .. }));
	assert_eq!(harness.observer.notice_messages(), ["服务器内部错误", "请求失败: 418"]);
	assert!(!client.is_refreshing());
}

#[tokio::test]
async fn unreachable_server_reports_transport_error() {
	let (client, harness) = build_test_client("http://127.0.0.1:1");
	let err = client
		.execute(ApiRequest::get("/api/devices"))
		.await
		.expect_err("Requests to a closed port should fail.");

	assert!(matches!(err, Error::Transport(_)));
	assert_eq!(harness.observer.notices().len(), 1);
	assert_eq!(harness.observer.notice_messages()[0], err.user_message());
}

#[tokio::test]
async fn blob_requests_skip_envelope_unwrapping() {
	let server = MockServer::start_async().await;
	let (client, _) = build_test_client(&server.base_url());

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/devices/export");
			then.status(200).header("content-type", "text/csv").body("id,name\n1,north-gate\n");
		})
		.await;

	let bytes = client
		.download(ApiRequest::get("/api/devices/export"))
		.await
		.expect("Blob downloads should succeed.");

	assert_eq!(bytes, b"id,name\n1,north-gate\n");
}

#[tokio::test]
async fn multipart_uploads_reach_the_server() {
	let server = MockServer::start_async().await;
	let (client, harness) = build_test_client(&server.base_url());

	seed_tokens(&harness, "access-m", "refresh-m").await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/firmware")
				.header("authorization", "Bearer access-m")
				.body_includes("camera-v2.bin");
			then.status(200).json_body(json!({ "code": 200, "data": { "uploaded": true } }));
		})
		.await;
	let payload = client
		.execute(ApiRequest::post("/api/firmware").multipart(vec![
			FormPart::text("model", "camera-v2"),
			FormPart::file(
				"file",
				"camera-v2.bin",
				Some("application/octet-stream".into()),
				vec![0, 1, 2, 3],
			),
		]))
		.await
		.expect("Multipart uploads should succeed.");

	mock.assert_async().await;

	assert_eq!(payload, Payload::Json(json!({ "uploaded": true })));
}
