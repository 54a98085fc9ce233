#![cfg(all(feature = "reqwest", feature = "test"))]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use monalytics_loader::{
	_preludet::*,
	error::{ConfigError, ContentError, TransportError},
	id::DataType,
	loader::FetchOutcome,
};

const INDICADORES_BODY: &str =
	r#"{"ultima_atualizacao":"2026-01-05T12:00:00Z","indicadores":{"selic":10.5,"ipca":4.1}}"#;
const BOLSA_BODY: &str =
	r#"{"ultima_atualizacao":"2026-01-05T12:00:00Z","acoes":[{"ticker":"PETR4","pl":4.2}]}"#;
const NOTICIAS_BODY: &str = r#"{"ultima_atualizacao":"2026-01-05T12:00:00Z","noticias":[]}"#;

#[tokio::test]
async fn indicadores_are_fetched_once_then_served_from_cache() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/main/data/indicadores.json");
			then.status(200).header("content-type", "application/json").body(INDICADORES_BODY);
		})
		.await;
	let (loader, clock) = build_reqwest_test_loader(test_config(&server.base_url()));
	let expected: Value =
		serde_json::from_str(INDICADORES_BODY).expect("Fixture body should be valid JSON.");
	let first = loader.fetch_outcome("indicadores").await;
	let second = loader.fetch_outcome("indicadores").await;

	assert!(matches!(&first, FetchOutcome::Fresh(data) if *data == expected));
	assert!(matches!(&second, FetchOutcome::Cached(data) if *data == expected));

	mock.assert_calls_async(1).await;

	clock.advance(Duration::seconds(31));

	let refreshed = loader.fetch_json("indicadores").await;

	assert_eq!(refreshed, Some(expected));
	assert_eq!(loader.metrics.network_requests(), 2);
	assert_eq!(loader.metrics.cache_hits(), 1);

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn requests_bust_caches_and_disable_intermediary_caching() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/main/data/noticias.json")
				.query_param("t", "1767618000000")
				.query_param("attempt", "1")
				.header("cache-control", "no-cache, no-store")
				.header("pragma", "no-cache");
			then.status(200).header("content-type", "application/json").body(NOTICIAS_BODY);
		})
		.await;
	let (loader, _clock) = build_reqwest_test_loader(test_config(&server.base_url()));

	assert!(loader.fetch_json("noticias").await.is_some());

	mock.assert_async().await;
}

#[tokio::test]
async fn stale_payload_is_served_when_refetch_fails() {
	let server = MockServer::start_async().await;
	let healthy = server
		.mock_async(|when, then| {
			when.method(GET).path("/main/data/bolsa.json");
			then.status(200).header("content-type", "application/json").body(BOLSA_BODY);
		})
		.await;
	let (loader, clock) = build_reqwest_test_loader(test_config(&server.base_url()));
	let cached = loader.fetch_json("bolsa").await.expect("Initial fetch should succeed.");

	healthy.delete_async().await;

	let failing = server
		.mock_async(|when, then| {
			when.method(GET).path("/main/data/bolsa.json");
			then.status(500);
		})
		.await;

	clock.advance(Duration::minutes(2));

	match loader.fetch_outcome("bolsa").await {
		FetchOutcome::StaleFallback { data, reason } => {
			assert_eq!(data, cached);
			assert!(matches!(
				reason,
				Error::Transport(TransportError::Status { status: 500, .. })
			));
		},
		other => panic!("Unexpected outcome: {other:?}."),
	}

	failing.assert_calls_async(3).await;

	assert_eq!(loader.metrics.stale_fallbacks(), 1);
}

#[tokio::test]
async fn failure_without_cache_resolves_to_none() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/main/data/noticias.json");
			then.status(404);
		})
		.await;
	let (loader, _clock) = build_reqwest_test_loader(test_config(&server.base_url()));

	assert_eq!(loader.fetch_json("noticias").await, None);
	assert_eq!(loader.metrics.failures(), 1);

	mock.assert_calls_async(3).await;
}

#[tokio::test]
async fn schema_failures_are_not_retried() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/main/data/indicadores.json");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"ultima_atualizacao":"2026-01-05T12:00:00Z"}"#);
		})
		.await;
	let (loader, _clock) = build_reqwest_test_loader(test_config(&server.base_url()));

	match loader.fetch_outcome("indicadores").await {
		FetchOutcome::Failed(Error::Schema { data_type, missing }) => {
			assert_eq!(data_type, DataType::indicadores());
			assert_eq!(missing, vec!["indicadores".to_string()]);
		},
		other => panic!("Unexpected outcome: {other:?}."),
	}

	mock.assert_calls_async(1).await;

	assert!(loader.cache.is_empty());
}

#[tokio::test]
async fn html_error_pages_are_retried_then_reported() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/main/data/bolsa.json");
			then.status(200)
				.header("content-type", "text/html; charset=utf-8")
				.body("<!DOCTYPE html><html><body>Not Found</body></html>");
		})
		.await;
	let (loader, _clock) = build_reqwest_test_loader(test_config(&server.base_url()));
	let outcome = loader.fetch_outcome("bolsa").await;

	assert!(matches!(
		outcome.error(),
		Some(Error::Content(ContentError::HtmlErrorPage { .. }))
	));

	mock.assert_calls_async(3).await;
}

#[tokio::test]
async fn plain_text_json_is_accepted() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/main/data/bolsa.json");
			then.status(200).header("content-type", "text/plain; charset=utf-8").body(BOLSA_BODY);
		})
		.await;
	let (loader, _clock) = build_reqwest_test_loader(test_config(&server.base_url()));
	let data = loader.fetch_json("bolsa").await.expect("Plain-text JSON should be accepted.");

	assert_eq!(data["acoes"][0]["ticker"], "PETR4");

	mock.assert_async().await;
}

#[tokio::test]
async fn dangerous_keys_are_stripped_before_caching() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/main/data/noticias.json");
			then.status(200).header("content-type", "application/json").body(
				r#"{"ultima_atualizacao":"x","constructor":{"prototype":{}},"noticias":[{"titulo":"Ibovespa sobe","__proto__":{"polluted":true}}]}"#,
			);
		})
		.await;
	let (loader, _clock) = build_reqwest_test_loader(test_config(&server.base_url()));
	let expected = json!({
		"ultima_atualizacao": "x",
		"noticias": [{ "titulo": "Ibovespa sobe" }]
	});

	assert_eq!(loader.fetch_json("noticias").await, Some(expected.clone()));
	assert_eq!(loader.cache.get("noticias"), Some(expected));

	mock.assert_async().await;
}

#[tokio::test]
async fn disallowed_origin_never_reaches_the_network() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/main/data/bolsa.json");
			then.status(200).header("content-type", "application/json").body(BOLSA_BODY);
		})
		.await;
	let (loader, _clock) = build_reqwest_test_loader(
		test_config(&server.base_url()).with_page_host("phishing.example.net"),
	);

	match loader.fetch_outcome("bolsa").await {
		FetchOutcome::Failed(Error::Unauthorized { host }) =>
			assert_eq!(host, "phishing.example.net"),
		other => panic!("Unexpected outcome: {other:?}."),
	}

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn rate_limited_session_falls_back_until_block_expires() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/main/data/bolsa.json");
			then.status(200).header("content-type", "application/json").body(BOLSA_BODY);
		})
		.await;
	let (loader, clock) = build_reqwest_test_loader(
		test_config(&server.base_url()).with_max_requests_per_minute(2),
	);

	assert!(matches!(loader.fetch_outcome("bolsa").await, FetchOutcome::Fresh(_)));
	assert!(matches!(loader.fetch_outcome("bolsa").await, FetchOutcome::Cached(_)));

	match loader.fetch_outcome("bolsa").await {
		FetchOutcome::StaleFallback { reason: Error::RateLimited { session, .. }, .. } =>
			assert_eq!(session, test_session()),
		other => panic!("Unexpected outcome: {other:?}."),
	}

	clock.advance(Duration::seconds(61));

	assert!(matches!(loader.fetch_outcome("bolsa").await, FetchOutcome::Fresh(_)));

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn zero_quota_fails_without_network_calls() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/main/data/bolsa.json");
			then.status(200).header("content-type", "application/json").body(BOLSA_BODY);
		})
		.await;
	let (loader, _clock) = build_reqwest_test_loader(
		test_config(&server.base_url()).with_max_requests_per_minute(0),
	);

	assert!(matches!(
		loader.fetch_outcome("bolsa").await,
		FetchOutcome::Failed(Error::RateLimited { .. })
	));

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn unknown_data_types_fail_without_network_calls() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET);
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;
	let (loader, _clock) = build_reqwest_test_loader(test_config(&server.base_url()));

	assert!(matches!(
		loader.fetch_outcome("cotacoes").await,
		FetchOutcome::Failed(Error::Config(ConfigError::UnknownDataType { .. }))
	));
	assert!(matches!(
		loader.fetch_outcome("not valid").await,
		FetchOutcome::Failed(Error::Config(ConfigError::InvalidIdentifier(_)))
	));

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn coalesced_callers_share_one_request() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/main/data/indicadores.json");
			then.status(200).header("content-type", "application/json").body(INDICADORES_BODY);
		})
		.await;
	let (loader, _clock) = build_reqwest_test_loader(
		test_config(&server.base_url()).with_coalesced_requests(true),
	);
	let (first, second) =
		tokio::join!(loader.fetch_json("indicadores"), loader.fetch_json("indicadores"));

	assert!(first.is_some());
	assert_eq!(first, second);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn uncoalesced_callers_each_hit_the_network() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/main/data/indicadores.json");
			then.status(200).header("content-type", "application/json").body(INDICADORES_BODY);
		})
		.await;
	let (loader, _clock) = build_reqwest_test_loader(test_config(&server.base_url()));
	let (first, second) =
		tokio::join!(loader.fetch_json("indicadores"), loader.fetch_json("indicadores"));

	assert_eq!(first, second);

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn fetch_all_loads_every_registered_source() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;

	for (path, body) in [
		("/main/data/bolsa.json", BOLSA_BODY),
		("/main/data/indicadores.json", INDICADORES_BODY),
		("/main/data/noticias.json", NOTICIAS_BODY),
	] {
		server
			.mock_async(|when, then| {
				when.method(GET).path(path);
				then.status(200).header("content-type", "application/json").body(body);
			})
			.await;
	}

	let (loader, _clock) = build_reqwest_test_loader(test_config(&server.base_url()));
	let results = loader.fetch_all().await;

	assert_eq!(results.len(), 3);
	assert!(results.values().all(Option::is_some));
	assert_eq!(results[&DataType::noticias()], Some(serde_json::from_str::<Value>(NOTICIAS_BODY)?));

	loader.clear_cache();

	assert!(loader.cache.is_empty());

	Ok(())
}
