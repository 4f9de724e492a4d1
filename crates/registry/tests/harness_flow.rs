use apidesk_registry::curl;
use apidesk_registry::executor::TestExecutor;
use apidesk_registry::harness::TestHarness;
use apidesk_registry::history::{HistoryRecorder, InMemoryHistory};
use apidesk_registry::model::{
    ApiDefinition, AuthType, EndpointDefinition, HttpMethod, RequestOverride,
};
use apidesk_test_support::TestServer;
use reqwest::Method;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

fn harness(history: Arc<InMemoryHistory>) -> TestHarness {
    TestHarness::new(TestExecutor::new().expect("executor"), history)
        .with_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn endpoint_test_resolves_executes_and_records() {
    let server = TestServer::spawn_echo().await.expect("server");
    let history = Arc::new(InMemoryHistory::new());
    let harness = harness(history.clone());

    let api = ApiDefinition::new("api-1", "Echo", format!("{}/", server.base_url()))
        .with_auth(AuthType::Bearer, "tok")
        .with_header("X-Client", "apidesk")
        .with_query_param("lang", "en");
    let endpoint = EndpointDefinition::new("ep-1", "api-1", "Create", HttpMethod::Post, "things")
        .with_header("X-Client", "endpoint")
        .with_body_template(json!({"title": "hello"}));

    let (request, result) = harness
        .run(&api, Some(&endpoint), &RequestOverride::default())
        .await
        .expect("resolved");

    assert_eq!(request.url, server.url("/things?lang=en"));
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.status, 200);

    let echoed: Value = serde_json::from_str(&result.body_text).expect("json");
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["path"], "/things");
    assert_eq!(echoed["query"], "lang=en");
    assert_eq!(echoed["headers"]["authorization"], "Bearer tok");
    assert_eq!(echoed["headers"]["x-client"], "endpoint");
    assert_eq!(echoed["headers"]["content-type"], "application/json");
    assert_eq!(
        serde_json::from_str::<Value>(echoed["body"].as_str().unwrap_or_default())
            .expect("body json"),
        json!({"title": "hello"})
    );

    let curl_text = result.curl_equivalent.clone().expect("curl attached");
    let reparsed = curl::parse(&curl_text).expect("curl parses");
    assert_eq!(reparsed, request);

    let recorded = history.entries_by_api("api-1").await.expect("history");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].request, request);
    assert_eq!(recorded[0].result, result);
}

#[tokio::test]
async fn overrides_win_and_history_is_most_recent_first() {
    let server = TestServer::spawn_echo().await.expect("server");
    let history = Arc::new(InMemoryHistory::new());
    let harness = harness(history.clone());

    let api = ApiDefinition::new("api-2", "Echo", server.base_url());
    let endpoint = EndpointDefinition::new("ep-2", "api-2", "Get", HttpMethod::Get, "/first")
        .with_header("X-Mode", "1");

    harness
        .run(&api, Some(&endpoint), &RequestOverride::default())
        .await
        .expect("first run");

    let custom = server.url("/elsewhere");
    let overrides = RequestOverride::default()
        .with_url(&custom)
        .with_method(Method::PUT)
        .with_header("X-Mode", "2")
        .with_body("raw");
    let (request, result) = harness
        .run(&api, Some(&endpoint), &overrides)
        .await
        .expect("second run");

    assert_eq!(request.url, custom);
    let echoed: Value = serde_json::from_str(&result.body_text).expect("json");
    assert_eq!(echoed["method"], "PUT");
    assert_eq!(echoed["path"], "/elsewhere");
    assert_eq!(echoed["headers"]["x-mode"], "2");
    assert_eq!(echoed["body"], "raw");

    let results = history.list_by_api("api-2").await.expect("history");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].url, custom);
    assert_eq!(results[1].url, server.url("/first"));
}
