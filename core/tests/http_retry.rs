use pulseboard_core::config::ClientConfig;
use pulseboard_core::http::HttpClient;
use pulseboard_core::http::HttpError;
use std::time::Duration;
use std::time::Instant;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;

fn fast_client(server: &MockServer) -> HttpClient {
    let config = ClientConfig::default()
        .with_base_url(server.uri())
        .with_base_backoff(Duration::from_millis(5));
    HttpClient::new(config).expect("client")
}

#[tokio::test]
async fn persistent_500_makes_exactly_four_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analytics"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let client = fast_client(&server);
    let err = client
        .get("/api/analytics", &[])
        .await
        .expect_err("terminal error after retries");
    assert_eq!(err.status(), Some(500));

    server.verify().await;
}

#[tokio::test]
async fn bad_request_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/marketing/campaign-metrics"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({ "detail": "min_roi must be numeric" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = fast_client(&server);
    let err = client
        .get("/api/marketing/campaign-metrics", &[])
        .await
        .expect_err("terminal 400");
    assert_eq!(err.status(), Some(400));
    // server-supplied detail is preferred over the generic message
    assert_eq!(err.to_string(), "min_roi must be numeric");

    server.verify().await;
}

#[tokio::test]
async fn throttled_request_recovers_after_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/optimization/metrics"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/optimization/metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "currentEfficiency": 0.6,
            "targetEfficiency": 0.8,
            "improvementPotential": 0.2,
            "areas": [],
        })))
        .mount(&server)
        .await;

    let client = fast_client(&server);
    let response = client
        .get("/api/optimization/metrics", &[])
        .await
        .expect("recovered after throttling");
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn connection_failure_surfaces_as_transport_error() {
    // nothing is listening on this address
    let config = ClientConfig::default()
        .with_base_url("http://127.0.0.1:9")
        .with_base_backoff(Duration::from_millis(1))
        .with_max_retries(1);
    let client = HttpClient::new(config).expect("client");

    let err = client
        .get("/api/analytics", &[])
        .await
        .expect_err("no backend");
    assert!(matches!(err, HttpError::Transport { .. }));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn retry_delays_follow_exponential_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analytics"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let client = HttpClient::new(
        ClientConfig::default().with_base_url(server.uri()),
    )
    .expect("client");

    let started = Instant::now();
    let _ = client.get("/api/analytics", &[]).await;
    let elapsed = started.elapsed();

    // 200 + 400 + 800 = 1400ms of backoff before the fourth attempt; allow
    // generous scheduling slack on either side
    assert!(elapsed >= Duration::from_millis(1300), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(10), "elapsed {elapsed:?}");

    server.verify().await;
}

#[tokio::test]
async fn query_params_reach_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analytics/predict"))
        .and(query_param("horizon_days", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "forecast": [],
            "confidence": 0.5,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = fast_client(&server);
    let response = client
        .get(
            "/api/analytics/predict",
            &[("horizon_days".to_string(), "2".to_string())],
        )
        .await
        .expect("predict");
    assert_eq!(response.status, 200);

    server.verify().await;
}
