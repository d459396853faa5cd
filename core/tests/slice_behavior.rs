use pulseboard_core::cache::FetchCache;
use pulseboard_core::config::ClientConfig;
use pulseboard_core::dashboard::Dashboard;
use pulseboard_core::http::HttpClient;
use pulseboard_core::mock;
use pulseboard_core::slices::optimization::RecommendationStatus;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;

fn dashboard(server: &MockServer) -> Dashboard {
    let config = ClientConfig::default()
        .with_base_url(server.uri())
        .with_base_backoff(Duration::from_millis(5));
    let client = Arc::new(HttpClient::new(config).expect("client"));
    Dashboard::with_parts(client, FetchCache::default())
}

#[tokio::test]
async fn aggregate_fetch_populates_slice_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analytics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_sales": 1000,
            "avg_order_value": 50,
            "orders_count": 20,
            "by_day": [],
        })))
        .mount(&server)
        .await;

    let dashboard = dashboard(&server);
    dashboard.analytics.fetch_aggregate().await;

    let state = dashboard.analytics.aggregate();
    let aggregate = state.data.expect("aggregate populated");
    assert_eq!(aggregate.total_sales, 1000.0);
    assert_eq!(aggregate.avg_order_value, 50.0);
    assert_eq!(aggregate.orders_count, 20);
    assert!(aggregate.by_day.is_empty());
    assert!(!state.loading);
    assert_eq!(state.error, None);
    assert!(state.last_updated.is_some());
}

#[tokio::test]
async fn forecast_points_keep_their_date_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analytics/predict"))
        .and(query_param("horizon_days", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "forecast": [
                { "date": "2025-11-05", "predicted_sales": 1200 },
                { "date": "2025-11-06", "predicted_sales": 1215 },
            ],
        })))
        .mount(&server)
        .await;

    let dashboard = dashboard(&server);
    dashboard.analytics.fetch_predictions(Some(2)).await;

    let predictions = dashboard
        .analytics
        .predictions()
        .data
        .expect("predictions populated");
    assert_eq!(predictions.forecast.len(), 2);
    assert_eq!(predictions.forecast[0].date, "2025-11-05");
    assert_eq!(predictions.forecast[0].predicted_sales, 1200.0);
    assert_eq!(predictions.forecast[1].date, "2025-11-06");
    assert_eq!(predictions.forecast[1].predicted_sales, 1215.0);
}

#[tokio::test]
async fn missing_route_substitutes_mock_data_without_error() {
    // nothing mounted: every request gets 404
    let server = MockServer::start().await;
    let dashboard = dashboard(&server);

    dashboard
        .marketing
        .fetch_campaigns(&Default::default())
        .await;

    let state = dashboard.marketing.campaigns();
    assert_eq!(state.error, None);
    assert_eq!(state.data, Some(mock::marketing_campaigns()));
    assert!(!state.loading);
}

#[tokio::test]
async fn terminal_error_preserves_existing_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analytics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_sales": 245000.5,
            "avg_order_value": 189.75,
            "orders_count": 1290,
            "by_day": [],
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/analytics"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "detail": "aggregation failed" })),
        )
        .mount(&server)
        .await;

    let dashboard = dashboard(&server);
    dashboard.analytics.fetch_aggregate().await;
    let before = dashboard.analytics.aggregate().data.expect("first fetch");

    dashboard.analytics.refresh().await;

    let state = dashboard.analytics.aggregate();
    assert_eq!(state.data, Some(before));
    assert_eq!(state.error, Some("aggregation failed".to_string()));
    assert!(!state.loading);
}

#[tokio::test]
async fn apply_recommendation_flips_status_optimistically() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/optimization/recommendations/rec-1/apply"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let dashboard = dashboard(&server);
    dashboard
        .optimization
        .set_recommendations(mock::optimization_recommendations());

    dashboard.optimization.apply_recommendation("rec-1").await;

    let recommendations = dashboard
        .optimization
        .recommendations()
        .data
        .expect("recommendations");
    let applied = recommendations
        .iter()
        .find(|rec| rec.id == "rec-1")
        .expect("rec-1 present");
    assert_eq!(applied.status, RecommendationStatus::Applied);
    let untouched = recommendations
        .iter()
        .find(|rec| rec.id == "rec-2")
        .expect("rec-2 present");
    assert_eq!(untouched.status, RecommendationStatus::Pending);
    assert_eq!(
        dashboard.optimization.active_optimizations(),
        vec!["rec-1".to_string()]
    );

    server.verify().await;
}

#[tokio::test]
async fn reject_on_demo_backend_tolerates_missing_route() {
    // POST route absent: the 404 is tolerated and the flip still happens
    let server = MockServer::start().await;
    let dashboard = dashboard(&server);
    dashboard
        .optimization
        .set_recommendations(mock::optimization_recommendations());

    dashboard.optimization.reject_recommendation("rec-2").await;

    let recommendations = dashboard
        .optimization
        .recommendations()
        .data
        .expect("recommendations");
    let rejected = recommendations
        .iter()
        .find(|rec| rec.id == "rec-2")
        .expect("rec-2 present");
    assert_eq!(rejected.status, RecommendationStatus::Rejected);
    assert_eq!(dashboard.optimization.recommendations().error, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slower_stale_response_does_not_overwrite_newer_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analytics/predict"))
        .and(query_param("horizon_days", "5"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "forecast": [{ "date": "2026-08-06", "predicted_sales": 100 }],
                }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/analytics/predict"))
        .and(query_param("horizon_days", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "forecast": [{ "date": "2026-08-06", "predicted_sales": 999 }],
        })))
        .mount(&server)
        .await;

    let dashboard = dashboard(&server);
    let analytics = Arc::clone(&dashboard.analytics);
    let slow = tokio::spawn(async move { analytics.fetch_predictions(Some(5)).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    dashboard.analytics.fetch_predictions(Some(7)).await;
    slow.await.expect("slow fetch task");

    let predictions = dashboard
        .analytics
        .predictions()
        .data
        .expect("predictions populated");
    assert_eq!(predictions.forecast[0].predicted_sales, 999.0);
}

#[tokio::test]
async fn product_forecasts_upsert_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health-intel/products/metrics"))
        .and(query_param("product_id", "sku-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "product_name": "Granola",
            "forecast": [{ "date": "2026-08-10", "value": 420.0 }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health-intel/products/metrics"))
        .and(query_param("product_id", "sku-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "product_name": "Oat Bars",
            "forecast": [{ "date": "2026-08-10", "value": 120.0 }],
        })))
        .mount(&server)
        .await;

    let dashboard = dashboard(&server);
    dashboard
        .forecasting
        .fetch_multiple_forecasts(&["sku-1".to_string(), "sku-2".to_string()])
        .await;

    let state = dashboard.forecasting.forecasts();
    let forecasts = state.data.expect("forecast list");
    assert_eq!(forecasts.len(), 2);
    assert_eq!(forecasts[0].product_id, "sku-1");
    assert_eq!(forecasts[1].product_id, "sku-2");
    assert_eq!(state.error, None);

    // refetching one product replaces its entry instead of appending
    dashboard
        .forecasting
        .fetch_product_forecast("sku-1", &Default::default())
        .await;
    let forecasts = dashboard
        .forecasting
        .forecasts()
        .data
        .expect("forecast list");
    assert_eq!(forecasts.len(), 2);
}

#[tokio::test]
async fn forecasting_missing_route_is_an_error_not_a_fallback() {
    let server = MockServer::start().await;
    let dashboard = dashboard(&server);

    dashboard.forecasting.fetch_metrics().await;

    let state = dashboard.forecasting.metrics();
    assert_eq!(state.data, None);
    assert!(state.error.is_some());
}
