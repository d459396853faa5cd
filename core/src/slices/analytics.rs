use crate::cache::FetchCache;
use crate::http::HttpClient;
use crate::mock;
use crate::slice::Resource;
use crate::slice::ResourceOptions;
use crate::slice::SliceState;
use crate::slice::SliceStatus;
use crate::slices::DateRange;
use crate::slices::cached_get;
use crate::slices::param;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::sync::Mutex;

pub const DEFAULT_HORIZON_DAYS: u32 = 5;
pub const DEFAULT_LIVE_WINDOW: &str = "24h";

const AGGREGATE_PATH: &str = "/api/analytics";
const PREDICT_PATH: &str = "/api/analytics/predict";
const LIVE_PATH: &str = "/api/analytics/live";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySales {
    pub date: String,
    pub sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsAggregate {
    pub total_sales: f64,
    pub avg_order_value: f64,
    pub orders_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_growth_pct: Option<f64>,
    #[serde(default)]
    pub by_day: Vec<DailySales>,
}

/// One forecasted day. Points arrive ordered by date and the order is
/// preserved as-is for chart consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionPoint {
    pub date: String,
    pub predicted_sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsPrediction {
    pub forecast: Vec<PredictionPoint>,
    #[serde(default)]
    pub confidence: f64,
}

/// Live rollup keyed by metric name; the backend decides the metric set.
pub type LiveMetrics = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsFilters {
    pub date_range: DateRange,
    pub selected_metrics: Vec<String>,
}

/// Sales analytics: aggregate KPIs, forecast points, and the live rollup.
/// All three endpoints may be absent in demo environments, so each carries a
/// mock fallback for 404.
pub struct AnalyticsSlice {
    client: Arc<HttpClient>,
    cache: FetchCache,
    aggregate: Resource<AnalyticsAggregate>,
    predictions: Resource<AnalyticsPrediction>,
    live_metrics: Resource<LiveMetrics>,
    filters: Mutex<AnalyticsFilters>,
}

impl AnalyticsSlice {
    pub fn new(client: Arc<HttpClient>, cache: FetchCache) -> Self {
        Self {
            client,
            cache,
            aggregate: Resource::new(
                ResourceOptions::default().with_not_found_fallback(mock::analytics_aggregate),
            ),
            predictions: Resource::new(
                ResourceOptions::default().with_not_found_fallback(mock::analytics_predictions),
            ),
            live_metrics: Resource::new(
                ResourceOptions::default().with_not_found_fallback(mock::analytics_live_metrics),
            ),
            filters: Mutex::new(AnalyticsFilters::default()),
        }
    }

    pub async fn fetch_aggregate(&self) {
        self.load_aggregate(false).await;
    }

    pub async fn fetch_predictions(&self, horizon_days: Option<u32>) {
        self.load_predictions(horizon_days, false).await;
    }

    pub async fn fetch_live_metrics(&self, window: Option<&str>) {
        self.load_live_metrics(window, false).await;
    }

    /// Refetches all three values concurrently. Aggregate-typed data is
    /// replaced wholesale, so nothing is cleared up front.
    pub async fn refresh(&self) {
        tokio::join!(
            self.load_aggregate(true),
            self.load_predictions(None, true),
            self.load_live_metrics(None, true),
        );
    }

    async fn load_aggregate(&self, force: bool) {
        let future = async {
            cached_get(&self.client, &self.cache, AGGREGATE_PATH, Vec::new(), force)
                .await
                .decode()
        };
        if force {
            self.aggregate.refresh_with(future).await;
        } else {
            self.aggregate.fetch_with(future).await;
        }
    }

    async fn load_predictions(&self, horizon_days: Option<u32>, force: bool) {
        let horizon = horizon_days.unwrap_or(DEFAULT_HORIZON_DAYS);
        let params = vec![param("horizon_days", horizon)];
        let future = async {
            cached_get(&self.client, &self.cache, PREDICT_PATH, params, force)
                .await
                .decode()
        };
        if force {
            self.predictions.refresh_with(future).await;
        } else {
            self.predictions.fetch_with(future).await;
        }
    }

    async fn load_live_metrics(&self, window: Option<&str>, force: bool) {
        let window = window.unwrap_or(DEFAULT_LIVE_WINDOW);
        let params = vec![param("window", window)];
        let future = async {
            cached_get(&self.client, &self.cache, LIVE_PATH, params, force)
                .await
                .decode()
        };
        if force {
            self.live_metrics.refresh_with(future).await;
        } else {
            self.live_metrics.fetch_with(future).await;
        }
    }

    pub fn aggregate(&self) -> SliceState<AnalyticsAggregate> {
        self.aggregate.snapshot()
    }

    pub fn predictions(&self) -> SliceState<AnalyticsPrediction> {
        self.predictions.snapshot()
    }

    pub fn live_metrics(&self) -> SliceState<LiveMetrics> {
        self.live_metrics.snapshot()
    }

    pub fn status(&self) -> SliceStatus {
        SliceStatus::merge([
            self.aggregate.status(),
            self.predictions.status(),
            self.live_metrics.status(),
        ])
    }

    pub fn set_aggregate(&self, data: AnalyticsAggregate) {
        self.aggregate.set(data);
    }

    pub fn set_predictions(&self, data: AnalyticsPrediction) {
        self.predictions.set(data);
    }

    pub fn set_live_metrics(&self, data: LiveMetrics) {
        self.live_metrics.set(data);
    }

    /// Edits the aggregate in place without a network call.
    pub fn update_aggregate<F>(&self, edit: F)
    where
        F: FnOnce(&mut AnalyticsAggregate),
    {
        self.aggregate.update(|data| {
            if let Some(aggregate) = data {
                edit(aggregate);
            }
        });
    }

    pub fn dismiss_errors(&self) {
        self.aggregate.dismiss_error();
        self.predictions.dismiss_error();
        self.live_metrics.dismiss_error();
    }

    pub fn filters(&self) -> AnalyticsFilters {
        self.filters.lock().expect("analytics filters lock").clone()
    }

    pub fn set_date_range(&self, start: Option<String>, end: Option<String>) {
        self.filters.lock().expect("analytics filters lock").date_range = DateRange { start, end };
    }

    pub fn set_selected_metrics(&self, metrics: Vec<String>) {
        self.filters
            .lock()
            .expect("analytics filters lock")
            .selected_metrics = metrics;
    }

    pub fn reset_filters(&self) {
        *self.filters.lock().expect("analytics filters lock") = AnalyticsFilters::default();
    }
}
