use crate::api::ApiResult;
use crate::cache::FetchCache;
use crate::http::HttpClient;
use crate::slice::Resource;
use crate::slice::ResourceOptions;
use crate::slice::SliceState;
use crate::slice::SliceStatus;
use crate::slices::DateRange;
use crate::slices::cached_get;
use crate::slices::param;
use futures::future::join_all;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;
use std::sync::Mutex;

pub const DEFAULT_HORIZON_DAYS: u32 = 30;

const PRODUCT_METRICS_PATH: &str = "/health-intel/products/metrics";
const METRICS_PATH: &str = "/api/forecasting/metrics";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductForecast {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default)]
    pub forecast: Vec<ForecastPoint>,
    #[serde(default)]
    pub historical: Vec<ForecastPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
}

/// The product endpoint's body, before the requested id is attached.
#[derive(Debug, Clone, Deserialize)]
struct ProductForecastPayload {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    forecast: Vec<ForecastPoint>,
    #[serde(default)]
    historical: Vec<ForecastPoint>,
    #[serde(default)]
    accuracy: Option<f64>,
    #[serde(default)]
    model_type: Option<String>,
}

impl ProductForecastPayload {
    fn into_forecast(self, product_id: String) -> ProductForecast {
        ProductForecast {
            product_id,
            product_name: self.product_name,
            forecast: self.forecast,
            historical: self.historical,
            accuracy: self.accuracy,
            model_type: self.model_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    pub total_forecasted_revenue: f64,
    pub forecasted_growth: f64,
    pub confidence: f64,
    pub horizon: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastingConfig {
    pub horizon: u32,
    pub selected_product_ids: Vec<String>,
    pub date_range: DateRange,
    pub model_type: Option<String>,
}

impl Default for ForecastingConfig {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON_DAYS,
            selected_product_ids: Vec::new(),
            date_range: DateRange::default(),
            model_type: None,
        }
    }
}

/// Per-product forecast series plus the horizon-wide metrics. These routes
/// are expected to exist, so there is no demo fallback; failures surface on
/// the error channel.
pub struct ForecastingSlice {
    client: Arc<HttpClient>,
    cache: FetchCache,
    forecasts: Resource<Vec<ProductForecast>>,
    metrics: Resource<ForecastMetrics>,
    selected_forecast: Mutex<Option<ProductForecast>>,
    config: Mutex<ForecastingConfig>,
}

impl ForecastingSlice {
    pub fn new(client: Arc<HttpClient>, cache: FetchCache) -> Self {
        Self {
            client,
            cache,
            forecasts: Resource::new(ResourceOptions::default().with_clear_on_refresh()),
            metrics: Resource::new(ResourceOptions::default()),
            selected_forecast: Mutex::new(None),
            config: Mutex::new(ForecastingConfig::default()),
        }
    }

    /// Fetches one product's series and upserts it into the forecast list.
    pub async fn fetch_product_forecast(&self, product_id: &str, range: &DateRange) {
        let generation = self.forecasts.begin();
        let result = self.fetch_payload(product_id, range, false).await;
        let applied = match result {
            ApiResult::Ok { data, status } => {
                let mut list = self.forecasts.data().unwrap_or_default();
                upsert(&mut list, data.into_forecast(product_id.to_string()));
                ApiResult::Ok { data: list, status }
            }
            ApiResult::Err { error, status } => ApiResult::Err { error, status },
        };
        self.forecasts.apply(generation, applied);
    }

    /// Fans out one fetch per product concurrently and applies the merged
    /// list once every fetch has settled. A failing product does not block
    /// the others; the first failure surfaces on the error channel.
    pub async fn fetch_multiple_forecasts(&self, product_ids: &[String]) {
        self.load_many(product_ids, false).await;
    }

    pub async fn fetch_metrics(&self) {
        self.load_metrics(false).await;
    }

    /// Clears the forecast list, then refetches the selected products and
    /// the metrics concurrently.
    pub async fn refresh(&self) {
        let product_ids = self.config().selected_product_ids;
        tokio::join!(self.load_many(&product_ids, true), self.load_metrics(true));
    }

    async fn load_many(&self, product_ids: &[String], force: bool) {
        let range = self.config().date_range;
        let generation = if force {
            self.forecasts.begin_refresh()
        } else {
            self.forecasts.begin()
        };

        let fetches = product_ids
            .iter()
            .map(|id| self.fetch_payload(id, &range, force));
        let results = join_all(fetches).await;

        let mut list = self.forecasts.data().unwrap_or_default();
        let mut last_status = 200;
        let mut succeeded = false;
        let mut first_error: Option<ApiResult<Vec<ProductForecast>>> = None;
        for (id, result) in product_ids.iter().zip(results) {
            match result {
                ApiResult::Ok { data, status } => {
                    upsert(&mut list, data.into_forecast(id.clone()));
                    last_status = status;
                    succeeded = true;
                }
                ApiResult::Err { error, status } => {
                    if first_error.is_none() {
                        first_error = Some(ApiResult::Err { error, status });
                    }
                }
            }
        }

        if succeeded || product_ids.is_empty() {
            self.forecasts.apply(
                generation,
                ApiResult::Ok {
                    data: list,
                    status: last_status,
                },
            );
            if let Some(ApiResult::Err { error, .. }) = first_error {
                self.forecasts.set_error(error);
            }
        } else if let Some(error) = first_error {
            self.forecasts.apply(generation, error);
        }
    }

    async fn fetch_payload(
        &self,
        product_id: &str,
        range: &DateRange,
        force: bool,
    ) -> ApiResult<ProductForecastPayload> {
        let mut params = vec![param("product_id", product_id)];
        if let Some(start) = &range.start {
            params.push(param("start", start));
        }
        if let Some(end) = &range.end {
            params.push(param("end", end));
        }
        cached_get(&self.client, &self.cache, PRODUCT_METRICS_PATH, params, force)
            .await
            .decode()
    }

    async fn load_metrics(&self, force: bool) {
        let horizon = self.config().horizon;
        let params = vec![param("horizon", horizon)];
        let future = async {
            cached_get(&self.client, &self.cache, METRICS_PATH, params, force)
                .await
                .decode()
        };
        if force {
            self.metrics.refresh_with(future).await;
        } else {
            self.metrics.fetch_with(future).await;
        }
    }

    pub fn forecasts(&self) -> SliceState<Vec<ProductForecast>> {
        self.forecasts.snapshot()
    }

    pub fn metrics(&self) -> SliceState<ForecastMetrics> {
        self.metrics.snapshot()
    }

    pub fn status(&self) -> SliceStatus {
        SliceStatus::merge([self.forecasts.status(), self.metrics.status()])
    }

    pub fn set_forecasts(&self, forecasts: Vec<ProductForecast>) {
        self.forecasts.set(forecasts);
    }

    pub fn set_metrics(&self, metrics: ForecastMetrics) {
        self.metrics.set(metrics);
    }

    /// Edits the metrics in place without a network call.
    pub fn update_metrics<F>(&self, edit: F)
    where
        F: FnOnce(&mut ForecastMetrics),
    {
        self.metrics.update(|data| {
            if let Some(metrics) = data {
                edit(metrics);
            }
        });
    }

    pub fn selected_forecast(&self) -> Option<ProductForecast> {
        self.selected_forecast
            .lock()
            .expect("selected forecast lock")
            .clone()
    }

    pub fn set_selected_forecast(&self, forecast: Option<ProductForecast>) {
        *self
            .selected_forecast
            .lock()
            .expect("selected forecast lock") = forecast;
    }

    pub fn dismiss_errors(&self) {
        self.forecasts.dismiss_error();
        self.metrics.dismiss_error();
    }

    pub fn config(&self) -> ForecastingConfig {
        self.config.lock().expect("forecasting config lock").clone()
    }

    pub fn set_horizon(&self, days: u32) {
        self.config.lock().expect("forecasting config lock").horizon = days;
    }

    pub fn set_selected_product_ids(&self, ids: Vec<String>) {
        self.config
            .lock()
            .expect("forecasting config lock")
            .selected_product_ids = ids;
    }

    pub fn set_date_range(&self, start: Option<String>, end: Option<String>) {
        self.config.lock().expect("forecasting config lock").date_range = DateRange { start, end };
    }

    pub fn set_model_type(&self, model_type: Option<String>) {
        self.config.lock().expect("forecasting config lock").model_type = model_type;
    }

    pub fn reset_configuration(&self) {
        *self.config.lock().expect("forecasting config lock") = ForecastingConfig::default();
    }
}

fn upsert(list: &mut Vec<ProductForecast>, forecast: ProductForecast) {
    match list
        .iter_mut()
        .find(|existing| existing.product_id == forecast.product_id)
    {
        Some(existing) => *existing = forecast,
        None => list.push(forecast),
    }
}
