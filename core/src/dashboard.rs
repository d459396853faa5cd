use crate::cache::FetchCache;
use crate::config::ClientConfig;
use crate::http::HttpClient;
use crate::http::HttpError;
use crate::refresh::RefreshCoordinator;
use crate::refresh::RefreshSummary;
use crate::refresh::RefreshTask;
use crate::slice::SliceStatus;
use crate::slices::AnalyticsSlice;
use crate::slices::ForecastingSlice;
use crate::slices::MarketingSlice;
use crate::slices::NutritionSlice;
use crate::slices::OptimizationSlice;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliceName {
    Analytics,
    Marketing,
    Optimization,
    Forecasting,
    Nutrition,
}

impl SliceName {
    pub const ALL: [SliceName; 5] = [
        SliceName::Analytics,
        SliceName::Marketing,
        SliceName::Optimization,
        SliceName::Forecasting,
        SliceName::Nutrition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SliceName::Analytics => "analytics",
            SliceName::Marketing => "marketing",
            SliceName::Optimization => "optimization",
            SliceName::Forecasting => "forecasting",
            SliceName::Nutrition => "nutrition",
        }
    }
}

impl fmt::Display for SliceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SliceName {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "analytics" => Ok(SliceName::Analytics),
            "marketing" => Ok(SliceName::Marketing),
            "optimization" => Ok(SliceName::Optimization),
            "forecasting" => Ok(SliceName::Forecasting),
            "nutrition" => Ok(SliceName::Nutrition),
            other => Err(format!("unknown slice: {other}")),
        }
    }
}

/// A label-addressed KPI overwrite, applied onto whichever metric the label
/// names. Non-numeric KPI values are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiUpdate {
    pub label: String,
    pub value: f64,
}

/// The composed store: one controller per domain, all sharing a single HTTP
/// client and request cache, plus the fan-out refresh coordinator.
pub struct Dashboard {
    client: Arc<HttpClient>,
    cache: FetchCache,
    coordinator: RefreshCoordinator,
    pub analytics: Arc<AnalyticsSlice>,
    pub marketing: Arc<MarketingSlice>,
    pub optimization: Arc<OptimizationSlice>,
    pub forecasting: Arc<ForecastingSlice>,
    pub nutrition: Arc<NutritionSlice>,
}

impl Dashboard {
    pub fn new(config: ClientConfig) -> Result<Self, HttpError> {
        let client = Arc::new(HttpClient::new(config)?);
        Ok(Self::with_parts(client, FetchCache::default()))
    }

    /// Builds the store around an existing client and cache, so tests can
    /// construct isolated instances per case.
    pub fn with_parts(client: Arc<HttpClient>, cache: FetchCache) -> Self {
        Self {
            analytics: Arc::new(AnalyticsSlice::new(Arc::clone(&client), cache.clone())),
            marketing: Arc::new(MarketingSlice::new(Arc::clone(&client), cache.clone())),
            optimization: Arc::new(OptimizationSlice::new(Arc::clone(&client), cache.clone())),
            forecasting: Arc::new(ForecastingSlice::new(Arc::clone(&client), cache.clone())),
            nutrition: Arc::new(NutritionSlice::new(Arc::clone(&client), cache.clone())),
            coordinator: RefreshCoordinator::new(),
            client,
            cache,
        }
    }

    pub fn client(&self) -> &Arc<HttpClient> {
        &self.client
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Refreshes every slice concurrently and reports the merged outcome.
    /// Each slice's own state is updated independently; the summary carries
    /// the first error among them.
    pub async fn refresh_all(&self) -> RefreshSummary {
        let analytics = Arc::clone(&self.analytics);
        let marketing = Arc::clone(&self.marketing);
        let optimization = Arc::clone(&self.optimization);
        let forecasting = Arc::clone(&self.forecasting);
        let nutrition = Arc::clone(&self.nutrition);

        let tasks: Vec<RefreshTask> = vec![
            async move {
                analytics.refresh().await;
                analytics.status().error
            }
            .boxed(),
            async move {
                marketing.refresh().await;
                marketing.status().error
            }
            .boxed(),
            async move {
                optimization.refresh().await;
                optimization.status().error
            }
            .boxed(),
            async move {
                forecasting.refresh().await;
                forecasting.status().error
            }
            .boxed(),
            async move {
                nutrition.refresh().await;
                nutrition.status().error
            }
            .boxed(),
        ];
        self.coordinator.refresh_all(tasks).await
    }

    pub fn status(&self, slice: SliceName) -> SliceStatus {
        match slice {
            SliceName::Analytics => self.analytics.status(),
            SliceName::Marketing => self.marketing.status(),
            SliceName::Optimization => self.optimization.status(),
            SliceName::Forecasting => self.forecasting.status(),
            SliceName::Nutrition => self.nutrition.status(),
        }
    }

    /// Routes a JSON payload record onto the matching slice setters. Fields
    /// that do not decode are skipped with a warning; this is a state
    /// injection path, not a network one.
    pub fn apply_payload(&self, slice: SliceName, payload: &Value) {
        match slice {
            SliceName::Analytics => {
                if let Some(aggregate) = take_field(payload, "aggregate") {
                    self.analytics.set_aggregate(aggregate);
                }
                if let Some(predictions) = take_field(payload, "predictions") {
                    self.analytics.set_predictions(predictions);
                }
                if let Some(live_metrics) = take_field(payload, "live_metrics") {
                    self.analytics.set_live_metrics(live_metrics);
                }
            }
            SliceName::Marketing => {
                if let Some(campaigns) = take_field(payload, "campaigns") {
                    self.marketing.set_campaigns(campaigns);
                }
                if let Some(conversions) = take_field(payload, "conversions") {
                    self.marketing.set_conversions(conversions);
                }
            }
            SliceName::Optimization => {
                if let Some(recommendations) = take_field(payload, "recommendations") {
                    self.optimization.set_recommendations(recommendations);
                }
                if let Some(metrics) = take_field(payload, "metrics") {
                    self.optimization.set_metrics(metrics);
                }
            }
            SliceName::Forecasting => {
                if let Some(forecasts) = take_field(payload, "forecasts") {
                    self.forecasting.set_forecasts(forecasts);
                }
                if let Some(metrics) = take_field(payload, "metrics") {
                    self.forecasting.set_metrics(metrics);
                }
            }
            SliceName::Nutrition => {
                if let Some(insights) = take_field(payload, "insights") {
                    self.nutrition.set_insights(insights);
                }
                if let Some(product_data) = take_field(payload, "product_data") {
                    self.nutrition.set_product_data(product_data);
                }
                if let Some(trends) = take_field(payload, "trends") {
                    self.nutrition.set_trends(trends);
                }
            }
        }
    }

    /// Applies label-matched KPI overwrites onto the slice's metric record.
    /// A slice without data yet is left untouched.
    pub fn update_kpi(&self, slice: SliceName, kpis: &[KpiUpdate]) {
        match slice {
            SliceName::Analytics => {
                for kpi in kpis {
                    let label = kpi.label.to_lowercase();
                    self.analytics.update_aggregate(|aggregate| {
                        if label.contains("sales") {
                            aggregate.total_sales = kpi.value;
                        }
                        if label.contains("order") {
                            if label.contains("avg") {
                                aggregate.avg_order_value = kpi.value;
                            } else {
                                aggregate.orders_count = kpi.value as u64;
                            }
                        }
                    });
                }
            }
            SliceName::Optimization => {
                for kpi in kpis {
                    let label = kpi.label.to_lowercase();
                    self.optimization.update_metrics(|metrics| {
                        if label.contains("efficiency") {
                            if label.contains("current") {
                                metrics.current_efficiency = kpi.value;
                            } else if label.contains("target") {
                                metrics.target_efficiency = kpi.value;
                            }
                        }
                    });
                }
            }
            SliceName::Forecasting => {
                for kpi in kpis {
                    let label = kpi.label.to_lowercase();
                    self.forecasting.update_metrics(|metrics| {
                        if label.contains("revenue") {
                            metrics.total_forecasted_revenue = kpi.value;
                        }
                        if label.contains("growth") {
                            metrics.forecasted_growth = kpi.value;
                        }
                    });
                }
            }
            SliceName::Marketing | SliceName::Nutrition => {}
        }
    }
}

fn take_field<T: DeserializeOwned>(payload: &Value, key: &str) -> Option<T> {
    let field = payload.get(key)?.clone();
    match serde_json::from_value(field) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, "skipping payload field with unexpected shape: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn dashboard() -> Dashboard {
        Dashboard::new(ClientConfig::default()).expect("dashboard")
    }

    #[test]
    fn payload_routes_to_analytics_setters() {
        let dashboard = dashboard();
        dashboard.apply_payload(
            SliceName::Analytics,
            &json!({
                "aggregate": {
                    "total_sales": 1000.0,
                    "avg_order_value": 50.0,
                    "orders_count": 20,
                    "by_day": [],
                }
            }),
        );

        let aggregate = dashboard.analytics.aggregate().data.expect("aggregate");
        assert_eq!(aggregate.total_sales, 1000.0);
        assert_eq!(aggregate.orders_count, 20);
    }

    #[test]
    fn malformed_payload_field_is_skipped() {
        let dashboard = dashboard();
        dashboard.apply_payload(
            SliceName::Marketing,
            &json!({ "campaigns": "not a list" }),
        );
        assert_eq!(dashboard.marketing.campaigns().data, None);
    }

    #[test]
    fn kpi_labels_address_aggregate_fields() {
        let dashboard = dashboard();
        dashboard.apply_payload(
            SliceName::Analytics,
            &json!({
                "aggregate": {
                    "total_sales": 1000.0,
                    "avg_order_value": 50.0,
                    "orders_count": 20,
                    "by_day": [],
                }
            }),
        );

        dashboard.update_kpi(
            SliceName::Analytics,
            &[
                KpiUpdate {
                    label: "Total Sales".to_string(),
                    value: 2000.0,
                },
                KpiUpdate {
                    label: "Avg Order Value".to_string(),
                    value: 75.0,
                },
            ],
        );

        let aggregate = dashboard.analytics.aggregate().data.expect("aggregate");
        assert_eq!(aggregate.total_sales, 2000.0);
        assert_eq!(aggregate.avg_order_value, 75.0);
        assert_eq!(aggregate.orders_count, 20);
    }

    #[test]
    fn kpi_update_without_data_is_a_noop() {
        let dashboard = dashboard();
        dashboard.update_kpi(
            SliceName::Forecasting,
            &[KpiUpdate {
                label: "Forecasted Revenue".to_string(),
                value: 1.0,
            }],
        );
        assert_eq!(dashboard.forecasting.metrics().data, None);
    }

    #[test]
    fn slice_names_round_trip() {
        for name in SliceName::ALL {
            assert_eq!(name.as_str().parse::<SliceName>(), Ok(name));
        }
    }
}
