use crate::api::ApiResult;
use crate::cache::FetchCache;
use crate::http::HttpClient;
use crate::mock;
use crate::slice::Resource;
use crate::slice::ResourceOptions;
use crate::slice::SliceState;
use crate::slice::SliceStatus;
use crate::slices::cached_get;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;
use std::sync::Mutex;

const RECOMMENDATIONS_PATH: &str = "/api/optimization/recommendations";
const METRICS_PATH: &str = "/api/optimization/metrics";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Pricing,
    Inventory,
    Promotion,
    SupplyChain,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationStatus {
    Pending,
    Applied,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub title: String,
    pub description: String,
    pub impact: ImpactLevel,
    #[serde(rename = "estimatedValue")]
    pub estimated_value: f64,
    pub confidence: f64,
    pub status: RecommendationStatus,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyArea {
    pub category: String,
    pub current: f64,
    pub target: f64,
    pub improvement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationMetrics {
    #[serde(rename = "currentEfficiency")]
    pub current_efficiency: f64,
    #[serde(rename = "targetEfficiency")]
    pub target_efficiency: f64,
    #[serde(rename = "improvementPotential")]
    pub improvement_potential: f64,
    #[serde(default)]
    pub areas: Vec<EfficiencyArea>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimizationFilters {
    pub kind: Option<RecommendationKind>,
    pub impact: Option<ImpactLevel>,
    pub status: Option<RecommendationStatus>,
}

/// Efficiency recommendations and their aggregate metrics, plus the
/// apply/reject mutations. Mutations update the local list optimistically
/// once the backend acknowledges (404 from a demo backend is tolerated).
pub struct OptimizationSlice {
    client: Arc<HttpClient>,
    cache: FetchCache,
    recommendations: Resource<Vec<Recommendation>>,
    metrics: Resource<OptimizationMetrics>,
    active_optimizations: Mutex<Vec<String>>,
    filters: Mutex<OptimizationFilters>,
}

impl OptimizationSlice {
    pub fn new(client: Arc<HttpClient>, cache: FetchCache) -> Self {
        Self {
            client,
            cache,
            recommendations: Resource::new(
                ResourceOptions::default()
                    .with_clear_on_refresh()
                    .with_not_found_fallback(mock::optimization_recommendations),
            ),
            metrics: Resource::new(
                ResourceOptions::default().with_not_found_fallback(mock::optimization_metrics),
            ),
            active_optimizations: Mutex::new(Vec::new()),
            filters: Mutex::new(OptimizationFilters::default()),
        }
    }

    pub async fn fetch_recommendations(&self) {
        self.load_recommendations(false).await;
    }

    pub async fn fetch_metrics(&self) {
        self.load_metrics(false).await;
    }

    /// Clears the recommendation list, then refetches both values
    /// concurrently. Metrics replace wholesale and keep their stale value
    /// while the refetch is in flight.
    pub async fn refresh(&self) {
        tokio::join!(self.load_recommendations(true), self.load_metrics(true));
    }

    async fn load_recommendations(&self, force: bool) {
        let future = async {
            cached_get(
                &self.client,
                &self.cache,
                RECOMMENDATIONS_PATH,
                Vec::new(),
                force,
            )
            .await
            .decode()
        };
        if force {
            self.recommendations.refresh_with(future).await;
        } else {
            self.recommendations.fetch_with(future).await;
        }
    }

    async fn load_metrics(&self, force: bool) {
        let future = async {
            cached_get(&self.client, &self.cache, METRICS_PATH, Vec::new(), force)
                .await
                .decode()
        };
        if force {
            self.metrics.refresh_with(future).await;
        } else {
            self.metrics.fetch_with(future).await;
        }
    }

    /// POSTs the apply action and flips the local status. The id is also
    /// recorded as an active optimization.
    pub async fn apply_recommendation(&self, id: &str) {
        let path = format!("{RECOMMENDATIONS_PATH}/{id}/apply");
        if self.mutate(&path).await {
            self.flip_status(id, RecommendationStatus::Applied);
            self.active_optimizations
                .lock()
                .expect("active optimizations lock")
                .push(id.to_string());
        }
    }

    pub async fn reject_recommendation(&self, id: &str) {
        let path = format!("{RECOMMENDATIONS_PATH}/{id}/reject");
        if self.mutate(&path).await {
            self.flip_status(id, RecommendationStatus::Rejected);
        }
    }

    async fn mutate(&self, path: &str) -> bool {
        let result = ApiResult::from_response(self.client.post(path, None).await);
        match result {
            ApiResult::Ok { .. }
            | ApiResult::Err {
                status: Some(404), ..
            } => true,
            ApiResult::Err { error, .. } => {
                self.recommendations.set_error(error);
                false
            }
        }
    }

    fn flip_status(&self, id: &str, status: RecommendationStatus) {
        self.recommendations.update(|data| {
            if let Some(list) = data {
                for recommendation in list.iter_mut() {
                    if recommendation.id == id {
                        recommendation.status = status;
                    }
                }
            }
        });
    }

    pub fn recommendations(&self) -> SliceState<Vec<Recommendation>> {
        self.recommendations.snapshot()
    }

    pub fn metrics(&self) -> SliceState<OptimizationMetrics> {
        self.metrics.snapshot()
    }

    pub fn active_optimizations(&self) -> Vec<String> {
        self.active_optimizations
            .lock()
            .expect("active optimizations lock")
            .clone()
    }

    pub fn status(&self) -> SliceStatus {
        SliceStatus::merge([self.recommendations.status(), self.metrics.status()])
    }

    pub fn set_recommendations(&self, recommendations: Vec<Recommendation>) {
        self.recommendations.set(recommendations);
    }

    pub fn set_metrics(&self, metrics: OptimizationMetrics) {
        self.metrics.set(metrics);
    }

    /// Edits the metrics in place without a network call.
    pub fn update_metrics<F>(&self, edit: F)
    where
        F: FnOnce(&mut OptimizationMetrics),
    {
        self.metrics.update(|data| {
            if let Some(metrics) = data {
                edit(metrics);
            }
        });
    }

    pub fn dismiss_errors(&self) {
        self.recommendations.dismiss_error();
        self.metrics.dismiss_error();
    }

    pub fn filters(&self) -> OptimizationFilters {
        self.filters.lock().expect("optimization filters lock").clone()
    }

    pub fn set_kind_filter(&self, kind: Option<RecommendationKind>) {
        self.filters.lock().expect("optimization filters lock").kind = kind;
    }

    pub fn set_impact_filter(&self, impact: Option<ImpactLevel>) {
        self.filters.lock().expect("optimization filters lock").impact = impact;
    }

    pub fn set_status_filter(&self, status: Option<RecommendationStatus>) {
        self.filters.lock().expect("optimization filters lock").status = status;
    }

    pub fn reset_filters(&self) {
        *self.filters.lock().expect("optimization filters lock") = OptimizationFilters::default();
    }
}
