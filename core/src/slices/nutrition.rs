use crate::cache::FetchCache;
use crate::http::HttpClient;
use crate::slice::Resource;
use crate::slice::ResourceOptions;
use crate::slice::SliceState;
use crate::slice::SliceStatus;
use crate::slices::cached_get;
use crate::slices::param;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;
use std::sync::Mutex;

const INSIGHTS_PATH: &str = "/api/nutrition-intelligence/insights";
const PRODUCTS_PATH: &str = "/api/nutrition-intelligence/products";
const TRENDS_PATH: &str = "/api/nutrition-intelligence/trends";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Trend,
    Recommendation,
    Alert,
    Opportunity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightImpact {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionInsight {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub category: String,
    pub impact: InsightImpact,
    pub confidence: f64,
    #[serde(default)]
    pub related_products: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTrend {
    pub period: String,
    pub score: f64,
    pub change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductNutritionData {
    pub product_id: String,
    pub product_name: String,
    pub nutrition_score: f64,
    pub health_metrics: HealthMetrics,
    #[serde(default)]
    pub trends: Vec<ScoreTrend>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionTrend {
    pub category: String,
    pub trend: TrendDirection,
    pub change: f64,
    #[serde(default)]
    pub products: Vec<String>,
    pub period: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutritionFilters {
    pub kind: Option<InsightKind>,
    pub category: Option<String>,
    pub impact: Option<InsightImpact>,
    pub search_query: String,
}

/// Nutrition intelligence: generated insights, per-product health metrics,
/// and category trends. No demo fallback; the intelligence routes are
/// expected to exist wherever this slice is enabled.
pub struct NutritionSlice {
    client: Arc<HttpClient>,
    cache: FetchCache,
    insights: Resource<Vec<NutritionInsight>>,
    product_data: Resource<Vec<ProductNutritionData>>,
    trends: Resource<Vec<NutritionTrend>>,
    selected_product: Mutex<Option<ProductNutritionData>>,
    filters: Mutex<NutritionFilters>,
}

impl NutritionSlice {
    pub fn new(client: Arc<HttpClient>, cache: FetchCache) -> Self {
        Self {
            client,
            cache,
            insights: Resource::new(ResourceOptions::default().with_clear_on_refresh()),
            product_data: Resource::new(ResourceOptions::default()),
            trends: Resource::new(ResourceOptions::default()),
            selected_product: Mutex::new(None),
            filters: Mutex::new(NutritionFilters::default()),
        }
    }

    pub async fn fetch_insights(&self) {
        self.load_insights(false).await;
    }

    pub async fn fetch_product_data(&self, product_id: Option<&str>) {
        self.load_product_data(product_id, false).await;
    }

    pub async fn fetch_trends(&self, category: Option<&str>) {
        self.load_trends(category, false).await;
    }

    /// Clears the insight list, then refetches everything concurrently with
    /// the category filter applied.
    pub async fn refresh(&self) {
        let category = self.filters().category;
        tokio::join!(
            self.load_insights(true),
            self.load_product_data(None, true),
            self.load_trends(category.as_deref(), true),
        );
    }

    async fn load_insights(&self, force: bool) {
        let future = async {
            cached_get(&self.client, &self.cache, INSIGHTS_PATH, Vec::new(), force)
                .await
                .decode()
        };
        if force {
            self.insights.refresh_with(future).await;
        } else {
            self.insights.fetch_with(future).await;
        }
    }

    async fn load_product_data(&self, product_id: Option<&str>, force: bool) {
        let mut params = Vec::new();
        if let Some(product_id) = product_id {
            params.push(param("product_id", product_id));
        }
        let future = async {
            cached_get(&self.client, &self.cache, PRODUCTS_PATH, params, force)
                .await
                .decode()
        };
        if force {
            self.product_data.refresh_with(future).await;
        } else {
            self.product_data.fetch_with(future).await;
        }
    }

    async fn load_trends(&self, category: Option<&str>, force: bool) {
        let mut params = Vec::new();
        if let Some(category) = category {
            params.push(param("category", category));
        }
        let future = async {
            cached_get(&self.client, &self.cache, TRENDS_PATH, params, force)
                .await
                .decode()
        };
        if force {
            self.trends.refresh_with(future).await;
        } else {
            self.trends.fetch_with(future).await;
        }
    }

    pub fn insights(&self) -> SliceState<Vec<NutritionInsight>> {
        self.insights.snapshot()
    }

    pub fn product_data(&self) -> SliceState<Vec<ProductNutritionData>> {
        self.product_data.snapshot()
    }

    pub fn trends(&self) -> SliceState<Vec<NutritionTrend>> {
        self.trends.snapshot()
    }

    pub fn status(&self) -> SliceStatus {
        SliceStatus::merge([
            self.insights.status(),
            self.product_data.status(),
            self.trends.status(),
        ])
    }

    pub fn set_insights(&self, insights: Vec<NutritionInsight>) {
        self.insights.set(insights);
    }

    pub fn set_product_data(&self, data: Vec<ProductNutritionData>) {
        self.product_data.set(data);
    }

    pub fn set_trends(&self, trends: Vec<NutritionTrend>) {
        self.trends.set(trends);
    }

    pub fn selected_product(&self) -> Option<ProductNutritionData> {
        self.selected_product
            .lock()
            .expect("selected product lock")
            .clone()
    }

    pub fn set_selected_product(&self, product: Option<ProductNutritionData>) {
        *self.selected_product.lock().expect("selected product lock") = product;
    }

    pub fn dismiss_errors(&self) {
        self.insights.dismiss_error();
        self.product_data.dismiss_error();
        self.trends.dismiss_error();
    }

    pub fn filters(&self) -> NutritionFilters {
        self.filters.lock().expect("nutrition filters lock").clone()
    }

    pub fn set_kind_filter(&self, kind: Option<InsightKind>) {
        self.filters.lock().expect("nutrition filters lock").kind = kind;
    }

    pub fn set_category_filter(&self, category: Option<String>) {
        self.filters.lock().expect("nutrition filters lock").category = category;
    }

    pub fn set_impact_filter(&self, impact: Option<InsightImpact>) {
        self.filters.lock().expect("nutrition filters lock").impact = impact;
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        self.filters.lock().expect("nutrition filters lock").search_query = query.into();
    }

    pub fn reset_filters(&self) {
        *self.filters.lock().expect("nutrition filters lock") = NutritionFilters::default();
    }
}
